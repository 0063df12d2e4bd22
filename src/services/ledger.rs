use sqlx::SqlitePool;

use crate::db::models::{Medicine, StockEntry, StockLevel};
use crate::error::ServiceError;

/// Per-distributor, per-medicine available-quantity records.
///
/// The ledger is informational: order creation does not decrement it. A
/// stricter policy would be layered here, against the same rows.
#[derive(Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Adds a medicine to the catalog. Names are not unique; distinct
    /// catalogs may duplicate them.
    pub async fn add_medicine(&self, name: &str) -> Result<Medicine, ServiceError> {
        let medicine =
            sqlx::query_as::<_, Medicine>("INSERT INTO medicines (name) VALUES ($1) RETURNING *")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(medicine)
    }

    /// Lists a distributor's stock with medicine names, in insertion order.
    pub async fn get_stock(&self, distributor_id: i64) -> Result<Vec<StockLevel>, ServiceError> {
        log::info!("Listing stock for distributor {}", distributor_id);
        let levels = sqlx::query_as::<_, StockLevel>(
            "SELECT m.name AS medicine, s.available_qty AS qty
             FROM stock_entries s
             JOIN medicines m ON m.id = s.medicine_id
             WHERE s.distributor_id = $1
             ORDER BY s.id",
        )
        .bind(distributor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    /// Upserts the available quantity for one (distributor, medicine) pair.
    pub async fn set_stock(
        &self,
        distributor_id: i64,
        medicine_id: i64,
        qty: i64,
    ) -> Result<StockEntry, ServiceError> {
        if qty < 0 {
            return Err(ServiceError::InvalidQuantity(qty));
        }

        let entry = sqlx::query_as::<_, StockEntry>(
            "INSERT INTO stock_entries (distributor_id, medicine_id, available_qty)
             VALUES ($1, $2, $3)
             ON CONFLICT(distributor_id, medicine_id)
             DO UPDATE SET available_qty = excluded.available_qty
             RETURNING *",
        )
        .bind(distributor_id)
        .bind(medicine_id)
        .bind(qty)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }
}
