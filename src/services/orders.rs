use sqlx::SqlitePool;

use crate::db::models::{NewOrderItem, Order, OrderItem, OrderStatus, OrderSummary, Role};
use crate::error::ServiceError;
use crate::services::directory::AccountDirectory;

/// Creates and advances multi-item orders a pharmacy places against a
/// distributor's catalog.
#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    directory: AccountDirectory,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        let directory = AccountDirectory::new(pool.clone());
        Self { pool, directory }
    }

    /// Creates an order with all of its items in one transaction.
    ///
    /// `pharmacy_id` must resolve to a Pharmacy account and `distributor_id`
    /// to a Distributor account; every item needs a positive quantity and a
    /// non-negative price. If any check fails, nothing is persisted. Stock is
    /// not checked or decremented here; the ledger is informational.
    pub async fn create_order(
        &self,
        pharmacy_id: i64,
        distributor_id: i64,
        items: &[NewOrderItem],
    ) -> Result<Order, ServiceError> {
        self.ensure_role(pharmacy_id, Role::Pharmacy, "pharmacy_id")
            .await?;
        self.ensure_role(distributor_id, Role::Distributor, "distributor_id")
            .await?;

        for item in items {
            if item.qty <= 0 {
                return Err(ServiceError::InvalidQuantity(item.qty));
            }
            if item.price < 0.0 {
                return Err(ServiceError::InvalidPrice(item.price));
            }
        }

        let mut transaction = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (pharmacy_id, distributor_id, status, created_at)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(pharmacy_id)
        .bind(distributor_id)
        .bind(OrderStatus::Pending)
        .bind(chrono::Utc::now().naive_utc())
        .fetch_one(&mut *transaction)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, medicine_id, qty, price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id)
            .bind(item.medicine_id)
            .bind(item.qty)
            .bind(item.price)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        log::info!(
            "Created order {} ({} items) for pharmacy {} against distributor {}",
            order.id,
            items.len(),
            pharmacy_id,
            distributor_id
        );
        Ok(order)
    }

    /// Fetches an order and its items in submission order.
    pub async fn get_order(&self, order_id: i64) -> Result<(Order, Vec<OrderItem>), ServiceError> {
        let order = self.order(order_id).await?;
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok((order, items))
    }

    /// Advances an order along the closed transition set. A disallowed
    /// transition fails and leaves the stored status unchanged.
    pub async fn update_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let order = self.order(order_id).await?;
        if !order.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        let updated =
            sqlx::query_as::<_, Order>("UPDATE orders SET status = $1 WHERE id = $2 RETURNING *")
                .bind(new_status)
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?;

        log::info!("Order {} moved {} -> {}", order_id, order.status, updated.status);
        Ok(updated)
    }

    /// Flattened listing across all orders: one row per item, joined with the
    /// pharmacy username and medicine name.
    pub async fn list_orders(&self) -> Result<Vec<OrderSummary>, ServiceError> {
        let rows = sqlx::query_as::<_, OrderSummary>(
            "SELECT a.username AS pharmacy, m.name AS medicine, i.qty AS qty, o.status AS status
             FROM orders o
             JOIN order_items i ON i.order_id = o.id
             JOIN accounts a ON a.id = o.pharmacy_id
             JOIN medicines m ON m.id = i.medicine_id
             ORDER BY o.id, i.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn order(&self, order_id: i64) -> Result<Order, ServiceError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("order"))
    }

    async fn ensure_role(
        &self,
        account_id: i64,
        role: Role,
        field: &'static str,
    ) -> Result<(), ServiceError> {
        match self.directory.find_by_id(account_id).await {
            Ok(account) if account.role == role => Ok(()),
            Ok(_) | Err(ServiceError::NotFound(_)) => Err(ServiceError::InvalidParty(field)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Account;
    use crate::db::test_support;
    use crate::services::ledger::InventoryLedger;

    async fn parties(pool: &SqlitePool) -> (Account, Account) {
        let directory = AccountDirectory::new(pool.clone());
        let distributor = directory
            .create_account("dist", "pass", Role::Distributor)
            .await
            .unwrap();
        let pharmacy = directory
            .create_pharmacy("pharm", Some("pw"), distributor.id)
            .await
            .unwrap();
        (pharmacy, distributor)
    }

    async fn catalog(pool: &SqlitePool, names: &[&str]) -> Vec<i64> {
        let ledger = InventoryLedger::new(pool.clone());
        let mut ids = Vec::new();
        for name in names {
            ids.push(ledger.add_medicine(name).await.unwrap().id);
        }
        ids
    }

    #[tokio::test]
    async fn round_trips_the_submitted_items_in_order() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let meds = catalog(&pool, &["Paracetamol", "Amoxicillin"]).await;
        let service = OrderService::new(pool);

        let items = vec![
            NewOrderItem {
                medicine_id: meds[0],
                qty: 10,
                price: 5.0,
            },
            NewOrderItem {
                medicine_id: meds[1],
                qty: 20,
                price: 3.0,
            },
        ];
        let order = service
            .create_order(pharmacy.id, distributor.id, &items)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let (fetched, fetched_items) = service.get_order(order.id).await.unwrap();
        assert_eq!(fetched.id, order.id);
        assert_eq!(fetched.pharmacy_id, pharmacy.id);
        assert_eq!(fetched.distributor_id, distributor.id);

        let round_tripped: Vec<NewOrderItem> = fetched_items
            .iter()
            .map(|i| NewOrderItem {
                medicine_id: i.medicine_id,
                qty: i.qty,
                price: i.price,
            })
            .collect();
        assert_eq!(round_tripped, items);
    }

    #[tokio::test]
    async fn creation_is_all_or_nothing() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let meds = catalog(&pool, &["Paracetamol"]).await;
        let service = OrderService::new(pool.clone());

        let items = vec![
            NewOrderItem {
                medicine_id: meds[0],
                qty: 10,
                price: 5.0,
            },
            NewOrderItem {
                medicine_id: meds[0],
                qty: 0,
                price: 3.0,
            },
        ];
        let err = service
            .create_order(pharmacy.id, distributor.id, &items)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(0)));

        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .unwrap();
        let order_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((orders, order_items), (0, 0));
    }

    #[tokio::test]
    async fn parties_must_carry_the_right_roles() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let service = OrderService::new(pool);

        // Swapped parties.
        let err = service
            .create_order(distributor.id, pharmacy.id, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParty("pharmacy_id")));

        // Unknown distributor.
        let err = service
            .create_order(pharmacy.id, distributor.id + 100, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParty("distributor_id")));
    }

    #[tokio::test]
    async fn only_the_closed_transition_set_is_allowed() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let service = OrderService::new(pool);

        let order = service
            .create_order(pharmacy.id, distributor.id, &[])
            .await
            .unwrap();

        // Pending -> Fulfilled skips approval.
        let err = service
            .update_status(order.id, OrderStatus::Fulfilled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Fulfilled,
            }
        ));
        let (unchanged, _) = service.get_order(order.id).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Pending);

        let approved = service
            .update_status(order.id, OrderStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, OrderStatus::Approved);

        // Approved -> Rejected is not a legal move.
        let err = service
            .update_status(order.id, OrderStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let fulfilled = service
            .update_status(order.id, OrderStatus::Fulfilled)
            .await
            .unwrap();
        assert_eq!(fulfilled.status, OrderStatus::Fulfilled);

        // Fulfilled is terminal.
        let err = service
            .update_status(order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn rejection_is_terminal() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let service = OrderService::new(pool);

        let order = service
            .create_order(pharmacy.id, distributor.id, &[])
            .await
            .unwrap();
        service
            .update_status(order.id, OrderStatus::Rejected)
            .await
            .unwrap();

        for next in [
            OrderStatus::Pending,
            OrderStatus::Approved,
            OrderStatus::Fulfilled,
        ] {
            let err = service.update_status(order.id, next).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidTransition { .. }));
        }
    }

    #[tokio::test]
    async fn unknown_orders_are_not_found() {
        let pool = test_support::pool().await;
        let service = OrderService::new(pool);

        assert!(matches!(
            service.get_order(99).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.update_status(99, OrderStatus::Approved).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_flattens_orders_to_one_row_per_item() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let meds = catalog(&pool, &["Paracetamol", "Amoxicillin"]).await;
        let service = OrderService::new(pool);

        service
            .create_order(
                pharmacy.id,
                distributor.id,
                &[
                    NewOrderItem {
                        medicine_id: meds[0],
                        qty: 10,
                        price: 5.0,
                    },
                    NewOrderItem {
                        medicine_id: meds[1],
                        qty: 20,
                        price: 3.0,
                    },
                ],
            )
            .await
            .unwrap();

        let rows = service.list_orders().await.unwrap();
        assert_eq!(
            rows,
            vec![
                OrderSummary {
                    pharmacy: "pharm".to_string(),
                    medicine: "Paracetamol".to_string(),
                    qty: 10,
                    status: OrderStatus::Pending,
                },
                OrderSummary {
                    pharmacy: "pharm".to_string(),
                    medicine: "Amoxicillin".to_string(),
                    qty: 20,
                    status: OrderStatus::Pending,
                },
            ]
        );
    }

    #[tokio::test]
    async fn orders_serialize_with_stable_field_names() {
        let pool = test_support::pool().await;
        let (pharmacy, distributor) = parties(&pool).await;
        let meds = catalog(&pool, &["Paracetamol"]).await;
        let service = OrderService::new(pool);

        let order = service
            .create_order(
                pharmacy.id,
                distributor.id,
                &[NewOrderItem {
                    medicine_id: meds[0],
                    qty: 10,
                    price: 5.0,
                }],
            )
            .await
            .unwrap();
        let (order, items) = service.get_order(order.id).await.unwrap();

        let payload = serde_json::json!({ "order": order, "items": items });
        assert_eq!(payload["order"]["status"], "Pending");
        assert_eq!(payload["items"][0]["qty"], 10);
        assert_eq!(payload["items"][0]["price"], 5.0);
    }
}
