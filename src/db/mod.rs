use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use thiserror::Error;

pub mod models;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// One `CREATE TABLE` per entity; idempotent so binaries can run it on every
/// start. Foreign keys are enforced via `init_db`'s connection options.
const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password TEXT,
        role TEXT NOT NULL,
        secret_code TEXT,
        linked_distributor_id INTEGER,
        FOREIGN KEY(linked_distributor_id) REFERENCES accounts(id)
    )",
    "CREATE TABLE IF NOT EXISTS medicines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stock_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        distributor_id INTEGER NOT NULL,
        medicine_id INTEGER NOT NULL,
        available_qty INTEGER NOT NULL DEFAULT 0 CHECK(available_qty >= 0),
        UNIQUE(distributor_id, medicine_id),
        FOREIGN KEY(distributor_id) REFERENCES accounts(id),
        FOREIGN KEY(medicine_id) REFERENCES medicines(id)
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pharmacy_id INTEGER NOT NULL,
        distributor_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        created_at DATETIME NOT NULL,
        FOREIGN KEY(pharmacy_id) REFERENCES accounts(id),
        FOREIGN KEY(distributor_id) REFERENCES accounts(id)
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL,
        medicine_id INTEGER NOT NULL,
        qty INTEGER NOT NULL,
        price REAL NOT NULL,
        FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE,
        FOREIGN KEY(medicine_id) REFERENCES medicines(id)
    )",
];

/// Opens the store, creating the database file on first run. The returned
/// pool is the single store handle the services are constructed with.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePool::connect_with(options)
        .await
        .map_err(DatabaseError::Sqlx)
}

/// Creates any missing tables.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
