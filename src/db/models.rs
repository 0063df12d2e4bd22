use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account role. Stored as TEXT in the `accounts` table.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "PascalCase")]
pub enum Role {
    Distributor,
    Pharmacy,
    Backup,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Distributor => "Distributor",
            Role::Pharmacy => "Pharmacy",
            Role::Backup => "Backup",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distributor" => Ok(Role::Distributor),
            "pharmacy" => Ok(Role::Pharmacy),
            "backup" => Ok(Role::Backup),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The closed set of states an order passes through.
///
/// Allowed transitions: Pending -> Approved, Pending -> Rejected,
/// Approved -> Fulfilled. Everything else is rejected.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "PascalCase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Approved)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Approved, OrderStatus::Fulfilled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Approved => "Approved",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Fulfilled => "Fulfilled",
        };
        f.write_str(name)
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "rejected" => Ok(OrderStatus::Rejected),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A distributor, pharmacy, or backup-operator account.
///
/// `secret_code` is set only on distributors; `linked_distributor_id` only on
/// pharmacies, where it references the one distributor the pharmacy orders
/// from. `password` is absent for pharmacies provisioned for login-time
/// linkage, which authenticate with the distributor's code instead.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub password: Option<String>,
    pub role: Role,
    pub secret_code: Option<String>,
    pub linked_distributor_id: Option<i64>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Medicine {
    pub id: i64,
    pub name: String,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct StockEntry {
    pub id: i64,
    pub distributor_id: i64,
    pub medicine_id: i64,
    pub available_qty: i64,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub pharmacy_id: i64,
    pub distributor_id: i64,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub medicine_id: i64,
    pub qty: i64,
    pub price: f64,
}

/// One line of an order submission, validated before anything is persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub medicine_id: i64,
    pub qty: i64,
    pub price: f64,
}

/// The identity a successful login authorizes a session as. The transport
/// layer owns session storage; the core only produces and consumes this value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub account_id: i64,
    pub username: String,
    pub role: Role,
}

/// One row of a distributor's stock listing, joined with the medicine name.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub medicine: String,
    pub qty: i64,
}

/// One flattened row of the global order listing: one row per order item,
/// joined with the pharmacy username and medicine name.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub pharmacy: String,
    pub medicine: String,
    pub qty: i64,
    pub status: OrderStatus,
}
