use thiserror::Error;

use crate::db::models::OrderStatus;

/// Errors surfaced by the core operations.
///
/// Every variant is recoverable at the caller: the transport layer maps each
/// kind to a status code and payload, and a failed operation leaves all
/// entities in their prior persisted state.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
    #[error("invite code does not match any distributor")]
    InvalidInviteCode,
    #[error("unauthorized")]
    Unauthorized,
    #[error("order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("quantity {0} is out of range")]
    InvalidQuantity(i64),
    #[error("price {0} is out of range")]
    InvalidPrice(f64),
    #[error("{0} does not resolve to an account with the required role")]
    InvalidParty(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
