use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog row. `price` serializes as a string with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Sweet {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity_in_stock: i32,
}

/// Validated, writable columns of a sweet.
#[derive(Debug, Clone, PartialEq)]
pub struct SweetFields {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub quantity_in_stock: i32,
}

/// Outcome of a stock adjustment.
#[derive(Debug, Clone, PartialEq)]
pub enum StockChange {
    Updated(Sweet),
    NotFound,
    OutOfStock,
    Overflow,
}

/// New stock level after applying `delta`, or why it cannot be applied.
pub fn next_quantity(current: i32, delta: i32) -> Result<i32, StockChange> {
    match current.checked_add(delta) {
        None => Err(StockChange::Overflow),
        Some(n) if n < 0 => Err(StockChange::OutOfStock),
        Some(n) => Ok(n),
    }
}
