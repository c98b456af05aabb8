//! Held positions and their persisted row shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by every persisted ledger row.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub average_buy_price: f64,
    pub category: String,
    pub acquisition_date: NaiveDate,
}

impl Position {
    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.average_buy_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.average_buy_price) * self.quantity as f64
    }

    /// Fold another lot into this position at quantity-weighted average cost.
    /// Returns the new quantity, or `None` (position untouched) on overflow.
    pub(crate) fn blend(&mut self, quantity: i64, price: f64) -> Option<i64> {
        let total = self.quantity.checked_add(quantity)?;
        self.average_buy_price = (self.cost_basis() + quantity as f64 * price) / total as f64;
        self.quantity = total;
        Some(total)
    }
}

/// One row of the persisted `Portfolio` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Buy_Price")]
    pub buy_price: f64,
    #[serde(rename = "Qty")]
    pub qty: i64,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<&Position> for PositionRow {
    fn from(pos: &Position) -> Self {
        PositionRow {
            symbol: pos.symbol.clone(),
            buy_price: pos.average_buy_price,
            qty: pos.quantity,
            category: pos.category.clone(),
            date: pos.acquisition_date.format(DATE_FORMAT).to_string(),
        }
    }
}

impl TryFrom<PositionRow> for Position {
    type Error = String;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        if row.symbol.trim().is_empty() {
            return Err("empty symbol".to_string());
        }
        if row.qty <= 0 {
            return Err(format!("{}: quantity must be positive, got {}", row.symbol, row.qty));
        }
        if !(row.buy_price.is_finite() && row.buy_price > 0.0) {
            return Err(format!("{}: invalid buy price {}", row.symbol, row.buy_price));
        }
        let acquisition_date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|e| format!("{}: invalid date '{}': {e}", row.symbol, row.date))?;
        Ok(Position {
            symbol: row.symbol,
            quantity: row.qty,
            average_buy_price: row.buy_price,
            category: row.category,
            acquisition_date,
        })
    }
}
