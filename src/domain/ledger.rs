//! Simulated cash ledger: balance plus held positions.
//!
//! Mutations either succeed completely or return a [`LedgerError`] and leave
//! the ledger untouched. Persistence goes through a [`StoragePort`]; loading
//! falls back to a fresh ledger and saving is best-effort.

use crate::domain::error::{LedgerError, MarketScanError};
use crate::domain::position::{Position, PositionRow};
use crate::ports::storage_port::StoragePort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub const DEFAULT_BALANCE: f64 = 1_000_000.0;
/// Percent of capital put at risk by one auto-sized buy.
pub const DEFAULT_RISK_PCT: f64 = 2.0;

/// Capital and per-trade risk used to size a buy from its stop distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSizing {
    pub capital: f64,
    pub risk_pct: f64,
}

impl RiskSizing {
    /// Whole shares such that hitting a stop `atr * stop_atr_mult` away loses
    /// `risk_pct` of capital. Zero when any input is non-positive or non-finite.
    pub fn quantity(&self, atr: f64, stop_atr_mult: f64) -> i64 {
        let risk = self.capital * self.risk_pct / 100.0;
        let gap = atr * stop_atr_mult;
        if !(risk.is_finite() && risk > 0.0 && gap.is_finite() && gap > 0.0) {
            return 0;
        }
        // float-to-int `as` saturates at i64::MAX
        (risk / gap).floor() as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub cash_balance: f64,
    pub positions: BTreeMap<String, Position>,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(DEFAULT_BALANCE)
    }
}

/// A single user action against the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    Buy {
        symbol: String,
        quantity: i64,
        price: f64,
        category: String,
        date: NaiveDate,
    },
    Sell {
        symbol: String,
        live_price: f64,
    },
    Reset {
        initial_balance: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerOutcome {
    Bought { cost: f64 },
    Sold { proceeds: f64 },
    Reset,
}

/// Unrealized P/L per held symbol plus the total.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkToMarket {
    pub rows: Vec<HoldingValuation>,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: i64,
    pub average_buy_price: f64,
    pub live_price: f64,
    pub pnl: f64,
    /// False when no live price was available and the average cost stood in.
    pub priced: bool,
}

/// Backend-independent persisted shape: a balance cell and the portfolio rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(rename = "Balance")]
    pub balance: f64,
    #[serde(rename = "Portfolio", default)]
    pub portfolio: Vec<PositionRow>,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Ledger {
            cash_balance: initial_balance,
            positions: BTreeMap::new(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn is_held(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Buy `quantity` shares at `price`. A repeat buy blends into the held
    /// position at weighted average cost and takes the new category and date.
    pub fn buy(
        &mut self,
        symbol: &str,
        quantity: i64,
        price: f64,
        category: &str,
        date: NaiveDate,
    ) -> Result<f64, LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::InvalidOrder {
                reason: "symbol must not be empty".to_string(),
            });
        }
        if quantity <= 0 {
            return Err(LedgerError::InvalidOrder {
                reason: format!("quantity must be positive, got {quantity}"),
            });
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(LedgerError::InvalidOrder {
                reason: format!("price must be positive, got {price}"),
            });
        }

        let cost = quantity as f64 * price;
        if cost > self.cash_balance {
            return Err(LedgerError::InsufficientFunds {
                cost,
                balance: self.cash_balance,
            });
        }

        match self.positions.get_mut(symbol) {
            Some(held) => {
                if held.blend(quantity, price).is_none() {
                    return Err(LedgerError::InvalidOrder {
                        reason: format!("holding in {symbol} would exceed {} shares", i64::MAX),
                    });
                }
                held.category = category.to_string();
                held.acquisition_date = date;
            }
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    Position {
                        symbol: symbol.to_string(),
                        quantity,
                        average_buy_price: price,
                        category: category.to_string(),
                        acquisition_date: date,
                    },
                );
            }
        }
        self.cash_balance -= cost;
        debug!(symbol, quantity, price, cost, "bought");
        Ok(cost)
    }

    /// Close the whole position in `symbol` at `live_price`, returning the proceeds.
    pub fn sell(&mut self, symbol: &str, live_price: f64) -> Result<f64, LedgerError> {
        if !(live_price.is_finite() && live_price > 0.0) {
            return Err(LedgerError::InvalidOrder {
                reason: format!("price must be positive, got {live_price}"),
            });
        }
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| LedgerError::NotHeld {
                symbol: symbol.to_string(),
            })?;
        let proceeds = position.market_value(live_price);
        self.cash_balance += proceeds;
        debug!(symbol, quantity = position.quantity, live_price, proceeds, "sold");
        Ok(proceeds)
    }

    pub fn reset(&mut self, initial_balance: f64) {
        self.cash_balance = initial_balance;
        self.positions.clear();
    }

    /// Apply `command` to a copy of this ledger, returning the new state.
    pub fn apply(&self, command: &LedgerCommand) -> Result<(Ledger, LedgerOutcome), LedgerError> {
        let mut next = self.clone();
        let outcome = match command {
            LedgerCommand::Buy {
                symbol,
                quantity,
                price,
                category,
                date,
            } => LedgerOutcome::Bought {
                cost: next.buy(symbol, *quantity, *price, category, *date)?,
            },
            LedgerCommand::Sell { symbol, live_price } => LedgerOutcome::Sold {
                proceeds: next.sell(symbol, *live_price)?,
            },
            LedgerCommand::Reset { initial_balance } => {
                next.reset(*initial_balance);
                LedgerOutcome::Reset
            }
        };
        Ok((next, outcome))
    }

    /// Value every held position. Symbols missing from `live_prices` are
    /// valued at their average cost, so they contribute zero P/L.
    pub fn mark_to_market(&self, live_prices: &HashMap<String, f64>) -> MarkToMarket {
        let rows: Vec<HoldingValuation> = self
            .positions
            .values()
            .map(|pos| {
                let live = live_prices
                    .get(&pos.symbol)
                    .copied()
                    .filter(|p| p.is_finite());
                let live_price = live.unwrap_or(pos.average_buy_price);
                HoldingValuation {
                    symbol: pos.symbol.clone(),
                    quantity: pos.quantity,
                    average_buy_price: pos.average_buy_price,
                    live_price,
                    pnl: pos.unrealized_pnl(live_price),
                    priced: live.is_some(),
                }
            })
            .collect();
        let total_pnl = rows.iter().map(|r| r.pnl).sum();
        MarkToMarket { rows, total_pnl }
    }

    pub fn to_document(&self) -> LedgerDocument {
        LedgerDocument {
            balance: self.cash_balance,
            portfolio: self.positions.values().map(PositionRow::from).collect(),
        }
    }

    pub fn from_document(doc: LedgerDocument) -> Result<Ledger, MarketScanError> {
        if !(doc.balance.is_finite() && doc.balance >= 0.0) {
            return Err(MarketScanError::Parse {
                source_name: "ledger".to_string(),
                reason: format!("invalid balance {}", doc.balance),
            });
        }
        let mut positions = BTreeMap::new();
        for row in doc.portfolio {
            let pos = Position::try_from(row).map_err(|reason| MarketScanError::Parse {
                source_name: "ledger".to_string(),
                reason,
            })?;
            if positions.contains_key(&pos.symbol) {
                return Err(MarketScanError::Parse {
                    source_name: "ledger".to_string(),
                    reason: format!("duplicate symbol {}", pos.symbol),
                });
            }
            positions.insert(pos.symbol.clone(), pos);
        }
        Ok(Ledger {
            cash_balance: doc.balance,
            positions,
        })
    }
}

/// Load the persisted ledger, falling back to a fresh one on any failure.
pub fn load_or_default(storage: &dyn StoragePort, initial_balance: f64) -> Ledger {
    match storage.load() {
        Ok(Some(ledger)) => ledger,
        Ok(None) => {
            debug!("no stored ledger, starting with {initial_balance:.2}");
            Ledger::new(initial_balance)
        }
        Err(e) => {
            warn!(error = %e, "could not load ledger, using defaults");
            Ledger::new(initial_balance)
        }
    }
}

/// Persist `ledger`, logging instead of failing. Returns whether the write landed.
pub fn save_best_effort(storage: &dyn StoragePort, ledger: &Ledger) -> bool {
    match storage.save(ledger) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "could not save ledger, changes kept in memory only");
            false
        }
    }
}

/// Load, apply one command, persist. A rejected command persists nothing.
pub fn execute(
    storage: &dyn StoragePort,
    initial_balance: f64,
    command: &LedgerCommand,
) -> Result<(Ledger, LedgerOutcome), LedgerError> {
    let ledger = load_or_default(storage, initial_balance);
    let (next, outcome) = ledger.apply(command)?;
    save_best_effort(storage, &next);
    Ok((next, outcome))
}
