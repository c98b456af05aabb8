//! Market data access port trait.

use crate::domain::error::MarketScanError;
use crate::domain::fundamentals::{Fundamentals, QuarterlyFigure};
use crate::domain::ohlcv::PriceBar;
use std::fmt;

/// Bar width of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
    FifteenMinutes,
}

impl Interval {
    /// Short suffix used in file names and logs (`1d`, `15m`).
    pub fn suffix(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::FifteenMinutes => "15m",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// How far back a history request reaches, in calendar days from the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    OneYear,
}

impl Period {
    pub fn days(self) -> u32 {
        match self {
            Period::Days(d) => d,
            Period::OneYear => 365,
        }
    }
}

pub trait MarketDataPort {
    /// Bars ascending by timestamp. An unknown symbol is `NoData`.
    fn history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, MarketScanError>;

    fn latest_price(&self, symbol: &str) -> Result<f64, MarketScanError>;

    /// Fields the source does not carry are `None`.
    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketScanError>;

    /// Quarterly figures, oldest first.
    fn quarterly_net_income(&self, symbol: &str) -> Result<Vec<QuarterlyFigure>, MarketScanError>;

    fn list_symbols(&self) -> Result<Vec<String>, MarketScanError>;
}
