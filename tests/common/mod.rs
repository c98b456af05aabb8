#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use marketscan::domain::error::MarketScanError;
use marketscan::domain::fundamentals::{Fundamentals, QuarterlyFigure};
pub use marketscan::domain::ohlcv::PriceBar;
use marketscan::ports::market_data_port::{Interval, MarketDataPort, Period};
use std::collections::HashMap;
use std::io::Write;

pub struct MockMarketData {
    pub daily: HashMap<String, Vec<PriceBar>>,
    pub intraday: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<String, Fundamentals>,
    pub quarters: HashMap<String, Vec<QuarterlyFigure>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            daily: HashMap::new(),
            intraday: HashMap::new(),
            fundamentals: HashMap::new(),
            quarters: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.daily.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_intraday(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.intraday.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_pe(mut self, symbol: &str, pe: f64) -> Self {
        self.fundamentals.insert(
            symbol.to_string(),
            Fundamentals {
                trailing_pe: Some(pe),
                ..Fundamentals::default()
            },
        );
        self
    }

    pub fn with_quarters(mut self, symbol: &str, values: &[f64]) -> Self {
        let figures = values
            .iter()
            .enumerate()
            .map(|(i, v)| QuarterlyFigure {
                period: format!("Q{}", i + 1),
                net_income: Some(*v),
            })
            .collect();
        self.quarters.insert(symbol.to_string(), figures);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), MarketScanError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(MarketScanError::Storage {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl MarketDataPort for MockMarketData {
    fn history(
        &self,
        symbol: &str,
        _period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, MarketScanError> {
        self.check(symbol)?;
        let source = match interval {
            Interval::Daily => &self.daily,
            Interval::FifteenMinutes => &self.intraday,
        };
        Ok(source.get(symbol).cloned().unwrap_or_default())
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, MarketScanError> {
        self.check(symbol)?;
        self.daily
            .get(symbol)
            .and_then(|bars| bars.last())
            .map(|b| b.close)
            .ok_or_else(|| MarketScanError::NoData {
                code: symbol.to_string(),
            })
    }

    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketScanError> {
        self.check(symbol)?;
        self.fundamentals
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketScanError::NoData {
                code: symbol.to_string(),
            })
    }

    fn quarterly_net_income(&self, symbol: &str) -> Result<Vec<QuarterlyFigure>, MarketScanError> {
        self.check(symbol)?;
        Ok(self.quarters.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, MarketScanError> {
        let mut symbols: Vec<String> = self.daily.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64, volume: i64) -> PriceBar {
    PriceBar {
        timestamp,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume,
    }
}

/// Daily bars rising by `step` per day from `start`.
pub fn trending_bars(n: usize, start: f64, step: f64) -> Vec<PriceBar> {
    (0..n)
        .map(|i| make_bar(day(i), start + step * i as f64, 1000))
        .collect()
}

/// Writes `{symbol}_1d.csv` into `dir` from the given bars.
pub fn write_daily_csv(dir: &std::path::Path, symbol: &str, bars: &[PriceBar]) {
    let mut file = std::fs::File::create(dir.join(format!("{symbol}_1d.csv"))).unwrap();
    writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
    for b in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
