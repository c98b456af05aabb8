//! CSV directory market data adapter.
//!
//! Layout under the base directory:
//! - `{SYMBOL}_1d.csv` and `{SYMBOL}_15m.csv`: `timestamp,open,high,low,close,volume`
//! - `{SYMBOL}_income.csv`: `period,net_income`, oldest first
//! - `fundamentals.csv`: `symbol,trailing_pe,return_on_equity,debt_to_equity`
//!
//! Daily timestamps may be plain dates. Blank fundamentals cells read as absent.

use crate::domain::error::MarketScanError;
use crate::domain::fundamentals::{Fundamentals, QuarterlyFigure};
use crate::domain::ohlcv::PriceBar;
use crate::ports::market_data_port::{Interval, MarketDataPort, Period};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const FUNDAMENTALS_FILE: &str = "fundamentals.csv";
const DAILY_SUFFIX: &str = "_1d.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FundamentalsRecord {
    symbol: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    trailing_pe: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    return_on_equity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    debt_to_equity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IncomeRecord {
    period: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    net_income: Option<f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bars_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, interval.suffix()))
    }

    fn read_file(&self, path: &Path, symbol: &str) -> Result<String, MarketScanError> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MarketScanError::NoData {
                code: symbol.to_string(),
            },
            _ => MarketScanError::Parse {
                source_name: path.display().to_string(),
                reason: format!("failed to read: {}", e),
            },
        })
    }

    fn read_bars(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, MarketScanError> {
        let path = self.bars_path(symbol, interval);
        let content = self.read_file(&path, symbol)?;
        let source_name = path.display().to_string();
        let parse_err = |reason: String| MarketScanError::Parse {
            source_name: source_name.clone(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| parse_err(format!("CSV parse error: {}", e)))?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| parse_err(format!("row {}: missing {} column", line + 1, name)))
            };
            let number = |idx: usize, name: &str| -> Result<f64, MarketScanError> {
                field(idx, name)?
                    .parse()
                    .map_err(|e| parse_err(format!("row {}: invalid {} value: {}", line + 1, name, e)))
            };

            let timestamp = parse_timestamp(field(0, "timestamp")?)
                .ok_or_else(|| parse_err(format!("row {}: invalid timestamp", line + 1)))?;
            let volume = field(5, "volume")?
                .parse::<f64>()
                .map_err(|e| parse_err(format!("row {}: invalid volume value: {}", line + 1, e)))?;

            bars.push(PriceBar {
                timestamp,
                open: number(1, "open")?,
                high: number(2, "high")?,
                low: number(3, "low")?,
                close: number(4, "close")?,
                volume: volume as i64,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` and the `T`-separated forms.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl MarketDataPort for CsvAdapter {
    fn history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, MarketScanError> {
        let mut bars = self.read_bars(symbol, interval)?;
        if let Some(last) = bars.last().map(|b| b.timestamp) {
            let cutoff = last - Duration::days(i64::from(period.days()));
            bars.retain(|b| b.timestamp > cutoff);
        }
        Ok(bars)
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, MarketScanError> {
        let intraday = match self.read_bars(symbol, Interval::FifteenMinutes) {
            Ok(bars) => bars,
            Err(MarketScanError::NoData { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        if let Some(bar) = intraday.last() {
            return Ok(bar.close);
        }
        self.read_bars(symbol, Interval::Daily)?
            .last()
            .map(|b| b.close)
            .ok_or_else(|| MarketScanError::NoData {
                code: symbol.to_string(),
            })
    }

    fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, MarketScanError> {
        let path = self.base_path.join(FUNDAMENTALS_FILE);
        let content = self.read_file(&path, symbol)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        for result in rdr.deserialize::<FundamentalsRecord>() {
            let record = result.map_err(|e| MarketScanError::Parse {
                source_name: path.display().to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;
            if record.symbol.trim() == symbol {
                return Ok(Fundamentals {
                    trailing_pe: record.trailing_pe,
                    return_on_equity: record.return_on_equity,
                    debt_to_equity: record.debt_to_equity,
                });
            }
        }
        Err(MarketScanError::NoData {
            code: symbol.to_string(),
        })
    }

    fn quarterly_net_income(&self, symbol: &str) -> Result<Vec<QuarterlyFigure>, MarketScanError> {
        let path = self.base_path.join(format!("{}_income.csv", symbol));
        let content = self.read_file(&path, symbol)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        rdr.deserialize::<IncomeRecord>()
            .map(|result| {
                result
                    .map(|r| QuarterlyFigure {
                        period: r.period,
                        net_income: r.net_income,
                    })
                    .map_err(|e| MarketScanError::Parse {
                        source_name: path.display().to_string(),
                        reason: format!("CSV parse error: {}", e),
                    })
            })
            .collect()
    }

    fn list_symbols(&self) -> Result<Vec<String>, MarketScanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MarketScanError::Parse {
            source_name: self.base_path.display().to_string(),
            reason: format!("failed to read directory: {}", e),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(DAILY_SUFFIX) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
