//! Market overview: option bias for broad indices and BULL/BEAR sector trends.
//!
//! An index reading combines the daily SuperTrend direction with a 15-minute
//! option bias (EMA9 vs EMA21, RSI and SuperTrend). A sector reading compares
//! the latest close with its 50-day SMA. Like the stock scan, a symbol that
//! fails to load is skipped without aborting the rest.

use crate::domain::error::MarketScanError;
use crate::domain::indicator::{IndicatorSet, IndicatorType, IndicatorValue, compute_indicators};
use crate::domain::ohlcv::PriceBar;
use crate::domain::scan::{INTRADAY_PERIOD, SkippedSymbol};
use crate::domain::signal::{RSI, SUPERTREND, SignalThresholds};
use crate::ports::market_data_port::{Interval, MarketDataPort, Period};
use std::fmt;
use tracing::{debug, info, warn};

/// Intraday bars needed before an option bias is attempted.
pub const OPTION_BIAS_MIN_BARS: usize = 30;
pub const EMA_SHORT: IndicatorType = IndicatorType::Ema(9);
pub const EMA_LONG: IndicatorType = IndicatorType::Ema(21);
pub const OPTION_SUPERTREND: IndicatorType = IndicatorType::SuperTrend {
    period: 7,
    multiplier_x100: 300,
};
pub const SECTOR_SMA: IndicatorType = IndicatorType::Sma(50);
/// Roughly three months of daily bars.
pub const SECTOR_PERIOD: Period = Period::Days(92);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionBias {
    BuyCall,
    BuyPut,
    Wait,
}

impl fmt::Display for OptionBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionBias::BuyCall => f.write_str("BUY CALL"),
            OptionBias::BuyPut => f.write_str("BUY PUT"),
            OptionBias::Wait => f.write_str("WAIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketTrend {
    Bull,
    Bear,
}

impl fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketTrend::Bull => f.write_str("BULL"),
            MarketTrend::Bear => f.write_str("BEAR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub symbol: String,
    pub last_price: f64,
    pub change_pct: f64,
    pub trend: Option<MarketTrend>,
    pub option_bias: OptionBias,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorReading {
    pub symbol: String,
    pub last_price: f64,
    pub change_pct: f64,
    pub trend: Option<MarketTrend>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketOverview {
    pub indices: Vec<IndexSnapshot>,
    pub sectors: Vec<SectorReading>,
    pub skipped: Vec<SkippedSymbol>,
}

fn supertrend_trend(indicators: &IndicatorSet, kind: &IndicatorType) -> Option<MarketTrend> {
    match indicators.latest(kind)? {
        IndicatorValue::SuperTrend { direction, .. } if direction.is_bullish() => {
            Some(MarketTrend::Bull)
        }
        IndicatorValue::SuperTrend { .. } => Some(MarketTrend::Bear),
        _ => None,
    }
}

/// Call/put bias from the latest 15-minute bar. Short or incomplete series wait.
pub fn option_bias(bars: &[PriceBar], thresholds: &SignalThresholds) -> OptionBias {
    if bars.len() < OPTION_BIAS_MIN_BARS {
        return OptionBias::Wait;
    }
    let ind = compute_indicators(bars, &[EMA_SHORT, EMA_LONG, RSI, OPTION_SUPERTREND]);
    let (Some(fast), Some(slow), Some(rsi), Some(trend)) = (
        ind.latest_simple(&EMA_SHORT),
        ind.latest_simple(&EMA_LONG),
        ind.latest_simple(&RSI),
        supertrend_trend(&ind, &OPTION_SUPERTREND),
    ) else {
        return OptionBias::Wait;
    };

    if fast > slow && rsi > thresholds.rsi_ce_weak && trend == MarketTrend::Bull {
        OptionBias::BuyCall
    } else if fast < slow && rsi < thresholds.rsi_pe_weak && trend == MarketTrend::Bear {
        OptionBias::BuyPut
    } else {
        OptionBias::Wait
    }
}

/// BULL when the latest close is above its 50-day SMA, `None` before the SMA exists.
pub fn sector_trend(bars: &[PriceBar]) -> Option<MarketTrend> {
    let close = bars.last()?.close;
    let sma = compute_indicators(bars, &[SECTOR_SMA]).latest_simple(&SECTOR_SMA)?;
    Some(if close > sma {
        MarketTrend::Bull
    } else {
        MarketTrend::Bear
    })
}

/// (last close, day-over-day % change).
fn last_and_change(symbol: &str, bars: &[PriceBar]) -> Result<(f64, f64), MarketScanError> {
    match bars {
        [.., prev, last] => {
            let change = if prev.close != 0.0 {
                (last.close - prev.close) / prev.close * 100.0
            } else {
                0.0
            };
            Ok((last.close, change))
        }
        [] => Err(MarketScanError::NoData {
            code: symbol.to_string(),
        }),
        [_] => Err(MarketScanError::InsufficientData {
            code: symbol.to_string(),
            bars: 1,
            minimum: 2,
        }),
    }
}

pub fn analyze_index(
    data: &dyn MarketDataPort,
    symbol: &str,
    thresholds: &SignalThresholds,
) -> Result<IndexSnapshot, MarketScanError> {
    let daily = data.history(symbol, Period::OneYear, Interval::Daily)?;
    let (last_price, change_pct) = last_and_change(symbol, &daily)?;
    let trend = supertrend_trend(&compute_indicators(&daily, &[SUPERTREND]), &SUPERTREND);

    let option_bias = match data.history(symbol, INTRADAY_PERIOD, Interval::FifteenMinutes) {
        Ok(bars) => option_bias(&bars, thresholds),
        Err(e) => {
            debug!(symbol, error = %e, "no intraday data");
            OptionBias::Wait
        }
    };

    Ok(IndexSnapshot {
        symbol: symbol.to_string(),
        last_price,
        change_pct,
        trend,
        option_bias,
    })
}

pub fn analyze_sector(
    data: &dyn MarketDataPort,
    symbol: &str,
) -> Result<SectorReading, MarketScanError> {
    let bars = data.history(symbol, SECTOR_PERIOD, Interval::Daily)?;
    let (last_price, change_pct) = last_and_change(symbol, &bars)?;
    Ok(SectorReading {
        symbol: symbol.to_string(),
        last_price,
        change_pct,
        trend: sector_trend(&bars),
    })
}

pub fn market_overview(
    data: &dyn MarketDataPort,
    indices: &[String],
    sectors: &[String],
    thresholds: &SignalThresholds,
) -> MarketOverview {
    let mut overview = MarketOverview::default();
    for symbol in indices {
        match analyze_index(data, symbol, thresholds) {
            Ok(snapshot) => overview.indices.push(snapshot),
            Err(e) => overview.skipped.push(skip(symbol, e)),
        }
    }
    for symbol in sectors {
        match analyze_sector(data, symbol) {
            Ok(reading) => overview.sectors.push(reading),
            Err(e) => overview.skipped.push(skip(symbol, e)),
        }
    }

    info!(
        indices = overview.indices.len(),
        sectors = overview.sectors.len(),
        skipped = overview.skipped.len(),
        "market overview complete"
    );
    overview
}

fn skip(symbol: &str, e: MarketScanError) -> SkippedSymbol {
    warn!(symbol, error = %e, "skipping market symbol");
    SkippedSymbol {
        symbol: symbol.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::collections::HashMap;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn bars(closes: impl Iterator<Item = f64>, step: Duration) -> Vec<PriceBar> {
        closes
            .enumerate()
            .map(|(i, close)| PriceBar {
                timestamp: start() + step * i as i32,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn line(n: usize, from: f64, step: f64) -> impl Iterator<Item = f64> {
        (0..n).map(move |i| from + step * i as f64)
    }

    #[test]
    fn rally_biases_calls() {
        let intraday = bars(line(40, 100.0, 0.5), Duration::minutes(15));
        assert_eq!(
            option_bias(&intraday, &SignalThresholds::default()),
            OptionBias::BuyCall
        );
    }

    #[test]
    fn selloff_biases_puts() {
        let intraday = bars(line(40, 200.0, -0.5), Duration::minutes(15));
        assert_eq!(
            option_bias(&intraday, &SignalThresholds::default()),
            OptionBias::BuyPut
        );
    }

    #[test]
    fn short_or_flat_series_waits() {
        let t = SignalThresholds::default();
        let short = bars(line(29, 100.0, 0.5), Duration::minutes(15));
        assert_eq!(option_bias(&short, &t), OptionBias::Wait);

        let flat = bars(line(40, 100.0, 0.0), Duration::minutes(15));
        assert_eq!(option_bias(&flat, &t), OptionBias::Wait);
    }

    #[test]
    fn sector_trend_against_fifty_day_average() {
        let rising = bars(line(60, 100.0, 1.0), Duration::days(1));
        assert_eq!(sector_trend(&rising), Some(MarketTrend::Bull));

        let falling = bars(line(60, 200.0, -1.0), Duration::days(1));
        assert_eq!(sector_trend(&falling), Some(MarketTrend::Bear));

        let young = bars(line(49, 100.0, 1.0), Duration::days(1));
        assert_eq!(sector_trend(&young), None);
    }

    #[test]
    fn labels() {
        assert_eq!(OptionBias::BuyCall.to_string(), "BUY CALL");
        assert_eq!(OptionBias::Wait.to_string(), "WAIT");
        assert_eq!(MarketTrend::Bear.to_string(), "BEAR");
    }

    struct StubData {
        daily: HashMap<String, Vec<PriceBar>>,
        intraday: HashMap<String, Vec<PriceBar>>,
    }

    impl MarketDataPort for StubData {
        fn history(
            &self,
            symbol: &str,
            _period: Period,
            interval: Interval,
        ) -> Result<Vec<PriceBar>, MarketScanError> {
            let source = match interval {
                Interval::Daily => &self.daily,
                Interval::FifteenMinutes => &self.intraday,
            };
            source
                .get(symbol)
                .cloned()
                .ok_or_else(|| MarketScanError::NoData {
                    code: symbol.to_string(),
                })
        }

        fn latest_price(&self, symbol: &str) -> Result<f64, MarketScanError> {
            Err(MarketScanError::NoData {
                code: symbol.to_string(),
            })
        }

        fn fundamentals(
            &self,
            symbol: &str,
        ) -> Result<crate::domain::fundamentals::Fundamentals, MarketScanError> {
            Err(MarketScanError::NoData {
                code: symbol.to_string(),
            })
        }

        fn quarterly_net_income(
            &self,
            _symbol: &str,
        ) -> Result<Vec<crate::domain::fundamentals::QuarterlyFigure>, MarketScanError> {
            Ok(Vec::new())
        }

        fn list_symbols(&self) -> Result<Vec<String>, MarketScanError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn overview_skips_missing_symbols() {
        let data = StubData {
            daily: HashMap::from([
                ("^NSEI".to_string(), bars(line(120, 100.0, 1.0), Duration::days(1))),
                ("^CNXIT".to_string(), bars(line(60, 300.0, -1.0), Duration::days(1))),
            ]),
            intraday: HashMap::from([(
                "^NSEI".to_string(),
                bars(line(40, 220.0, 0.5), Duration::minutes(15)),
            )]),
        };
        let overview = market_overview(
            &data,
            &["^NSEI".to_string(), "^GONE".to_string()],
            &["^CNXIT".to_string()],
            &SignalThresholds::default(),
        );

        assert_eq!(overview.indices.len(), 1);
        let nifty = &overview.indices[0];
        assert_eq!(nifty.trend, Some(MarketTrend::Bull));
        assert_eq!(nifty.option_bias, OptionBias::BuyCall);
        assert!((nifty.last_price - 219.0).abs() < 1e-9);

        assert_eq!(overview.sectors.len(), 1);
        assert_eq!(overview.sectors[0].trend, Some(MarketTrend::Bear));
        assert!(overview.sectors[0].change_pct < 0.0);

        assert_eq!(overview.skipped.len(), 1);
        assert_eq!(overview.skipped[0].symbol, "^GONE");
    }

    #[test]
    fn index_without_intraday_waits() {
        let data = StubData {
            daily: HashMap::from([(
                "^NSEBANK".to_string(),
                bars(line(60, 100.0, 1.0), Duration::days(1)),
            )]),
            intraday: HashMap::new(),
        };
        let snapshot = analyze_index(&data, "^NSEBANK", &SignalThresholds::default()).unwrap();
        assert_eq!(snapshot.option_bias, OptionBias::Wait);
    }
}
