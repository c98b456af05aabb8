//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values, aligned with the bars
//! - `IndicatorSet`: All series computed for one symbol and timeframe
//!
//! Every series has exactly one point per input bar. Points inside an
//! indicator's lookback window are marked invalid and must not be consumed.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod extrema;
pub mod macd;
pub mod psar;
pub mod rsi;
pub mod sma;
pub mod supertrend;
pub mod vwap;
pub mod weekly;

pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use psar::calculate_psar;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_sma};
pub use supertrend::calculate_supertrend;
pub use vwap::calculate_vwap;

use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

impl TrendDirection {
    pub fn is_bullish(self) -> bool {
        self == TrendDirection::Bullish
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    pub fn invalid(timestamp: NaiveDateTime) -> Self {
        IndicatorPoint {
            timestamp,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        }
    }

    pub fn simple(timestamp: NaiveDateTime, value: f64) -> Self {
        IndicatorPoint {
            timestamp,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    SuperTrend {
        line: f64,
        direction: TrendDirection,
    },
}

impl IndicatorValue {
    /// The scalar reading of a value; MACD reports its line, SuperTrend its band.
    pub fn as_f64(&self) -> f64 {
        match self {
            IndicatorValue::Simple(v) => *v,
            IndicatorValue::Macd { line, .. } => *line,
            IndicatorValue::SuperTrend { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Adx(usize),
    VolumeSma(usize),
    Vwap,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    SuperTrend {
        period: usize,
        multiplier_x100: u32,
    },
    Psar {
        step_x1000: u32,
        max_step_x1000: u32,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Vwap => write!(f, "VWAP"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::SuperTrend {
                period,
                multiplier_x100,
            } => {
                let mult = *multiplier_x100 as f64 / 100.0;
                write!(f, "SUPERTREND({},{})", period, mult)
            }
            IndicatorType::Psar {
                step_x1000,
                max_step_x1000,
            } => {
                let step = *step_x1000 as f64 / 1000.0;
                let max = *max_step_x1000 as f64 / 1000.0;
                write!(f, "PSAR({},{})", step, max)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The value at `index`, or `None` when out of range or inside the warmup window.
    pub fn value_at(&self, index: usize) -> Option<&IndicatorValue> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| &p.value)
    }

    pub fn latest(&self) -> Option<&IndicatorValue> {
        self.values.len().checked_sub(1).and_then(|i| self.value_at(i))
    }
}

/// Indicator series for one symbol and timeframe, keyed by indicator identity.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type.clone(), series);
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    pub fn contains(&self, indicator_type: &IndicatorType) -> bool {
        self.series.contains_key(indicator_type)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn value_at(&self, indicator_type: &IndicatorType, index: usize) -> Option<&IndicatorValue> {
        self.get(indicator_type).and_then(|s| s.value_at(index))
    }

    pub fn simple_at(&self, indicator_type: &IndicatorType, index: usize) -> Option<f64> {
        self.value_at(indicator_type, index).map(IndicatorValue::as_f64)
    }

    pub fn latest(&self, indicator_type: &IndicatorType) -> Option<&IndicatorValue> {
        self.get(indicator_type).and_then(IndicatorSeries::latest)
    }

    pub fn latest_simple(&self, indicator_type: &IndicatorType) -> Option<f64> {
        self.latest(indicator_type).map(IndicatorValue::as_f64)
    }
}

/// Compute every requested indicator over `bars`. Duplicate kinds are computed once.
pub fn compute_indicators(bars: &[PriceBar], kinds: &[IndicatorType]) -> IndicatorSet {
    let mut set = IndicatorSet::new();
    for kind in kinds {
        if set.contains(kind) {
            continue;
        }
        let series = match kind {
            IndicatorType::Sma(period) => calculate_sma(bars, *period),
            IndicatorType::Ema(period) => calculate_ema(bars, *period),
            IndicatorType::Rsi(period) => calculate_rsi(bars, *period),
            IndicatorType::Atr(period) => calculate_atr(bars, *period),
            IndicatorType::Adx(period) => calculate_adx(bars, *period),
            IndicatorType::VolumeSma(period) => calculate_volume_sma(bars, *period),
            IndicatorType::Vwap => calculate_vwap(bars),
            IndicatorType::Macd { fast, slow, signal } => {
                calculate_macd(bars, *fast, *slow, *signal)
            }
            IndicatorType::SuperTrend {
                period,
                multiplier_x100,
            } => calculate_supertrend(bars, *period, *multiplier_x100 as f64 / 100.0),
            IndicatorType::Psar {
                step_x1000,
                max_step_x1000,
            } => calculate_psar(
                bars,
                *step_x1000 as f64 / 1000.0,
                *max_step_x1000 as f64 / 1000.0,
            ),
        };
        set.insert(series);
    }
    set
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_supertrend_and_psar() {
        let st = IndicatorType::SuperTrend {
            period: 7,
            multiplier_x100: 300,
        };
        assert_eq!(st.to_string(), "SUPERTREND(7,3)");
        let psar = IndicatorType::Psar {
            step_x1000: 20,
            max_step_x1000: 200,
        };
        assert_eq!(psar.to_string(), "PSAR(0.02,0.2)");
    }

    #[test]
    fn compute_indicators_aligns_every_series() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let kinds = vec![
            IndicatorType::Sma(20),
            IndicatorType::Ema(20),
            IndicatorType::Rsi(14),
            IndicatorType::Atr(14),
            IndicatorType::Adx(14),
            IndicatorType::VolumeSma(10),
            IndicatorType::Vwap,
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorType::SuperTrend {
                period: 7,
                multiplier_x100: 300,
            },
            IndicatorType::Psar {
                step_x1000: 20,
                max_step_x1000: 200,
            },
        ];
        let set = compute_indicators(&bars, &kinds);
        assert_eq!(set.len(), kinds.len());
        for kind in &kinds {
            let series = set.get(kind).unwrap();
            assert_eq!(series.values.len(), bars.len(), "{} misaligned", kind);
            assert!(series.latest().is_some(), "{} has no latest value", kind);
        }
    }

    #[test]
    fn compute_indicators_deduplicates() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let set = compute_indicators(&bars, &[IndicatorType::Sma(2), IndicatorType::Sma(2)]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn warmup_values_are_null() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        let set = compute_indicators(&bars, &[IndicatorType::Sma(200)]);
        assert_eq!(set.latest_simple(&IndicatorType::Sma(200)), None);
        assert_eq!(set.simple_at(&IndicatorType::Sma(200), 99), None);
        assert_eq!(set.latest_simple(&IndicatorType::Rsi(14)), None);
    }
}
