//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: max(fast, slow) - 1 + signal - 1 bars

use crate::domain::indicator::ema::ema_of;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::invalid(b.timestamp))
        .collect();

    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_of(&closes, fast);
    let ema_slow = ema_of(&closes, slow);

    let macd_warmup = fast.max(slow) - 1;
    if bars.len() <= macd_warmup {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .skip(macd_warmup)
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();
    let signal_line = ema_of(&macd_line, signal_period);

    for (offset, (line, signal)) in macd_line.iter().zip(&signal_line).enumerate() {
        let Some(signal) = signal else { continue };
        let i = macd_warmup + offset;
        values[i] = IndicatorPoint {
            timestamp: bars[i].timestamp,
            valid: true,
            value: IndicatorValue::Macd {
                line: *line,
                signal: *signal,
                histogram: line - signal,
            },
        };
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[PriceBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// True when the latest MACD line sits above its signal line.
pub fn is_bullish(series: &IndicatorSeries) -> Option<bool> {
    match series.latest()? {
        IndicatorValue::Macd { line, signal, .. } => Some(line > signal),
        _ => None,
    }
}
