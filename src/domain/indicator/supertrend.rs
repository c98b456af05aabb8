//! SuperTrend overlay.
//!
//! Bands are hl2 ± multiplier * ATR(n). The final upper band only moves down
//! (and the final lower band only moves up) unless the previous close broke
//! through it. Direction flips bullish when close exceeds the previous final
//! upper band and bearish when close falls under the previous final lower band.
//!
//! Warmup: first (n-1) bars are invalid (ATR seed). The first valid bar is bullish.

use crate::domain::indicator::atr::atr_raw;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, TrendDirection,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 7;
pub const DEFAULT_MULTIPLIER: f64 = 3.0;

pub fn calculate_supertrend(bars: &[PriceBar], period: usize, multiplier: f64) -> IndicatorSeries {
    let indicator_type = IndicatorType::SuperTrend {
        period,
        multiplier_x100: (multiplier * 100.0).round() as u32,
    };
    let atr = atr_raw(bars, period);

    let mut values = Vec::with_capacity(bars.len());
    let mut state: Option<(f64, f64, TrendDirection)> = None;

    for (i, bar) in bars.iter().enumerate() {
        let Some(atr_val) = atr[i] else {
            values.push(IndicatorPoint::invalid(bar.timestamp));
            continue;
        };

        let basic_upper = bar.hl2() + multiplier * atr_val;
        let basic_lower = bar.hl2() - multiplier * atr_val;

        let (upper, lower, direction) = match state {
            None => (basic_upper, basic_lower, TrendDirection::Bullish),
            Some((prev_upper, prev_lower, prev_dir)) => {
                let prev_close = bars[i - 1].close;
                let upper = if basic_upper < prev_upper || prev_close > prev_upper {
                    basic_upper
                } else {
                    prev_upper
                };
                let lower = if basic_lower > prev_lower || prev_close < prev_lower {
                    basic_lower
                } else {
                    prev_lower
                };
                let direction = if bar.close > prev_upper {
                    TrendDirection::Bullish
                } else if bar.close < prev_lower {
                    TrendDirection::Bearish
                } else {
                    prev_dir
                };
                (upper, lower, direction)
            }
        };

        state = Some((upper, lower, direction));
        let line = match direction {
            TrendDirection::Bullish => lower,
            TrendDirection::Bearish => upper,
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::SuperTrend { line, direction },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
