//! Parabolic SAR (Wilder).
//!
//! SAR[i] = SAR[i-1] + af * (ep - SAR[i-1]), clamped so it never enters the
//! prior two bars' range. The acceleration factor starts at `step`, grows by
//! `step` on every new extreme point and caps at `max_step`. Price crossing the
//! SAR reverses the trend, resetting SAR to the previous extreme point.
//!
//! The initial trend is taken from the first two closes. Warmup: bar 0 is invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_STEP: f64 = 0.02;
pub const DEFAULT_MAX_STEP: f64 = 0.2;

pub fn calculate_psar(bars: &[PriceBar], step: f64, max_step: f64) -> IndicatorSeries {
    let indicator_type = IndicatorType::Psar {
        step_x1000: (step * 1000.0).round() as u32,
        max_step_x1000: (max_step * 1000.0).round() as u32,
    };
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::invalid(b.timestamp))
        .collect();

    if bars.len() < 2 {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let mut rising = bars[1].close >= bars[0].close;
    let mut af = step;
    let mut ep = if rising { bars[0].high } else { bars[0].low };
    let mut sar = if rising { bars[0].low } else { bars[0].high };

    for i in 1..bars.len() {
        let bar = &bars[i];
        let mut next = sar + af * (ep - sar);

        if rising {
            next = next.min(bars[i - 1].low);
            if i >= 2 {
                next = next.min(bars[i - 2].low);
            }
            if bar.low < next {
                rising = false;
                next = ep;
                ep = bar.low;
                af = step;
            } else if bar.high > ep {
                ep = bar.high;
                af = (af + step).min(max_step);
            }
        } else {
            next = next.max(bars[i - 1].high);
            if i >= 2 {
                next = next.max(bars[i - 2].high);
            }
            if bar.high > next {
                rising = true;
                next = ep;
                ep = bar.high;
                af = step;
            } else if bar.low < ep {
                ep = bar.low;
                af = (af + step).min(max_step);
            }
        }

        sar = next;
        values[i] = IndicatorPoint::simple(bar.timestamp, sar);
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
