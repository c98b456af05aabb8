//! Session VWAP: cumulative(volume * typical_price) / cumulative(volume).
//!
//! Accumulators reset whenever the calendar date changes, so each trading
//! session starts fresh. A bar is invalid while its session has no volume.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_vwap(bars: &[PriceBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut session = None;
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for bar in bars {
        let date = bar.timestamp.date();
        if session != Some(date) {
            session = Some(date);
            cum_pv = 0.0;
            cum_vol = 0.0;
        }

        cum_pv += bar.volume as f64 * bar.typical_price();
        cum_vol += bar.volume as f64;

        if cum_vol > 0.0 {
            values.push(IndicatorPoint::simple(bar.timestamp, cum_pv / cum_vol));
        } else {
            values.push(IndicatorPoint::invalid(bar.timestamp));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Vwap,
        values,
    }
}
