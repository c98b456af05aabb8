//! Simple Moving Average over close price and over volume.
//!
//! SMA[i] = mean(x[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: to_points(bars, &rolling_mean(&closes, period)),
    }
}

pub fn calculate_volume_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::VolumeSma(period),
        values: to_points(bars, &rolling_mean(&volumes, period)),
    }
}

/// Rolling mean aligned with `values`; `None` until the window is full.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

fn to_points(bars: &[PriceBar], raw: &[Option<f64>]) -> Vec<IndicatorPoint> {
    bars.iter()
        .zip(raw)
        .map(|(bar, v)| match v {
            Some(v) => IndicatorPoint::simple(bar.timestamp, *v),
            None => IndicatorPoint::invalid(bar.timestamp),
        })
        .collect()
}
