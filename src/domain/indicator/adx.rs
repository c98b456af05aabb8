//! Average Directional Index (Wilder).
//!
//! +DM = up move if up > down and up > 0, -DM symmetric. TR, +DM and -DM are
//! Wilder-summed over n bars; DI = 100 * DM_s / TR_s, DX = 100 * |+DI - -DI| / (+DI + -DI).
//! ADX seeds with the mean of the first n DX values and is Wilder-smoothed after.
//!
//! Warmup: first (2n - 1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::invalid(b.timestamp))
        .collect();

    if period == 0 || bars.len() < 2 * period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Adx(period),
            values,
        };
    }

    let n = bars.len();
    let mut tr = vec![0.0; n];
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        tr[i] = bars[i].true_range(bars[i - 1].close);
    }

    let mut tr_s: f64 = tr[1..=period].iter().sum();
    let mut plus_s: f64 = plus_dm[1..=period].iter().sum();
    let mut minus_s: f64 = minus_dm[1..=period].iter().sum();

    let mut dx = vec![0.0; n];
    dx[period] = directional_index(tr_s, plus_s, minus_s);
    for i in (period + 1)..n {
        tr_s = tr_s - tr_s / period as f64 + tr[i];
        plus_s = plus_s - plus_s / period as f64 + plus_dm[i];
        minus_s = minus_s - minus_s / period as f64 + minus_dm[i];
        dx[i] = directional_index(tr_s, plus_s, minus_s);
    }

    let first = 2 * period - 1;
    let mut adx = dx[period..=first].iter().sum::<f64>() / period as f64;
    values[first] = IndicatorPoint::simple(bars[first].timestamp, adx);
    for i in (first + 1)..n {
        adx = (adx * (period - 1) as f64 + dx[i]) / period as f64;
        values[i] = IndicatorPoint::simple(bars[i].timestamp, adx);
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        values,
    }
}

fn directional_index(tr_s: f64, plus_s: f64, minus_s: f64) -> f64 {
    if tr_s == 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_s / tr_s;
    let minus_di = 100.0 * minus_s / tr_s;
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}
