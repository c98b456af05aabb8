//! Average True Range with Wilder smoothing.
//!
//! Seed: mean of the first n true ranges (the first bar uses high - low).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let values = atr_raw(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(v, bar)| match v {
            Some(v) => IndicatorPoint::simple(bar.timestamp, v),
            None => IndicatorPoint::invalid(bar.timestamp),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

pub(crate) fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// ATR values aligned with `bars`; `None` during warmup.
pub(crate) fn atr_raw(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr = true_ranges(bars);
    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    for i in period..bars.len() {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = Some(atr);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{bars_from_hlc, simple};

    #[test]
    fn atr_warmup() {
        let bars = bars_from_hlc(&[(110.0, 90.0, 100.0); 5]);
        let series = calculate_atr(&bars, 3);
        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = bars_from_hlc(&[
            (110.0, 100.0, 105.0),
            (115.0, 105.0, 110.0),
            (120.0, 110.0, 115.0),
        ]);
        let series = calculate_atr(&bars, 3);
        assert!((simple(series.value_at(2)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = bars_from_hlc(&[
            (110.0, 100.0, 105.0),
            (115.0, 105.0, 110.0),
            (120.0, 110.0, 115.0),
            (125.0, 115.0, 120.0),
        ]);
        let series = calculate_atr(&bars, 3);
        let expected = (10.0 * 2.0 + 10.0) / 3.0;
        assert!((simple(series.value_at(3)) - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_handles_gaps() {
        let bars = bars_from_hlc(&[
            (110.0, 100.0, 105.0),
            (130.0, 120.0, 125.0),
            (120.0, 110.0, 115.0),
        ]);
        let series = calculate_atr(&bars, 2);
        // TR: 10, max(10, 25, 15) = 25 → seed 17.5
        assert!((simple(series.value_at(1)) - 17.5).abs() < 1e-9);
        assert!(series.values[2].valid);
    }

    #[test]
    fn atr_insufficient_bars_stays_aligned() {
        let bars = bars_from_hlc(&[(110.0, 90.0, 100.0); 2]);
        let series = calculate_atr(&bars, 5);
        assert_eq!(series.values.len(), 2);
        assert!(series.latest().is_none());
    }
}
