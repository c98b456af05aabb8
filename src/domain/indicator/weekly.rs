//! Weekly resampling and the weekly trend filter.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::ohlcv::PriceBar;
use chrono::Datelike;

pub const DEFAULT_WEEKLY_SMA: usize = 20;

/// Collapse bars into ISO weeks: first open, max high, min low, last close, summed volume.
/// Each weekly bar is stamped with the timestamp of the week's last input bar.
pub fn resample_weekly(bars: &[PriceBar]) -> Vec<PriceBar> {
    let mut weeks: Vec<PriceBar> = Vec::new();
    let mut current_week = None;

    for bar in bars {
        let iso = bar.timestamp.date().iso_week();
        let key = (iso.year(), iso.week());
        match weeks.last_mut() {
            Some(week) if current_week == Some(key) => {
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
                week.timestamp = bar.timestamp;
            }
            _ => {
                current_week = Some(key);
                weeks.push(bar.clone());
            }
        }
    }
    weeks
}

/// `Some(true)` when the latest weekly close is above its `period`-week SMA,
/// `None` when there are not enough weeks to decide.
pub fn weekly_trend_up(bars: &[PriceBar], period: usize) -> Option<bool> {
    let weeks = resample_weekly(bars);
    let closes: Vec<f64> = weeks.iter().map(|w| w.close).collect();
    let sma = rolling_mean(&closes, period).last().copied().flatten()?;
    closes.last().map(|close| *close > sma)
}
