//! Signal evaluation: turns the latest indicator readings into tags, a quality
//! label and a stop-loss/target pair.
//!
//! Every rule is an independent predicate over the latest bar. A rule that
//! needs an indicator value still inside its warmup window does not fire.

use crate::domain::error::MarketScanError;
use crate::domain::fundamentals::{
    DEFAULT_DEBT_TO_EQUITY, DEFAULT_RETURN_ON_EQUITY, DEFAULT_TRAILING_PE, Fundamentals,
    GrowthOutlook,
};
use crate::domain::indicator::extrema::{local_maxima, local_minima};
use crate::domain::indicator::weekly::weekly_trend_up;
use crate::domain::indicator::{
    IndicatorSet, IndicatorType, IndicatorValue, TrendDirection, compute_indicators, macd,
    supertrend,
};
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveTime;
use std::collections::BTreeSet;
use std::fmt;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const VOLUME_AVG_PERIOD: usize = 10;

pub const SMA_LONG: IndicatorType = IndicatorType::Sma(200);
pub const EMA_FAST: IndicatorType = IndicatorType::Ema(20);
pub const RSI: IndicatorType = IndicatorType::Rsi(RSI_PERIOD);
pub const ATR: IndicatorType = IndicatorType::Atr(ATR_PERIOD);
pub const ADX: IndicatorType = IndicatorType::Adx(ADX_PERIOD);
pub const VOLUME_AVG: IndicatorType = IndicatorType::VolumeSma(VOLUME_AVG_PERIOD);
pub const SUPERTREND: IndicatorType = IndicatorType::SuperTrend {
    period: supertrend::DEFAULT_PERIOD,
    multiplier_x100: 300,
};
pub const MACD: IndicatorType = IndicatorType::Macd {
    fast: macd::DEFAULT_FAST,
    slow: macd::DEFAULT_SLOW,
    signal: macd::DEFAULT_SIGNAL,
};
pub const PSAR: IndicatorType = IndicatorType::Psar {
    step_x1000: 20,
    max_step_x1000: 200,
};

/// Session time from which an afternoon VWAP reversal counts.
pub const REVERSAL_AFTER: NaiveTime = match NaiveTime::from_hms_opt(13, 30, 0) {
    Some(time) => time,
    None => panic!("13:30 is a valid time of day"),
};

/// Indicators computed for the daily timeframe.
pub fn daily_indicator_kinds() -> Vec<IndicatorType> {
    vec![
        SMA_LONG, EMA_FAST, RSI, ATR, ADX, VOLUME_AVG, SUPERTREND, MACD, PSAR,
    ]
}

/// Indicators computed for the 15-minute timeframe.
pub fn intraday_indicator_kinds() -> Vec<IndicatorType> {
    vec![IndicatorType::Vwap, SUPERTREND, RSI, VOLUME_AVG]
}

/// Every threshold the rule menu consults. Deployments tune these through
/// configuration rather than code.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalThresholds {
    pub pe_max: f64,
    /// Return on equity as a ratio (0.12 = 12%).
    pub roe_min: f64,
    pub debt_max: f64,
    pub rsi_jackpot_min: f64,
    pub rsi_jackpot_max: f64,
    pub rsi_ce_strong: f64,
    pub rsi_ce_weak: f64,
    pub rsi_pe_strong: f64,
    pub rsi_pe_weak: f64,
    pub rsi_swing: f64,
    pub adx_strong: f64,
    pub volume_spike_mult: f64,
    pub trend_lookback: usize,
    pub swing_lookback: usize,
    pub swing_proximity: f64,
    pub golden_ratio: f64,
    pub golden_tolerance: f64,
    pub pattern_tolerance: f64,
    pub extrema_order: usize,
    pub fresh_window: usize,
    pub stop_atr_mult: f64,
    pub target_atr_mult: f64,
    pub weekly_sma: usize,
    pub min_intraday_bars: usize,
    pub reversal_after: NaiveTime,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        SignalThresholds {
            pe_max: 60.0,
            roe_min: 0.12,
            debt_max: 1.5,
            rsi_jackpot_min: 55.0,
            rsi_jackpot_max: 70.0,
            rsi_ce_strong: 60.0,
            rsi_ce_weak: 55.0,
            rsi_pe_strong: 40.0,
            rsi_pe_weak: 45.0,
            rsi_swing: 60.0,
            adx_strong: 25.0,
            volume_spike_mult: 1.5,
            trend_lookback: 20,
            swing_lookback: 20,
            swing_proximity: 0.98,
            golden_ratio: 0.618,
            golden_tolerance: 0.015,
            pattern_tolerance: 0.02,
            extrema_order: 5,
            fresh_window: 2,
            stop_atr_mult: 2.0,
            target_atr_mult: 4.0,
            weekly_sma: 20,
            min_intraday_bars: 20,
            reversal_after: REVERSAL_AFTER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    Jackpot,
    Ce100,
    Ce80,
    Pe100,
    Pe80,
    FoCe,
    FoPe,
    Golden,
    SarBullish,
    MacdBullish,
    Swing,
    FreshSupport,
    FreshResistance,
    DayBuy,
    DaySell,
    Reversal2pm,
    Trend,
    Tech,
    Fund,
    FundStrong,
    Double,
    Alert,
    WPattern,
    InverseHeadShoulders,
    MPattern,
    HeadShoulders,
}

impl Tag {
    pub fn label(self) -> &'static str {
        match self {
            Tag::Jackpot => "Jackpot",
            Tag::Ce100 => "CE 100%",
            Tag::Ce80 => "CE 80%",
            Tag::Pe100 => "PE 100%",
            Tag::Pe80 => "PE 80%",
            Tag::FoCe => "F&O CE",
            Tag::FoPe => "F&O PE",
            Tag::Golden => "Golden Dip",
            Tag::SarBullish => "SAR Bull",
            Tag::MacdBullish => "MACD Bull",
            Tag::Swing => "Swing",
            Tag::FreshSupport => "Support",
            Tag::FreshResistance => "Resistance",
            Tag::DayBuy => "Day Buy",
            Tag::DaySell => "Day Sell",
            Tag::Reversal2pm => "2 PM Reversal",
            Tag::Trend => "Trend",
            Tag::Tech => "Tech",
            Tag::Fund => "Fund",
            Tag::FundStrong => "Fund+",
            Tag::Double => "Double",
            Tag::Alert => "Alert",
            Tag::WPattern => "W-Pattern",
            Tag::InverseHeadShoulders => "Inverse H&S",
            Tag::MPattern => "M-Pattern",
            Tag::HeadShoulders => "Head & Shoulders",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single-line verdict, picked from the tags in a fixed priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    SuperStrongCe,
    SuperStrongPe,
    GoldenSupport,
    SarBullish,
    StrongCe,
    StrongPe,
    SupportBuy,
    DayBuy,
    DaySell,
    Neutral,
}

impl Quality {
    pub fn is_super_strong(self) -> bool {
        matches!(self, Quality::SuperStrongCe | Quality::SuperStrongPe)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quality::SuperStrongCe => "Super Strong CE",
            Quality::SuperStrongPe => "Super Strong PE",
            Quality::GoldenSupport => "Golden Support",
            Quality::SarBullish => "SAR Bull",
            Quality::StrongCe => "Strong CE",
            Quality::StrongPe => "Strong PE",
            Quality::SupportBuy => "Support Buy",
            Quality::DayBuy => "Day Buy",
            Quality::DaySell => "Day Sell",
            Quality::Neutral => "Neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeeklyTrend {
    Up,
    Down,
}

impl fmt::Display for WeeklyTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeeklyTrend::Up => f.write_str("UP"),
            WeeklyTrend::Down => f.write_str("DOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalResult {
    pub symbol: String,
    pub last_price: f64,
    pub change_pct: f64,
    pub tags: BTreeSet<Tag>,
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub quality: Quality,
    pub weekly_trend: WeeklyTrend,
    pub growth: Option<GrowthOutlook>,
}

impl SignalResult {
    pub fn has(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Tags joined for display, `-` when none fired.
    pub fn tag_summary(&self) -> String {
        if self.tags.is_empty() {
            return "-".to_string();
        }
        self.tags
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Bars of one timeframe together with the indicators computed over them.
#[derive(Debug, Clone)]
pub struct AnalyzedSeries {
    pub bars: Vec<PriceBar>,
    pub indicators: IndicatorSet,
    pub weekly_trend_up: Option<bool>,
}

impl AnalyzedSeries {
    pub fn daily(bars: Vec<PriceBar>, thresholds: &SignalThresholds) -> Self {
        let indicators = compute_indicators(&bars, &daily_indicator_kinds());
        let weekly_trend_up = weekly_trend_up(&bars, thresholds.weekly_sma);
        AnalyzedSeries {
            bars,
            indicators,
            weekly_trend_up,
        }
    }

    pub fn intraday(bars: Vec<PriceBar>) -> Self {
        let indicators = compute_indicators(&bars, &intraday_indicator_kinds());
        AnalyzedSeries {
            bars,
            indicators,
            weekly_trend_up: None,
        }
    }

    fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    fn supertrend_direction(&self) -> Option<TrendDirection> {
        match self.indicators.latest(&SUPERTREND)? {
            IndicatorValue::SuperTrend { direction, .. } => Some(*direction),
            _ => None,
        }
    }

    fn volume_spike(&self, index: usize, mult: f64) -> bool {
        let volume = self.bars[index].volume as f64;
        matches!(
            self.indicators.simple_at(&VOLUME_AVG, index),
            Some(avg) if avg > 0.0 && volume > avg * mult
        )
    }
}

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v < threshold)
}

/// Evaluate the rule menu for one symbol.
///
/// `intraday` rules only run when the intraday series is longer than
/// `min_intraday_bars`. Missing fundamentals fall back to inert values.
pub fn evaluate(
    symbol: &str,
    daily: &AnalyzedSeries,
    intraday: Option<&AnalyzedSeries>,
    fundamentals: Option<&Fundamentals>,
    thresholds: &SignalThresholds,
) -> Result<SignalResult, MarketScanError> {
    let t = thresholds;
    let bars = &daily.bars;
    if bars.len() < 2 {
        return Err(MarketScanError::InsufficientData {
            code: symbol.to_string(),
            bars: bars.len(),
            minimum: 2,
        });
    }
    let last = bars.len() - 1;
    let bar = &bars[last];
    let close = bar.close;
    let prev_close = bars[last - 1].close;
    let change_pct = if prev_close != 0.0 {
        (close - prev_close) / prev_close * 100.0
    } else {
        0.0
    };

    let ind = &daily.indicators;
    let sma200 = ind.latest_simple(&SMA_LONG);
    let rsi = ind.latest_simple(&RSI);
    let adx = ind.latest_simple(&ADX);
    let atr = ind.latest_simple(&ATR);
    let sar = ind.latest_simple(&PSAR);
    let direction = daily.supertrend_direction();
    let bullish = direction == Some(TrendDirection::Bullish);
    let bearish = direction == Some(TrendDirection::Bearish);
    let volume_spike = daily.volume_spike(last, t.volume_spike_mult);
    let weekly_up = daily.weekly_trend_up == Some(true);

    let mut tags = BTreeSet::new();
    let mut tag_if = |tag: Tag, fired: bool| {
        if fired {
            tags.insert(tag);
        }
        fired
    };

    let (pe, roe, debt) = match fundamentals {
        Some(f) => (
            f.trailing_pe_or_default(),
            f.return_on_equity_or_default(),
            f.debt_to_equity_or_default(),
        ),
        None => (
            DEFAULT_TRAILING_PE,
            DEFAULT_RETURN_ON_EQUITY,
            DEFAULT_DEBT_TO_EQUITY,
        ),
    };
    let tech = tag_if(Tag::Tech, sma200.is_some_and(|s| close > s));
    let fund = tag_if(Tag::Fund, pe > 0.0 && pe < t.pe_max);
    let profitable = fund && roe > t.roe_min;
    tag_if(Tag::FundStrong, profitable && debt < t.debt_max);
    tag_if(Tag::Double, tech && fund);
    // window start counts the last bar as one of `trend_lookback`
    let trend_base = bars.len().checked_sub(t.trend_lookback.max(1));
    tag_if(Tag::Trend, trend_base.is_some_and(|i| close > bars[i].close));
    tag_if(Tag::Alert, volume_spike);

    let jackpot = tag_if(
        Tag::Jackpot,
        profitable && tech
            && above(rsi, t.rsi_jackpot_min)
            && below(rsi, t.rsi_jackpot_max)
            && volume_spike
            && weekly_up,
    );

    let ce100 = tag_if(
        Tag::Ce100,
        bullish && above(rsi, t.rsi_ce_strong) && above(adx, t.adx_strong) && weekly_up,
    );
    let ce80 = tag_if(Tag::Ce80, !ce100 && bullish && above(rsi, t.rsi_ce_weak));
    let pe100 = tag_if(
        Tag::Pe100,
        bearish && below(rsi, t.rsi_pe_strong) && above(adx, t.adx_strong),
    );
    let pe80 = tag_if(Tag::Pe80, !pe100 && bearish && below(rsi, t.rsi_pe_weak));

    let macd_bull = ind.get(&MACD).and_then(macd::is_bullish);
    tag_if(Tag::MacdBullish, macd_bull == Some(true));
    let ema20 = ind.latest_simple(&EMA_FAST);
    let fo_ce = tag_if(
        Tag::FoCe,
        ema20.is_some_and(|e| close > e) && above(rsi, t.rsi_ce_weak) && macd_bull == Some(true),
    );
    tag_if(
        Tag::FoPe,
        !fo_ce
            && ema20.is_some_and(|e| close < e)
            && below(rsi, t.rsi_pe_weak)
            && macd_bull == Some(false),
    );

    let max_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let min_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let golden_level = max_high - (max_high - min_low) * t.golden_ratio;
    let golden = tag_if(
        Tag::Golden,
        (close - golden_level).abs() <= close * t.golden_tolerance && close > bar.open,
    );

    let sar_bullish = tag_if(Tag::SarBullish, sar.is_some_and(|s| close > s));

    let swing_start = bars.len().saturating_sub(t.swing_lookback);
    let recent_high = bars[swing_start..]
        .iter()
        .map(|b| b.high)
        .fold(f64::MIN, f64::max);
    tag_if(
        Tag::Swing,
        close >= recent_high * t.swing_proximity && above(rsi, t.rsi_swing) && volume_spike,
    );

    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let minima = local_minima(&lows, t.extrema_order);
    let maxima = local_maxima(&highs, t.extrema_order);
    let is_fresh = |idx: &usize| idx + t.fresh_window > last;
    let fresh_support = tag_if(Tag::FreshSupport, minima.last().is_some_and(is_fresh));
    tag_if(Tag::FreshResistance, maxima.last().is_some_and(is_fresh));

    let double_bottom = tag_if(
        Tag::WPattern,
        twin_extrema(&lows, &minima, t.pattern_tolerance),
    );
    tag_if(
        Tag::InverseHeadShoulders,
        !double_bottom && middle_extreme(&lows, &minima, |mid, side| mid < side),
    );
    let double_top = tag_if(
        Tag::MPattern,
        twin_extrema(&highs, &maxima, t.pattern_tolerance),
    );
    tag_if(
        Tag::HeadShoulders,
        !double_top && middle_extreme(&highs, &maxima, |mid, side| mid > side),
    );

    let mut day_buy = false;
    let mut day_sell = false;
    if let Some(intra) = intraday.filter(|s| s.bars.len() > t.min_intraday_bars) {
        let (buy, sell, reversal) = evaluate_intraday(intra, t);
        day_buy = tag_if(Tag::DayBuy, buy);
        day_sell = tag_if(Tag::DaySell, sell);
        tag_if(Tag::Reversal2pm, reversal);
    }

    let quality = if (jackpot || ce100) && weekly_up && volume_spike {
        Quality::SuperStrongCe
    } else if pe100 && volume_spike {
        Quality::SuperStrongPe
    } else if golden {
        Quality::GoldenSupport
    } else if sar_bullish {
        Quality::SarBullish
    } else if ce100 || ce80 {
        Quality::StrongCe
    } else if pe100 || pe80 {
        Quality::StrongPe
    } else if fresh_support {
        Quality::SupportBuy
    } else if day_buy {
        Quality::DayBuy
    } else if day_sell {
        Quality::DaySell
    } else {
        Quality::Neutral
    };

    Ok(SignalResult {
        symbol: symbol.to_string(),
        last_price: close,
        change_pct,
        tags,
        stop_loss: atr.map(|a| close - a * t.stop_atr_mult),
        target: atr.map(|a| close + a * t.target_atr_mult),
        quality,
        weekly_trend: if weekly_up {
            WeeklyTrend::Up
        } else {
            WeeklyTrend::Down
        },
        growth: None,
    })
}

/// (day buy, day sell, afternoon VWAP reversal) for the latest intraday bar.
fn evaluate_intraday(intra: &AnalyzedSeries, t: &SignalThresholds) -> (bool, bool, bool) {
    let Some(last) = intra.last_index() else {
        return (false, false, false);
    };
    let close = intra.bars[last].close;
    let Some(vwap) = intra.indicators.simple_at(&IndicatorType::Vwap, last) else {
        return (false, false, false);
    };
    let direction = intra.supertrend_direction();

    let day_buy = close > vwap && direction == Some(TrendDirection::Bullish);
    let day_sell = close < vwap && direction == Some(TrendDirection::Bearish);

    let reversal = last >= 1
        && intra.bars[last].timestamp.time() >= t.reversal_after
        && intra
            .indicators
            .simple_at(&IndicatorType::Vwap, last - 1)
            .is_some_and(|prev_vwap| intra.bars[last - 1].close < prev_vwap)
        && close > vwap
        && intra.volume_spike(last, t.volume_spike_mult);

    (day_buy, day_sell, reversal)
}

/// The two most recent extrema sit within `tolerance` of each other.
fn twin_extrema(values: &[f64], indices: &[usize], tolerance: f64) -> bool {
    match indices {
        [.., a, b] => (values[*b] - values[*a]).abs() < values[*b] * tolerance,
        _ => false,
    }
}

/// The middle of the three most recent extrema beats both neighbours.
fn middle_extreme(values: &[f64], indices: &[usize], beats: impl Fn(f64, f64) -> bool) -> bool {
    match indices {
        [.., a, b, c] => beats(values[*b], values[*a]) && beats(values[*b], values[*c]),
        _ => false,
    }
}
