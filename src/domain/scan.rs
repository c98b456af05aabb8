//! Batch scan: fetch, analyze and evaluate a list of symbols.
//!
//! A failure for one symbol is logged and the symbol is dropped; it never
//! aborts the rest of the batch.

use crate::domain::error::MarketScanError;
use crate::domain::fundamentals::{GrowthOutlook, classify_growth};
use crate::domain::indicator::compute_indicators;
use crate::domain::ledger::RiskSizing;
use crate::domain::signal::{
    ATR, ATR_PERIOD, AnalyzedSeries, SignalResult, SignalThresholds, evaluate,
};
use crate::ports::market_data_port::{Interval, MarketDataPort, Period};
use crate::ports::notify_port::NotifyPort;
use tracing::{debug, info, warn};

pub const DEFAULT_MIN_DAILY_BARS: usize = 50;
pub const DEFAULT_GROWTH_LIMIT: usize = 10;
pub const INTRADAY_PERIOD: Period = Period::Days(5);

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub thresholds: SignalThresholds,
    pub min_daily_bars: usize,
    /// Classify result growth for the first `growth_limit` results.
    pub with_growth: bool,
    pub growth_limit: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            thresholds: SignalThresholds::default(),
            min_daily_bars: DEFAULT_MIN_DAILY_BARS,
            with_growth: false,
            growth_limit: DEFAULT_GROWTH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub results: Vec<SignalResult>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetch and evaluate one symbol.
pub fn analyze_symbol(
    data: &dyn MarketDataPort,
    symbol: &str,
    settings: &ScanSettings,
) -> Result<SignalResult, MarketScanError> {
    let bars = data.history(symbol, Period::OneYear, Interval::Daily)?;
    if bars.is_empty() {
        return Err(MarketScanError::NoData {
            code: symbol.to_string(),
        });
    }
    if bars.len() < settings.min_daily_bars {
        return Err(MarketScanError::InsufficientData {
            code: symbol.to_string(),
            bars: bars.len(),
            minimum: settings.min_daily_bars,
        });
    }
    let daily = AnalyzedSeries::daily(bars, &settings.thresholds);

    let intraday = match data.history(symbol, INTRADAY_PERIOD, Interval::FifteenMinutes) {
        Ok(bars) if !bars.is_empty() => Some(AnalyzedSeries::intraday(bars)),
        Ok(_) => None,
        Err(e) => {
            debug!(symbol, error = %e, "no intraday data");
            None
        }
    };

    let fundamentals = data
        .fundamentals(symbol)
        .inspect_err(|e| debug!(symbol, error = %e, "no fundamentals"))
        .ok();

    evaluate(
        symbol,
        &daily,
        intraday.as_ref(),
        fundamentals.as_ref(),
        &settings.thresholds,
    )
}

/// Risk-sized share count for `symbol` from its latest daily ATR and the
/// configured stop multiple. A zero count is returned as is.
pub fn suggest_quantity(
    data: &dyn MarketDataPort,
    symbol: &str,
    sizing: &RiskSizing,
    thresholds: &SignalThresholds,
) -> Result<i64, MarketScanError> {
    let bars = data.history(symbol, Period::OneYear, Interval::Daily)?;
    let atr = compute_indicators(&bars, &[ATR])
        .latest_simple(&ATR)
        .ok_or_else(|| MarketScanError::InsufficientData {
            code: symbol.to_string(),
            bars: bars.len(),
            minimum: ATR_PERIOD,
        })?;
    let quantity = sizing.quantity(atr, thresholds.stop_atr_mult);
    debug!(symbol, atr, quantity, "risk-sized quantity");
    Ok(quantity)
}

/// Growth classification that never fails; source errors read as unavailable.
pub fn growth_outlook(data: &dyn MarketDataPort, symbol: &str) -> GrowthOutlook {
    match data.quarterly_net_income(symbol) {
        Ok(figures) => classify_growth(&figures),
        Err(e) => {
            debug!(symbol, error = %e, "no quarterly results");
            GrowthOutlook::Unavailable
        }
    }
}

/// Scan `symbols` in order. Results keep input order, minus skipped symbols.
pub fn run_scan(
    data: &dyn MarketDataPort,
    notifier: Option<&dyn NotifyPort>,
    symbols: &[String],
    settings: &ScanSettings,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for symbol in symbols {
        match analyze_symbol(data, symbol, settings) {
            Ok(result) => outcome.results.push(result),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                outcome.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if settings.with_growth {
        for result in outcome.results.iter_mut().take(settings.growth_limit) {
            result.growth = Some(growth_outlook(data, &result.symbol));
        }
    }

    if let Some(notifier) = notifier {
        for result in outcome.results.iter().filter(|r| r.quality.is_super_strong()) {
            notifier.notify(&alert_message(result));
        }
    }

    info!(
        scanned = symbols.len(),
        results = outcome.results.len(),
        skipped = outcome.skipped.len(),
        "scan complete"
    );
    outcome
}

/// Text of the alert sent for a super-strong result.
pub fn alert_message(result: &SignalResult) -> String {
    let levels = match (result.stop_loss, result.target) {
        (Some(sl), Some(target)) => format!(" SL {sl:.2} Target {target:.2}"),
        _ => String::new(),
    };
    format!(
        "{}: {} @ {:.2} ({:+.2}%){} [{}]",
        result.quality,
        result.symbol,
        result.last_price,
        result.change_pct,
        levels,
        result.tag_summary()
    )
}
