//! Configuration validation and typed settings.
//!
//! Validates every config field before a command runs, then reads the
//! scan, ledger and signal settings with their defaults.

use crate::domain::error::MarketScanError;
use crate::domain::ledger::{DEFAULT_BALANCE, DEFAULT_RISK_PCT, RiskSizing};
use crate::domain::scan::{DEFAULT_GROWTH_LIMIT, DEFAULT_MIN_DAILY_BARS, ScanSettings};
use crate::domain::signal::SignalThresholds;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveTime;

const SIGNALS: &str = "signals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Json,
    Sqlite,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), MarketScanError> {
    validate_data_path(config)?;
    storage_backend(config)?;
    storage_path(config)?;
    validate_initial_balance(config)?;
    validate_scan(config)?;
    thresholds_from_config(config)?;
    sizing_from_config(config)?;
    Ok(())
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, MarketScanError> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| MarketScanError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> MarketScanError {
    MarketScanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), MarketScanError> {
    require(config, "data", "path").map(|_| ())
}

pub fn data_path(config: &dyn ConfigPort) -> Result<String, MarketScanError> {
    require(config, "data", "path")
}

pub fn storage_path(config: &dyn ConfigPort) -> Result<String, MarketScanError> {
    require(config, "storage", "path")
}

pub fn storage_backend(config: &dyn ConfigPort) -> Result<StorageBackend, MarketScanError> {
    let value = config
        .get_string("storage", "backend")
        .unwrap_or_else(|| "json".to_string());
    match value.trim().to_lowercase().as_str() {
        "json" => Ok(StorageBackend::Json),
        "sqlite" if cfg!(feature = "sqlite") => Ok(StorageBackend::Sqlite),
        "sqlite" => Err(invalid(
            "storage",
            "backend",
            "sqlite support was not compiled in",
        )),
        other => Err(invalid(
            "storage",
            "backend",
            format!("unknown backend '{other}', expected json or sqlite"),
        )),
    }
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), MarketScanError> {
    let value = initial_balance(config);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "ledger",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    Ok(())
}

pub fn initial_balance(config: &dyn ConfigPort) -> f64 {
    config.get_double("ledger", "initial_balance", DEFAULT_BALANCE)
}

fn validate_scan(config: &dyn ConfigPort) -> Result<(), MarketScanError> {
    positive_count(config, "scan", "min_daily_bars", DEFAULT_MIN_DAILY_BARS)?;
    positive_count(config, "scan", "growth_limit", DEFAULT_GROWTH_LIMIT)?;
    Ok(())
}

/// Symbols listed under `[scan] codes`, if any.
pub fn scan_codes(config: &dyn ConfigPort) -> Option<Vec<String>> {
    config.get_list("scan", "codes").filter(|c| !c.is_empty())
}

pub fn parse_codes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `[market] indices` and `[market] sectors`, each empty when unset.
pub fn market_symbols(config: &dyn ConfigPort) -> (Vec<String>, Vec<String>) {
    (
        config.get_list("market", "indices").unwrap_or_default(),
        config.get_list("market", "sectors").unwrap_or_default(),
    )
}

/// `[sizing] capital` defaults to the ledger's initial balance.
pub fn sizing_from_config(config: &dyn ConfigPort) -> Result<RiskSizing, MarketScanError> {
    let capital = config.get_double("sizing", "capital", initial_balance(config));
    if !(capital.is_finite() && capital > 0.0) {
        return Err(invalid("sizing", "capital", "capital must be positive"));
    }
    let risk_pct = config.get_double("sizing", "risk_pct", DEFAULT_RISK_PCT);
    if !(risk_pct > 0.0 && risk_pct <= 100.0) {
        return Err(invalid("sizing", "risk_pct", "risk_pct must be in (0, 100]"));
    }
    Ok(RiskSizing { capital, risk_pct })
}

pub fn notify_enabled(config: &dyn ConfigPort) -> bool {
    config.get_bool("notify", "enabled", false)
}

pub fn scan_settings_from_config(config: &dyn ConfigPort) -> Result<ScanSettings, MarketScanError> {
    Ok(ScanSettings {
        thresholds: thresholds_from_config(config)?,
        min_daily_bars: positive_count(config, "scan", "min_daily_bars", DEFAULT_MIN_DAILY_BARS)?,
        with_growth: config.get_bool("scan", "growth", false),
        growth_limit: positive_count(config, "scan", "growth_limit", DEFAULT_GROWTH_LIMIT)?,
    })
}

fn positive_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, MarketScanError> {
    let value = config.get_int(section, key, default as i64);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value as usize)
}

fn positive_ratio(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, MarketScanError> {
    let value = config.get_double(SIGNALS, key, default);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(SIGNALS, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn rsi_level(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, MarketScanError> {
    let value = config.get_double(SIGNALS, key, default);
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(SIGNALS, key, format!("{key} must be between 0 and 100")));
    }
    Ok(value)
}

/// Signal thresholds, each overridable under `[signals]`.
pub fn thresholds_from_config(config: &dyn ConfigPort) -> Result<SignalThresholds, MarketScanError> {
    let d = SignalThresholds::default();

    let reversal_after = match config.get_string(SIGNALS, "reversal_after") {
        Some(v) => NaiveTime::parse_from_str(v.trim(), "%H:%M").map_err(|e| {
            invalid(SIGNALS, "reversal_after", format!("expected HH:MM, got '{v}': {e}"))
        })?,
        None => d.reversal_after,
    };

    let thresholds = SignalThresholds {
        pe_max: positive_ratio(config, "pe_max", d.pe_max)?,
        roe_min: positive_ratio(config, "roe_min", d.roe_min)?,
        debt_max: positive_ratio(config, "debt_max", d.debt_max)?,
        rsi_jackpot_min: rsi_level(config, "rsi_jackpot_min", d.rsi_jackpot_min)?,
        rsi_jackpot_max: rsi_level(config, "rsi_jackpot_max", d.rsi_jackpot_max)?,
        rsi_ce_strong: rsi_level(config, "rsi_ce_strong", d.rsi_ce_strong)?,
        rsi_ce_weak: rsi_level(config, "rsi_ce_weak", d.rsi_ce_weak)?,
        rsi_pe_strong: rsi_level(config, "rsi_pe_strong", d.rsi_pe_strong)?,
        rsi_pe_weak: rsi_level(config, "rsi_pe_weak", d.rsi_pe_weak)?,
        rsi_swing: rsi_level(config, "rsi_swing", d.rsi_swing)?,
        adx_strong: rsi_level(config, "adx_strong", d.adx_strong)?,
        volume_spike_mult: positive_ratio(config, "volume_spike_mult", d.volume_spike_mult)?,
        trend_lookback: positive_count(config, SIGNALS, "trend_lookback", d.trend_lookback)?,
        swing_lookback: positive_count(config, SIGNALS, "swing_lookback", d.swing_lookback)?,
        swing_proximity: positive_ratio(config, "swing_proximity", d.swing_proximity)?,
        golden_ratio: positive_ratio(config, "golden_ratio", d.golden_ratio)?,
        golden_tolerance: positive_ratio(config, "golden_tolerance", d.golden_tolerance)?,
        pattern_tolerance: positive_ratio(config, "pattern_tolerance", d.pattern_tolerance)?,
        extrema_order: positive_count(config, SIGNALS, "extrema_order", d.extrema_order)?,
        fresh_window: positive_count(config, SIGNALS, "fresh_window", d.fresh_window)?,
        stop_atr_mult: positive_ratio(config, "stop_atr_mult", d.stop_atr_mult)?,
        target_atr_mult: positive_ratio(config, "target_atr_mult", d.target_atr_mult)?,
        weekly_sma: positive_count(config, SIGNALS, "weekly_sma", d.weekly_sma)?,
        min_intraday_bars: positive_count(config, "scan", "min_intraday_bars", d.min_intraday_bars)?,
        reversal_after,
    };

    if thresholds.rsi_jackpot_min >= thresholds.rsi_jackpot_max {
        return Err(invalid(
            SIGNALS,
            "rsi_jackpot_min",
            "rsi_jackpot_min must be below rsi_jackpot_max",
        ));
    }
    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const MINIMAL: &str = "[data]\npath = /tmp/data\n[storage]\npath = /tmp/ledger.json\n";

    #[test]
    fn minimal_config_passes() {
        let config = make_config(MINIMAL);
        assert!(validate_config(&config).is_ok());
        assert_eq!(storage_backend(&config).unwrap(), StorageBackend::Json);
        assert!((initial_balance(&config) - DEFAULT_BALANCE).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_data_path_is_fatal() {
        let config = make_config("[storage]\npath = /tmp/ledger.json\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            MarketScanError::ConfigMissing { ref section, ref key } if section == "data" && key == "path"
        ));
    }

    #[test]
    fn missing_storage_path_is_fatal() {
        let config = make_config("[data]\npath = /tmp/data\n");
        assert!(matches!(
            validate_config(&config),
            Err(MarketScanError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let config = make_config("[data]\npath =\n[storage]\npath = x\n");
        assert!(matches!(
            validate_config(&config),
            Err(MarketScanError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn unknown_backend_rejected() {
        let config = make_config(&format!("{MINIMAL}backend = cloud\n"));
        assert!(matches!(
            validate_config(&config),
            Err(MarketScanError::ConfigInvalid { .. })
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_backend_accepted() {
        let config = make_config(&format!("{MINIMAL}backend = SQLite\n"));
        assert_eq!(storage_backend(&config).unwrap(), StorageBackend::Sqlite);
    }

    #[test]
    fn non_positive_balance_rejected() {
        let config = make_config(&format!("{MINIMAL}[ledger]\ninitial_balance = 0\n"));
        assert!(matches!(
            validate_config(&config),
            Err(MarketScanError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn threshold_overrides_are_read() {
        let config = make_config(&format!(
            "{MINIMAL}[signals]\nrsi_ce_strong = 65\nadx_strong = 20\nreversal_after = 14:00\nextrema_order = 3\n"
        ));
        let t = thresholds_from_config(&config).unwrap();
        assert!((t.rsi_ce_strong - 65.0).abs() < f64::EPSILON);
        assert!((t.adx_strong - 20.0).abs() < f64::EPSILON);
        assert_eq!(t.extrema_order, 3);
        assert_eq!(t.reversal_after, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert!((t.pe_max - 60.0).abs() < f64::EPSILON);
        assert!((t.roe_min - 0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn fundamental_gates_are_overridable() {
        let config = make_config(&format!("{MINIMAL}[signals]
roe_min = 0.2
debt_max = 0.8
"));
        let t = thresholds_from_config(&config).unwrap();
        assert!((t.roe_min - 0.2).abs() < f64::EPSILON);
        assert!((t.debt_max - 0.8).abs() < f64::EPSILON);

        let config = make_config(&format!("{MINIMAL}[signals]
debt_max = -1
"));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn sizing_defaults_to_ledger_capital() {
        let config = make_config(&format!("{MINIMAL}[ledger]
initial_balance = 50000
"));
        let sizing = sizing_from_config(&config).unwrap();
        assert!((sizing.capital - 50_000.0).abs() < f64::EPSILON);
        assert!((sizing.risk_pct - DEFAULT_RISK_PCT).abs() < f64::EPSILON);

        let config = make_config(&format!("{MINIMAL}[sizing]
capital = 20000
risk_pct = 1.5
"));
        let sizing = sizing_from_config(&config).unwrap();
        assert!((sizing.capital - 20_000.0).abs() < f64::EPSILON);
        assert!((sizing.risk_pct - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_risk_rejected() {
        let config = make_config(&format!("{MINIMAL}[sizing]
risk_pct = 0
"));
        assert!(validate_config(&config).is_err());
        let config = make_config(&format!("{MINIMAL}[sizing]
risk_pct = 150
"));
        assert!(sizing_from_config(&config).is_err());
    }

    #[test]
    fn market_lists_default_empty() {
        assert_eq!(market_symbols(&make_config(MINIMAL)), (vec![], vec![]));
        let config = make_config(&format!(
            "{MINIMAL}[market]
indices = ^NSEI, ^NSEBANK
sectors = ^CNXIT
"
        ));
        let (indices, sectors) = market_symbols(&config);
        assert_eq!(indices, vec!["^NSEI", "^NSEBANK"]);
        assert_eq!(sectors, vec!["^CNXIT"]);
    }

    #[test]
    fn bad_reversal_time_rejected() {
        let config = make_config(&format!("{MINIMAL}[signals]\nreversal_after = 2pm\n"));
        assert!(matches!(
            thresholds_from_config(&config),
            Err(MarketScanError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn out_of_range_rsi_rejected() {
        let config = make_config(&format!("{MINIMAL}[signals]\nrsi_pe_weak = 140\n"));
        assert!(thresholds_from_config(&config).is_err());
    }

    #[test]
    fn inverted_jackpot_band_rejected() {
        let config = make_config(&format!(
            "{MINIMAL}[signals]\nrsi_jackpot_min = 75\nrsi_jackpot_max = 70\n"
        ));
        assert!(thresholds_from_config(&config).is_err());
    }

    #[test]
    fn scan_settings_defaults_and_overrides() {
        let settings = scan_settings_from_config(&make_config(MINIMAL)).unwrap();
        assert_eq!(settings.min_daily_bars, 50);
        assert_eq!(settings.growth_limit, 10);
        assert!(!settings.with_growth);

        let config = make_config(&format!(
            "{MINIMAL}[scan]\nmin_daily_bars = 100\nmin_intraday_bars = 30\ngrowth = true\n"
        ));
        let settings = scan_settings_from_config(&config).unwrap();
        assert_eq!(settings.min_daily_bars, 100);
        assert_eq!(settings.thresholds.min_intraday_bars, 30);
        assert!(settings.with_growth);
    }

    #[test]
    fn zero_min_bars_rejected() {
        let config = make_config(&format!("{MINIMAL}[scan]\nmin_daily_bars = 0\n"));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn codes_are_split_and_trimmed() {
        let config = make_config(&format!("{MINIMAL}[scan]\ncodes = TCS.NS, INFY.NS ,,RELIANCE.NS\n"));
        assert_eq!(
            scan_codes(&config).unwrap(),
            vec!["TCS.NS", "INFY.NS", "RELIANCE.NS"]
        );
        assert_eq!(scan_codes(&make_config(MINIMAL)), None);
    }

    #[test]
    fn notify_defaults_off() {
        assert!(!notify_enabled(&make_config(MINIMAL)));
        let config = make_config(&format!("{MINIMAL}[notify]\nenabled = yes\n"));
        assert!(notify_enabled(&config));
    }
}
