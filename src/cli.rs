//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::console_table::{format_market_table, format_portfolio, format_scan_table};
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_storage_adapter::JsonStorageAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::domain::config_validation::{
    StorageBackend, data_path, initial_balance, market_symbols, notify_enabled, parse_codes,
    scan_codes, scan_settings_from_config, sizing_from_config, storage_backend, storage_path,
    thresholds_from_config, validate_config,
};
use crate::domain::error::MarketScanError;
use crate::domain::ledger::{self, Ledger, LedgerCommand, LedgerOutcome};
use crate::domain::position::DATE_FORMAT;
use crate::domain::market::market_overview;
use crate::domain::scan::{run_scan, suggest_quantity};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notify_port::NotifyPort;
use crate::ports::report_port::ReportPort;
use crate::ports::storage_port::StoragePort;

pub const DEFAULT_CATEGORY: &str = "Manual";

#[derive(Parser, Debug)]
#[command(
    name = "marketscan",
    about = "Technical signal scanner with a simulated portfolio ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan symbols and print their signals
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols, overriding [scan] codes
        #[arg(long)]
        codes: Option<String>,
        /// Also write the results to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Classify quarterly result growth
        #[arg(long)]
        growth: bool,
        /// Repeat the scan every N seconds
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },
    /// Buy into a position
    Buy {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Share count, defaults to a risk-sized quantity
        #[arg(long)]
        qty: Option<i64>,
        #[arg(long)]
        price: f64,
        /// Percent of capital to risk when sizing, overriding [sizing] risk_pct
        #[arg(long)]
        risk_pct: Option<f64>,
        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,
        /// Acquisition date as DD-MM-YYYY, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Index option bias and sector trends
    Market {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated index symbols, overriding [market] indices
        #[arg(long)]
        indices: Option<String>,
        /// Comma-separated sector symbols, overriding [market] sectors
        #[arg(long)]
        sectors: Option<String>,
    },
    /// Close a whole position
    Sell {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Exit price, defaults to the latest market price
        #[arg(long)]
        price: Option<f64>,
    },
    /// Restore the initial balance and drop all positions
    Reset {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show holdings with unrealized P/L
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            codes,
            output,
            growth,
            watch,
        } => run_scan_command(&config, codes.as_deref(), output.as_ref(), growth, watch),
        Command::Buy {
            config,
            symbol,
            qty,
            price,
            risk_pct,
            category,
            date,
        } => run_buy(
            &config,
            &symbol,
            BuyOrder {
                qty,
                price,
                risk_pct,
            },
            &category,
            date.as_deref(),
        ),
        Command::Market {
            config,
            indices,
            sectors,
        } => run_market(&config, indices.as_deref(), sectors.as_deref()),
        Command::Sell {
            config,
            symbol,
            price,
        } => run_sell(&config, &symbol, price),
        Command::Reset { config } => run_reset(&config),
        Command::Portfolio { config } => run_portfolio(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(e: MarketScanError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

/// Load and validate the configuration file.
pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(fail)?;
    validate_config(&adapter).map_err(fail)?;
    Ok(adapter)
}

pub fn open_storage(config: &dyn ConfigPort) -> Result<Box<dyn StoragePort>, MarketScanError> {
    match storage_backend(config)? {
        StorageBackend::Json => Ok(Box::new(JsonStorageAdapter::new(PathBuf::from(
            storage_path(config)?,
        )))),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteStorageAdapter::from_config(config)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => Err(MarketScanError::ConfigInvalid {
            section: "storage".into(),
            key: "backend".into(),
            reason: "sqlite support was not compiled in".into(),
        }),
    }
}

pub fn open_market_data(config: &dyn ConfigPort) -> Result<CsvAdapter, MarketScanError> {
    Ok(CsvAdapter::new(PathBuf::from(data_path(config)?)))
}

/// Symbols to scan: the override, else `[scan] codes`, else every symbol the data source has.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
    data: &dyn MarketDataPort,
) -> Result<Vec<String>, MarketScanError> {
    if let Some(codes) = code_override.map(parse_codes).filter(|c| !c.is_empty()) {
        return Ok(codes);
    }
    if let Some(codes) = scan_codes(config) {
        return Ok(codes);
    }
    data.list_symbols()
}

fn run_scan_command(
    config_path: &PathBuf,
    code_override: Option<&str>,
    output_path: Option<&PathBuf>,
    growth: bool,
    watch: Option<u64>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let mut settings = match scan_settings_from_config(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    settings.with_growth |= growth;

    let data = match open_market_data(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let codes = match resolve_codes(code_override, &config, &data) {
        Ok(c) if !c.is_empty() => c,
        Ok(_) => {
            eprintln!("error: no symbols to scan");
            return ExitCode::from(2);
        }
        Err(e) => return fail(e),
    };

    let log_notifier = LogNotifier;
    let notifier = notify_enabled(&config).then_some(&log_notifier as &dyn NotifyPort);

    loop {
        eprintln!("Scanning {} symbols...", codes.len());
        let outcome = run_scan(&data, notifier, &codes, &settings);
        print!("{}", format_scan_table(&outcome));

        if let Some(path) = output_path {
            let path_str = path.to_string_lossy();
            if let Err(e) = CsvReportAdapter.write(&outcome.results, &path_str) {
                return fail(e);
            }
            eprintln!("Report written to {}", path.display());
        }

        match watch {
            Some(secs) => {
                info!(secs, "sleeping before next scan");
                std::thread::sleep(Duration::from_secs(secs.max(1)));
            }
            None => break,
        }
    }

    ExitCode::SUCCESS
}

fn run_ledger_command(config: &FileConfigAdapter, command: &LedgerCommand) -> ExitCode {
    let storage = match open_storage(config) {
        Ok(s) => s,
        Err(e) => {
            // an unreachable store behaves like an empty one; nothing will persist
            warn!(error = %e, "storage unavailable");
            return run_with_storage(&UnavailableStorage(e.to_string()), config, command);
        }
    };
    run_with_storage(storage.as_ref(), config, command)
}

fn run_with_storage(
    storage: &dyn StoragePort,
    config: &FileConfigAdapter,
    command: &LedgerCommand,
) -> ExitCode {
    match ledger::execute(storage, initial_balance(config), command) {
        Ok((ledger, outcome)) => {
            match outcome {
                LedgerOutcome::Bought { cost } => println!("Bought for {cost:.2}"),
                LedgerOutcome::Sold { proceeds } => println!("Sold for {proceeds:.2}"),
                LedgerOutcome::Reset => println!("Ledger reset"),
            }
            println!("Cash balance: {:.2}", ledger.cash_balance);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Stand-in store used when the configured backend cannot be opened.
struct UnavailableStorage(String);

impl StoragePort for UnavailableStorage {
    fn load(&self) -> Result<Option<Ledger>, MarketScanError> {
        Err(MarketScanError::Storage {
            reason: self.0.clone(),
        })
    }

    fn save(&self, _ledger: &Ledger) -> Result<(), MarketScanError> {
        Err(MarketScanError::Storage {
            reason: self.0.clone(),
        })
    }
}

pub fn parse_date(value: Option<&str>) -> Result<NaiveDate, MarketScanError> {
    match value {
        Some(v) => NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).map_err(|e| {
            MarketScanError::Parse {
                source_name: "--date".into(),
                reason: format!("expected DD-MM-YYYY, got '{v}': {e}"),
            }
        }),
        None => Ok(Local::now().date_naive()),
    }
}

struct BuyOrder {
    qty: Option<i64>,
    price: f64,
    risk_pct: Option<f64>,
}

/// The explicit quantity, else one sized from `[sizing]` and the symbol's ATR.
fn resolve_quantity(
    config: &FileConfigAdapter,
    symbol: &str,
    order: &BuyOrder,
) -> Result<i64, MarketScanError> {
    if let Some(qty) = order.qty {
        return Ok(qty);
    }
    let mut sizing = sizing_from_config(config)?;
    if let Some(risk_pct) = order.risk_pct {
        if !(risk_pct > 0.0 && risk_pct <= 100.0) {
            return Err(MarketScanError::Parse {
                source_name: "--risk-pct".into(),
                reason: format!("expected a percent in (0, 100], got {risk_pct}"),
            });
        }
        sizing.risk_pct = risk_pct;
    }
    let thresholds = thresholds_from_config(config)?;
    let data = open_market_data(config)?;
    suggest_quantity(&data, symbol, &sizing, &thresholds)
}

fn run_buy(
    config_path: &PathBuf,
    symbol: &str,
    order: BuyOrder,
    category: &str,
    date: Option<&str>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let date = match parse_date(date) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let quantity = match resolve_quantity(&config, symbol, &order) {
        Ok(q) => q,
        Err(e) => return fail(e),
    };
    if order.qty.is_none() {
        info!(symbol, quantity, "auto-sized buy");
        println!("Sized at {quantity} shares");
    }
    run_ledger_command(
        &config,
        &LedgerCommand::Buy {
            symbol: symbol.to_string(),
            quantity,
            price: order.price,
            category: category.to_string(),
            date,
        },
    )
}

fn run_market(
    config_path: &PathBuf,
    index_override: Option<&str>,
    sector_override: Option<&str>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let (mut indices, mut sectors) = market_symbols(&config);
    if let Some(list) = index_override {
        indices = parse_codes(list);
    }
    if let Some(list) = sector_override {
        sectors = parse_codes(list);
    }
    if indices.is_empty() && sectors.is_empty() {
        eprintln!("error: no index or sector symbols configured");
        return ExitCode::from(2);
    }

    let thresholds = match thresholds_from_config(&config) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let data = match open_market_data(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let overview = market_overview(&data, &indices, &sectors, &thresholds);
    print!("{}", format_market_table(&overview));
    ExitCode::SUCCESS
}

fn run_sell(config_path: &PathBuf, symbol: &str, price: Option<f64>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let live_price = match price {
        Some(p) => p,
        None => match open_market_data(&config).and_then(|d| d.latest_price(symbol)) {
            Ok(p) => p,
            Err(e) => return fail(e),
        },
    };
    run_ledger_command(
        &config,
        &LedgerCommand::Sell {
            symbol: symbol.to_string(),
            live_price,
        },
    )
}

fn run_reset(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let initial_balance = initial_balance(&config);
    run_ledger_command(&config, &LedgerCommand::Reset { initial_balance })
}

fn run_portfolio(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let storage = match open_storage(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let ledger = ledger::load_or_default(storage.as_ref(), initial_balance(&config));

    let live_prices: HashMap<String, f64> = match open_market_data(&config) {
        Ok(data) => ledger
            .positions
            .keys()
            .filter_map(|symbol| match data.latest_price(symbol) {
                Ok(p) => Some((symbol.clone(), p)),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "no live price");
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "market data unavailable");
            HashMap::new()
        }
    };

    let mtm = ledger.mark_to_market(&live_prices);
    print!("{}", format_portfolio(&ledger, &mtm));
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match scan_settings_from_config(&config) {
        Ok(settings) => {
            println!("Configuration is valid");
            println!("  storage backend: {:?}", storage_backend(&config).ok());
            println!("  initial balance: {:.2}", initial_balance(&config));
            println!("  min daily bars: {}", settings.min_daily_bars);
            println!("  growth limit: {}", settings.growth_limit);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}
