//! Ledger persistence through the storage port, for every backend.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use marketscan::adapters::json_storage_adapter::JsonStorageAdapter;
use marketscan::domain::error::LedgerError;
use marketscan::domain::ledger::{self, Ledger, LedgerCommand, LedgerOutcome};
use marketscan::ports::storage_port::StoragePort;

fn date(d: u32, m: u32, y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_ledger() -> Ledger {
    let mut ledger = Ledger::new(100_000.0);
    ledger
        .buy("TCS.NS", 10, 3500.0, "Jackpot", date(2, 1, 2024))
        .unwrap();
    ledger
        .buy("SBIN.NS", 40, 610.25, "Golden Dip", date(15, 3, 2024))
        .unwrap();
    ledger
}

fn buy(symbol: &str, quantity: i64, price: f64) -> LedgerCommand {
    LedgerCommand::Buy {
        symbol: symbol.to_string(),
        quantity,
        price,
        category: "Manual".to_string(),
        date: date(1, 6, 2024),
    }
}

mod json_backend {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorageAdapter::new(dir.path().join("ledger.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn balance_and_rows_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        JsonStorageAdapter::new(path.clone())
            .save(&sample_ledger())
            .unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_relative_eq!(doc["Balance"].as_f64().unwrap(), 100_000.0 - 35_000.0 - 24_410.0);
        let rows = doc["Portfolio"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        let sbin = rows.iter().find(|r| r["Symbol"] == "SBIN.NS").unwrap();
        assert_eq!(sbin["Qty"], 40);
        assert_eq!(sbin["Category"], "Golden Dip");
        assert_eq!(sbin["Date"], "15-03-2024");

        let reopened = JsonStorageAdapter::new(path);
        assert_eq!(reopened.load().unwrap(), Some(sample_ledger()));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        let storage = JsonStorageAdapter::new(path);
        assert!(storage.load().is_err());
        // the command layer still starts from a fresh ledger
        let fresh = ledger::load_or_default(&storage, 5_000.0);
        assert_eq!(fresh, Ledger::new(5_000.0));
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_backend {
    use super::*;
    use marketscan::adapters::file_config_adapter::FileConfigAdapter;
    use marketscan::adapters::sqlite_adapter::SqliteStorageAdapter;

    #[test]
    fn json_ledger_moves_to_sqlite_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let json = JsonStorageAdapter::new(dir.path().join("ledger.json"));
        json.save(&sample_ledger()).unwrap();

        let sqlite = SqliteStorageAdapter::in_memory().unwrap();
        sqlite.save(&json.load().unwrap().unwrap()).unwrap();
        assert_eq!(sqlite.load().unwrap(), json.load().unwrap());
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let ini = format!(
            "[storage]\nbackend = sqlite\npath = {}\n",
            dir.path().join("ledger.db").display()
        );
        let config = FileConfigAdapter::from_string(&ini).unwrap();

        let ledger = sample_ledger();
        SqliteStorageAdapter::from_config(&config)
            .unwrap()
            .save(&ledger)
            .unwrap();

        let reopened = SqliteStorageAdapter::from_config(&config).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(ledger));
    }
}

mod command_execution {
    use super::*;

    #[test]
    fn buy_persists_and_sell_closes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorageAdapter::new(dir.path().join("ledger.json"));

        let (after_buy, outcome) = ledger::execute(&storage, 10_000.0, &buy("INFY.NS", 5, 1500.0)).unwrap();
        assert_eq!(outcome, LedgerOutcome::Bought { cost: 7500.0 });
        assert_relative_eq!(after_buy.cash_balance, 2500.0);
        assert_eq!(storage.load().unwrap(), Some(after_buy));

        let (after_sell, outcome) = ledger::execute(
            &storage,
            10_000.0,
            &LedgerCommand::Sell {
                symbol: "INFY.NS".to_string(),
                live_price: 1600.0,
            },
        )
        .unwrap();
        assert_eq!(outcome, LedgerOutcome::Sold { proceeds: 8000.0 });
        assert_relative_eq!(after_sell.cash_balance, 10_500.0);
        assert!(after_sell.positions.is_empty());
        assert_eq!(storage.load().unwrap(), Some(after_sell));
    }

    #[test]
    fn rejected_buy_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let storage = JsonStorageAdapter::new(path.clone());

        let err = ledger::execute(&storage, 1_000.0, &buy("TCS.NS", 10, 3500.0)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn selling_unheld_symbol_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorageAdapter::new(dir.path().join("ledger.json"));
        storage.save(&sample_ledger()).unwrap();

        let err = ledger::execute(
            &storage,
            100_000.0,
            &LedgerCommand::Sell {
                symbol: "WIPRO.NS".to_string(),
                live_price: 450.0,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::NotHeld {
                symbol: "WIPRO.NS".to_string()
            }
        );
        assert_eq!(storage.load().unwrap(), Some(sample_ledger()));
    }

    #[test]
    fn reset_restores_balance_and_clears_positions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorageAdapter::new(dir.path().join("ledger.json"));
        storage.save(&sample_ledger()).unwrap();

        let (ledger, outcome) = ledger::execute(
            &storage,
            100_000.0,
            &LedgerCommand::Reset {
                initial_balance: 250_000.0,
            },
        )
        .unwrap();
        assert_eq!(outcome, LedgerOutcome::Reset);
        assert_eq!(ledger, Ledger::new(250_000.0));
        assert_eq!(storage.load().unwrap(), Some(Ledger::new(250_000.0)));
    }

    #[test]
    fn unwritable_storage_still_returns_updated_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let storage = JsonStorageAdapter::new(blocker.join("ledger.json"));
        let (ledger, _) = ledger::execute(&storage, 10_000.0, &buy("INFY.NS", 1, 1500.0)).unwrap();
        assert!(ledger.is_held("INFY.NS"));
    }
}
