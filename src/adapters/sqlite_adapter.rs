//! SQLite ledger storage: a one-row `balance` table and a `portfolio` table.

use crate::domain::error::MarketScanError;
use crate::domain::ledger::{Ledger, LedgerDocument};
use crate::domain::position::PositionRow;
use crate::ports::config_port::ConfigPort;
use crate::ports::storage_port::StoragePort;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

pub struct SqliteStorageAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> MarketScanError {
    MarketScanError::Storage {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> MarketScanError {
    MarketScanError::StorageQuery {
        reason: e.to_string(),
    }
}

impl SqliteStorageAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketScanError> {
        let db_path =
            config
                .get_string("storage", "path")
                .ok_or_else(|| MarketScanError::ConfigMissing {
                    section: "storage".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("storage", "pool_size", 2).max(1) as u32;

        let manager = SqliteConnectionManager::file(db_path.trim());
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, MarketScanError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MarketScanError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), MarketScanError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS balance (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    amount REAL NOT NULL
                );
                CREATE TABLE IF NOT EXISTS portfolio (
                    symbol TEXT PRIMARY KEY,
                    buy_price REAL NOT NULL,
                    qty INTEGER NOT NULL,
                    category TEXT NOT NULL,
                    date TEXT NOT NULL
                );",
            )
            .map_err(query_err)
    }
}

impl StoragePort for SqliteStorageAdapter {
    fn load(&self) -> Result<Option<Ledger>, MarketScanError> {
        let conn = self.conn()?;

        let balance: Option<f64> = conn
            .query_row("SELECT amount FROM balance WHERE id = 1", [], |row| row.get(0))
            .optional()
            .map_err(query_err)?;
        let Some(balance) = balance else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare("SELECT symbol, buy_price, qty, category, date FROM portfolio ORDER BY symbol")
            .map_err(query_err)?;
        let portfolio = stmt
            .query_map([], |row| {
                Ok(PositionRow {
                    symbol: row.get(0)?,
                    buy_price: row.get(1)?,
                    qty: row.get(2)?,
                    category: row.get(3)?,
                    date: row.get(4)?,
                })
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ledger::from_document(LedgerDocument { balance, portfolio }).map(Some)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), MarketScanError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT OR REPLACE INTO balance (id, amount) VALUES (1, ?1)",
            params![ledger.cash_balance],
        )
        .map_err(query_err)?;
        tx.execute("DELETE FROM portfolio", []).map_err(query_err)?;
        for row in ledger.to_document().portfolio {
            tx.execute(
                "INSERT INTO portfolio (symbol, buy_price, qty, category, date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.symbol, row.buy_price, row.qty, row.category, row.date],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_ledger() -> Ledger {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut ledger = Ledger::new(250_000.0);
        ledger.buy("TCS.NS", 10, 3500.25, "Jackpot", date).unwrap();
        ledger.buy("HDFCBANK.NS", 40, 1450.0, "Support", date).unwrap();
        ledger
    }

    #[test]
    fn from_config_missing_path() {
        let config = FileConfigAdapter::from_string("[storage]\nbackend = sqlite\n").unwrap();
        let result = SqliteStorageAdapter::from_config(&config);
        assert!(matches!(result, Err(MarketScanError::ConfigMissing { .. })));
    }

    #[test]
    fn empty_database_loads_as_none() {
        let adapter = SqliteStorageAdapter::in_memory().unwrap();
        assert_eq!(adapter.load().unwrap(), None);
    }

    #[test]
    fn save_then_load_reproduces_ledger() {
        let adapter = SqliteStorageAdapter::in_memory().unwrap();
        let ledger = sample_ledger();
        adapter.save(&ledger).unwrap();
        assert_eq!(adapter.load().unwrap(), Some(ledger));
    }

    #[test]
    fn save_replaces_previous_rows() {
        let adapter = SqliteStorageAdapter::in_memory().unwrap();
        let mut ledger = sample_ledger();
        adapter.save(&ledger).unwrap();
        ledger.sell("TCS.NS", 3600.0).unwrap();
        adapter.save(&ledger).unwrap();
        let loaded = adapter.load().unwrap().unwrap();
        assert_eq!(loaded.positions.len(), 1);
        assert!(!loaded.is_held("TCS.NS"));
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn file_database_persists_across_adapters() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("ledger.db");
        let config =
            FileConfigAdapter::from_string(&format!("[storage]\npath = {}\n", db.display()))
                .unwrap();
        SqliteStorageAdapter::from_config(&config)
            .unwrap()
            .save(&sample_ledger())
            .unwrap();
        let reopened = SqliteStorageAdapter::from_config(&config).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(sample_ledger()));
    }
}
