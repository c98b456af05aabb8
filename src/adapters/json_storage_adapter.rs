//! Local JSON document ledger storage.
//!
//! The document mirrors the two persisted tables:
//! `{"Balance": 1000000.0, "Portfolio": [{"Symbol": ..., "Buy_Price": ..., ...}]}`.

use crate::domain::error::MarketScanError;
use crate::domain::ledger::{Ledger, LedgerDocument};
use crate::ports::storage_port::StoragePort;
use std::fs;
use std::path::PathBuf;

pub struct JsonStorageAdapter {
    path: PathBuf,
}

impl JsonStorageAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn storage_err(&self, action: &str, e: impl std::fmt::Display) -> MarketScanError {
        MarketScanError::Storage {
            reason: format!("failed to {} {}: {}", action, self.path.display(), e),
        }
    }
}

impl StoragePort for JsonStorageAdapter {
    fn load(&self) -> Result<Option<Ledger>, MarketScanError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_err("read", e)),
        };
        let doc: LedgerDocument =
            serde_json::from_str(&content).map_err(|e| self.storage_err("parse", e))?;
        Ledger::from_document(doc).map(Some)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), MarketScanError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.storage_err("create directory for", e))?;
        }
        let json = serde_json::to_string_pretty(&ledger.to_document())
            .map_err(|e| self.storage_err("serialize", e))?;
        // replace via a sibling temp file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.storage_err("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_err("replace", e))?;
        Ok(())
    }
}
