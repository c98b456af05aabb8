//! Ledger persistence port trait.

use crate::domain::error::MarketScanError;
use crate::domain::ledger::Ledger;

/// Whole-document ledger storage. Every save replaces what was stored.
pub trait StoragePort {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Ledger>, MarketScanError>;

    fn save(&self, ledger: &Ledger) -> Result<(), MarketScanError>;
}
