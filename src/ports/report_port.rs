//! Scan report port trait.

use crate::domain::error::MarketScanError;
use crate::domain::signal::SignalResult;

/// Port for writing scan results.
pub trait ReportPort {
    fn write(&self, results: &[SignalResult], output_path: &str) -> Result<(), MarketScanError>;
}
