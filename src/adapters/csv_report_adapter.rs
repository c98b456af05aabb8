//! CSV scan report adapter implementing ReportPort.

use crate::domain::error::MarketScanError;
use crate::domain::signal::SignalResult;
use crate::ports::report_port::ReportPort;
use std::path::Path;

const HEADERS: [&str; 9] = [
    "symbol",
    "price",
    "change_pct",
    "quality",
    "weekly_trend",
    "stop_loss",
    "target",
    "growth",
    "tags",
];

pub struct CsvReportAdapter;

fn level(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, results: &[SignalResult], output_path: &str) -> Result<(), MarketScanError> {
        let write_err = |e: csv::Error| MarketScanError::Parse {
            source_name: output_path.to_string(),
            reason: format!("failed to write report: {}", e),
        };

        if let Some(parent) = Path::new(output_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(output_path).map_err(write_err)?;
        wtr.write_record(HEADERS).map_err(write_err)?;
        for r in results {
            wtr.write_record([
                r.symbol.clone(),
                format!("{:.2}", r.last_price),
                format!("{:.2}", r.change_pct),
                r.quality.to_string(),
                r.weekly_trend.to_string(),
                level(r.stop_loss),
                level(r.target),
                r.growth.map(|g| g.to_string()).unwrap_or_default(),
                r.tag_summary(),
            ])
            .map_err(write_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
