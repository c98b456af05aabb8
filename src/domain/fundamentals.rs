//! Fundamentals snapshot and the quarterly result-growth classifier.

use std::fmt;

/// Trailing P/E used when the data source has none. It fails every P/E gate.
pub const DEFAULT_TRAILING_PE: f64 = 100.0;
/// Return on equity when absent: no earnings quality.
pub const DEFAULT_RETURN_ON_EQUITY: f64 = 0.0;
/// Debt-to-equity when absent. It fails every leverage gate.
pub const DEFAULT_DEBT_TO_EQUITY: f64 = 100.0;

/// Quarters between a figure and the same quarter one year earlier.
const YEAR_OVER_YEAR_LAG: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    pub trailing_pe: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

impl Fundamentals {
    pub fn trailing_pe_or_default(&self) -> f64 {
        self.trailing_pe
            .filter(|pe| pe.is_finite())
            .unwrap_or(DEFAULT_TRAILING_PE)
    }

    pub fn return_on_equity_or_default(&self) -> f64 {
        self.return_on_equity
            .filter(|roe| roe.is_finite())
            .unwrap_or(DEFAULT_RETURN_ON_EQUITY)
    }

    pub fn debt_to_equity_or_default(&self) -> f64 {
        self.debt_to_equity
            .filter(|d| d.is_finite())
            .unwrap_or(DEFAULT_DEBT_TO_EQUITY)
    }
}

/// One quarter's reported net income. `None` marks a missing or malformed figure.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyFigure {
    pub period: String,
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthOutlook {
    SuperGrowth(f64),
    Positive(f64),
    Weak(f64),
    Neutral,
    QoqGrowth,
    QoqDip,
    DataGap,
    Unavailable,
}

impl GrowthOutlook {
    /// Outlooks worth surfacing next to a scan result.
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            GrowthOutlook::SuperGrowth(_) | GrowthOutlook::Positive(_) | GrowthOutlook::Weak(_)
        )
    }
}

impl fmt::Display for GrowthOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrowthOutlook::SuperGrowth(pct) => write!(f, "Super Growth (+{}%)", pct.trunc()),
            GrowthOutlook::Positive(pct) => write!(f, "Positive (+{}%)", pct.trunc()),
            GrowthOutlook::Weak(pct) => write!(f, "Weak (-{}%)", pct.abs().trunc()),
            GrowthOutlook::Neutral => write!(f, "Neutral"),
            GrowthOutlook::QoqGrowth => write!(f, "QoQ Growth"),
            GrowthOutlook::QoqDip => write!(f, "QoQ Dip"),
            GrowthOutlook::DataGap => write!(f, "Data Gap"),
            GrowthOutlook::Unavailable => write!(f, "N/A"),
        }
    }
}

/// Classify earnings growth from quarterly figures ordered oldest first.
///
/// With at least five quarters the latest quarter is compared with the same
/// quarter a year earlier; with two to four, with the previous quarter.
/// Never fails: gaps and zero denominators yield [`GrowthOutlook::DataGap`].
pub fn classify_growth(figures: &[QuarterlyFigure]) -> GrowthOutlook {
    let n = figures.len();
    if n > YEAR_OVER_YEAR_LAG {
        let current = finite(figures[n - 1].net_income);
        let year_ago = finite(figures[n - 1 - YEAR_OVER_YEAR_LAG].net_income);
        return match (current, year_ago) {
            (Some(current), Some(year_ago)) if year_ago != 0.0 => {
                growth_band((current - year_ago) / year_ago.abs() * 100.0)
            }
            _ => GrowthOutlook::DataGap,
        };
    }

    if n >= 2 {
        return match (finite(figures[n - 1].net_income), finite(figures[n - 2].net_income)) {
            (Some(current), Some(previous)) if current > previous => GrowthOutlook::QoqGrowth,
            (Some(_), Some(_)) => GrowthOutlook::QoqDip,
            _ => GrowthOutlook::DataGap,
        };
    }

    GrowthOutlook::Unavailable
}

fn growth_band(pct: f64) -> GrowthOutlook {
    if pct > 20.0 {
        GrowthOutlook::SuperGrowth(pct)
    } else if pct > 0.0 {
        GrowthOutlook::Positive(pct)
    } else if pct < -10.0 {
        GrowthOutlook::Weak(pct)
    } else {
        GrowthOutlook::Neutral
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
