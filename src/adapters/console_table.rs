//! Plain-text tables for terminal output.

use crate::domain::ledger::{Ledger, MarkToMarket};
use crate::domain::market::{MarketOverview, MarketTrend};
use crate::domain::scan::ScanOutcome;

fn level(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn format_scan_table(outcome: &ScanOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<14} {:>10} {:>8}  {:<16} {:<6} {:>10} {:>10}  {}\n",
        "Symbol", "Price", "Chg%", "Quality", "Week", "SL", "Target", "Tags"
    ));
    for r in &outcome.results {
        let mut tags = r.tag_summary();
        if let Some(growth) = r.growth.filter(|g| g.is_notable()) {
            tags.push_str(&format!(" | {growth}"));
        }
        out.push_str(&format!(
            "{:<14} {:>10.2} {:>+8.2}  {:<16} {:<6} {:>10} {:>10}  {}\n",
            r.symbol,
            r.last_price,
            r.change_pct,
            r.quality.to_string(),
            r.weekly_trend.to_string(),
            level(r.stop_loss),
            level(r.target),
            tags
        ));
    }
    for s in &outcome.skipped {
        out.push_str(&format!("skipped {}: {}\n", s.symbol, s.reason));
    }
    out
}

fn trend(value: Option<MarketTrend>) -> String {
    value.map_or_else(|| "-".to_string(), |t| t.to_string())
}

pub fn format_market_table(overview: &MarketOverview) -> String {
    let mut out = String::new();
    if !overview.indices.is_empty() {
        out.push_str(&format!(
            "{:<14} {:>10} {:>8}  {:<6} {}\n",
            "Index", "Price", "Chg%", "Trend", "Options"
        ));
        for i in &overview.indices {
            out.push_str(&format!(
                "{:<14} {:>10.2} {:>+8.2}  {:<6} {}\n",
                i.symbol,
                i.last_price,
                i.change_pct,
                trend(i.trend),
                i.option_bias
            ));
        }
    }
    if !overview.sectors.is_empty() {
        out.push_str(&format!(
            "{:<14} {:>10} {:>8}  {}\n",
            "Sector", "Price", "Chg%", "Trend"
        ));
        for s in &overview.sectors {
            out.push_str(&format!(
                "{:<14} {:>10.2} {:>+8.2}  {}\n",
                s.symbol,
                s.last_price,
                s.change_pct,
                trend(s.trend)
            ));
        }
    }
    for s in &overview.skipped {
        out.push_str(&format!("skipped {}: {}\n", s.symbol, s.reason));
    }
    out
}

pub fn format_portfolio(ledger: &Ledger, mtm: &MarkToMarket) -> String {
    let mut out = format!("Cash balance: {:.2}\n", ledger.cash_balance);
    if mtm.rows.is_empty() {
        out.push_str("No open positions\n");
        return out;
    }

    out.push_str(&format!(
        "{:<14} {:>8} {:>12} {:>12} {:>12}  {:<14} {}\n",
        "Symbol", "Qty", "Avg Price", "Live", "P/L", "Category", "Date"
    ));
    for row in &mtm.rows {
        let (category, date) = ledger
            .position(&row.symbol)
            .map(|p| (p.category.as_str(), p.acquisition_date.format("%d-%m-%Y").to_string()))
            .unwrap_or_default();
        let live = if row.priced {
            format!("{:.2}", row.live_price)
        } else {
            "n/a".to_string()
        };
        out.push_str(&format!(
            "{:<14} {:>8} {:>12.2} {:>12} {:>+12.2}  {:<14} {}\n",
            row.symbol, row.quantity, row.average_buy_price, live, row.pnl, category, date
        ));
    }
    out.push_str(&format!("Total unrealized P/L: {:+.2}\n", mtm.total_pnl));
    out
}
