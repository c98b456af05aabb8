//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod fundamentals;
pub mod indicator;
pub mod ledger;
pub mod market;
pub mod ohlcv;
pub mod position;
pub mod scan;
pub mod signal;
