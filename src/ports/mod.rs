//! Port traits: the boundaries between domain logic and the outside world.

pub mod config_port;
pub mod market_data_port;
pub mod notify_port;
pub mod report_port;
pub mod storage_port;
