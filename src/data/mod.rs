pub mod hashrate;
pub mod report;
pub mod snapshot;
