pub mod config;
pub mod data;
pub mod miners;
pub mod render;
pub mod scheduler;

pub use config::ConsoleConfig;
pub use scheduler::{Scheduler, SnapshotMap};
