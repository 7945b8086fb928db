//! Domain layer for rask-log-transport.
//!
//! Contains the types shared across all modules:
//! - `LogEntry`: what the producer hands to the transport
//! - `LogLevel`: entry severity (Error/Warn/Info/Debug)
//! - `TransportError` and `OptimizationError`

pub mod error;
pub mod log_entry;
pub mod log_level;

pub use error::{OptimizationError, TransportError};
pub use log_entry::{ErrorDetails, LogEntry, LogError};
pub use log_level::LogLevel;
