//! Warrant Telemetry - Logging setup for the delegated-auth kernel.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Rolling file output for long-running hosts
//! - Conversion from the `[logging]` config section (feature `config`)
//!
//! Security-relevant history lives in the audit log, not here. Logs are
//! for operators and never carry raw secrets.
//!
//! # Example
//!
//! ```rust,no_run
//! use warrant_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), warrant_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("warrant_auth=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("auth kernel starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

#[cfg(feature = "config")]
mod config_bridge;
mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
