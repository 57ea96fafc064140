//! # Hypersync Telemetry
//!
//! Structured logging for agents and the supervisor.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hs_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     tracing::info!("agent started");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HS_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directive |
//! | `HS_JSON_LOGS` | `false` | JSON lines instead of plain text |
//! | `HS_SERVICE_NAME` | `hypersync` | Service name in the startup line |
//! | `HS_AGENT_INDEX` | unset | Agent index |

mod config;
mod logging;

pub use config::TelemetryConfig;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber. Call once per process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    logging::init_subscriber(config)?;

    tracing::info!(
        service = %config.full_service_name(),
        json = config.json_logs,
        filter = %config.log_level,
        "Telemetry initialized"
    );
    Ok(())
}
