//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for the logging stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Agent index, `None` for the supervisor
    pub agent_index: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error) or full directive
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to colour the plain formatter
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hypersync".to_string(),
            agent_index: None,
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HS_SERVICE_NAME`: Service name (default: hypersync)
    /// - `HS_AGENT_INDEX`: Agent index (default: unset)
    /// - `HS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `HS_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `NO_COLOR`: Disable ANSI colours when set
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("HS_SERVICE_NAME").unwrap_or_else(|_| "hypersync".to_string()),

            agent_index: env::var("HS_AGENT_INDEX").ok().and_then(|v| v.parse().ok()),

            log_level: env::var("HS_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("HS_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            ansi: env::var("NO_COLOR").is_err(),
        }
    }

    /// Configuration for one agent process.
    pub fn for_agent(index: usize) -> Self {
        let mut config = Self::from_env();
        config.agent_index = Some(index);
        config
    }

    /// Service name including the agent index.
    pub fn full_service_name(&self) -> String {
        match self.agent_index {
            Some(index) => format!("{}-agent-{}", self.service_name, index),
            None => self.service_name.clone(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
