//! # Runtime Configuration
//!
//! Everything is read from `HS_*` environment variables. Parsing goes through
//! a lookup function so the same code serves the real environment and tests.
//!
//! ## Agent
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HS_AGENT_INDEX` | `0` | Agent index |
//! | `HS_BIND` | `127.0.0.1:7400` | UDP bind address |
//! | `HS_PEERS` | empty | Comma-separated peer addresses |
//! | `HS_WARMUP_MS` | `2000` | Syncing window before going active |
//! | `HS_REBROADCAST_MS` | `5000` | Re-broadcast period |
//! | `HS_REBROADCAST_WINDOW` | `4` | Local transitions re-broadcast per period |
//! | `HS_TRUSTED_AGENTS` | empty | Comma-separated hex agent ids; empty accepts any |
//! | `HS_IDENTITY_SEED` | unset | 32-byte hex seed; unset generates a fresh key |
//! | `HS_CONSOLE` | `true` | Read commands from stdin |
//!
//! ## Network parameters
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HS_DIMENSION` | `8` |
//! | `HS_VALIDITY_THRESHOLD` | `0.8` |
//! | `HS_COMPUTE_TIMEOUT_MS` | `5000` |
//! | `HS_MAX_DATAGRAM_BYTES` | `1200` |
//!
//! ## Supervisor
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HS_AGENTS` | CPU count | Number of agent processes |
//! | `HS_HOST` | `127.0.0.1` | Address every agent binds on |
//! | `HS_BASE_PORT` | `7400` | Agent `i` binds `base + i` |
//! | `HS_MAX_RESTARTS` | `3` | Restarts per agent before giving up |
//! | `HS_SEED_BASE` | unset | Derive stable per-agent identity seeds |

use shared_crypto::Blake3Hasher;
use shared_types::{AgentId, NetworkParams, ParamsError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default first agent port.
pub const DEFAULT_BASE_PORT: u16 = 7400;

const SEED_CONTEXT: &str = "hypersync 2024 agent identity seed v1";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid network parameters: {0}")]
    Params(#[from] ParamsError),
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Per-agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Position of the agent in the supervisor's list.
    pub index: usize,
    /// UDP bind address.
    pub bind_addr: SocketAddr,
    /// Static peer list.
    pub peers: Vec<SocketAddr>,
    /// Syncing window before activation.
    pub warmup: Duration,
    /// Period of the local-history re-broadcast.
    pub rebroadcast_interval: Duration,
    /// How many recent local transitions each re-broadcast carries.
    pub rebroadcast_window: usize,
    /// Accepted proof signers. Empty accepts any key.
    pub trusted_agents: Vec<AgentId>,
    /// Deterministic identity seed.
    pub identity_seed: Option<[u8; 32]>,
    /// Whether stdin is read for console commands.
    pub console: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            index: 0,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_BASE_PORT),
            peers: Vec::new(),
            warmup: Duration::from_secs(2),
            rebroadcast_interval: Duration::from_secs(5),
            rebroadcast_window: 4,
            trusted_agents: Vec::new(),
            identity_seed: None,
            console: true,
        }
    }
}

impl AgentConfig {
    /// Read the agent configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("HS_AGENT_INDEX") {
            config.index = parse("HS_AGENT_INDEX", &v)?;
        }
        if let Some(v) = lookup("HS_BIND") {
            config.bind_addr = parse("HS_BIND", &v)?;
        }
        if let Some(v) = lookup("HS_PEERS") {
            config.peers = parse_list(&v, |item| parse("HS_PEERS", item))?;
        }
        if let Some(v) = lookup("HS_WARMUP_MS") {
            config.warmup = Duration::from_millis(parse("HS_WARMUP_MS", &v)?);
        }
        if let Some(v) = lookup("HS_REBROADCAST_MS") {
            let millis: u64 = parse("HS_REBROADCAST_MS", &v)?;
            if millis == 0 {
                return Err(invalid("HS_REBROADCAST_MS", &v, "must be non-zero"));
            }
            config.rebroadcast_interval = Duration::from_millis(millis);
        }
        if let Some(v) = lookup("HS_REBROADCAST_WINDOW") {
            config.rebroadcast_window = parse("HS_REBROADCAST_WINDOW", &v)?;
        }
        if let Some(v) = lookup("HS_TRUSTED_AGENTS") {
            config.trusted_agents = parse_list(&v, |item| {
                parse_hex32("HS_TRUSTED_AGENTS", item).map(AgentId)
            })?;
        }
        if let Some(v) = lookup("HS_IDENTITY_SEED") {
            config.identity_seed = Some(parse_hex32("HS_IDENTITY_SEED", &v)?);
        }
        if let Some(v) = lookup("HS_CONSOLE") {
            config.console = parse_flag("HS_CONSOLE", &v)?;
        }

        let own = config.bind_addr;
        config.peers.retain(|peer| *peer != own);
        Ok(config)
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Number of agent processes.
    pub agents: usize,
    /// Address every agent binds on.
    pub host: IpAddr,
    /// Port of agent 0; agent `i` uses `base_port + i`.
    pub base_port: u16,
    /// Restarts allowed per agent after abnormal exits.
    pub max_restarts: u32,
    /// Pause before restarting a crashed agent.
    pub restart_delay: Duration,
    /// How long agents get to exit after `quit`.
    pub shutdown_grace: Duration,
    /// Base for per-agent identity seeds.
    pub seed_base: Option<[u8; 32]>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            agents: num_cpus::get().max(1),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: DEFAULT_BASE_PORT,
            max_restarts: 3,
            restart_delay: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(10),
            seed_base: None,
        }
    }
}

impl SupervisorConfig {
    /// Read the supervisor configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("HS_AGENTS") {
            let agents: usize = parse("HS_AGENTS", &v)?;
            if agents == 0 {
                return Err(invalid("HS_AGENTS", &v, "at least one agent is required"));
            }
            config.agents = agents;
        }
        if let Some(v) = lookup("HS_HOST") {
            config.host = parse("HS_HOST", &v)?;
        }
        if let Some(v) = lookup("HS_BASE_PORT") {
            config.base_port = parse("HS_BASE_PORT", &v)?;
        }
        if let Some(v) = lookup("HS_MAX_RESTARTS") {
            config.max_restarts = parse("HS_MAX_RESTARTS", &v)?;
        }
        if let Some(v) = lookup("HS_SEED_BASE") {
            config.seed_base = Some(parse_hex32("HS_SEED_BASE", &v)?);
        }

        if usize::from(config.base_port) + config.agents > usize::from(u16::MAX) + 1 {
            return Err(invalid(
                "HS_BASE_PORT",
                &config.base_port.to_string(),
                format!("{} agents do not fit below port 65535", config.agents),
            ));
        }
        Ok(config)
    }

    /// Address of agent `index`.
    pub fn agent_addr(&self, index: usize) -> SocketAddr {
        SocketAddr::new(self.host, self.base_port + index as u16)
    }

    /// Addresses of every agent, in index order.
    pub fn agent_addrs(&self) -> Vec<SocketAddr> {
        (0..self.agents).map(|i| self.agent_addr(i)).collect()
    }

    /// Stable identity seed for agent `index`, if a seed base is set.
    pub fn agent_seed(&self, index: usize) -> Option<[u8; 32]> {
        self.seed_base.map(|base| {
            let mut hasher = Blake3Hasher::new(SEED_CONTEXT);
            hasher
                .update_field(&base)
                .update_field(&(index as u64).to_be_bytes());
            hasher.finalize()
        })
    }
}

/// Read the network parameters through `lookup` and validate them.
pub fn network_params_from_lookup<F>(lookup: F) -> Result<NetworkParams, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut params = NetworkParams::default();

    if let Some(v) = lookup("HS_DIMENSION") {
        params.dimension = parse("HS_DIMENSION", &v)?;
    }
    if let Some(v) = lookup("HS_VALIDITY_THRESHOLD") {
        params.validity_threshold = parse("HS_VALIDITY_THRESHOLD", &v)?;
    }
    if let Some(v) = lookup("HS_COMPUTE_TIMEOUT_MS") {
        params.computation_timeout = Duration::from_millis(parse("HS_COMPUTE_TIMEOUT_MS", &v)?);
    }
    if let Some(v) = lookup("HS_MAX_DATAGRAM_BYTES") {
        params.max_datagram_bytes = parse("HS_MAX_DATAGRAM_BYTES", &v)?;
    }

    params.validate()?;
    Ok(params)
}

/// Load the agent configuration from the process environment.
pub fn load_agent_config() -> Result<AgentConfig, ConfigError> {
    AgentConfig::from_lookup(env_lookup)
}

/// Load the supervisor configuration from the process environment.
pub fn load_supervisor_config() -> Result<SupervisorConfig, ConfigError> {
    SupervisorConfig::from_lookup(env_lookup)
}

/// Load the network parameters from the process environment.
pub fn load_network_params() -> Result<NetworkParams, ConfigError> {
    network_params_from_lookup(env_lookup)
}

fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(var, value, e))
}

fn parse_list<T, F>(value: &str, item: F) -> Result<Vec<T>, ConfigError>
where
    F: Fn(&str) -> Result<T, ConfigError>,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(item)
        .collect()
}

fn parse_hex32(var: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim()).map_err(|e| invalid(var, value, e))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| invalid(var, value, format!("expected 32 bytes, got {}", bytes.len())))
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}
