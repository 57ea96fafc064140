//! # Hypersync
//!
//! Without `HS_AGENT_INDEX` this binary is the supervisor; with it, one agent.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (stderr)
//! 2. Load and validate configuration
//! 3. Supervisor: start agents and relay the console.
//!    Agent: generate identity, bind UDP, sync, go active
//!
//! Exit status 1 on any startup failure (bad configuration, identity
//! generation, socket bind).

use std::process::ExitCode;
use std::sync::Arc;

use agent_runtime::config::{load_agent_config, load_network_params, load_supervisor_config};
use agent_runtime::runtime::run_agent;
use agent_runtime::Supervisor;
use anyhow::{Context, Result};
use hs_telemetry::{init_telemetry, TelemetryConfig};
use tracing::error;

enum Role {
    Supervisor,
    Agent(usize),
}

fn role() -> Role {
    match std::env::var("HS_AGENT_INDEX").ok().and_then(|v| v.trim().parse().ok()) {
        Some(index) => Role::Agent(index),
        None => Role::Supervisor,
    }
}

fn main() -> ExitCode {
    let role = role();
    let telemetry = match role {
        Role::Agent(index) => TelemetryConfig::for_agent(index),
        Role::Supervisor => TelemetryConfig::from_env(),
    };
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("hypersync: {e}");
        return ExitCode::from(1);
    }

    match run(role) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(role: Role) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    match role {
        Role::Supervisor => {
            let config = load_supervisor_config().context("Invalid supervisor configuration")?;
            // Agents inherit the environment; fail before starting any of them.
            load_network_params().context("Invalid network parameters")?;
            let supervisor = Supervisor::new(config)?;
            runtime.block_on(supervisor.run())
        }
        Role::Agent(_) => {
            let config = load_agent_config().context("Invalid agent configuration")?;
            let params = Arc::new(load_network_params().context("Invalid network parameters")?);
            runtime.block_on(run_agent(config, params))
        }
    }
}
