//! # Agent Runtime
//!
//! The control loop of one agent process. Everything but the coherence
//! computation runs on a single current-thread runtime:
//!
//! ```text
//!              ┌── inbound datagrams (reassembled) ──┐
//!              ├── console lines (stdin) ────────────┤
//! select! ─────┼── warm-up deadline ─────────────────┼──→ Agent
//!              ├── re-broadcast interval ────────────┤
//!              └── ctrl-c / SIGTERM ─────────────────┘
//! ```

use crate::agent::{Agent, AgentPhase};
use crate::config::AgentConfig;
use crate::console::{self, Reply};
use anyhow::{Context, Result};
use hs_03_sync_transport::{DatagramSocket, SyncTransport, TransportConfig, UdpDatagramSocket};
use shared_types::NetworkParams;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Bind the UDP socket, build the agent and run it until `quit`, end of
/// stdin or a termination signal.
pub async fn run_agent(config: AgentConfig, params: Arc<NetworkParams>) -> Result<()> {
    let socket = UdpDatagramSocket::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let transport = Arc::new(SyncTransport::new(
        socket,
        TransportConfig::from(params.as_ref()),
        config.peers.clone(),
    ));
    let agent = Agent::new(config, params, transport).context("Failed to initialize agent")?;
    drive(agent).await;
    Ok(())
}

/// Run the control loop of an initialized agent.
pub async fn drive<S: DatagramSocket>(mut agent: Agent<S>) {
    let console_enabled = agent.config().console;
    let warmup = agent.config().warmup;
    let rebroadcast_every = agent.config().rebroadcast_interval;

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let receiver = agent.transport().on_receive(move |message| {
        let _ = inbound_tx.send(message);
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = console_enabled;

    let warmup = tokio::time::sleep(warmup);
    tokio::pin!(warmup);
    let mut rebroadcast = tokio::time::interval(rebroadcast_every);
    rebroadcast.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    agent.start_sync().await;

    loop {
        tokio::select! {
            Some(inbound) = inbound_rx.recv() => {
                agent.handle_inbound(inbound).await;
            }
            _ = &mut warmup, if agent.phase() == AgentPhase::Syncing => {
                agent.activate().await;
            }
            _ = rebroadcast.tick(), if agent.phase() == AgentPhase::Active => {
                agent.rebroadcast().await;
            }
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    if handle_line(&mut agent, &line).await == Reply::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Console closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Console read failed, console disabled");
                    console_open = false;
                }
            },
            _ = &mut shutdown => {
                info!("Termination signal received");
                break;
            }
        }
    }

    agent.shutdown();
    receiver.abort();
    info!(status = %agent.status(), "Agent stopped");
}

async fn handle_line<S: DatagramSocket>(agent: &mut Agent<S>, line: &str) -> Reply {
    match console::parse(line) {
        Ok(None) => Reply::Text(String::new()),
        Ok(Some(command)) => {
            let reply = console::execute(agent, command).await;
            if let Reply::Text(text) = &reply {
                println!("{text}");
            }
            reply
        }
        Err(e) => {
            println!("{e}");
            Reply::Text(e.to_string())
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
