//! # Process Supervisor
//!
//! Starts one agent process per configured slot, relays operator lines and
//! restarts agents that exit abnormally, within a per-agent budget.
//!
//! ## Console Routing
//!
//! | Line | Goes to |
//! |------|---------|
//! | `@i <command>` | agent `i` |
//! | `quit` | every agent, then the supervisor exits |
//! | anything else | agent 0 |

use crate::config::SupervisorConfig;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, error, info, warn};

/// Environment variables the supervisor sets per child.
const CHILD_ENV: [&str; 5] = [
    "HS_AGENT_INDEX",
    "HS_BIND",
    "HS_PEERS",
    "HS_CONSOLE",
    "HS_IDENTITY_SEED",
];

/// Where an operator line goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Every agent gets the line.
    All(String),
    /// One agent gets the line.
    One(usize, String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no agent {index}, valid range is 0..{agents}")]
    NoSuchAgent { index: usize, agents: usize },

    #[error("expected `@<index> <command>`")]
    BadPrefix,
}

/// Decide where `line` goes.
pub fn route(line: &str, agents: usize) -> Result<Option<Route>, RouteError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "quit" {
        return Ok(Some(Route::All(line.to_string())));
    }
    let Some(rest) = line.strip_prefix('@') else {
        return Ok(Some(Route::One(0, line.to_string())));
    };

    let (index, command) = rest.split_once(char::is_whitespace).ok_or(RouteError::BadPrefix)?;
    let index: usize = index.parse().map_err(|_| RouteError::BadPrefix)?;
    if index >= agents {
        return Err(RouteError::NoSuchAgent { index, agents });
    }
    let command = command.trim();
    if command.is_empty() {
        return Err(RouteError::BadPrefix);
    }
    Ok(Some(Route::One(index, command.to_string())))
}

struct AgentSlot {
    index: usize,
    addr: SocketAddr,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    restarts: u32,
}

/// Owner of every agent process.
pub struct Supervisor {
    config: SupervisorConfig,
    program: PathBuf,
    slots: Vec<AgentSlot>,
}

impl Supervisor {
    /// Supervisor that re-executes the current binary as agents.
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        let program = std::env::current_exe().context("Cannot locate own executable")?;
        Ok(Self::with_program(config, program))
    }

    /// Supervisor that runs `program` as agents.
    pub fn with_program(config: SupervisorConfig, program: PathBuf) -> Self {
        let slots = config
            .agent_addrs()
            .into_iter()
            .enumerate()
            .map(|(index, addr)| AgentSlot {
                index,
                addr,
                child: None,
                stdin: None,
                restarts: 0,
            })
            .collect();
        Self {
            config,
            program,
            slots,
        }
    }

    /// Start every agent, relay stdin and supervise until `quit` or a
    /// termination signal.
    pub async fn run(mut self) -> Result<()> {
        info!(
            agents = self.config.agents,
            base_port = self.config.base_port,
            "Starting agents"
        );
        for index in 0..self.slots.len() {
            self.spawn(index)
                .with_context(|| format!("Failed to start agent {index}"))?;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut console_open = true;
        let mut check = tokio::time::interval(Duration::from_millis(250));

        loop {
            tokio::select! {
                line = lines.next_line(), if console_open => match line {
                    Ok(Some(line)) => {
                        if self.relay(&line).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Operator console closed");
                        console_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "Operator console read failed");
                        console_open = false;
                    }
                },
                _ = check.tick() => {
                    self.reap().await;
                    if self.slots.iter().all(|slot| slot.child.is_none()) {
                        info!("No agents left running");
                        return Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, stopping agents");
                    break;
                }
            }
        }

        self.stop_all().await;
        Ok(())
    }

    /// Relay one operator line. Returns true when the supervisor should stop.
    async fn relay(&mut self, line: &str) -> bool {
        match route(line, self.slots.len()) {
            Ok(None) => false,
            Ok(Some(Route::All(_))) => true,
            Ok(Some(Route::One(index, command))) => {
                self.send_line(index, &command).await;
                false
            }
            Err(e) => {
                println!("{e}");
                false
            }
        }
    }

    async fn send_line(&mut self, index: usize, line: &str) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(stdin) = slot.stdin.as_mut() else {
            println!("agent {index} is not running");
            return;
        };
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        if let Err(e) = stdin.write_all(&bytes).await {
            warn!(index, error = %e, "Relay to agent failed");
        } else if let Err(e) = stdin.flush().await {
            warn!(index, error = %e, "Relay flush failed");
        }
    }

    fn spawn(&mut self, index: usize) -> Result<()> {
        let peers: Vec<String> = self
            .slots
            .iter()
            .filter(|slot| slot.index != index)
            .map(|slot| slot.addr.to_string())
            .collect();
        let seed = self.config.agent_seed(index);
        let slot = &mut self.slots[index];

        let mut command = Command::new(&self.program);
        for var in CHILD_ENV {
            command.env_remove(var);
        }
        command
            .env("HS_AGENT_INDEX", index.to_string())
            .env("HS_BIND", slot.addr.to_string())
            .env("HS_PEERS", peers.join(","))
            .env("HS_CONSOLE", "true")
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(seed) = seed {
            command.env("HS_IDENTITY_SEED", hex::encode(seed));
        }

        let mut child = command.spawn()?;
        slot.stdin = child.stdin.take();
        info!(index, addr = %slot.addr, pid = ?child.id(), "Agent started");
        slot.child = Some(child);
        Ok(())
    }

    /// Collect exited agents; restart abnormal exits within the budget.
    async fn reap(&mut self) {
        let mut restart = Vec::new();
        for slot in &mut self.slots {
            let Some(child) = slot.child.as_mut() else {
                continue;
            };
            let status = match child.try_wait() {
                Ok(Some(status)) => status,
                Ok(None) => continue,
                Err(e) => {
                    warn!(index = slot.index, error = %e, "Cannot poll agent");
                    continue;
                }
            };
            slot.child = None;
            slot.stdin = None;

            if status.success() {
                info!(index = slot.index, "Agent exited");
            } else if slot.restarts < self.config.max_restarts {
                slot.restarts += 1;
                warn!(
                    index = slot.index,
                    status = %describe(status),
                    restart = slot.restarts,
                    budget = self.config.max_restarts,
                    "Agent crashed, restarting"
                );
                restart.push(slot.index);
            } else {
                error!(
                    index = slot.index,
                    status = %describe(status),
                    "Agent crashed, restart budget exhausted"
                );
            }
        }

        if restart.is_empty() {
            return;
        }
        tokio::time::sleep(self.config.restart_delay).await;
        for index in restart {
            if let Err(e) = self.spawn(index) {
                error!(index, error = %e, "Agent restart failed");
            }
        }
    }

    /// Ask every agent to quit, then wait out the grace period.
    async fn stop_all(&mut self) {
        for index in 0..self.slots.len() {
            self.send_line(index, "quit").await;
            self.slots[index].stdin = None;
        }

        let grace = self.config.shutdown_grace;
        for slot in &mut self.slots {
            let Some(mut child) = slot.child.take() else {
                continue;
            };
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => debug!(index = slot.index, status = %describe(status), "Agent stopped"),
                Ok(Err(e)) => warn!(index = slot.index, error = %e, "Waiting for agent failed"),
                Err(_) => {
                    warn!(index = slot.index, "Agent ignored quit, killing");
                    if let Err(e) = child.kill().await {
                        error!(index = slot.index, error = %e, "Kill failed");
                    }
                }
            }
        }
        info!("All agents stopped");
    }
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
