//! # Console
//!
//! Line-oriented operator commands, one per line on stdin. Replies go to
//! stdout; logs go to stderr.

use crate::agent::{Agent, EditOutcome};
use hs_01_graph_store::LocalEdit;
use hs_03_sync_transport::DatagramSocket;
use thiserror::Error;

/// Command summary printed by `help`.
pub const HELP: &str = "\
commands:
  status                                   show replica and rejection counters
  sync                                     ask peers for their history
  node <id> <label...>                     create a node
  edge <id> <relation> <node> <node>...    create a hyperedge over existing nodes
  help                                     this text
  quit                                     stop the agent";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Sync,
    Help,
    Quit,
    Edit(LocalEdit),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "status" => Command::Status,
        "sync" => Command::Sync,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "node" => {
            let id = words.next().ok_or(ConsoleError::Usage("node <id> <label...>"))?;
            let label = words.collect::<Vec<_>>().join(" ");
            Command::Edit(LocalEdit::AddNode {
                id: id.to_string(),
                label,
            })
        }
        "edge" => {
            const USAGE: &str = "edge <id> <relation> <node> <node>...";
            let id = words.next().ok_or(ConsoleError::Usage(USAGE))?;
            let relation = words.next().ok_or(ConsoleError::Usage(USAGE))?;
            let members: Vec<String> = words.map(str::to_string).collect();
            if members.len() < 2 {
                return Err(ConsoleError::Usage(USAGE));
            }
            Command::Edit(LocalEdit::AddEdge {
                id: id.to_string(),
                relation: relation.to_string(),
                members,
            })
        }
        other => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// What the runtime should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Run `command` against `agent`.
pub async fn execute<S: DatagramSocket>(agent: &mut Agent<S>, command: Command) -> Reply {
    let text = match command {
        Command::Status => agent.status().to_string(),
        Command::Help => HELP.to_string(),
        Command::Quit => return Reply::Quit,
        Command::Sync => {
            let sent = agent.request_sync().await;
            format!("sync request sent to {sent} peers")
        }
        Command::Edit(edit) => {
            let id = edit.id().to_string();
            match agent.submit(edit).await {
                Ok(EditOutcome::Applied(proof)) => format!(
                    "{id} applied: seq={} {} address={}",
                    proof.sequence,
                    proof.invariants,
                    proof.address()
                ),
                Ok(EditOutcome::Queued { pending }) => {
                    format!("{id} queued until sync completes ({pending} pending)")
                }
                Err(reason) => format!("{id} rejected: {reason}"),
            }
        }
    };
    Reply::Text(text)
}
