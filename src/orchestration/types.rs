//! Type definitions for runs and sub-agents.
//!
//! [`Run`] and [`SubAgent`] are plain data: cloning one yields a snapshot
//! suitable for rendering. The state transitions live in
//! [`super::run`] and [`super::sub_agent`]; cancellation tokens and task
//! handles are kept out of these types by [`super::state::WorkbenchState`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::plan::Production;
use crate::artifact::Artifact;

/// Identifier of a run, e.g. `r1`.
pub type RunId = String;

/// Identifier of a sub-agent, e.g. `r1-a`. Unique across runs.
pub type SubAgentId = String;

/// Lifecycle status shared by runs and sub-agents.
///
/// `Idle -> Running -> {Completed, Stopped}`. Both terminal states are final.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Stopped)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "Idle"),
            AgentStatus::Running => write!(f, "Running"),
            AgentStatus::Completed => write!(f, "Completed"),
            AgentStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// The deferred work a sub-agent performs once it is running.
#[derive(Clone, Debug)]
pub(crate) struct SubAgentWork {
    pub delay: Duration,
    pub production: Production,
}

/// One independently executing unit of work inside a run.
#[derive(Clone, Debug, Serialize)]
pub struct SubAgent {
    pub id: SubAgentId,
    pub name: String,
    pub status: AgentStatus,
    /// Sub-agent level approval gate, narrower than the run's.
    pub approval_pending: bool,
    /// UI-only disclosure state.
    pub expanded: bool,
    /// Pending guidance typed by the user but not yet sent.
    pub additional_input: String,
    /// Accumulated free text. Only ever appended to.
    pub response: String,
    pub generated_artifacts: Vec<Artifact>,
    /// Attempt counter; bumped whenever a running attempt starts or is
    /// superseded by a stop.
    #[serde(skip)]
    pub(crate) generation: u64,
    #[serde(skip)]
    pub(crate) work: SubAgentWork,
}

/// One supervised orchestration episode spawned by a prompt.
#[derive(Clone, Debug, Serialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub status: AgentStatus,
    pub approval_required: bool,
    pub approval_pending: bool,
    /// Fixed membership after creation.
    pub sub_agents: Vec<SubAgent>,
    /// Stable anchor the activity ledger links back to.
    pub anchor_id: String,
}

/// Instruction to spawn the deferred completion of one sub-agent attempt.
///
/// Produced by state transitions that move a sub-agent into `Running`; the
/// facade turns each one into a tokio task.
#[derive(Clone, Debug)]
pub(crate) struct Launch {
    pub run_id: RunId,
    pub sub_agent_id: SubAgentId,
    pub attempt: u64,
    pub delay: Duration,
    pub token: CancellationToken,
}
