//! Run state machine and completion aggregation.

use chrono::{DateTime, Utc};

use super::plan::OrchestrationPlan;
use super::sub_agent::Started;
use super::types::{AgentStatus, Run, RunId, SubAgent};
use crate::error::OrchestrationError;

/// Text prepended to every prompt-initiated run name.
pub const RUN_NAME_PREFIX: &str = "Agent Orchestration for: ";

/// Build a run name from a prompt, truncating to `limit` characters.
pub fn run_name(prompt: &str, limit: usize) -> String {
    let prompt = prompt.trim();
    if prompt.chars().count() > limit {
        let head: String = prompt.chars().take(limit).collect();
        format!("{RUN_NAME_PREFIX}{head}…")
    } else {
        format!("{RUN_NAME_PREFIX}{prompt}")
    }
}

/// Sub-agent ids are `<run>-a`, `<run>-b`, ... and fall back to numbers past `z`.
fn sub_agent_id(run_id: &str, index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => format!("{run_id}-{}", char::from(b'a' + i)),
        _ => format!("{run_id}-{index}"),
    }
}

impl Run {
    pub(crate) fn new(
        id: RunId,
        name: String,
        plan: OrchestrationPlan,
        approval_required: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let sub_agents = plan
            .sub_agents
            .into_iter()
            .enumerate()
            .map(|(i, sa_plan)| SubAgent::from_plan(sub_agent_id(&id, i), sa_plan))
            .collect();
        let anchor_id = format!("anchor-{id}");

        Self {
            id,
            name,
            started_at,
            status: AgentStatus::Running,
            approval_required,
            approval_pending: approval_required,
            sub_agents,
            anchor_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn sub_agent(&self, id: &str) -> Option<&SubAgent> {
        self.sub_agents.iter().find(|sa| sa.id == id)
    }

    pub(crate) fn sub_agent_mut(&mut self, id: &str) -> Result<&mut SubAgent, OrchestrationError> {
        self.sub_agents
            .iter_mut()
            .find(|sa| sa.id == id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("sub-agent {id}")))
    }

    fn invalid(&self, action: &'static str) -> OrchestrationError {
        OrchestrationError::InvalidTransition {
            id: self.id.clone(),
            action,
            state: self.status.to_string(),
        }
    }

    fn require_pending(&self) -> Result<(), OrchestrationError> {
        if self.approval_pending {
            Ok(())
        } else {
            Err(OrchestrationError::NotFound(format!(
                "pending approval for run {}",
                self.id
            )))
        }
    }

    /// Clear the run gate and start every idle sub-agent that is not waiting
    /// on its own gate. Returns the attempts that were started; the caller
    /// runs [`Run::aggregate`] afterwards in case nothing was left to start.
    pub(crate) fn approve(&mut self) -> Result<Vec<Started>, OrchestrationError> {
        self.require_pending()?;
        self.approval_pending = false;
        self.launch()
    }

    /// Start every eligible sub-agent of a run that needs no run approval.
    pub(crate) fn launch(&mut self) -> Result<Vec<Started>, OrchestrationError> {
        if self.approval_pending || self.is_terminal() {
            return Err(self.invalid("launch"));
        }
        let mut started = Vec::new();
        for sa in &mut self.sub_agents {
            if sa.status == AgentStatus::Idle && !sa.approval_pending {
                started.push(sa.start()?);
            }
        }
        Ok(started)
    }

    /// Clear the run gate and complete the run without starting anything.
    pub(crate) fn reject(&mut self) -> Result<(), OrchestrationError> {
        self.require_pending()?;
        self.approval_pending = false;
        for sa in &mut self.sub_agents {
            sa.approval_pending = false;
        }
        self.status = AgentStatus::Completed;
        Ok(())
    }

    /// Stop the run. Completed sub-agents are left untouched, every other one
    /// is forced into `Stopped`. Returns the ids of the sub-agents that changed.
    pub(crate) fn stop(&mut self) -> Result<Vec<String>, OrchestrationError> {
        if self.is_terminal() {
            return Err(self.invalid("stop"));
        }
        self.status = AgentStatus::Stopped;
        self.approval_pending = false;
        Ok(self
            .sub_agents
            .iter_mut()
            .filter_map(|sa| sa.force_stop().then(|| sa.id.clone()))
            .collect())
    }

    /// Re-evaluate the run after a sub-agent reached a terminal state.
    /// Returns `true` if the run just became `Completed`.
    pub(crate) fn aggregate(&mut self) -> bool {
        if self.is_terminal() || self.approval_pending {
            return false;
        }
        if self.sub_agents.iter().all(SubAgent::is_terminal) {
            self.status = AgentStatus::Completed;
            return true;
        }
        false
    }
}
