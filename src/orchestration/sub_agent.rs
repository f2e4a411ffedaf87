//! Sub-agent state machine.
//!
//! `Idle -> Running -> {Completed, Stopped}`. Each entry into `Running`
//! starts a new attempt with a fresh generation number; a completion is only
//! applied when it carries the current generation and the sub-agent is still
//! running. Stopping bumps the generation so an in-flight attempt can never
//! land afterwards.

use std::time::Duration;

use super::plan::SubAgentPlan;
use super::types::{AgentStatus, SubAgent, SubAgentId, SubAgentWork};
use crate::artifact::Artifact;
use crate::error::OrchestrationError;

/// Prefix of every additional-input record appended to a response.
pub const ADDITIONAL_INPUT_MARKER: &str = "[User additional input]: ";

/// A sub-agent attempt that has just entered `Running`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Started {
    pub sub_agent_id: SubAgentId,
    pub attempt: u64,
    pub delay: Duration,
}

impl SubAgent {
    pub(crate) fn from_plan(id: SubAgentId, plan: SubAgentPlan) -> Self {
        Self {
            id,
            name: plan.name,
            status: AgentStatus::Idle,
            approval_pending: plan.needs_approval,
            expanded: false,
            additional_input: String::new(),
            response: String::new(),
            generated_artifacts: Vec::new(),
            generation: 0,
            work: SubAgentWork {
                delay: plan.delay,
                production: plan.production,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn invalid(&self, action: &'static str) -> OrchestrationError {
        OrchestrationError::InvalidTransition {
            id: self.id.clone(),
            action,
            state: self.status.to_string(),
        }
    }

    /// Move an idle sub-agent into `Running` and open a new attempt.
    pub(crate) fn start(&mut self) -> Result<Started, OrchestrationError> {
        if self.status != AgentStatus::Idle {
            return Err(self.invalid("start"));
        }
        self.status = AgentStatus::Running;
        self.generation += 1;
        Ok(Started {
            sub_agent_id: self.id.clone(),
            attempt: self.generation,
            delay: self.work.delay,
        })
    }

    /// Clear the sub-agent gate and start this sub-agent alone.
    pub(crate) fn approve(&mut self) -> Result<Started, OrchestrationError> {
        if !self.approval_pending {
            return Err(OrchestrationError::NotFound(format!(
                "pending approval for sub-agent {}",
                self.id
            )));
        }
        if self.status != AgentStatus::Idle {
            return Err(self.invalid("approve"));
        }
        self.approval_pending = false;
        self.start()
    }

    /// Clear the sub-agent gate and finish without producing anything.
    pub(crate) fn reject(&mut self) -> Result<(), OrchestrationError> {
        if !self.approval_pending {
            return Err(OrchestrationError::NotFound(format!(
                "pending approval for sub-agent {}",
                self.id
            )));
        }
        if self.is_terminal() {
            return Err(self.invalid("reject"));
        }
        self.approval_pending = false;
        self.status = AgentStatus::Completed;
        Ok(())
    }

    /// Stop a running sub-agent, superseding its in-flight attempt.
    pub(crate) fn stop(&mut self) -> Result<(), OrchestrationError> {
        if self.status != AgentStatus::Running {
            return Err(self.invalid("stop"));
        }
        self.force_stop();
        Ok(())
    }

    /// Force any non-completed sub-agent into `Stopped`. Used when the owning
    /// run is stopped. Returns whether the status changed.
    pub(crate) fn force_stop(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = AgentStatus::Stopped;
        self.approval_pending = false;
        self.generation += 1;
        true
    }

    /// Reject a completion that does not belong to the current attempt.
    pub(crate) fn check_attempt(&self, attempt: u64) -> Result<(), OrchestrationError> {
        if attempt != self.generation || self.status != AgentStatus::Running {
            return Err(OrchestrationError::StaleCompletion {
                sub_agent_id: self.id.clone(),
                attempt,
                current: self.generation,
            });
        }
        Ok(())
    }

    /// Apply the production of the current attempt and move to `Completed`.
    pub(crate) fn complete(
        &mut self,
        attempt: u64,
        artifact: Option<Artifact>,
    ) -> Result<(), OrchestrationError> {
        self.check_attempt(attempt)?;
        let response = &self.work.production.response;
        if !response.is_empty() {
            if !self.response.is_empty() {
                self.response.push_str("\n\n");
            }
            self.response.push_str(response);
        }
        self.generated_artifacts.extend(artifact);
        self.status = AgentStatus::Completed;
        Ok(())
    }

    /// Append a user guidance record to the response and clear the pending
    /// input buffer. Allowed in every status.
    pub(crate) fn send_additional_input(&mut self, text: &str) -> Result<(), OrchestrationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OrchestrationError::InvalidInput(
                "additional input is blank".to_string(),
            ));
        }
        self.response.push_str("\n\n");
        self.response.push_str(ADDITIONAL_INPUT_MARKER);
        self.response.push_str(text);
        self.additional_input.clear();
        Ok(())
    }
}
