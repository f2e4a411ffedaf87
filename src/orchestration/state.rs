//! Shared orchestration state behind the [`super::Workbench`] facade.
//!
//! [`WorkbenchState`] owns the runs, the artifact index, the activity ledger,
//! the open preview and the runtime bookkeeping (cancellation tokens and task
//! handles). Every public facade call and every deferred completion takes the
//! state lock exactly once, so each transition is applied atomically.
//!
//! **Cancellation model:** the workbench root token parents one token per
//! run, which parents one token per running sub-agent attempt. Stopping a run
//! cancels its token and so every attempt below it; the generation check in
//! [`SubAgent::check_attempt`](super::types::SubAgent) rejects anything that
//! still manages to resolve.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::WorkbenchEvent;
use super::plan::OrchestrationPlan;
use super::run::run_name;
use super::sub_agent::Started;
use super::types::{AgentStatus, Launch, Run, RunId, SubAgentId};
use crate::artifact::registry::{ArtifactLocation, ArtifactRegistry};
use crate::artifact::{Artifact, ArtifactId};
use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::ledger::audit::{AuditEntry, AuditLog, now_iso};
use crate::ledger::{ActivityEntry, ActivityLedger};

pub(crate) struct WorkbenchState {
    /// Newest first.
    runs: Vec<Run>,
    registry: ArtifactRegistry,
    ledger: ActivityLedger,
    preview: Option<ArtifactId>,
    next_run: u64,
    approval_required: bool,
    run_name_limit: usize,
    root_token: CancellationToken,
    run_tokens: HashMap<RunId, CancellationToken>,
    attempt_tokens: HashMap<SubAgentId, CancellationToken>,
    handles: Vec<JoinHandle<()>>,
    events: Option<UnboundedSender<WorkbenchEvent>>,
    audit: Option<AuditLog>,
}

impl WorkbenchState {
    pub fn new(config: &AppConfig, root_token: CancellationToken) -> Self {
        Self {
            runs: Vec::new(),
            registry: ArtifactRegistry::new(),
            ledger: ActivityLedger::new(),
            preview: None,
            next_run: 0,
            approval_required: config.approval_required,
            run_name_limit: config.run_name_limit,
            root_token,
            run_tokens: HashMap::new(),
            attempt_tokens: HashMap::new(),
            handles: Vec::new(),
            events: None,
            audit: None,
        }
    }

    pub fn set_event_sender(&mut self, tx: UnboundedSender<WorkbenchEvent>) {
        self.events = Some(tx);
    }

    pub fn set_audit_log(&mut self, log: AuditLog) {
        self.audit = Some(log);
    }

    fn emit(&self, event: WorkbenchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn audit(&mut self, entry: AuditEntry) {
        if let Some(log) = self.audit.as_mut() {
            if let Err(e) = log.record(&entry) {
                tracing::warn!(
                    error = %e,
                    path = %log.path().display(),
                    "Failed to write audit entry"
                );
            }
        }
    }

    /// Nothing may be launched once the root token is cancelled.
    fn ensure_open(&self) -> Result<(), OrchestrationError> {
        if self.root_token.is_cancelled() {
            return Err(OrchestrationError::InvalidTransition {
                id: "workbench".to_string(),
                action: "start work on",
                state: "shut down".to_string(),
            });
        }
        Ok(())
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut Run, OrchestrationError> {
        self.runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("run {run_id}")))
    }

    // ── Runs ────────────────────────────────────────────────────────────

    /// Create a run from a prompt and its plan. When approval is not
    /// required the run is launched immediately.
    pub fn submit_prompt(
        &mut self,
        prompt: &str,
        plan: OrchestrationPlan,
    ) -> Result<(RunId, Vec<Launch>), OrchestrationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(OrchestrationError::InvalidInput("prompt is blank".into()));
        }
        self.ensure_open()?;

        self.next_run += 1;
        let run_id = format!("r{}", self.next_run);
        let run = Run::new(
            run_id.clone(),
            run_name(prompt, self.run_name_limit),
            plan,
            self.approval_required,
            Utc::now(),
        );
        let sub_agents = run.sub_agents.len();

        self.run_tokens
            .insert(run_id.clone(), self.root_token.child_token());
        self.ledger.record_run_started(&run);
        self.emit(WorkbenchEvent::RunCreated {
            run_id: run_id.clone(),
            name: run.name.clone(),
        });
        self.runs.insert(0, run);
        self.audit(AuditEntry::PromptSubmitted {
            timestamp: now_iso(),
            run_id: run_id.clone(),
            prompt: prompt.to_string(),
            sub_agents,
        });
        tracing::info!(
            run_id = %run_id,
            sub_agents,
            approval_required = self.approval_required,
            "Run created"
        );

        let launches = if self.approval_required {
            Vec::new()
        } else {
            let started = self.run_mut(&run_id)?.launch()?;
            self.finish_launch(&run_id, started)
        };
        Ok((run_id, launches))
    }

    pub fn approve_run(&mut self, run_id: &str) -> Result<Vec<Launch>, OrchestrationError> {
        self.ensure_open()?;
        let started = self.run_mut(run_id)?.approve()?;
        self.audit(AuditEntry::RunApproved {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            started: started.len(),
        });
        tracing::info!(run_id, started = started.len(), "Run approved");
        Ok(self.finish_launch(run_id, started))
    }

    /// Turn freshly started attempts into launches with their own
    /// cancellation tokens, and settle the run if nothing was left to start.
    fn finish_launch(&mut self, run_id: &str, started: Vec<Started>) -> Vec<Launch> {
        let run_token = self
            .run_tokens
            .entry(run_id.to_string())
            .or_insert_with(|| self.root_token.child_token())
            .clone();

        let mut launches = Vec::with_capacity(started.len());
        for s in started {
            let token = run_token.child_token();
            self.attempt_tokens
                .insert(s.sub_agent_id.clone(), token.clone());
            self.emit(WorkbenchEvent::SubAgentStatusChanged {
                run_id: run_id.to_string(),
                sub_agent_id: s.sub_agent_id.clone(),
                status: AgentStatus::Running,
            });
            launches.push(Launch {
                run_id: run_id.to_string(),
                sub_agent_id: s.sub_agent_id,
                attempt: s.attempt,
                delay: s.delay,
                token,
            });
        }
        self.after_terminal(run_id);
        launches
    }

    pub fn reject_run(&mut self, run_id: &str) -> Result<(), OrchestrationError> {
        self.run_mut(run_id)?.reject()?;
        self.run_tokens.remove(run_id);
        self.emit(WorkbenchEvent::RunStatusChanged {
            run_id: run_id.to_string(),
            status: AgentStatus::Completed,
        });
        self.audit(AuditEntry::RunRejected {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
        });
        tracing::info!(run_id, "Run rejected");
        Ok(())
    }

    pub fn stop_run(&mut self, run_id: &str) -> Result<(), OrchestrationError> {
        let stopped = self.run_mut(run_id)?.stop()?;

        if let Some(token) = self.run_tokens.remove(run_id) {
            token.cancel();
        }
        for sub_agent_id in &stopped {
            self.attempt_tokens.remove(sub_agent_id);
            self.emit(WorkbenchEvent::SubAgentStatusChanged {
                run_id: run_id.to_string(),
                sub_agent_id: sub_agent_id.clone(),
                status: AgentStatus::Stopped,
            });
        }
        self.emit(WorkbenchEvent::RunStatusChanged {
            run_id: run_id.to_string(),
            status: AgentStatus::Stopped,
        });
        tracing::info!(run_id, stopped = stopped.len(), "Run stopped");
        self.audit(AuditEntry::RunStopped {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            stopped_sub_agents: stopped,
        });
        Ok(())
    }

    /// Re-run completion aggregation for a run after one of its sub-agents
    /// reached a terminal state.
    fn after_terminal(&mut self, run_id: &str) {
        let completed = match self.run_mut(run_id) {
            Ok(run) => run.aggregate(),
            Err(_) => false,
        };
        if completed {
            self.run_tokens.remove(run_id);
            self.emit(WorkbenchEvent::RunStatusChanged {
                run_id: run_id.to_string(),
                status: AgentStatus::Completed,
            });
            self.audit(AuditEntry::RunCompleted {
                timestamp: now_iso(),
                run_id: run_id.to_string(),
            });
            tracing::info!(run_id, "Run completed");
        }
    }

    // ── Sub-agents ──────────────────────────────────────────────────────

    /// Sub-agent gates only open once the run's own gate is cleared and
    /// while the run is still live.
    fn run_for_sub_agent_gate(&mut self, run_id: &str) -> Result<&mut Run, OrchestrationError> {
        let run = self.run_mut(run_id)?;
        if run.approval_pending {
            return Err(OrchestrationError::InvalidTransition {
                id: run_id.to_string(),
                action: "decide a sub-agent of",
                state: "awaiting run approval".to_string(),
            });
        }
        if run.is_terminal() {
            return Err(OrchestrationError::InvalidTransition {
                id: run_id.to_string(),
                action: "decide a sub-agent of",
                state: run.status.to_string(),
            });
        }
        Ok(run)
    }

    pub fn approve_sub_agent(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
    ) -> Result<Vec<Launch>, OrchestrationError> {
        self.ensure_open()?;
        let started = self
            .run_for_sub_agent_gate(run_id)?
            .sub_agent_mut(sub_agent_id)?
            .approve()?;
        self.audit(AuditEntry::SubAgentApproved {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
        });
        tracing::info!(run_id, sub_agent_id, "Sub-agent approved");
        Ok(self.finish_launch(run_id, vec![started]))
    }

    pub fn reject_sub_agent(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
    ) -> Result<(), OrchestrationError> {
        self.run_for_sub_agent_gate(run_id)?
            .sub_agent_mut(sub_agent_id)?
            .reject()?;
        self.emit(WorkbenchEvent::SubAgentStatusChanged {
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
            status: AgentStatus::Completed,
        });
        self.audit(AuditEntry::SubAgentRejected {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
        });
        tracing::info!(run_id, sub_agent_id, "Sub-agent rejected");
        self.after_terminal(run_id);
        Ok(())
    }

    pub fn stop_sub_agent(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
    ) -> Result<(), OrchestrationError> {
        self.run_mut(run_id)?.sub_agent_mut(sub_agent_id)?.stop()?;
        if let Some(token) = self.attempt_tokens.remove(sub_agent_id) {
            token.cancel();
        }
        self.emit(WorkbenchEvent::SubAgentStatusChanged {
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
            status: AgentStatus::Stopped,
        });
        self.audit(AuditEntry::SubAgentStopped {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
        });
        tracing::info!(run_id, sub_agent_id, "Sub-agent stopped");
        self.after_terminal(run_id);
        Ok(())
    }

    /// Apply the production of a sub-agent attempt. Fails with
    /// `StaleCompletion` if the attempt was superseded by a stop.
    pub fn complete_sub_agent(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
        attempt: u64,
    ) -> Result<(), OrchestrationError> {
        let run = self
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("run {run_id}")))?;
        let anchor_id = run.anchor_id.clone();
        let sub_agent = run.sub_agent_mut(sub_agent_id)?;
        sub_agent.check_attempt(attempt)?;

        let artifact = sub_agent
            .work
            .production
            .artifact
            .clone()
            .map(|draft| Artifact::from_draft(self.registry.next_id(draft.kind()), draft));
        if let Some(artifact) = &artifact {
            self.registry.register(
                artifact.id.clone(),
                ArtifactLocation {
                    run_id: run_id.to_string(),
                    sub_agent_id: sub_agent_id.to_string(),
                },
            )?;
        }
        sub_agent.complete(attempt, artifact.clone())?;
        if let Some(artifact) = &artifact {
            self.ledger.record_artifact(&anchor_id, sub_agent, artifact);
        }

        self.attempt_tokens.remove(sub_agent_id);
        self.emit(WorkbenchEvent::SubAgentStatusChanged {
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
            status: AgentStatus::Completed,
        });
        if let Some(artifact) = &artifact {
            self.emit(WorkbenchEvent::ArtifactGenerated {
                artifact_id: artifact.id.clone(),
                kind: artifact.kind(),
                name: artifact.name.clone(),
            });
        }
        let artifact_id = artifact.map(|a| a.id);
        tracing::info!(run_id, sub_agent_id, artifact_id = ?artifact_id, "Sub-agent completed");
        self.audit(AuditEntry::SubAgentCompleted {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
            artifact_id,
        });
        self.after_terminal(run_id);
        Ok(())
    }

    pub fn send_additional_input(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
        text: &str,
    ) -> Result<(), OrchestrationError> {
        self.run_mut(run_id)?
            .sub_agent_mut(sub_agent_id)?
            .send_additional_input(text)?;
        self.emit(WorkbenchEvent::SubAgentResponseUpdated {
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
        });
        self.audit(AuditEntry::AdditionalInput {
            timestamp: now_iso(),
            run_id: run_id.to_string(),
            sub_agent_id: sub_agent_id.to_string(),
            text: text.trim().to_string(),
        });
        Ok(())
    }

    pub fn set_additional_input(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
        text: &str,
    ) -> Result<(), OrchestrationError> {
        self.run_mut(run_id)?.sub_agent_mut(sub_agent_id)?.additional_input = text.to_string();
        Ok(())
    }

    pub fn toggle_expanded(
        &mut self,
        run_id: &str,
        sub_agent_id: &str,
    ) -> Result<bool, OrchestrationError> {
        let sub_agent = self.run_mut(run_id)?.sub_agent_mut(sub_agent_id)?;
        sub_agent.expanded = !sub_agent.expanded;
        Ok(sub_agent.expanded)
    }

    // ── Artifacts ───────────────────────────────────────────────────────

    pub fn save_artifact(&mut self, artifact_id: &str) -> Result<(), OrchestrationError> {
        self.registry
            .save(artifact_id, &mut self.runs, &mut self.ledger)?;
        self.emit(WorkbenchEvent::ArtifactSaved {
            artifact_id: artifact_id.to_string(),
        });
        self.audit(AuditEntry::ArtifactSaved {
            timestamp: now_iso(),
            artifact_id: artifact_id.to_string(),
        });
        tracing::info!(artifact_id, "Artifact saved");
        Ok(())
    }

    pub fn delete_artifact(&mut self, artifact_id: &str) -> Result<(), OrchestrationError> {
        self.registry
            .delete(artifact_id, &mut self.runs, &mut self.ledger)?;
        self.after_removal(artifact_id);
        self.audit(AuditEntry::ArtifactDeleted {
            timestamp: now_iso(),
            artifact_id: artifact_id.to_string(),
        });
        tracing::info!(artifact_id, "Artifact deleted");
        Ok(())
    }

    pub fn revert_activity(&mut self, activity_id: &str) -> Result<ArtifactId, OrchestrationError> {
        let artifact_id = self
            .registry
            .revert(activity_id, &mut self.runs, &mut self.ledger)?;
        self.after_removal(&artifact_id);
        self.audit(AuditEntry::ActivityReverted {
            timestamp: now_iso(),
            activity_id: activity_id.to_string(),
            artifact_id: artifact_id.clone(),
        });
        tracing::info!(activity_id, artifact_id = %artifact_id, "Activity reverted");
        Ok(artifact_id)
    }

    fn after_removal(&mut self, artifact_id: &str) {
        if self.preview.as_deref() == Some(artifact_id) {
            self.preview = None;
            self.emit(WorkbenchEvent::PreviewChanged { artifact_id: None });
        }
        self.emit(WorkbenchEvent::ArtifactRemoved {
            artifact_id: artifact_id.to_string(),
        });
    }

    fn artifact(&self, artifact_id: &str) -> Option<&Artifact> {
        let location = self.registry.locate(artifact_id)?;
        self.runs
            .iter()
            .find(|r| r.id == location.run_id)?
            .sub_agent(&location.sub_agent_id)?
            .generated_artifacts
            .iter()
            .find(|a| a.id == artifact_id)
    }

    pub fn open_preview(&mut self, artifact_id: &str) -> Result<(), OrchestrationError> {
        if self.artifact(artifact_id).is_none() {
            return Err(OrchestrationError::NotFound(format!("artifact {artifact_id}")));
        }
        self.preview = Some(artifact_id.to_string());
        self.emit(WorkbenchEvent::PreviewChanged {
            artifact_id: Some(artifact_id.to_string()),
        });
        Ok(())
    }

    pub fn close_preview(&mut self) -> Result<(), OrchestrationError> {
        if self.preview.take().is_none() {
            return Err(OrchestrationError::NotFound("open preview".into()));
        }
        self.emit(WorkbenchEvent::PreviewChanged { artifact_id: None });
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn preview(&self) -> Option<Artifact> {
        self.preview
            .as_deref()
            .and_then(|id| self.artifact(id))
            .cloned()
    }

    pub fn runs(&self) -> Vec<Run> {
        self.runs.clone()
    }

    pub fn run(&self, run_id: &str) -> Option<Run> {
        self.runs.iter().find(|r| r.id == run_id).cloned()
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.ledger.entries().cloned().collect()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        ArtifactRegistry::list_all(&self.runs)
    }

    // ── Runtime bookkeeping ─────────────────────────────────────────────

    pub fn push_handle(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    pub fn take_handles(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.handles)
    }

    /// Put back handles a waiter stopped awaiting. Finished ones are dropped.
    pub fn restore_handles(&mut self, handles: Vec<JoinHandle<()>>) {
        self.handles
            .extend(handles.into_iter().filter(|h| !h.is_finished()));
    }

    /// Stop every live run and cancel the root token.
    pub fn stop_all(&mut self) {
        let live: Vec<RunId> = self
            .runs
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| r.id.clone())
            .collect();
        for run_id in live {
            if let Err(e) = self.stop_run(&run_id) {
                tracing::debug!(run_id = %run_id, error = %e, "Run not stopped during shutdown");
            }
        }
        self.root_token.cancel();
    }
}
