//! The orchestration facade.
//!
//! [`Workbench`] is the single entry point for the UI collaborator: submit a
//! prompt, approve or reject at run or sub-agent granularity, stop work,
//! save/delete/revert artifacts and query snapshots. It wraps the shared
//! [`WorkbenchState`] in `Arc<Mutex<..>>` and is cheap to clone.
//!
//! Operations never fail loudly. Each returns whether it changed anything;
//! the reason an operation was ignored is logged at debug level.
//!
//! Operations that start sub-agents spawn tokio tasks and must be called
//! from within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::WorkbenchEvent;
use super::plan::Planner;
use super::state::WorkbenchState;
use super::types::{Launch, Run, RunId};
use crate::artifact::Artifact;
use crate::config::AppConfig;
use crate::error::OrchestrationError;
use crate::ledger::ActivityEntry;
use crate::ledger::audit::AuditLog;

/// How long shutdown waits for each outstanding sub-agent task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Workbench {
    state: Arc<Mutex<WorkbenchState>>,
    planner: Arc<dyn Planner>,
    root_cancel_token: CancellationToken,
}

/// Log why an operation was ignored and collapse it to a flag.
fn applied<T>(operation: &'static str, result: Result<T, OrchestrationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(operation, error = %e, "Operation ignored");
            None
        }
    }
}

fn lock(state: &Mutex<WorkbenchState>) -> MutexGuard<'_, WorkbenchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Body of a sub-agent attempt: wait out the planned delay unless cancelled,
/// then apply the production under the state lock.
async fn run_attempt(state: Arc<Mutex<WorkbenchState>>, launch: Launch) {
    tokio::select! {
        _ = tokio::time::sleep(launch.delay) => {}
        _ = launch.token.cancelled() => {
            tracing::debug!(
                run_id = %launch.run_id,
                sub_agent_id = %launch.sub_agent_id,
                attempt = launch.attempt,
                "Sub-agent attempt cancelled"
            );
            return;
        }
    }

    let result =
        lock(&state).complete_sub_agent(&launch.run_id, &launch.sub_agent_id, launch.attempt);
    if let Err(e) = result {
        tracing::debug!(
            run_id = %launch.run_id,
            sub_agent_id = %launch.sub_agent_id,
            error = %e,
            "Completion discarded"
        );
    }
}

/// Task handles taken out of the state for awaiting. Whatever has not
/// finished when this is dropped goes back, so a cancelled waiter loses
/// nothing.
struct PendingTasks {
    state: Arc<Mutex<WorkbenchState>>,
    handles: Vec<JoinHandle<()>>,
}

impl PendingTasks {
    fn take(state: &Arc<Mutex<WorkbenchState>>) -> Self {
        let handles = lock(state).take_handles();
        Self {
            state: state.clone(),
            handles,
        }
    }
}

impl Drop for PendingTasks {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            lock(&self.state).restore_handles(std::mem::take(&mut self.handles));
        }
    }
}

impl Workbench {
    /// Create a workbench with the given configuration and planner.
    pub fn new(config: &AppConfig, planner: Arc<dyn Planner>) -> Self {
        let root_cancel_token = CancellationToken::new();
        let state = WorkbenchState::new(config, root_cancel_token.clone());
        Self {
            state: Arc::new(Mutex::new(state)),
            planner,
            root_cancel_token,
        }
    }

    /// Send a [`WorkbenchEvent`] to `tx` after every state change.
    pub fn with_events(self, tx: UnboundedSender<WorkbenchEvent>) -> Self {
        lock(&self.state).set_event_sender(tx);
        self
    }

    /// Append every orchestration event to a JSONL audit log.
    pub fn with_audit_log(self, log: AuditLog) -> Self {
        lock(&self.state).set_audit_log(log);
        self
    }

    fn state(&self) -> MutexGuard<'_, WorkbenchState> {
        lock(&self.state)
    }

    /// Spawn one task per launch. The caller still holds the lock, so no
    /// completion can apply before the transition that caused it is visible.
    fn spawn(&self, state: &mut WorkbenchState, launches: Vec<Launch>) {
        for launch in launches {
            let handle = tokio::spawn(run_attempt(self.state.clone(), launch));
            state.push_handle(handle);
        }
    }

    // ── Runs ────────────────────────────────────────────────────────────

    /// Submit a prompt. Returns the new run's id, or `None` for a blank prompt.
    pub fn submit_prompt(&self, prompt: &str) -> Option<RunId> {
        if prompt.trim().is_empty() {
            tracing::debug!("Ignoring blank prompt");
            return None;
        }
        let plan = self.planner.plan(prompt.trim());
        let mut state = self.state();
        let (run_id, launches) = applied("submit_prompt", state.submit_prompt(prompt, plan))?;
        self.spawn(&mut state, launches);
        Some(run_id)
    }

    /// Clear the run's approval gate and start its sub-agents concurrently.
    pub fn approve_run(&self, run_id: &str) -> bool {
        let mut state = self.state();
        match applied("approve_run", state.approve_run(run_id)) {
            Some(launches) => {
                self.spawn(&mut state, launches);
                true
            }
            None => false,
        }
    }

    pub fn reject_run(&self, run_id: &str) -> bool {
        applied("reject_run", self.state().reject_run(run_id)).is_some()
    }

    pub fn stop_run(&self, run_id: &str) -> bool {
        applied("stop_run", self.state().stop_run(run_id)).is_some()
    }

    // ── Sub-agents ──────────────────────────────────────────────────────

    pub fn approve_sub_agent(&self, run_id: &str, sub_agent_id: &str) -> bool {
        let mut state = self.state();
        match applied(
            "approve_sub_agent",
            state.approve_sub_agent(run_id, sub_agent_id),
        ) {
            Some(launches) => {
                self.spawn(&mut state, launches);
                true
            }
            None => false,
        }
    }

    pub fn reject_sub_agent(&self, run_id: &str, sub_agent_id: &str) -> bool {
        applied(
            "reject_sub_agent",
            self.state().reject_sub_agent(run_id, sub_agent_id),
        )
        .is_some()
    }

    pub fn stop_sub_agent(&self, run_id: &str, sub_agent_id: &str) -> bool {
        applied(
            "stop_sub_agent",
            self.state().stop_sub_agent(run_id, sub_agent_id),
        )
        .is_some()
    }

    /// Append out-of-band guidance to a sub-agent's response.
    pub fn send_additional_input(&self, run_id: &str, sub_agent_id: &str, text: &str) -> bool {
        applied(
            "send_additional_input",
            self.state().send_additional_input(run_id, sub_agent_id, text),
        )
        .is_some()
    }

    /// Update the pending (unsent) guidance buffer of a sub-agent.
    pub fn set_additional_input(&self, run_id: &str, sub_agent_id: &str, text: &str) -> bool {
        applied(
            "set_additional_input",
            self.state().set_additional_input(run_id, sub_agent_id, text),
        )
        .is_some()
    }

    /// Flip the UI-only expanded flag. Returns the new value.
    pub fn toggle_expanded(&self, run_id: &str, sub_agent_id: &str) -> Option<bool> {
        applied(
            "toggle_expanded",
            self.state().toggle_expanded(run_id, sub_agent_id),
        )
    }

    // ── Artifacts ───────────────────────────────────────────────────────

    pub fn save_artifact(&self, artifact_id: &str) -> bool {
        applied("save_artifact", self.state().save_artifact(artifact_id)).is_some()
    }

    pub fn delete_artifact(&self, artifact_id: &str) -> bool {
        applied("delete_artifact", self.state().delete_artifact(artifact_id)).is_some()
    }

    /// Delete the unsaved artifact behind a ledger entry.
    pub fn revert_activity(&self, activity_id: &str) -> bool {
        applied("revert_activity", self.state().revert_activity(activity_id)).is_some()
    }

    pub fn open_preview(&self, artifact_id: &str) -> bool {
        applied("open_preview", self.state().open_preview(artifact_id)).is_some()
    }

    pub fn close_preview(&self) -> bool {
        applied("close_preview", self.state().close_preview()).is_some()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// The artifact currently shown in the preview pane.
    pub fn preview(&self) -> Option<Artifact> {
        self.state().preview()
    }

    /// Snapshots of every run, newest first.
    pub fn list_runs(&self) -> Vec<Run> {
        self.state().runs()
    }

    pub fn get_run(&self, run_id: &str) -> Option<Run> {
        self.state().run(run_id)
    }

    /// Ledger entries, newest first.
    pub fn list_activity(&self) -> Vec<ActivityEntry> {
        self.state().activity()
    }

    /// Every artifact in run, sub-agent, then creation order.
    pub fn list_artifacts(&self) -> Vec<Artifact> {
        self.state().artifacts()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Wait until every spawned sub-agent task has finished.
    ///
    /// Cancel-safe: dropping the returned future leaves unfinished tasks
    /// tracked, so a later call still waits for them.
    pub async fn settle(&self) {
        loop {
            let mut pending = PendingTasks::take(&self.state);
            if pending.handles.is_empty() {
                break;
            }
            for result in futures::future::join_all(pending.handles.iter_mut()).await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Sub-agent task failed");
                }
            }
            pending.handles.clear();
        }
    }

    /// Stop every live run, cancel all outstanding attempts and wait for
    /// their tasks with a per-task timeout.
    pub async fn shutdown(&self) {
        self.state().stop_all();
        let mut pending = PendingTasks::take(&self.state);
        for handle in pending.handles.iter_mut() {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await;
        }
    }

    /// Whether [`Workbench::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.root_cancel_token.is_cancelled()
    }
}
