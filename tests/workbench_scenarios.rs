use std::sync::Arc;
use std::time::Duration;

use workbench::artifact::{ArtifactDraft, ArtifactKind, Preview};
use workbench::config::AppConfig;
use workbench::orchestration::{
    AgentStatus, FixedPlanner, OrchestrationPlan, Planner, Production, SubAgentPlan, Workbench,
    WorkbenchEvent,
};

// ─── Helpers ──────────────────────────────────────────────────────────

fn workbench_with_delays(delays_ms: &[u64]) -> Workbench {
    let config = AppConfig::default();
    Workbench::new(&config, Arc::new(FixedPlanner::from_millis(delays_ms)))
}

/// Poll until `condition` holds, failing the test after two seconds.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Planner with one gated sub-agent and one producing no artifact.
struct GatedPlanner;

impl Planner for GatedPlanner {
    fn plan(&self, _prompt: &str) -> OrchestrationPlan {
        OrchestrationPlan {
            sub_agents: vec![
                SubAgentPlan {
                    name: "Analyst".into(),
                    needs_approval: false,
                    delay: Duration::from_millis(1),
                    production: Production {
                        response: "Looked at the data.".into(),
                        artifact: None,
                    },
                },
                SubAgentPlan {
                    name: "Rule Drafting".into(),
                    needs_approval: true,
                    delay: Duration::from_millis(1),
                    production: Production {
                        response: "Drafted a rule.".into(),
                        artifact: Some(ArtifactDraft {
                            name: "BigTicket".into(),
                            description: "Review if amount > 5000".into(),
                            preview: Preview::Rule {
                                condition: "amount > 5000".into(),
                                actions: "Review".into(),
                            },
                        }),
                    },
                },
            ],
        }
    }
}

// ============================================================
// Scenarios
// ============================================================

#[tokio::test]
async fn test_fraud_feature_prompt_runs_to_completion() {
    let wb = workbench_with_delays(&[1, 2, 3]);

    let run_id = wb.submit_prompt("derive a fraud feature").unwrap();
    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.name, "Agent Orchestration for: derive a fraud feature");
    assert!(run.approval_pending);
    assert_eq!(run.sub_agents.len(), 3);
    assert!(run.sub_agents.iter().all(|sa| sa.status == AgentStatus::Idle));

    assert!(wb.approve_run(&run_id));
    let run = wb.get_run(&run_id).unwrap();
    assert!(!run.approval_pending);
    assert!(run.sub_agents.iter().all(|sa| sa.status == AgentStatus::Running));

    wb.settle().await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Completed);
    let mut kinds = Vec::new();
    for sa in &run.sub_agents {
        assert_eq!(sa.status, AgentStatus::Completed);
        assert_eq!(sa.generated_artifacts.len(), 1);
        kinds.push(sa.generated_artifacts[0].kind());
    }
    assert_eq!(
        kinds,
        [ArtifactKind::Feature, ArtifactKind::Rule, ArtifactKind::Dataset]
    );

    let ids: Vec<_> = wb.list_artifacts().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, ["feat-1", "rule-1", "ds-1"]);
}

#[tokio::test]
async fn test_stop_before_completion_discards_late_productions() {
    let wb = workbench_with_delays(&[200]);
    let run_id = wb.submit_prompt("derive a fraud feature").unwrap();
    assert!(wb.approve_run(&run_id));
    assert!(wb.stop_run(&run_id));

    wb.settle().await;
    // Give anything that slipped past cancellation a chance to land.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Stopped);
    assert!(run.sub_agents.iter().all(|sa| sa.status == AgentStatus::Stopped));
    assert!(run.sub_agents.iter().all(|sa| sa.response.is_empty()));
    assert!(wb.list_artifacts().is_empty());
}

#[tokio::test]
async fn test_revert_removes_unsaved_feature() {
    let wb = workbench_with_delays(&[1]);
    let run_id = wb.submit_prompt("derive a fraud feature").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;

    let entry = wb
        .list_activity()
        .into_iter()
        .find(|e| e.linked_artifact_id.as_deref() == Some("feat-1"))
        .unwrap();
    assert!(wb.revert_activity(&entry.id));

    let run = wb.get_run(&run_id).unwrap();
    assert!(run.sub_agents[0].generated_artifacts.is_empty());
    assert!(wb.list_activity().iter().all(|e| e.id != entry.id));
    assert!(wb.list_artifacts().iter().all(|a| a.id != "feat-1"));
}

// ============================================================
// Properties
// ============================================================

#[tokio::test]
async fn test_run_reaches_terminal_state_after_approval() {
    let wb = workbench_with_delays(&[3, 1, 2]);
    let run_id = wb.submit_prompt("anything").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;
    assert!(wb.get_run(&run_id).unwrap().status.is_terminal());
}

#[tokio::test]
async fn test_stop_leaves_completed_sub_agents_untouched() {
    let wb = workbench_with_delays(&[1, 5_000, 5_000]);
    let run_id = wb.submit_prompt("mixed").unwrap();
    wb.approve_run(&run_id);

    wait_until(|| {
        wb.get_run(&run_id)
            .is_some_and(|r| r.sub_agents[0].status == AgentStatus::Completed)
    })
    .await;
    assert!(wb.stop_run(&run_id));
    wb.settle().await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Stopped);
    let statuses: Vec<_> = run.sub_agents.iter().map(|sa| sa.status).collect();
    assert_eq!(
        statuses,
        [AgentStatus::Completed, AgentStatus::Stopped, AgentStatus::Stopped]
    );
    assert_eq!(run.sub_agents[0].generated_artifacts.len(), 1);
    assert_eq!(wb.list_artifacts().len(), 1);
}

#[tokio::test]
async fn test_save_then_delete_equals_delete() {
    let wb = workbench_with_delays(&[1]);
    let run_id = wb.submit_prompt("p").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;

    assert!(wb.save_artifact("rule-1"));
    assert!(wb.delete_artifact("rule-1"));
    assert!(wb.list_artifacts().iter().all(|a| a.id != "rule-1"));
    assert!(
        wb.list_activity()
            .iter()
            .all(|e| e.linked_artifact_id.as_deref() != Some("rule-1"))
    );
    // Second delete is a no-op.
    assert!(!wb.delete_artifact("rule-1"));
}

#[tokio::test]
async fn test_revert_of_saved_artifact_is_noop() {
    let wb = workbench_with_delays(&[1]);
    let run_id = wb.submit_prompt("p").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;

    assert!(wb.save_artifact("ds-1"));
    let entry = wb
        .list_activity()
        .into_iter()
        .find(|e| e.linked_artifact_id.as_deref() == Some("ds-1"))
        .unwrap();
    assert!(entry.is_saved);

    let before = wb.list_activity();
    assert!(!wb.revert_activity(&entry.id));
    assert_eq!(wb.list_activity(), before);
    let ds = wb.list_artifacts().into_iter().find(|a| a.id == "ds-1").unwrap();
    assert!(ds.is_saved());
    assert_eq!(ds.edit_reference(), Some("/datasets/declined_txn_sample/edit"));
}

#[tokio::test]
async fn test_list_artifacts_tracks_registered_minus_deleted() {
    let wb = workbench_with_delays(&[1]);
    let first = wb.submit_prompt("one").unwrap();
    wb.approve_run(&first);
    wb.settle().await;
    let second = wb.submit_prompt("two").unwrap();
    wb.approve_run(&second);
    wb.settle().await;

    let ids = |wb: &Workbench| -> Vec<String> {
        wb.list_artifacts().into_iter().map(|a| a.id).collect()
    };
    // Newest run first, then plan order.
    assert_eq!(
        ids(&wb),
        ["feat-2", "rule-2", "ds-2", "feat-1", "rule-1", "ds-1"]
    );

    wb.delete_artifact("rule-2");
    wb.delete_artifact("feat-1");
    assert_eq!(ids(&wb), ["feat-2", "ds-2", "rule-1", "ds-1"]);
    assert_eq!(ids(&wb), ids(&wb));
}

// ============================================================
// Gates, inputs, and no-ops
// ============================================================

#[tokio::test]
async fn test_sub_agent_gate_holds_run_open() {
    let wb = Workbench::new(&AppConfig::default(), Arc::new(GatedPlanner));
    let run_id = wb.submit_prompt("investigate").unwrap();

    // Sub-agent gate is closed until the run gate clears.
    assert!(!wb.approve_sub_agent(&run_id, "r1-b"));
    wb.approve_run(&run_id);
    wb.settle().await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Running);
    assert_eq!(run.sub_agents[0].status, AgentStatus::Completed);
    assert!(run.sub_agents[0].generated_artifacts.is_empty());
    assert_eq!(run.sub_agents[1].status, AgentStatus::Idle);
    assert!(run.sub_agents[1].approval_pending);

    assert!(wb.approve_sub_agent(&run_id, "r1-b"));
    wb.settle().await;
    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Completed);
    assert_eq!(wb.list_artifacts()[0].id, "rule-1");
}

#[tokio::test]
async fn test_rejecting_gated_sub_agent_completes_run() {
    let wb = Workbench::new(&AppConfig::default(), Arc::new(GatedPlanner));
    let run_id = wb.submit_prompt("investigate").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;

    assert!(wb.reject_sub_agent(&run_id, "r1-b"));
    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.sub_agents[1].status, AgentStatus::Completed);
    assert!(run.sub_agents[1].generated_artifacts.is_empty());
    assert_eq!(run.status, AgentStatus::Completed);
    assert!(wb.list_artifacts().is_empty());
}

#[tokio::test]
async fn test_reject_run_never_starts_sub_agents() {
    let wb = workbench_with_delays(&[1]);
    let run_id = wb.submit_prompt("p").unwrap();
    assert!(wb.reject_run(&run_id));
    wb.settle().await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Completed);
    assert!(run.sub_agents.iter().all(|sa| sa.status == AgentStatus::Idle));
    assert!(!wb.approve_run(&run_id));
    assert!(wb.list_artifacts().is_empty());
}

#[tokio::test]
async fn test_blank_inputs_are_ignored() {
    let wb = workbench_with_delays(&[1]);
    assert!(wb.submit_prompt("   ").is_none());
    assert!(wb.list_runs().is_empty());

    let run_id = wb.submit_prompt("p").unwrap();
    assert!(!wb.send_additional_input(&run_id, "r1-a", "  \n"));
    assert!(wb.get_run(&run_id).unwrap().sub_agents[0].response.is_empty());
}

#[tokio::test]
async fn test_additional_input_is_appended_before_completion() {
    let wb = workbench_with_delays(&[1]);
    let run_id = wb.submit_prompt("p").unwrap();
    assert!(wb.set_additional_input(&run_id, "r1-a", "draft"));
    assert!(wb.send_additional_input(&run_id, "r1-a", " weekends only "));
    wb.approve_run(&run_id);
    wb.settle().await;

    let sa = wb.get_run(&run_id).unwrap().sub_agents[0].clone();
    assert!(sa.additional_input.is_empty());
    assert!(
        sa.response
            .starts_with("\n\n[User additional input]: weekends only")
    );
    assert!(sa.response.ends_with("(sum(amount) over 24h)."));
}

#[tokio::test]
async fn test_unknown_ids_are_noops() {
    let wb = workbench_with_delays(&[1]);
    assert!(!wb.approve_run("r9"));
    assert!(!wb.stop_run("r9"));
    assert!(!wb.stop_sub_agent("r9", "r9-a"));
    assert!(!wb.save_artifact("feat-9"));
    assert!(!wb.revert_activity("sum-r9-a"));
    assert!(!wb.open_preview("feat-9"));
    assert!(!wb.close_preview());
    assert!(wb.toggle_expanded("r9", "r9-a").is_none());
}

#[tokio::test]
async fn test_runs_are_listed_newest_first() {
    let wb = workbench_with_delays(&[1]);
    wb.submit_prompt("first").unwrap();
    wb.submit_prompt("second").unwrap();
    let ids: Vec<_> = wb.list_runs().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["r2", "r1"]);
    assert_eq!(wb.list_activity()[0].id, "s-r2");
}

#[tokio::test]
async fn test_preview_follows_artifact_lifecycle() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let wb = workbench_with_delays(&[1]).with_events(tx);
    let run_id = wb.submit_prompt("p").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;

    assert!(wb.open_preview("feat-1"));
    assert_eq!(wb.preview().map(|a| a.id).as_deref(), Some("feat-1"));

    let entry_id = format!("sum-{run_id}-a");
    assert!(wb.revert_activity(&entry_id));
    assert!(wb.preview().is_none());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&WorkbenchEvent::PreviewChanged { artifact_id: None }));
    assert!(events.contains(&WorkbenchEvent::ArtifactRemoved {
        artifact_id: "feat-1".into()
    }));
    assert!(events.contains(&WorkbenchEvent::RunStatusChanged {
        run_id,
        status: AgentStatus::Completed,
    }));
}

#[tokio::test]
async fn test_shutdown_stops_live_runs() {
    let wb = workbench_with_delays(&[5_000]);
    let run_id = wb.submit_prompt("long").unwrap();
    wb.approve_run(&run_id);
    let pending = wb.submit_prompt("pending").unwrap();

    wb.shutdown().await;
    assert!(wb.is_shut_down());
    assert_eq!(wb.get_run(&run_id).unwrap().status, AgentStatus::Stopped);
    assert_eq!(wb.get_run(&pending).unwrap().status, AgentStatus::Stopped);
}

#[tokio::test]
async fn test_stopped_sub_agent_does_not_block_run_completion() {
    let wb = workbench_with_delays(&[1, 200, 1]);
    let run_id = wb.submit_prompt("derive a fraud feature").unwrap();
    wb.approve_run(&run_id);
    assert!(wb.stop_sub_agent(&run_id, "r1-b"));
    // Only a running sub-agent can be stopped.
    assert!(!wb.stop_sub_agent(&run_id, "r1-b"));

    wb.settle().await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Completed);
    let statuses: Vec<_> = run.sub_agents.iter().map(|sa| sa.status).collect();
    assert_eq!(
        statuses,
        [AgentStatus::Completed, AgentStatus::Stopped, AgentStatus::Completed]
    );
    assert!(run.sub_agents[1].response.is_empty());
    assert!(run.sub_agents[1].generated_artifacts.is_empty());
    assert!(wb.list_artifacts().iter().all(|a| !a.id.starts_with("rule-")));
    assert!(wb.list_activity().iter().all(|e| e.id != "sum-r1-b"));
}

#[tokio::test]
async fn test_no_new_work_after_shutdown() {
    let wb = workbench_with_delays(&[1]);
    let pending = wb.submit_prompt("before").unwrap();
    wb.shutdown().await;

    assert!(wb.submit_prompt("after shutdown").is_none());
    assert!(!wb.approve_run(&pending));
    wb.settle().await;

    let runs = wb.list_runs();
    assert_eq!(runs.len(), 1);
    assert!(runs.iter().all(|r| r.status.is_terminal()));
}

#[tokio::test]
async fn test_no_launch_after_shutdown_without_approval() {
    let config = AppConfig {
        approval_required: false,
        ..AppConfig::default()
    };
    let wb = Workbench::new(&config, Arc::new(FixedPlanner::from_millis(&[1])));
    wb.shutdown().await;

    assert!(wb.submit_prompt("after shutdown").is_none());
    assert!(wb.list_runs().is_empty());
}

#[tokio::test]
async fn test_settle_resumes_after_being_cancelled() {
    let wb = workbench_with_delays(&[100]);
    let run_id = wb.submit_prompt("p").unwrap();
    wb.approve_run(&run_id);

    tokio::select! {
        _ = wb.settle() => panic!("tasks finished before the short timer"),
        _ = tokio::time::sleep(Duration::from_millis(10)) => {}
    }
    wb.settle().await;

    let run = wb.get_run(&run_id).unwrap();
    assert_eq!(run.status, AgentStatus::Completed);
    assert_eq!(wb.list_artifacts().len(), 3);
}
