use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use workbench::config::AppConfig;
use workbench::ledger::audit::AuditLog;
use workbench::orchestration::{FixedPlanner, Workbench};

fn event_types(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("audit log exists");
    std::io::BufReader::new(file)
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(&line.unwrap()).unwrap();
            value["event_type"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_audit_log_records_run_lifecycle() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("audit").join("workbench.jsonl");

    let log = AuditLog::open(&path).unwrap();
    let wb = Workbench::new(&AppConfig::default(), Arc::new(FixedPlanner::from_millis(&[1])))
        .with_audit_log(log);

    let run_id = wb.submit_prompt("derive a fraud feature").unwrap();
    wb.approve_run(&run_id);
    wb.settle().await;
    wb.save_artifact("feat-1");
    wb.revert_activity(&format!("sum-{run_id}-b"));

    let types = event_types(&path);
    assert_eq!(types[0], "prompt_submitted");
    assert_eq!(types[1], "run_approved");
    assert_eq!(
        types.iter().filter(|t| *t == "sub_agent_completed").count(),
        3
    );
    assert!(types.contains(&"run_completed".to_string()));
    assert_eq!(types[types.len() - 2], "artifact_saved");
    assert_eq!(types[types.len() - 1], "activity_reverted");
}

#[tokio::test]
async fn test_audit_log_records_stop() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("audit.jsonl");

    let log = AuditLog::open(&path).unwrap();
    let wb = Workbench::new(
        &AppConfig::default(),
        Arc::new(FixedPlanner::from_millis(&[5_000])),
    )
    .with_audit_log(log);

    let run_id = wb.submit_prompt("p").unwrap();
    wb.approve_run(&run_id);
    wb.stop_run(&run_id);
    wb.settle().await;

    assert_eq!(
        event_types(&path),
        ["prompt_submitted", "run_approved", "run_stopped"]
    );
}
