//! JSONL audit trail of orchestration events.
//!
//! Every approval, stop, completion and artifact lifecycle change is written
//! as one self-describing JSON line. Writes are small and flushed per event,
//! so plain synchronous `std::fs` is used.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::AuditError;

/// Current UTC time as an ISO 8601 string with milliseconds.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// One audit record, tagged with `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEntry {
    PromptSubmitted {
        timestamp: String,
        run_id: String,
        prompt: String,
        sub_agents: usize,
    },
    RunApproved {
        timestamp: String,
        run_id: String,
        started: usize,
    },
    RunRejected {
        timestamp: String,
        run_id: String,
    },
    RunStopped {
        timestamp: String,
        run_id: String,
        stopped_sub_agents: Vec<String>,
    },
    RunCompleted {
        timestamp: String,
        run_id: String,
    },
    SubAgentApproved {
        timestamp: String,
        run_id: String,
        sub_agent_id: String,
    },
    SubAgentRejected {
        timestamp: String,
        run_id: String,
        sub_agent_id: String,
    },
    SubAgentStopped {
        timestamp: String,
        run_id: String,
        sub_agent_id: String,
    },
    SubAgentCompleted {
        timestamp: String,
        run_id: String,
        sub_agent_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact_id: Option<String>,
    },
    AdditionalInput {
        timestamp: String,
        run_id: String,
        sub_agent_id: String,
        text: String,
    },
    ArtifactSaved {
        timestamp: String,
        artifact_id: String,
    },
    ArtifactDeleted {
        timestamp: String,
        artifact_id: String,
    },
    ActivityReverted {
        timestamp: String,
        activity_id: String,
        artifact_id: String,
    },
}

/// Append-only JSONL writer for [`AuditEntry`] records.
pub struct AuditLog {
    writer: BufWriter<fs::File>,
    path: PathBuf,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("path", &self.path).finish()
    }
}

impl AuditLog {
    /// Open (or create) the audit log at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let io_err = |source| AuditError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Serialize an entry as a single JSON line and flush.
    pub fn record(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        serde_json::to_writer(&mut self.writer, entry)?;
        let io_err = |source| AuditError::Io {
            path: self.path.clone(),
            source,
        };
        self.writer.write_all(b"\n").map_err(io_err)?;
        self.writer.flush().map_err(io_err)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        let file = fs::File::open(path).unwrap();
        std::io::BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn creates_parent_dirs_and_appends_lines() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("logs").join("audit.jsonl");
        let mut log = AuditLog::open(&path).unwrap();

        log.record(&AuditEntry::RunApproved {
            timestamp: now_iso(),
            run_id: "r1".into(),
            started: 3,
        })
        .unwrap();
        log.record(&AuditEntry::SubAgentCompleted {
            timestamp: now_iso(),
            run_id: "r1".into(),
            sub_agent_id: "r1-a".into(),
            artifact_id: None,
        })
        .unwrap();

        let lines = read_lines(log.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "run_approved");
        assert_eq!(lines[0]["started"], 3);
        assert_eq!(lines[1]["event_type"], "sub_agent_completed");
        assert!(lines[1].get("artifact_id").is_none());
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("audit.jsonl");
        for _ in 0..2 {
            let mut log = AuditLog::open(&path).unwrap();
            log.record(&AuditEntry::ArtifactSaved {
                timestamp: now_iso(),
                artifact_id: "feat-1".into(),
            })
            .unwrap();
        }
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2025-01-01T00:00:00.000Z".len());
    }
}
