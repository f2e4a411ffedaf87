//! Change notifications for the UI collaborator.
//!
//! The workbench pushes a [`WorkbenchEvent`] over an unbounded channel after
//! every state change so a renderer can refresh without polling. Events carry
//! ids only; the receiver queries the facade for the current snapshot.

use serde::Serialize;

use super::types::{AgentStatus, RunId, SubAgentId};
use crate::artifact::{ArtifactId, ArtifactKind};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkbenchEvent {
    RunCreated {
        run_id: RunId,
        name: String,
    },
    RunStatusChanged {
        run_id: RunId,
        status: AgentStatus,
    },
    SubAgentStatusChanged {
        run_id: RunId,
        sub_agent_id: SubAgentId,
        status: AgentStatus,
    },
    SubAgentResponseUpdated {
        run_id: RunId,
        sub_agent_id: SubAgentId,
    },
    ArtifactGenerated {
        artifact_id: ArtifactId,
        kind: ArtifactKind,
        name: String,
    },
    ArtifactSaved {
        artifact_id: ArtifactId,
    },
    ArtifactRemoved {
        artifact_id: ArtifactId,
    },
    PreviewChanged {
        artifact_id: Option<ArtifactId>,
    },
}

impl std::fmt::Display for WorkbenchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkbenchEvent::RunCreated { run_id, name } => {
                write!(f, "[{run_id}] created: {name}")
            }
            WorkbenchEvent::RunStatusChanged { run_id, status } => {
                write!(f, "[{run_id}] {status}")
            }
            WorkbenchEvent::SubAgentStatusChanged {
                run_id,
                sub_agent_id,
                status,
            } => write!(f, "[{run_id}] {sub_agent_id} {status}"),
            WorkbenchEvent::SubAgentResponseUpdated {
                run_id,
                sub_agent_id,
            } => write!(f, "[{run_id}] {sub_agent_id} response updated"),
            WorkbenchEvent::ArtifactGenerated {
                artifact_id,
                kind,
                name,
            } => write!(f, "{kind} generated: {name} ({artifact_id})"),
            WorkbenchEvent::ArtifactSaved { artifact_id } => write!(f, "{artifact_id} saved"),
            WorkbenchEvent::ArtifactRemoved { artifact_id } => write!(f, "{artifact_id} removed"),
            WorkbenchEvent::PreviewChanged {
                artifact_id: Some(id),
            } => write!(f, "previewing {id}"),
            WorkbenchEvent::PreviewChanged { artifact_id: None } => write!(f, "preview closed"),
        }
    }
}
