//! Activity ledger: the audit trail shown as the conversation's summary.
//!
//! Entries are prepended (newest first) when a run starts and when a
//! sub-agent completes with an artifact. An entry linked to an artifact
//! mirrors its saved flag and disappears when the artifact is deleted or
//! reverted. Entries are never re-targeted to another artifact.

pub mod audit;

use std::collections::VecDeque;

use serde::Serialize;

use crate::artifact::{Artifact, ArtifactKind};
use crate::orchestration::{Run, SubAgent};

/// Identifier of a ledger entry, e.g. `s-r1` or `sum-r1-a`.
pub type ActivityId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Feature,
    Rule,
    Dataset,
    Analysis,
    Workflow,
    Other,
}

impl From<ArtifactKind> for ActivityKind {
    fn from(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Feature => ActivityKind::Feature,
            ArtifactKind::Rule => ActivityKind::Rule,
            ArtifactKind::Dataset => ActivityKind::Dataset,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub label: String,
    pub kind: ActivityKind,
    /// Back-reference to the run this entry belongs to.
    pub anchor_id: String,
    pub linked_artifact_id: Option<String>,
    /// Meaningful only when `linked_artifact_id` is set.
    pub is_saved: bool,
}

#[derive(Debug, Default)]
pub struct ActivityLedger {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a run.
    pub fn record_run_started(&mut self, run: &Run) -> &ActivityEntry {
        self.prepend(ActivityEntry {
            id: format!("s-{}", run.id),
            label: format!("Started: {}", run.name),
            kind: ActivityKind::Analysis,
            anchor_id: run.anchor_id.clone(),
            linked_artifact_id: None,
            is_saved: false,
        })
    }

    /// Record an artifact produced by a sub-agent of the given run.
    pub fn record_artifact(
        &mut self,
        anchor_id: &str,
        sub_agent: &SubAgent,
        artifact: &Artifact,
    ) -> &ActivityEntry {
        let verb = match artifact.kind() {
            ArtifactKind::Feature => "Feature generated",
            ArtifactKind::Rule => "Rule drafted",
            ArtifactKind::Dataset => "Dataset built",
        };
        self.prepend(ActivityEntry {
            id: format!("sum-{}", sub_agent.id),
            label: format!("{verb}: {}", artifact.name),
            kind: artifact.kind().into(),
            anchor_id: anchor_id.to_string(),
            linked_artifact_id: Some(artifact.id.clone()),
            is_saved: artifact.is_saved(),
        })
    }

    fn prepend(&mut self, entry: ActivityEntry) -> &ActivityEntry {
        self.entries.push_front(entry);
        &self.entries[0]
    }

    pub fn get(&self, id: &str) -> Option<&ActivityEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mark every entry linked to `artifact_id` as saved. Returns how many
    /// entries were updated.
    pub fn mark_saved(&mut self, artifact_id: &str) -> usize {
        let mut updated = 0;
        for entry in self.linked_mut(artifact_id) {
            entry.is_saved = true;
            updated += 1;
        }
        updated
    }

    /// Remove every entry linked to `artifact_id`. Returns how many were removed.
    pub fn remove_linked(&mut self, artifact_id: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.linked_artifact_id.as_deref() != Some(artifact_id));
        before - self.entries.len()
    }

    fn linked_mut<'a>(
        &'a mut self,
        artifact_id: &'a str,
    ) -> impl Iterator<Item = &'a mut ActivityEntry> + 'a {
        self.entries
            .iter_mut()
            .filter(move |e| e.linked_artifact_id.as_deref() == Some(artifact_id))
    }

    /// Entries newest first.
    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
