//! By-id index over every generated artifact.
//!
//! Artifacts live inside the sub-agent that produced them; the registry only
//! records where each one is so that save, delete and revert can find it
//! without walking every run. It also hands out collision-free ids.

use std::collections::HashMap;

use super::{Artifact, ArtifactId, ArtifactKind, SavedState};
use crate::error::OrchestrationError;
use crate::ledger::ActivityLedger;
use crate::orchestration::{Run, RunId, SubAgentId};

/// Where an artifact is owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub run_id: RunId,
    pub sub_agent_id: SubAgentId,
}

#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    index: HashMap<ArtifactId, ArtifactLocation>,
    counters: HashMap<ArtifactKind, u64>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for an artifact of `kind`: kind prefix plus a per-kind
    /// monotonic counter (`feat-1`, `feat-2`, `rule-1`, ...).
    pub fn next_id(&mut self, kind: ArtifactKind) -> ArtifactId {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{}", kind.id_prefix(), counter)
    }

    /// Index an artifact by id. Ids must be unique.
    pub fn register(
        &mut self,
        id: ArtifactId,
        location: ArtifactLocation,
    ) -> Result<(), OrchestrationError> {
        if self.index.contains_key(&id) {
            return Err(OrchestrationError::DuplicateId(id));
        }
        self.index.insert(id, location);
        Ok(())
    }

    pub fn locate(&self, id: &str) -> Option<&ArtifactLocation> {
        self.index.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn find_mut<'r>(&self, runs: &'r mut [Run], id: &str) -> Option<&'r mut Artifact> {
        let location = self.index.get(id)?;
        runs.iter_mut()
            .find(|r| r.id == location.run_id)?
            .sub_agents
            .iter_mut()
            .find(|sa| sa.id == location.sub_agent_id)?
            .generated_artifacts
            .iter_mut()
            .find(|a| a.id == id)
    }

    /// Mark an artifact saved and propagate the flag to linked ledger entries.
    pub fn save(
        &self,
        id: &str,
        runs: &mut [Run],
        ledger: &mut ActivityLedger,
    ) -> Result<(), OrchestrationError> {
        let artifact = self
            .find_mut(runs, id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("artifact {id}")))?;
        artifact.saved_state = SavedState::Saved;
        ledger.mark_saved(id);
        Ok(())
    }

    /// Remove an artifact from every sub-agent and drop its ledger entries.
    /// Deleting an absent id reports `NotFound` and changes nothing.
    pub fn delete(
        &mut self,
        id: &str,
        runs: &mut [Run],
        ledger: &mut ActivityLedger,
    ) -> Result<(), OrchestrationError> {
        let indexed = self.index.remove(id).is_some();

        let mut removed = 0;
        for sa in runs.iter_mut().flat_map(|r| r.sub_agents.iter_mut()) {
            let before = sa.generated_artifacts.len();
            sa.generated_artifacts.retain(|a| a.id != id);
            removed += before - sa.generated_artifacts.len();
        }
        let entries = ledger.remove_linked(id);

        if !indexed && removed == 0 && entries == 0 {
            return Err(OrchestrationError::NotFound(format!("artifact {id}")));
        }
        Ok(())
    }

    /// Undo the artifact behind a ledger entry, unless it was already saved.
    /// Returns the id of the deleted artifact.
    pub fn revert(
        &mut self,
        activity_id: &str,
        runs: &mut [Run],
        ledger: &mut ActivityLedger,
    ) -> Result<ArtifactId, OrchestrationError> {
        let artifact_id = ledger
            .get(activity_id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("activity {activity_id}")))?
            .linked_artifact_id
            .clone()
            .ok_or_else(|| {
                OrchestrationError::NotFound(format!("artifact linked to {activity_id}"))
            })?;

        let artifact = self
            .find_mut(runs, &artifact_id)
            .ok_or_else(|| OrchestrationError::NotFound(format!("artifact {artifact_id}")))?;
        if artifact.is_saved() {
            return Err(OrchestrationError::InvalidTransition {
                id: artifact_id,
                action: "revert",
                state: "saved".to_string(),
            });
        }

        self.delete(&artifact_id, runs, ledger)?;
        Ok(artifact_id)
    }

    /// Every artifact across every run, in run order, then sub-agent order,
    /// then creation order.
    pub fn list_all(runs: &[Run]) -> Vec<Artifact> {
        runs.iter()
            .flat_map(|r| r.sub_agents.iter())
            .flat_map(|sa| sa.generated_artifacts.iter().cloned())
            .collect()
    }
}
