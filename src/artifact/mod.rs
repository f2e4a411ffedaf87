//! Generated entities (features, rules, datasets) and their lifecycle.
//!
//! An [`Artifact`] is produced by a sub-agent when it completes. The
//! sub-agent owns it; the [`registry::ArtifactRegistry`] keeps a by-id index
//! for global lookup, save, delete and revert.

pub mod preview;
pub mod registry;

use serde::{Deserialize, Serialize};

/// Identifier of a generated artifact, e.g. `feat-1` or `ds-3`.
pub type ArtifactId = String;

/// What kind of entity an artifact represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Feature,
    Rule,
    Dataset,
}

impl ArtifactKind {
    /// Prefix used for generated ids of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ArtifactKind::Feature => "feat",
            ArtifactKind::Rule => "rule",
            ArtifactKind::Dataset => "ds",
        }
    }

    /// Path segment used for the external editor locator.
    fn editor_segment(self) -> &'static str {
        match self {
            ArtifactKind::Feature => "features",
            ArtifactKind::Rule => "rules",
            ArtifactKind::Dataset => "datasets",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Feature => write!(f, "Feature"),
            ArtifactKind::Rule => write!(f, "Rule"),
            ArtifactKind::Dataset => write!(f, "Dataset"),
        }
    }
}

/// Whether the user has kept an artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedState {
    #[default]
    Unsaved,
    Saved,
}

/// One sample row of a dataset preview.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub event_id: String,
    pub user_id: String,
    pub amount: f64,
    pub ts: String,
}

/// Kind-specific preview payload. The variant decides the artifact's kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Preview {
    Feature {
        #[serde(rename = "type")]
        feature_type: String,
        expression: String,
    },
    Rule {
        condition: String,
        actions: String,
    },
    Dataset {
        rows: Vec<DatasetRow>,
    },
}

impl Preview {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Preview::Feature { .. } => ArtifactKind::Feature,
            Preview::Rule { .. } => ArtifactKind::Rule,
            Preview::Dataset { .. } => ArtifactKind::Dataset,
        }
    }
}

/// Everything a sub-agent's production carries before it is given an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDraft {
    pub name: String,
    pub description: String,
    pub preview: Preview,
}

impl ArtifactDraft {
    pub fn kind(&self) -> ArtifactKind {
        self.preview.kind()
    }
}

/// A generated feature, rule or dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Artifact {
    pub id: ArtifactId,
    kind: ArtifactKind,
    pub name: String,
    pub description: String,
    pub saved_state: SavedState,
    pub preview: Preview,
    edit_path: String,
}

impl Artifact {
    /// Build an unsaved artifact from a draft. The kind is taken from the
    /// preview variant and cannot be changed afterwards.
    pub fn from_draft(id: ArtifactId, draft: ArtifactDraft) -> Self {
        let kind = draft.preview.kind();
        let edit_path = format!("/{}/{}/edit", kind.editor_segment(), draft.name);
        Self {
            id,
            kind,
            name: draft.name,
            description: draft.description,
            saved_state: SavedState::Unsaved,
            preview: draft.preview,
            edit_path,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn is_saved(&self) -> bool {
        self.saved_state == SavedState::Saved
    }

    /// External editor locator. Only resolvable once the artifact is saved.
    pub fn edit_reference(&self) -> Option<&str> {
        self.is_saved().then_some(self.edit_path.as_str())
    }
}
