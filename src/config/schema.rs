use serde::Deserialize;
use std::path::PathBuf;

use crate::orchestration::plan::DEFAULT_DELAYS_MS;

/// The TOML file structure for workbench.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub orchestration: Option<OrchestrationConfig>,
    pub agents: Option<AgentsConfig>,
    pub audit: Option<AuditConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationConfig {
    /// Whether prompt-initiated runs wait for an explicit approval.
    pub approval_required: Option<bool>,
    /// Maximum prompt characters kept in a run name.
    pub run_name_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsConfig {
    /// Per-sub-agent completion delays, in plan order.
    pub completion_delays_ms: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    pub log_path: Option<String>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub approval_required: bool,
    pub run_name_limit: usize,
    pub completion_delays_ms: Vec<u64>,
    pub audit_log_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        PartialConfig::default().finalize()
    }
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    pub approval_required: Option<bool>,
    pub run_name_limit: Option<usize>,
    pub completion_delays_ms: Option<Vec<u64>>,
    pub audit_log_path: Option<PathBuf>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let orchestration = self.orchestration;
        PartialConfig {
            approval_required: orchestration.as_ref().and_then(|o| o.approval_required),
            run_name_limit: orchestration.as_ref().and_then(|o| o.run_name_limit),
            completion_delays_ms: self.agents.and_then(|a| a.completion_delays_ms),
            audit_log_path: self
                .audit
                .and_then(|a| a.log_path)
                .map(PathBuf::from),
        }
    }
}

/// Default run name prompt limit.
pub const DEFAULT_RUN_NAME_LIMIT: usize = 60;

pub(crate) fn default_delays() -> Vec<u64> {
    DEFAULT_DELAYS_MS.to_vec()
}
