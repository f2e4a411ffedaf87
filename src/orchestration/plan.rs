//! Prompt-to-plan translation.
//!
//! Deciding how many sub-agents a prompt needs, what they are called and what
//! they produce is an external concern. The workbench only consumes a
//! [`Planner`]; [`FixedPlanner`] is the built-in three-way split used when no
//! real planning step is wired in.

use std::time::Duration;

use crate::artifact::{ArtifactDraft, DatasetRow, Preview};

/// What a sub-agent yields when its attempt completes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Production {
    pub response: String,
    pub artifact: Option<ArtifactDraft>,
}

/// Plan for a single sub-agent.
#[derive(Clone, Debug)]
pub struct SubAgentPlan {
    pub name: String,
    /// Require a sub-agent level approval before this one may start.
    pub needs_approval: bool,
    /// How long the attempt takes before its production resolves.
    pub delay: Duration,
    pub production: Production,
}

/// Ordered sub-agent plans for one run.
#[derive(Clone, Debug, Default)]
pub struct OrchestrationPlan {
    pub sub_agents: Vec<SubAgentPlan>,
}

/// Translates a prompt into an orchestration plan.
pub trait Planner: Send + Sync {
    fn plan(&self, prompt: &str) -> OrchestrationPlan;
}

/// Default per-sub-agent delays in milliseconds.
pub const DEFAULT_DELAYS_MS: [u64; 3] = [400, 600, 800];

/// Splits every prompt into feature, rule and dataset sub-agents,
/// regardless of prompt content.
#[derive(Clone, Debug)]
pub struct FixedPlanner {
    delays: Vec<Duration>,
}

impl FixedPlanner {
    /// Build a planner using the given delays in order. Sub-agents beyond the
    /// end of the list reuse the last delay.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub fn from_millis(delays_ms: &[u64]) -> Self {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }

    fn delay(&self, index: usize) -> Duration {
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for FixedPlanner {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_DELAYS_MS)
    }
}

impl Planner for FixedPlanner {
    fn plan(&self, _prompt: &str) -> OrchestrationPlan {
        let productions = [
            ("Feature Generator", feature_production()),
            ("Rule Drafting", rule_production()),
            ("Dataset Builder", dataset_production()),
        ];

        let sub_agents = productions
            .into_iter()
            .enumerate()
            .map(|(i, (name, production))| SubAgentPlan {
                name: name.to_string(),
                needs_approval: false,
                delay: self.delay(i),
                production,
            })
            .collect();

        OrchestrationPlan { sub_agents }
    }
}

fn feature_production() -> Production {
    Production {
        response: "Generated feature based on user behavior (sum(amount) over 24h).".into(),
        artifact: Some(ArtifactDraft {
            name: "total_amount_24h_by_user".into(),
            description: "Aggregation over 24h by user_id".into(),
            preview: Preview::Feature {
                feature_type: "Aggregation".into(),
                expression: "sum(amount) OVER user_id LAST 24h".into(),
            },
        }),
    }
}

fn rule_production() -> Production {
    Production {
        response: "Drafted a rule using velocity and amount thresholds.".into(),
        artifact: Some(ArtifactDraft {
            name: "HighVelocityLargeAmount".into(),
            description: "Decline if amount>1000 and velocity_24h>3".into(),
            preview: Preview::Rule {
                condition: "amount > 1000 AND velocity_24h > 3".into(),
                actions: "Decline".into(),
            },
        }),
    }
}

fn dataset_production() -> Production {
    Production {
        response: "Built a dataset of declined transactions (sample of 1000 rows).".into(),
        artifact: Some(ArtifactDraft {
            name: "declined_txn_sample".into(),
            description: "Sample of declined transactions in last 7d".into(),
            preview: Preview::Dataset {
                rows: sample_rows(),
            },
        }),
    }
}

/// Sample rows shown for generated datasets.
pub fn sample_rows() -> Vec<DatasetRow> {
    [
        ("e01", "u01", 124.55, "2025-11-08T11:24:00Z"),
        ("e02", "u01", 88.10, "2025-11-08T12:10:00Z"),
        ("e03", "u02", 921.00, "2025-11-08T12:22:30Z"),
    ]
    .into_iter()
    .map(|(event_id, user_id, amount, ts)| DatasetRow {
        event_id: event_id.to_string(),
        user_id: user_id.to_string(),
        amount,
        ts: ts.to_string(),
    })
    .collect()
}
