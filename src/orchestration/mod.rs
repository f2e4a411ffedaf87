//! Run and sub-agent orchestration.
//!
//! Provides the [`Workbench`] facade over the run and sub-agent state
//! machines, the [`plan::Planner`] seam, and the [`events::WorkbenchEvent`]
//! stream consumed by renderers.

pub mod events;
pub mod plan;
pub mod run;
mod state;
pub mod sub_agent;
pub mod types;
pub mod workbench;

pub use events::WorkbenchEvent;
pub use plan::{FixedPlanner, OrchestrationPlan, Planner, Production, SubAgentPlan};
pub use types::{AgentStatus, Run, RunId, SubAgent, SubAgentId};
pub use workbench::Workbench;
