//! 审阅流程：路由、提示词、审阅/编辑/排版调用与编排

pub mod context;
pub mod editor;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod prompts;
pub mod reviewer;
pub mod router;
pub mod types;
pub mod usage;

pub use context::{WorkflowContext, resolve_workflow_context};
pub use error::ReviewError;
pub use events::{NoopObserver, StageAgent, StageEvent, StageObserver, StageStatus};
pub use orchestrator::{ReviewOrchestrator, ReviewSettings};
pub use router::{WorkflowRoute, route_workflow};
pub use types::{AiReviewPayload, ReviewerResult, ReviewerSource, ToolInsights};
pub use usage::{AgentTokenUsage, UsageSummary};

// Include tests
#[cfg(test)]
mod tests;
