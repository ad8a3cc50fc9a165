use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::usage::AgentTokenUsage;

/// 进度事件所属的阶段；排版角色的进度以`editor`阶段上报
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageAgent {
    Reviewer,
    Editor,
}

impl std::fmt::Display for StageAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageAgent::Reviewer => write!(f, "reviewer"),
            StageAgent::Editor => write!(f, "editor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Started,
    Completed,
}

/// 阶段进度通知，瞬时对象，不做保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub agent: StageAgent,
    pub status: StageStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<AgentTokenUsage>,
    pub emitted_at: DateTime<Utc>,
}

impl StageEvent {
    pub fn started(agent: StageAgent, message: impl Into<String>) -> Self {
        Self {
            agent,
            status: StageStatus::Started,
            message: message.into(),
            usage: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn completed(
        agent: StageAgent,
        message: impl Into<String>,
        usage: Option<AgentTokenUsage>,
    ) -> Self {
        Self {
            agent,
            status: StageStatus::Completed,
            message: message.into(),
            usage,
            emitted_at: Utc::now(),
        }
    }
}

/// 进度回调。实现方不应阻塞
pub trait StageObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent);
}

impl<F> StageObserver for F
where
    F: Fn(&StageEvent) + Send + Sync,
{
    fn on_stage(&self, event: &StageEvent) {
        self(event)
    }
}

/// 丢弃所有事件
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _event: &StageEvent) {}
}
