use thiserror::Error;

use crate::llm::AgentError;

/// 审阅流程对调用方暴露的错误
///
/// 审阅、编辑、排版各角色的失败都在流程内部降级处理，不会出现在这里。
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("review cancelled")]
    Cancelled,

    #[error("review pipeline failed: {0}")]
    Pipeline(String),
}

impl ReviewError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReviewError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for ReviewError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            ReviewError::Cancelled
        } else {
            ReviewError::Pipeline(err.to_string())
        }
    }
}

/// 仅用于取消信号的透传；其它生成错误由各阶段自行降级
pub(crate) fn propagate_cancel(err: &AgentError) -> Result<(), ReviewError> {
    if err.is_cancelled() {
        Err(ReviewError::Cancelled)
    } else {
        Ok(())
    }
}
