use thiserror::Error;

use super::client::types::TokenUsage;

/// 文本生成调用的失败类型
///
/// `Cancelled` 必须原样向上传播；其余变体由调用方就地降级处理。
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("generation cancelled by caller")]
    Cancelled,

    /// 模型返回了文本，但无法解析为要求的结构化对象。携带原始文本供宽松解析使用。
    #[error("model produced no structured output")]
    NoStructuredOutput { text: String, usage: TokenUsage },

    #[error("generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("generation failed: {0}")]
    Generation(String),
}

impl AgentError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }

    /// 失败前已经消耗的用量（仅结构化解析失败时可知）
    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            AgentError::NoStructuredOutput { usage, .. } => Some(*usage),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Generation(format!("{:#}", err))
    }
}
