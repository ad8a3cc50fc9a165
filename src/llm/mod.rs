//! 文本生成能力：统一的调用接口与基于rig的实现

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod scripted;

pub use client::LLMClient;
pub use client::types::TokenUsage;
pub use error::AgentError;

/// 调用模型的三个角色，各自有独立的提示词模板与输出约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Reviewer,
    Editor,
    Formatter,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Reviewer => write!(f, "reviewer"),
            AgentRole::Editor => write!(f, "editor"),
            AgentRole::Formatter => write!(f, "formatter"),
        }
    }
}

/// 结构化输出的目标类型，客户端据此选择Extractor的类型参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutput {
    /// 审阅结论，对应`ReviewerResult`
    ReviewerVerdict,
}

/// 一次生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub role: AgentRole,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// 要求结构化输出时的目标类型
    pub structured: Option<StructuredOutput>,
}

impl GenerationRequest {
    pub fn text(
        role: AgentRole,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            role,
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            structured: None,
        }
    }

    pub fn with_structured_output(mut self, output: StructuredOutput) -> Self {
        self.structured = Some(output);
        self
    }
}

/// 一次生成的结果
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub text: String,
    /// 结构化请求成功解析出的对象
    pub structured: Option<Value>,
    pub usage: TokenUsage,
}

/// 外部文本生成能力
///
/// 实现方必须响应`cancel`：取消后尽快返回[`AgentError::Cancelled`]。
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, AgentError>;
}
