use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::llm::{GenerationRequest, TextGenerator};

use super::error::{ReviewError, propagate_cancel};
use super::usage::AgentTokenUsage;

/// 编辑/排版调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteOutcome {
    /// 模型返回的非空文本（已去除首尾空白）
    Rewritten(String),
    /// 模型返回了空文本
    Empty,
    /// 非取消类失败
    Failed(String),
}

impl RewriteOutcome {
    /// 成功时取改写文本，否则回退到给定文本
    pub fn text_or(self, fallback: &str) -> String {
        match self {
            RewriteOutcome::Rewritten(text) => text,
            RewriteOutcome::Empty | RewriteOutcome::Failed(_) => fallback.to_string(),
        }
    }
}

/// 执行一次改写调用（编辑或排版角色）。只有取消会作为错误返回
pub async fn run_rewrite_pass(
    generator: &dyn TextGenerator,
    request: GenerationRequest,
    cancel: &CancellationToken,
    usage: &mut AgentTokenUsage,
) -> Result<RewriteOutcome, ReviewError> {
    let role = request.role;
    match generator.generate(request, cancel).await {
        Ok(generation) => {
            usage.record(Some(&generation.usage));
            let text = generation.text.trim();
            if text.is_empty() {
                Ok(RewriteOutcome::Empty)
            } else {
                Ok(RewriteOutcome::Rewritten(text.to_string()))
            }
        }
        Err(err) => {
            propagate_cancel(&err)?;
            usage.record(err.usage().as_ref());
            warn!(%role, error = %err, "rewrite pass failed");
            Ok(RewriteOutcome::Failed(err.to_string()))
        }
    }
}
