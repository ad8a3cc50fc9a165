//! 按脚本逐条回放的文本生成器，用于在无网络环境下驱动编排器测试

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{AgentError, Generation, GenerationRequest, TextGenerator, TokenUsage};

pub(crate) const SCRIPTED_USAGE: TokenUsage = TokenUsage {
    input_tokens: 10,
    output_tokens: 5,
    total_tokens: 15,
    reasoning_tokens: 0,
    cached_tokens: 0,
};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    Structured(Value),
    Unparsed(String),
    Fail(String),
    /// 先触发取消，再正常返回文本
    CancelThen(String),
}

#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Text(text)) => Ok(Generation {
                text,
                structured: None,
                usage: SCRIPTED_USAGE,
            }),
            Some(Reply::Structured(value)) => Ok(Generation {
                text: value.to_string(),
                structured: Some(value),
                usage: SCRIPTED_USAGE,
            }),
            Some(Reply::Unparsed(text)) => Err(AgentError::NoStructuredOutput {
                text,
                usage: SCRIPTED_USAGE,
            }),
            Some(Reply::Fail(message)) => Err(AgentError::Generation(message)),
            Some(Reply::CancelThen(text)) => {
                cancel.cancel();
                Ok(Generation {
                    text,
                    structured: None,
                    usage: SCRIPTED_USAGE,
                })
            }
            None => Err(AgentError::Generation("script exhausted".to_string())),
        }
    }
}
