//! LLM客户端 - 基于rig provider实现文本生成能力

use anyhow::Result;
use async_trait::async_trait;
use rig::extractor::ExtractionError;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LLMConfig;
use crate::llm::{AgentError, Generation, GenerationRequest, StructuredOutput, TextGenerator};
use crate::review::types::ReviewerResult;

mod providers;
pub mod types;
pub mod utils;

use providers::ProviderClient;
use types::TokenUsage;
use utils::{estimate_token_usage, structured_output_instruction};

/// LLM客户端 - 提供统一的LLM服务接口
///
/// 不做自动重试：失败会作为普通的生成错误交给编排器降级处理。
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self, model: &str) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        let request = GenerationRequest::text(
            crate::llm::AgentRole::Reviewer,
            model,
            "You are a helpful assistant.",
            "Hello",
        );
        match self.generate(request, &CancellationToken::new()).await {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(anyhow::anyhow!(e))
            }
        }
    }

    /// 在取消与超时的约束下等待一次模型调用
    async fn bounded<T, E>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<Result<T, E>, AgentError> {
        let seconds = self.config.timeout_seconds;
        tokio::select! {
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            outcome = tokio::time::timeout(Duration::from_secs(seconds), call) => {
                outcome.map_err(|_| {
                    warn!(role = %request.role, seconds, "model call timed out");
                    AgentError::Timeout { seconds }
                })
            }
        }
    }

    /// 普通的单轮prompt，返回原始文本与估算用量
    async fn prompt_text(
        &self,
        request: &GenerationRequest,
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, TokenUsage), AgentError> {
        let agent = self
            .client
            .create_agent(&request.model, system_prompt, &self.config)?;
        let text = self
            .bounded(request, cancel, agent.prompt(&request.user_prompt))
            .await??;
        let usage = estimate_token_usage(
            &format!("{}\n{}", system_prompt, request.user_prompt),
            &text,
        );
        Ok((text, usage))
    }

    /// 通过rig Extractor提取`T`；没有提取到数据时改用普通prompt取回原始文本
    async fn extract_structured<T>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, AgentError>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let extractor = self.client.create_extractor::<T>(
            &request.model,
            &request.system_prompt,
            &self.config,
        )?;

        match self
            .bounded(request, cancel, extractor.extract(request.user_prompt.as_str()))
            .await?
        {
            Ok(result) => {
                let structured = serde_json::to_value(&result)
                    .map_err(|e| AgentError::Generation(e.to_string()))?;
                let text = structured.to_string();
                let usage = estimate_token_usage(
                    &format!("{}\n{}", request.system_prompt, request.user_prompt),
                    &text,
                );
                Ok(Generation {
                    text,
                    structured: Some(structured),
                    usage,
                })
            }
            Err(e) => {
                if let Some(failure) = extraction_failure(&e) {
                    return Err(failure);
                }
                warn!(role = %request.role, error = %e, "extractor returned no data, re-prompting for raw text");
                let schema = serde_json::to_value(schema_for!(T))
                    .map_err(|e| AgentError::Generation(e.to_string()))?;
                let system_prompt = format!(
                    "{}\n\n{}",
                    request.system_prompt,
                    structured_output_instruction(&schema)
                );
                let (text, usage) = self.prompt_text(request, &system_prompt, cancel).await?;
                Err(AgentError::NoStructuredOutput { text, usage })
            }
        }
    }
}

/// 调用本身失败时返回对应的错误；`None`表示模型有回复但没有可用的结构化数据
fn extraction_failure(err: &ExtractionError) -> Option<AgentError> {
    match err {
        ExtractionError::CompletionError(e) => Some(AgentError::Generation(e.to_string())),
        ExtractionError::NoData | ExtractionError::DeserializationError(_) => None,
    }
}

#[async_trait]
impl TextGenerator for LLMClient {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        debug!(role = %request.role, model = %request.model, structured = ?request.structured, "invoking model");

        match request.structured {
            Some(StructuredOutput::ReviewerVerdict) => {
                self.extract_structured::<ReviewerResult>(&request, cancel)
                    .await
            }
            None => {
                let (text, usage) = self
                    .prompt_text(&request, &request.system_prompt, cancel)
                    .await?;
                Ok(Generation {
                    text,
                    structured: None,
                    usage,
                })
            }
        }
    }
}
