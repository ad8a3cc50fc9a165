//! 各LLM Provider的统一封装，审阅流程只需要“系统提示词 + 单轮prompt”

use anyhow::{Context, Result};
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Prompt,
    extractor::{ExtractionError, Extractor},
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::{LLMConfig, LLMProvider};

/// 以同样的参数构建单轮Agent
macro_rules! single_turn_agent {
    ($builder:expr, $system_prompt:expr, $config:expr) => {
        $builder
            .preamble($system_prompt)
            .max_tokens($config.max_tokens.into())
            .temperature($config.temperature)
            .build()
    };
}

/// 以同样的参数构建Extractor
macro_rules! typed_extractor {
    ($builder:expr, $system_prompt:expr, $config:expr) => {
        $builder
            .preamble($system_prompt)
            .max_tokens($config.max_tokens.into())
            .build()
    };
}

fn gemini_params() -> Result<serde_json::Value> {
    serde_json::to_value(AdditionalParameters::default().with_config(GenerationConfig::default()))
        .context("Failed to encode gemini parameters")
}

/// 统一的Provider客户端
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    Moonshot(rig::providers::moonshot::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Mistral(rig::providers::mistral::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    Gemini(rig::providers::gemini::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let key = config.api_key.as_str();
        let base_url = config.api_base_url.as_str();
        Ok(match config.provider {
            LLMProvider::OpenAI => Self::OpenAI(
                rig::providers::openai::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::Moonshot => Self::Moonshot(
                rig::providers::moonshot::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::DeepSeek => Self::DeepSeek(
                rig::providers::deepseek::Client::builder(key)
                    .base_url(base_url)
                    .build(),
            ),
            LLMProvider::Mistral => {
                Self::Mistral(rig::providers::mistral::Client::builder(key).build())
            }
            LLMProvider::OpenRouter => {
                Self::OpenRouter(rig::providers::openrouter::Client::builder(key).build())
            }
            LLMProvider::Anthropic => Self::Anthropic(
                rig::providers::anthropic::ClientBuilder::new(key)
                    .build()
                    .context("Failed to build anthropic client")?,
            ),
            LLMProvider::Gemini => Self::Gemini(
                rig::providers::gemini::Client::builder(key)
                    .build()
                    .context("Failed to build gemini client")?,
            ),
            LLMProvider::Ollama => Self::Ollama(rig::providers::ollama::Client::builder().build()),
        })
    }

    /// 为某个角色创建不挂载工具的单轮Agent
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
    ) -> Result<ProviderAgent> {
        Ok(match self {
            // OpenAI兼容网关大多只实现了chat completions接口
            Self::OpenAI(client) => ProviderAgent::OpenAI(single_turn_agent!(
                client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder(),
                system_prompt,
                config
            )),
            Self::Moonshot(client) => {
                ProviderAgent::Moonshot(single_turn_agent!(client.agent(model), system_prompt, config))
            }
            Self::DeepSeek(client) => {
                ProviderAgent::DeepSeek(single_turn_agent!(client.agent(model), system_prompt, config))
            }
            Self::Mistral(client) => {
                ProviderAgent::Mistral(single_turn_agent!(client.agent(model), system_prompt, config))
            }
            Self::OpenRouter(client) => ProviderAgent::OpenRouter(single_turn_agent!(
                client.agent(model),
                system_prompt,
                config
            )),
            Self::Anthropic(client) => ProviderAgent::Anthropic(single_turn_agent!(
                client.agent(model),
                system_prompt,
                config
            )),
            Self::Gemini(client) => {
                ProviderAgent::Gemini(single_turn_agent!(
                    client.agent(model).additional_params(gemini_params()?),
                    system_prompt,
                    config
                ))
            }
            Self::Ollama(client) => {
                ProviderAgent::Ollama(single_turn_agent!(client.agent(model), system_prompt, config))
            }
        })
    }

    /// 创建输出类型为`T`的Extractor
    pub fn create_extractor<T>(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
    ) -> Result<ProviderExtractor<T>>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        Ok(match self {
            Self::OpenAI(client) => ProviderExtractor::OpenAI(typed_extractor!(
                client.extractor_completions_api::<T>(model),
                system_prompt,
                config
            )),
            Self::Moonshot(client) => ProviderExtractor::Moonshot(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
            Self::DeepSeek(client) => ProviderExtractor::DeepSeek(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
            Self::Mistral(client) => ProviderExtractor::Mistral(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
            Self::OpenRouter(client) => ProviderExtractor::OpenRouter(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
            Self::Anthropic(client) => ProviderExtractor::Anthropic(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
            Self::Gemini(client) => ProviderExtractor::Gemini(typed_extractor!(
                client.extractor::<T>(model).additional_params(gemini_params()?),
                system_prompt,
                config
            )),
            Self::Ollama(client) => ProviderExtractor::Ollama(typed_extractor!(
                client.extractor::<T>(model),
                system_prompt,
                config
            )),
        })
    }
}

pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    Moonshot(Agent<rig::providers::moonshot::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    Mistral(Agent<rig::providers::mistral::CompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Gemini(Agent<rig::providers::gemini::completion::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 发送单轮prompt，返回模型的原始文本
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        let reply = match self {
            Self::OpenAI(agent) => agent.prompt(prompt).await?,
            Self::Moonshot(agent) => agent.prompt(prompt).await?,
            Self::DeepSeek(agent) => agent.prompt(prompt).await?,
            Self::Mistral(agent) => agent.prompt(prompt).await?,
            Self::OpenRouter(agent) => agent.prompt(prompt).await?,
            Self::Anthropic(agent) => agent.prompt(prompt).await?,
            Self::Gemini(agent) => agent.prompt(prompt).await?,
            Self::Ollama(agent) => agent.prompt(prompt).await?,
        };
        Ok(reply)
    }
}

pub enum ProviderExtractor<T>
where
    T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
{
    OpenAI(Extractor<rig::providers::openai::CompletionModel, T>),
    Moonshot(Extractor<rig::providers::moonshot::CompletionModel, T>),
    DeepSeek(Extractor<rig::providers::deepseek::CompletionModel, T>),
    Mistral(Extractor<rig::providers::mistral::CompletionModel, T>),
    OpenRouter(Extractor<rig::providers::openrouter::CompletionModel, T>),
    Anthropic(Extractor<rig::providers::anthropic::completion::CompletionModel, T>),
    Gemini(Extractor<rig::providers::gemini::completion::CompletionModel, T>),
    Ollama(Extractor<rig::providers::ollama::CompletionModel<reqwest::Client>, T>),
}

impl<T> ProviderExtractor<T>
where
    T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
{
    /// 执行提取，保留rig的错误类型以便区分“没有结构化数据”与调用失败
    pub async fn extract(&self, prompt: &str) -> Result<T, ExtractionError> {
        match self {
            Self::OpenAI(extractor) => extractor.extract(prompt).await,
            Self::Moonshot(extractor) => extractor.extract(prompt).await,
            Self::DeepSeek(extractor) => extractor.extract(prompt).await,
            Self::Mistral(extractor) => extractor.extract(prompt).await,
            Self::OpenRouter(extractor) => extractor.extract(prompt).await,
            Self::Anthropic(extractor) => extractor.extract(prompt).await,
            Self::Gemini(extractor) => extractor.extract(prompt).await,
            Self::Ollama(extractor) => extractor.extract(prompt).await,
        }
    }
}
