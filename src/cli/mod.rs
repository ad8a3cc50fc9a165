use crate::config::{Config, LLMProvider};
use crate::i18n::TargetLanguage;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Scribe-RS - 面向原始文稿的结构恢复与审阅引擎
#[derive(Parser, Debug)]
#[command(name = "scribe (scribe-rs)")]
#[command(
    about = "Structure-recovering editorial review engine. It analyzes raw prose with deterministic heuristics, routes it through a reviewer/editor or formatter model pass, and guards numbers, URLs and versions against silent alteration."
)]
#[command(version)]
pub struct Args {
    /// 待审阅的文本文件，未指定时从标准输入读取
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 润色后文本的输出路径
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出完整的审阅结果JSON而不是润色后的正文
    #[arg(long)]
    pub json: bool,

    /// 以SSE帧的形式把审阅进度写到标准输出
    #[arg(long, conflicts_with = "json")]
    pub stream: bool,

    /// 启动HTTP服务而不是处理单个文件
    #[arg(long, conflicts_with_all = ["input", "output", "json", "stream"])]
    pub serve: bool,

    /// 只检查审阅模型的连接后退出
    #[arg(long, conflicts_with_all = ["serve", "json", "stream"])]
    pub check_connection: bool,

    /// HTTP服务监听地址
    #[arg(long)]
    pub bind: Option<String>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，默认用于审阅角色
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，默认用于编辑与排版角色
    #[arg(long)]
    pub model_powerful: Option<String>,

    #[arg(long)]
    pub reviewer_model: Option<String>,

    #[arg(long)]
    pub editor_model: Option<String>,

    #[arg(long)]
    pub formatter_model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 单次模型调用的超时时间（秒）
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// 原始分块的最大数量
    #[arg(long)]
    pub max_raw_blocks: Option<usize>,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 审阅意见的语言 (zh, en, ja, ko, de, fr, ru)
    #[arg(long)]
    pub target_language: Option<String>,
}

impl Args {
    /// 将CLI参数转换为配置，命令行参数覆盖配置文件
    pub fn into_config(self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(timeout_seconds) = self.timeout_seconds {
            config.llm.timeout_seconds = timeout_seconds;
        }

        // 角色模型覆盖
        if self.reviewer_model.is_some() {
            config.agents.reviewer = self.reviewer_model;
        }
        if self.editor_model.is_some() {
            config.agents.editor = self.editor_model;
        }
        if self.formatter_model.is_some() {
            config.agents.formatter = self.formatter_model;
        }

        if let Some(max_raw_blocks) = self.max_raw_blocks {
            config.review.max_raw_blocks = max_raw_blocks.max(1);
        }
        if let Some(target_language_str) = self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.review.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用默认语言 (English)",
                    target_language_str
                );
            }
        }

        if let Some(bind) = self.bind {
            config.server.bind_addr = bind;
        }
        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}
