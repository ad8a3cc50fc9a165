use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scribe_rs::cli::Args;
use scribe_rs::config::Config;
use scribe_rs::llm::{AgentRole, LLMClient};
use scribe_rs::review::{
    ReviewOrchestrator, ReviewSettings, StageAgent, StageEvent, StageStatus,
};
use scribe_rs::transport::sse::{stream_outcome, write_frames};
use scribe_rs::transport::{AppState, serve, spawn_review_stream};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let input = args.input.clone();
    let output = args.output.clone();
    let (json, stream, serve_mode) = (args.json, args.stream, args.serve);
    let check_connection = args.check_connection;
    let config = args.into_config()?;

    init_tracing(config.verbose);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            ctrl_c_cancel.cancel();
        }
    });

    if check_connection {
        let client = LLMClient::new(config.llm.clone())?;
        return client.check_connection(&config.model_for(AgentRole::Reviewer)).await;
    }

    let orchestrator = build_orchestrator(&config)?;

    if serve_mode {
        return serve(
            &config.server.bind_addr,
            AppState { orchestrator },
            cancel,
        )
        .await;
    }

    let text = read_input(input.as_deref()).await?;

    if stream {
        let review_stream = spawn_review_stream(orchestrator, text, cancel.clone());
        let mut stdout = tokio::io::stdout();
        let last = write_frames(review_stream, &mut stdout, &cancel).await?;
        if let (Some(payload), Some(path)) = (stream_outcome(last)?, output.as_deref()) {
            write_output(path, &payload.polished_text).await?;
        }
        return Ok(());
    }

    let observer = |event: &StageEvent| print_stage(event);
    let payload = orchestrator.run(&text, &observer, &cancel).await?;

    if let Some(path) = output.as_deref() {
        write_output(path, &payload.polished_text).await?;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if output.is_none() {
        println!("{}", payload.polished_text);
    }

    let factual = &payload.tool_insights.factual;
    eprintln!(
        "✅ 审阅完成: route={}, changed={}, factual risk={}, tokens={}",
        payload.tool_insights.route, payload.changed, factual.risk_level, payload.usage.total.total_tokens
    );
    for warning in &factual.warnings {
        eprintln!("⚠️ {}", warning);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "warn,scribe_rs=debug"
    } else {
        "warn,scribe_rs=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();
}

fn build_orchestrator(config: &Config) -> Result<ReviewOrchestrator> {
    let client = LLMClient::new(config.llm.clone())?;
    let settings = ReviewSettings::from_config(config);
    info!(
        provider = %config.llm.provider,
        reviewer = %settings.reviewer_model,
        editor = %settings.editor_model,
        formatter = %settings.formatter_model,
        "orchestrator ready"
    );
    Ok(ReviewOrchestrator::new(Arc::new(client), settings))
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read input file: {:?}", path)),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn write_output(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .context(format!("Failed to write output file: {:?}", path))?;
    eprintln!("💾 已写入: {}", path.display());
    Ok(())
}

fn print_stage(event: &StageEvent) {
    let icon = match (event.agent, event.status) {
        (StageAgent::Reviewer, StageStatus::Started) => "🔍",
        (StageAgent::Editor, StageStatus::Started) => "✍️",
        (_, StageStatus::Completed) => "✔️",
    };
    match &event.usage {
        Some(usage) => eprintln!(
            "{} [{}] {} (tokens: {})",
            icon, event.agent, event.message, usage.total_tokens
        ),
        None => eprintln!("{} [{}] {}", icon, event.agent, event.message),
    }
}
