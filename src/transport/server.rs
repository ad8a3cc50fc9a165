use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::review::{AiReviewPayload, NoopObserver, ReviewError, ReviewOrchestrator};

use super::sse::{ReviewStreamMessage, spawn_review_stream};

const KEEP_ALIVE_SECONDS: u64 = 15;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ReviewOrchestrator,
}

/// 审阅请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub text: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/review", post(review))
        .route("/api/review/stream", post(review_stream))
        .with_state(state)
}

/// 启动HTTP服务，`shutdown`触发后优雅退出
pub async fn serve(bind_addr: &str, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context(format!("Failed to bind {}", bind_addr))?;
    info!(addr = %bind_addr, "review server listening");
    println!("🌐 审阅服务已启动: http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Review server terminated unexpectedly")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn review(
    State(state): State<AppState>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<AiReviewPayload>, (StatusCode, Json<Value>)> {
    let request_id = Uuid::new_v4();
    info!(%request_id, chars = request.text.chars().count(), "review request");
    let cancel = CancellationToken::new();
    // 客户端断开时axum会丢弃该future，guard随之取消审阅
    let _guard = cancel.clone().drop_guard();

    match state
        .orchestrator
        .run(&request.text, &NoopObserver, &cancel)
        .await
    {
        Ok(payload) => Ok(Json(payload)),
        Err(ReviewError::Cancelled) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "review cancelled" })),
        )),
        Err(err) => {
            warn!(%request_id, error = %err, "review failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": err.to_string() })),
            ))
        }
    }
}

async fn review_stream(
    State(state): State<AppState>,
    Json(request): Json<ReviewRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request_id = Uuid::new_v4();
    info!(%request_id, chars = request.text.chars().count(), "streaming review request");
    let stream = spawn_review_stream(state.orchestrator, request.text, CancellationToken::new())
        .map(|message| Ok(to_event(&message)));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECONDS)))
}

fn to_event(message: &ReviewStreamMessage) -> Event {
    let data = message.data().unwrap_or_else(|err| {
        json!({ "message": format!("failed to encode {}: {}", message.event_name(), err) })
            .to_string()
    });
    Event::default().event(message.event_name()).data(data)
}
