//! 审阅进度的SSE编码与后台流

use anyhow::anyhow;
use futures::Stream;
use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::stream::StreamExt;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::review::{AiReviewPayload, ReviewError, ReviewOrchestrator, StageEvent};

/// 流上的一条消息：若干`stage`之后恰好一条`result`或`error`
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewStreamMessage {
    Stage(StageEvent),
    Result(Box<AiReviewPayload>),
    Error(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl ReviewStreamMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ReviewStreamMessage::Stage(_) => "stage",
            ReviewStreamMessage::Result(_) => "result",
            ReviewStreamMessage::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStreamMessage::Stage(_))
    }

    /// 单行JSON数据
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            ReviewStreamMessage::Stage(event) => serde_json::to_string(event),
            ReviewStreamMessage::Result(payload) => serde_json::to_string(payload),
            ReviewStreamMessage::Error(message) => serde_json::to_string(&ErrorBody { message }),
        }
    }

    /// 完整SSE帧：事件名一行、数据一行、空行结束
    pub fn to_frame(&self) -> serde_json::Result<String> {
        Ok(encode_sse_frame(self.event_name(), &self.data()?))
    }
}

pub fn encode_sse_frame(event: &str, data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

/// 后台审阅任务的消息流。被丢弃时取消审阅
pub struct ReviewStream {
    receiver: UnboundedReceiver<ReviewStreamMessage>,
    _guard: DropGuard,
}

impl Stream for ReviewStream {
    type Item = ReviewStreamMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_next_unpin(cx)
    }
}

/// 在后台任务中运行审阅，并把阶段事件与最终结果送入流
pub fn spawn_review_stream(
    orchestrator: ReviewOrchestrator,
    text: String,
    cancel: CancellationToken,
) -> ReviewStream {
    let (sender, receiver) = mpsc::unbounded();
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let stage_sender = sender.clone();
        let worker = tokio::spawn(async move {
            // 消费端已关闭时发送失败，直接忽略
            let observer = move |event: &StageEvent| {
                let _ = stage_sender.unbounded_send(ReviewStreamMessage::Stage(event.clone()));
            };
            orchestrator.run(&text, &observer, &task_cancel).await
        });

        let outcome = match worker.await {
            Ok(result) => result,
            Err(join_error) => Err(ReviewError::from(join_error)),
        };
        let message = match outcome {
            Ok(payload) => ReviewStreamMessage::Result(Box::new(payload)),
            Err(err) => {
                debug!(error = %err, "review stream ended with error");
                ReviewStreamMessage::Error(err.to_string())
            }
        };
        let _ = sender.unbounded_send(message);
    });

    ReviewStream {
        receiver,
        _guard: cancel.drop_guard(),
    }
}

/// 把流逐帧写入`writer`，返回最终的结果消息
///
/// 写入失败（例如管道已关闭）时触发`cancel`并停止，不视为错误。
pub async fn write_frames<W>(
    mut stream: ReviewStream,
    writer: &mut W,
    cancel: &CancellationToken,
) -> serde_json::Result<Option<ReviewStreamMessage>>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = stream.next().await {
        let frame = message.to_frame()?;
        let written = async {
            writer.write_all(frame.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = written {
            warn!(error = %err, "output closed, cancelling review");
            cancel.cancel();
            return Ok(None);
        }
        if message.is_terminal() {
            return Ok(Some(message));
        }
    }
    Ok(None)
}

/// 把`write_frames`的最终消息转换为命令行的退出结果：`error`帧视为失败，输出提前关闭时没有结果
pub fn stream_outcome(
    last: Option<ReviewStreamMessage>,
) -> anyhow::Result<Option<Box<AiReviewPayload>>> {
    match last {
        Some(ReviewStreamMessage::Result(payload)) => Ok(Some(payload)),
        Some(ReviewStreamMessage::Error(message)) => Err(anyhow!("review failed: {}", message)),
        Some(ReviewStreamMessage::Stage(_)) | None => Ok(None),
    }
}
