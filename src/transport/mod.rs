//! 审阅结果的对外传输：SSE帧编码、HTTP服务与标准输出流

pub mod server;
pub mod sse;

pub use server::{AppState, ReviewRequest, router, serve};
pub use sse::{ReviewStream, ReviewStreamMessage, encode_sse_frame, spawn_review_stream};
