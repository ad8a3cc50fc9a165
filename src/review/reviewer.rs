use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::client::utils::extract_json_object;
use crate::llm::{AgentError, GenerationRequest, TextGenerator};

use super::error::{ReviewError, propagate_cancel};
use super::types::{ReviewerResult, ReviewerSource};
use super::usage::AgentTokenUsage;

/// 审阅调用留下的原始材料，供提取链逐级尝试
#[derive(Debug, Clone, Default)]
pub struct ReviewerAttempt {
    pub structured: Option<Value>,
    pub text: Option<String>,
}

/// 审阅结论及其来源
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewerOutcome {
    pub result: ReviewerResult,
    pub source: ReviewerSource,
    /// 降级时的说明，进入阶段事件
    pub note: Option<String>,
}

type Extractor = fn(&ReviewerAttempt) -> Option<ReviewerResult>;

/// 按顺序尝试，首个成功者胜出；全部失败时使用保守兜底
pub const EXTRACTION_CHAIN: [(ReviewerSource, Extractor); 2] = [
    (ReviewerSource::Structured, from_structured_output),
    (ReviewerSource::RawJson, from_raw_json),
];

pub fn from_structured_output(attempt: &ReviewerAttempt) -> Option<ReviewerResult> {
    let value = attempt.structured.as_ref()?;
    serde_json::from_value::<ReviewerResult>(value.clone())
        .ok()
        .map(ReviewerResult::normalized)
}

pub fn from_raw_json(attempt: &ReviewerAttempt) -> Option<ReviewerResult> {
    let value = extract_json_object(attempt.text.as_deref()?)?;
    serde_json::from_value::<ReviewerResult>(value)
        .ok()
        .map(ReviewerResult::normalized)
}

/// 审阅失败时的保守结论：不触发编辑
pub fn fallback_reviewer_result() -> ReviewerResult {
    ReviewerResult {
        needs_edit: false,
        review: "Automatic review was unavailable, so the document was left unchanged.".to_string(),
        key_improvements: vec![
            "Re-read the document for clarity and consistent terminology.".to_string(),
        ],
        rewrite_plan: vec!["Keep the current text; no automated edits were applied.".to_string()],
    }
}

pub fn extract_reviewer_result(attempt: &ReviewerAttempt) -> (ReviewerResult, ReviewerSource) {
    EXTRACTION_CHAIN
        .iter()
        .find_map(|(source, extract)| extract(attempt).map(|result| (result, *source)))
        .unwrap_or_else(|| (fallback_reviewer_result(), ReviewerSource::Fallback))
}

/// 执行审阅调用。取消之外的任何失败都降级为兜底结论
pub async fn run_reviewer(
    generator: &dyn TextGenerator,
    request: GenerationRequest,
    cancel: &CancellationToken,
    usage: &mut AgentTokenUsage,
) -> Result<ReviewerOutcome, ReviewError> {
    let (attempt, failure) = match generator.generate(request, cancel).await {
        Ok(generation) => {
            usage.record(Some(&generation.usage));
            let attempt = ReviewerAttempt {
                structured: generation.structured,
                text: Some(generation.text),
            };
            (attempt, None)
        }
        Err(err) => {
            propagate_cancel(&err)?;
            usage.record(err.usage().as_ref());
            let failure = err.to_string();
            let attempt = match err {
                AgentError::NoStructuredOutput { text, .. } => ReviewerAttempt {
                    structured: None,
                    text: Some(text),
                },
                _ => ReviewerAttempt::default(),
            };
            (attempt, Some(failure))
        }
    };

    let (result, source) = extract_reviewer_result(&attempt);
    let note = match (source, failure) {
        (ReviewerSource::Fallback, Some(failure)) => {
            warn!(%failure, "reviewer failed, using fallback verdict");
            Some(format!("Reviewer unavailable ({}); used a conservative verdict.", failure))
        }
        (ReviewerSource::Fallback, None) => {
            warn!("reviewer output could not be parsed, using fallback verdict");
            Some("Reviewer output could not be parsed; used a conservative verdict.".to_string())
        }
        (ReviewerSource::RawJson, _) => {
            debug!("reviewer verdict recovered from raw text");
            None
        }
        _ => None,
    };

    Ok(ReviewerOutcome {
        result,
        source,
        note,
    })
}
