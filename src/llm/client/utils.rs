use crate::{llm::client::types::TokenUsage, utils::token_estimator::TokenEstimator};

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TOKEN_ESTIMATOR: LazyLock<TokenEstimator> = LazyLock::new(TokenEstimator::new);

/// 估算token使用情况（基于文本长度）
pub fn estimate_token_usage(input_text: &str, output_text: &str) -> TokenUsage {
    // 粗略估算：1个token约等于4个字符（英文）或1.5个字符（中文）
    let input_estimate = TOKEN_ESTIMATOR.estimate_tokens(input_text);
    let output_estimate = TOKEN_ESTIMATOR.estimate_tokens(output_text);
    TokenUsage::new(
        input_estimate.estimated_tokens,
        output_estimate.estimated_tokens,
    )
}

/// 结构化调用时追加到系统提示词末尾的输出约束
pub fn structured_output_instruction(schema: &Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Respond with a single JSON object only, with no prose and no code fences. The object must validate against this JSON Schema:\n{}",
        schema_text
    )
}

/// 严格解析：整段回复（去除首尾空白）必须是一个JSON对象
pub fn parse_structured_output(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```").expect("json fence pattern")
});

/// 宽松解析：依次尝试整段文本、代码围栏内容、首个`{`到最后一个`}`之间的片段
pub fn extract_json_object(text: &str) -> Option<Value> {
    if let Some(value) = parse_structured_output(text) {
        return Some(value);
    }

    for captures in JSON_FENCE.captures_iter(text) {
        if let Some(body) = captures.get(1)
            && let Some(value) = parse_structured_output(body.as_str())
        {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_structured_output(&text[start..=end])
}
