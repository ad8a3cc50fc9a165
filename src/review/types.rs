use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::factual::FactualGuardResult;

use super::router::WorkflowRoute;
use super::usage::UsageSummary;

pub const MAX_KEY_IMPROVEMENTS: usize = 5;
pub const MAX_REWRITE_STEPS: usize = 6;

/// 审阅角色的结构化结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerResult {
    /// Whether the document needs an editing pass.
    #[serde(alias = "needs_edit")]
    pub needs_edit: bool,
    /// One-sentence overall review.
    #[serde(default)]
    pub review: String,
    /// Up to 5 key improvements, most important first.
    #[serde(default, alias = "key_improvements")]
    #[schemars(length(max = 5))]
    pub key_improvements: Vec<String>,
    /// Up to 6 ordered rewrite steps for the editor.
    #[serde(default, alias = "rewrite_plan")]
    #[schemars(length(max = 6))]
    pub rewrite_plan: Vec<String>,
}

impl ReviewerResult {
    /// 去除空白条目并截断到上限
    pub fn normalized(self) -> Self {
        Self {
            needs_edit: self.needs_edit,
            review: self.review.trim().to_string(),
            key_improvements: clean_items(self.key_improvements, MAX_KEY_IMPROVEMENTS),
            rewrite_plan: clean_items(self.rewrite_plan, MAX_REWRITE_STEPS),
        }
    }
}

fn clean_items(items: Vec<String>, limit: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(limit)
        .collect()
}

/// 审阅结论的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerSource {
    Structured,
    RawJson,
    Fallback,
}

/// 合并路由、结构分析与事实核查的诊断信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInsights {
    pub route: WorkflowRoute,
    pub structure_cues: Vec<String>,
    pub has_markdown_signals: bool,
    pub is_likely_unstructured_plain_text: bool,
    pub raw_block_count: usize,
    pub heading_block_count: usize,
    pub paragraph_block_count: usize,
    pub list_block_count: usize,
    pub code_block_count: usize,
    pub recovered_code_block_count: usize,
    pub recovered_code_languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_source: Option<ReviewerSource>,
    pub editor_skipped: bool,
    pub factual: FactualGuardResult,
}

/// 一次审阅请求的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReviewPayload {
    pub review: String,
    pub key_improvements: Vec<String>,
    pub polished_text: String,
    pub changed: bool,
    pub usage: UsageSummary,
    pub tool_insights: ToolInsights,
}
