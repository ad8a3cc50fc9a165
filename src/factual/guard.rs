use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use super::baseline::{
    AllFacts, FactualBaseline, MAX_NUMBERS, MAX_URLS, MAX_VERSIONS, normalize_text, tokenize,
};

/// 风险判定阈值
pub struct RiskThresholds;

impl RiskThresholds {
    pub const HIGH_MISSING_NUMBERS: usize = 3;
    pub const HIGH_MIN_SIMILARITY: f64 = 0.45;
    pub const MEDIUM_ADDED_NUMBERS: usize = 2;
    pub const MEDIUM_MIN_SIMILARITY: f64 = 0.62;
    pub const MEDIUM_MAX_LENGTH_DELTA: f64 = 0.7;
}

/// 事实改写风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 每个风险等级对应一条固定建议
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Factual content appears preserved; the polished text is safe to apply.",
            RiskLevel::Medium => {
                "Some numbers or wording changed; compare the highlighted facts before applying."
            }
            RiskLevel::High => {
                "Facts such as URLs, versions or numbers may have been altered; review manually before applying."
            }
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// 候选文本与事实基线的比对结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactualGuardResult {
    pub risk_level: RiskLevel,
    pub similarity: f64,
    pub length_delta: f64,
    pub missing_numbers: Vec<String>,
    pub added_numbers: Vec<String>,
    pub missing_urls: Vec<String>,
    pub added_urls: Vec<String>,
    pub missing_versions: Vec<String>,
    pub added_versions: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendation: String,
}

impl FactualGuardResult {
    /// 候选文本与原文一致时的固定结果：零风险、无警告
    pub fn unchanged() -> Self {
        Self {
            risk_level: RiskLevel::Low,
            similarity: 1.0,
            length_delta: 0.0,
            missing_numbers: Vec::new(),
            added_numbers: Vec::new(),
            missing_urls: Vec::new(),
            added_urls: Vec::new(),
            missing_versions: Vec::new(),
            added_versions: Vec::new(),
            warnings: Vec::new(),
            recommendation: RiskLevel::Low.recommendation().to_string(),
        }
    }
}

/// 将候选文本与原文基线比对，给出风险等级与差异
pub fn evaluate_factual_risk(baseline: &FactualBaseline, candidate: &str) -> FactualGuardResult {
    let candidate_tokens = tokenize(candidate);
    let similarity = jaccard_similarity(&baseline.tokens, &candidate_tokens);

    let original_len = baseline.normalized_text.chars().count();
    let candidate_len = normalize_text(candidate).chars().count();
    let length_delta = candidate_len.abs_diff(original_len) as f64 / original_len.max(1) as f64;

    // 基线有上限，两侧的比对对象都不截断，只截断报告出来的新增项
    let candidate_facts = AllFacts::from_text(candidate);
    let original_facts = AllFacts::from_text(&baseline.normalized_text);

    let missing_numbers = directional_diff(&baseline.numbers, &candidate_facts.numbers);
    let mut added_numbers = directional_diff(&candidate_facts.numbers, &original_facts.numbers);
    added_numbers.truncate(MAX_NUMBERS);
    let missing_urls = directional_diff(&baseline.urls, &candidate_facts.urls);
    let mut added_urls = directional_diff(&candidate_facts.urls, &original_facts.urls);
    added_urls.truncate(MAX_URLS);
    let missing_versions = directional_diff(&baseline.versions, &candidate_facts.versions);
    let mut added_versions = directional_diff(&candidate_facts.versions, &original_facts.versions);
    added_versions.truncate(MAX_VERSIONS);

    let risk_level = if !missing_urls.is_empty()
        || !missing_versions.is_empty()
        || missing_numbers.len() >= RiskThresholds::HIGH_MISSING_NUMBERS
        || similarity < RiskThresholds::HIGH_MIN_SIMILARITY
    {
        RiskLevel::High
    } else if !missing_numbers.is_empty()
        || added_numbers.len() > RiskThresholds::MEDIUM_ADDED_NUMBERS
        || similarity < RiskThresholds::MEDIUM_MIN_SIMILARITY
        || length_delta > RiskThresholds::MEDIUM_MAX_LENGTH_DELTA
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let mut warnings = Vec::new();
    if !missing_urls.is_empty() {
        warnings.push(format!(
            "URLs from the original are missing: {}",
            missing_urls.join(", ")
        ));
    }
    if !missing_versions.is_empty() {
        warnings.push(format!(
            "Version strings from the original are missing: {}",
            missing_versions.join(", ")
        ));
    }
    if missing_numbers.len() >= RiskThresholds::HIGH_MISSING_NUMBERS {
        warnings.push(format!(
            "{} numbers from the original are missing: {}",
            missing_numbers.len(),
            missing_numbers.join(", ")
        ));
    }
    if similarity < RiskThresholds::HIGH_MIN_SIMILARITY {
        warnings.push(format!(
            "Wording diverges heavily from the original (similarity {:.2}).",
            similarity
        ));
    }

    FactualGuardResult {
        risk_level,
        similarity: round3(similarity),
        length_delta: round3(length_delta),
        missing_numbers,
        added_numbers,
        missing_urls,
        added_urls,
        missing_versions,
        added_versions,
        warnings,
        recommendation: risk_level.recommendation().to_string(),
    }
}

/// 词级Jaccard相似度，两侧均为空时视为完全相同
pub fn jaccard_similarity(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.union(right).count();
    intersection as f64 / union as f64
}

/// `from`中存在而`against`中不存在的条目（忽略大小写）
fn directional_diff(from: &[String], against: &[String]) -> Vec<String> {
    let against: HashSet<String> = against.iter().map(|item| item.to_lowercase()).collect();
    from.iter()
        .filter(|item| !against.contains(&item.to_lowercase()))
        .cloned()
        .collect()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
