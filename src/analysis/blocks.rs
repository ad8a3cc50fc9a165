use serde::{Deserialize, Serialize};

use super::code_recovery::score_code_line;
use super::patterns::{LIST_LINE, is_heading_like, preview};

pub const DEFAULT_MAX_RAW_BLOCKS: usize = 80;
pub const BLOCK_PREVIEW_CHARS: usize = 96;

const LIST_MIN_LINES: f64 = 2.0;
const LIST_MIN_RATIO: f64 = 0.6;
const HEADING_MAX_CHARS: usize = 80;
const CODE_MIN_AVG_SCORE: f64 = 0.5;
const CODE_MIN_LINES: usize = 2;

const LIST_CONFIDENCE: f64 = 0.78;
const HEADING_CONFIDENCE: f64 = 0.72;
const PARAGRAPH_CONFIDENCE: f64 = 0.55;
const CODE_CONFIDENCE_CAP: f64 = 0.92;

/// 原始块的形态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawBlockKind {
    HeadingCandidate,
    Paragraph,
    ListCandidate,
    CodeCandidate,
}

impl std::fmt::Display for RawBlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            RawBlockKind::HeadingCandidate => "heading_candidate",
            RawBlockKind::Paragraph => "paragraph",
            RawBlockKind::ListCandidate => "list_candidate",
            RawBlockKind::CodeCandidate => "code_candidate",
        };
        write!(f, "{}", str)
    }
}

/// 空行分隔的一段输入文本，行号从1开始且包含两端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub index: usize,
    pub kind: RawBlockKind,
    pub start_line: usize,
    pub end_line: usize,
    pub line_count: usize,
    pub confidence: f64,
    pub preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlocksResult {
    pub blocks: Vec<RawBlock>,
    pub block_count: usize,
    pub heading_count: usize,
    pub paragraph_count: usize,
    pub list_count: usize,
    pub code_count: usize,
    /// 达到块数上限后仍有未解析的内容
    pub truncated: bool,
}

impl RawBlocksResult {
    pub fn count_of(&self, kind: RawBlockKind) -> usize {
        match kind {
            RawBlockKind::HeadingCandidate => self.heading_count,
            RawBlockKind::Paragraph => self.paragraph_count,
            RawBlockKind::ListCandidate => self.list_count,
            RawBlockKind::CodeCandidate => self.code_count,
        }
    }
}

/// 将文本按空行切分为块并逐块分类，最多解析`max_blocks`个块
pub fn parse_raw_blocks(text: &str, max_blocks: usize) -> RawBlocksResult {
    let lines: Vec<&str> = text.lines().collect();
    let mut result = RawBlocksResult::default();
    let mut cursor = 0;

    while cursor < lines.len() {
        if lines[cursor].trim().is_empty() {
            cursor += 1;
            continue;
        }
        if result.blocks.len() >= max_blocks {
            result.truncated = true;
            break;
        }

        let start = cursor;
        while cursor < lines.len() && !lines[cursor].trim().is_empty() {
            cursor += 1;
        }

        let chunk = &lines[start..cursor];
        let (kind, confidence) = classify_chunk(chunk);
        match kind {
            RawBlockKind::HeadingCandidate => result.heading_count += 1,
            RawBlockKind::Paragraph => result.paragraph_count += 1,
            RawBlockKind::ListCandidate => result.list_count += 1,
            RawBlockKind::CodeCandidate => result.code_count += 1,
        }
        result.blocks.push(RawBlock {
            index: result.blocks.len(),
            kind,
            start_line: start + 1,
            end_line: cursor,
            line_count: chunk.len(),
            confidence,
            preview: preview(&chunk.join("\n"), BLOCK_PREVIEW_CHARS),
        });
    }

    result.block_count = result.blocks.len();
    result
}

/// 按优先级分类：列表 > 标题 > 代码 > 段落
fn classify_chunk(chunk: &[&str]) -> (RawBlockKind, f64) {
    let line_count = chunk.len();
    let list_lines = chunk.iter().filter(|line| LIST_LINE.is_match(line)).count();
    let avg_code_score =
        chunk.iter().map(|line| score_code_line(line)).sum::<f64>() / line_count as f64;

    if list_lines as f64 >= LIST_MIN_LINES.max(LIST_MIN_RATIO * line_count as f64) {
        return (RawBlockKind::ListCandidate, LIST_CONFIDENCE);
    }

    if line_count == 1
        && is_heading_like(chunk[0])
        && chunk[0].trim().chars().count() <= HEADING_MAX_CHARS
    {
        return (RawBlockKind::HeadingCandidate, HEADING_CONFIDENCE);
    }

    if avg_code_score >= CODE_MIN_AVG_SCORE && line_count >= CODE_MIN_LINES {
        let confidence = (0.45 + 0.5 * avg_code_score).min(CODE_CONFIDENCE_CAP);
        return (RawBlockKind::CodeCandidate, round2(confidence));
    }

    (RawBlockKind::Paragraph, PARAGRAPH_CONFIDENCE)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
