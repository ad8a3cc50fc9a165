use serde::{Deserialize, Serialize};

use super::patterns::{
    CODE_CUE_LINE, INLINE_LIST_CUE, MD_BLOCKQUOTE, MD_FENCE, MD_HEADING, MD_LINK, MD_LIST,
    MD_TABLE_ROW, PARAGRAPH_BREAK, is_heading_like,
};

/// 结构信号阈值。这些常量决定了工作流分支，调整前需要整体回归。
pub struct SignalThresholds;

impl SignalThresholds {
    pub const VERY_LONG_MAX_LINES: usize = 2;
    pub const VERY_LONG_MIN_CHARS: usize = 160;
    pub const NO_BREAK_MIN_AVG_LINE: f64 = 100.0;
    pub const NO_BREAK_MIN_CHARS: usize = 220;
    pub const HEADING_LIKE_MIN_LINES: usize = 2;
    pub const HEADING_LIKE_MIN_NON_EMPTY: usize = 4;
    pub const CODE_CUE_MIN_LINES: usize = 2;
    pub const INLINE_LIST_MIN_CUES: usize = 3;
    pub const LONG_NO_MARKDOWN_MIN_CHARS: usize = 400;
    pub const LONG_NO_MARKDOWN_MIN_LINES: usize = 3;
}

/// 启发式规则命中的线索名称
pub struct StructureCue;

impl StructureCue {
    pub const VERY_LONG_LINES: &'static str = "very-long-lines";
    pub const NO_PARAGRAPH_BREAKS: &'static str = "no-paragraph-breaks";
    pub const HEADING_LIKE_LINES: &'static str = "heading-like-lines";
    pub const CODE_OR_LIST_CUES: &'static str = "code-or-list-cues";
    pub const LONG_WITHOUT_MARKDOWN: &'static str = "long-without-markdown";
}

/// 单次请求输入文本的结构信号快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSignals {
    pub has_markdown_signals: bool,
    pub has_paragraph_break: bool,
    pub is_likely_unstructured_plain_text: bool,
    pub non_empty_line_count: usize,
    pub average_line_length: f64,
    pub heading_like_line_count: usize,
    pub code_cue_line_count: usize,
    pub inline_list_cue_count: usize,
    pub cues: Vec<String>,
}

impl StructureSignals {
    pub fn has_cue(&self, cue: &str) -> bool {
        self.cues.iter().any(|c| c == cue)
    }
}

/// 检测是否存在任意Markdown语法
pub fn has_markdown_signals(text: &str) -> bool {
    [
        &*MD_HEADING,
        &*MD_LIST,
        &*MD_FENCE,
        &*MD_BLOCKQUOTE,
        &*MD_LINK,
        &*MD_TABLE_ROW,
    ]
    .iter()
    .any(|probe| probe.is_match(text))
}

/// 分析文本的结构信号，纯函数，空文本返回全零结果
pub fn analyze_structure_signals(text: &str) -> StructureSignals {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return StructureSignals::default();
    }

    let has_markdown = has_markdown_signals(trimmed);
    let has_paragraph_break = PARAGRAPH_BREAK.is_match(trimmed);

    let lines: Vec<&str> = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let non_empty = lines.len();
    let total_line_chars: usize = lines.iter().map(|line| line.chars().count()).sum();
    let average_line_length = if non_empty == 0 {
        0.0
    } else {
        total_line_chars as f64 / non_empty as f64
    };
    let heading_like = lines.iter().filter(|line| is_heading_like(line)).count();
    let code_cues = lines
        .iter()
        .filter(|line| CODE_CUE_LINE.is_match(line))
        .count();
    let inline_list_cues = INLINE_LIST_CUE.find_iter(trimmed).count();
    let total_chars = trimmed.chars().count();

    let mut cues = Vec::new();
    if non_empty <= SignalThresholds::VERY_LONG_MAX_LINES
        && total_chars >= SignalThresholds::VERY_LONG_MIN_CHARS
    {
        cues.push(StructureCue::VERY_LONG_LINES.to_string());
    }
    if !has_paragraph_break
        && average_line_length >= SignalThresholds::NO_BREAK_MIN_AVG_LINE
        && total_chars >= SignalThresholds::NO_BREAK_MIN_CHARS
    {
        cues.push(StructureCue::NO_PARAGRAPH_BREAKS.to_string());
    }
    if heading_like >= SignalThresholds::HEADING_LIKE_MIN_LINES
        && non_empty >= SignalThresholds::HEADING_LIKE_MIN_NON_EMPTY
        && !has_paragraph_break
    {
        cues.push(StructureCue::HEADING_LIKE_LINES.to_string());
    }
    if code_cues >= SignalThresholds::CODE_CUE_MIN_LINES
        || inline_list_cues >= SignalThresholds::INLINE_LIST_MIN_CUES
    {
        cues.push(StructureCue::CODE_OR_LIST_CUES.to_string());
    }
    if !has_markdown
        && !has_paragraph_break
        && total_chars >= SignalThresholds::LONG_NO_MARKDOWN_MIN_CHARS
        && non_empty >= SignalThresholds::LONG_NO_MARKDOWN_MIN_LINES
    {
        cues.push(StructureCue::LONG_WITHOUT_MARKDOWN.to_string());
    }

    StructureSignals {
        has_markdown_signals: has_markdown,
        has_paragraph_break,
        is_likely_unstructured_plain_text: !has_markdown && !cues.is_empty(),
        non_empty_line_count: non_empty,
        average_line_length,
        heading_like_line_count: heading_like,
        code_cue_line_count: code_cues,
        inline_list_cue_count: inline_list_cues,
        cues,
    }
}
