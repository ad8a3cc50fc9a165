//! 各角色的提示词构建。纯字符串拼装，不调用模型，不截断用户正文。

use crate::analysis::{CodeRecoveryResult, RawBlocksResult, StructureSignals};
use crate::factual::FactualBaseline;
use crate::i18n::TargetLanguage;

use super::types::ReviewerResult;

/// 摘要中最多列出的原始块提示
pub const MAX_BLOCK_HINTS: usize = 12;
/// 摘要中最多列出的代码恢复提示
pub const MAX_CODE_HINTS: usize = 6;
/// 每类事实约束最多列出的条目
pub const MAX_FACT_ITEMS: usize = 20;

const DOCUMENT_OPEN: &str = "<<<DOCUMENT";
const DOCUMENT_CLOSE: &str = "DOCUMENT>>>";

const REVIEWER_SYSTEM_PROMPT: &str = "You are a meticulous editorial reviewer for markdown documents. \
Judge whether the document needs an editing pass for clarity, structure and correctness. \
Set needsEdit to false when the text is already clear and well structured; an unnecessary rewrite is worse than none. \
Never propose changing numbers, URLs or version strings.";

const EDITOR_SYSTEM_PROMPT: &str = "You are a careful copy editor. \
Apply the given rewrite plan to the document and return only the full polished markdown text, with no commentary and no surrounding code fence. \
Keep the document's language, meaning and every factual token (numbers, URLs, version strings) exactly as written.";

const FORMATTER_SYSTEM_PROMPT: &str = "You are a markdown structure formatter. \
The input is plain text whose structure was lost. Restore headings, paragraphs, lists and fenced code blocks using the provided hints. \
Do not reword sentences, do not add or remove content, and keep every number, URL and version string unchanged. \
Return only the formatted markdown text, with no commentary.";

pub fn reviewer_system_prompt(language: TargetLanguage) -> String {
    format!("{}\n{}", REVIEWER_SYSTEM_PROMPT, language.prompt_instruction())
}

pub fn editor_system_prompt() -> String {
    EDITOR_SYSTEM_PROMPT.to_string()
}

pub fn formatter_system_prompt() -> String {
    FORMATTER_SYSTEM_PROMPT.to_string()
}

/// 审阅提示词：结构摘要 + 原文
pub fn build_reviewer_prompt(
    text: &str,
    signals: &StructureSignals,
    raw_blocks: &RawBlocksResult,
) -> String {
    let mut prompt = String::from("Review the document below.\n\n## Structure digest\n");
    prompt.push_str(&format!(
        "- markdown syntax detected: {}\n- paragraph breaks: {}\n- non-empty lines: {}\n- average line length: {:.1}\n",
        yes_no(signals.has_markdown_signals),
        yes_no(signals.has_paragraph_break),
        signals.non_empty_line_count,
        signals.average_line_length,
    ));
    if !signals.cues.is_empty() {
        prompt.push_str(&format!("- structure cues: {}\n", signals.cues.join(", ")));
    }
    prompt.push_str(&format!(
        "- blocks: {} (headings {}, paragraphs {}, lists {}, code {})\n",
        raw_blocks.block_count,
        raw_blocks.heading_count,
        raw_blocks.paragraph_count,
        raw_blocks.list_count,
        raw_blocks.code_count,
    ));

    prompt.push_str("\n## Document\n");
    push_document(&mut prompt, text);
    prompt.push_str(
        "\nReturn needsEdit, a one-sentence review, up to 5 keyImprovements and up to 6 ordered rewritePlan steps.",
    );
    prompt
}

/// 编辑提示词：审阅计划为执行指令，改进要点仅作背景，事实基线为硬约束
pub fn build_editor_prompt(
    text: &str,
    reviewer: &ReviewerResult,
    baseline: &FactualBaseline,
) -> String {
    let mut prompt = String::from("## Rewrite plan (apply these steps in order)\n");
    if reviewer.rewrite_plan.is_empty() {
        prompt.push_str("1. Improve clarity and flow without changing meaning.\n");
    } else {
        for (index, step) in reviewer.rewrite_plan.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", index + 1, step));
        }
    }

    if !reviewer.key_improvements.is_empty() {
        prompt.push_str("\n## Reviewer notes (context only, not instructions)\n");
        for item in &reviewer.key_improvements {
            prompt.push_str(&format!("- {}\n", item));
        }
    }

    if baseline.has_facts() {
        prompt.push_str("\n## Hard constraints (must appear unchanged in the output)\n");
        push_fact_list(&mut prompt, "Numbers", &baseline.numbers);
        push_fact_list(&mut prompt, "URLs", &baseline.urls);
        push_fact_list(&mut prompt, "Versions", &baseline.versions);
    }

    prompt.push_str("\n## Document\n");
    push_document(&mut prompt, text);
    prompt.push_str("\nReturn the complete polished document only.");
    prompt
}

/// 排版提示词：原始块提示 + 代码恢复提示 + 原文
pub fn build_formatter_prompt(
    text: &str,
    raw_blocks: &RawBlocksResult,
    code_recovery: &CodeRecoveryResult,
) -> String {
    let mut prompt = String::from("## Block hints\n");
    if raw_blocks.blocks.is_empty() {
        prompt.push_str("- none\n");
    }
    for block in raw_blocks.blocks.iter().take(MAX_BLOCK_HINTS) {
        prompt.push_str(&format!(
            "- lines {}-{}: {} ({:.2}) \"{}\"\n",
            block.start_line, block.end_line, block.kind, block.confidence, block.preview
        ));
    }
    if raw_blocks.blocks.len() > MAX_BLOCK_HINTS {
        prompt.push_str(&format!(
            "- ... {} more blocks\n",
            raw_blocks.blocks.len() - MAX_BLOCK_HINTS
        ));
    }

    prompt.push_str("\n## Probable code regions\n");
    if code_recovery.suggestions.is_empty() {
        prompt.push_str("- none\n");
    }
    for suggestion in code_recovery.suggestions.iter().take(MAX_CODE_HINTS) {
        let language = if suggestion.language.is_empty() {
            "plain"
        } else {
            suggestion.language.as_str()
        };
        prompt.push_str(&format!(
            "- lines {}-{}: {} ({:.2}) \"{}\"\n",
            suggestion.start_line,
            suggestion.end_line,
            language,
            suggestion.confidence,
            suggestion.preview
        ));
    }

    prompt.push_str("\n## Original text\n");
    push_document(&mut prompt, text);
    prompt.push_str("\nReturn the restored markdown document only.");
    prompt
}

fn push_document(prompt: &mut String, text: &str) {
    prompt.push_str(DOCUMENT_OPEN);
    prompt.push('\n');
    prompt.push_str(text);
    prompt.push('\n');
    prompt.push_str(DOCUMENT_CLOSE);
    prompt.push('\n');
}

fn push_fact_list(prompt: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let shown: Vec<&str> = items
        .iter()
        .take(MAX_FACT_ITEMS)
        .map(String::as_str)
        .collect();
    prompt.push_str(&format!("- {}: {}\n", label, shown.join(", ")));
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
