//! 代码块恢复：对疑似代码、日志、配置的区域补全围栏

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::blocks::round2;
use super::patterns::{
    CODE_PUNCT_OR_KEYWORD, INDENT_2, INDENT_4, LIST_LINE, SHELL_PROMPT, TERMINAL_PUNCT,
    is_fence_line, preview,
};

const SHELL_WEIGHT: f64 = 0.55;
const PUNCT_WEIGHT: f64 = 0.4;
const INDENT_WEIGHT: f64 = 0.35;
const LIST_PENALTY: f64 = 0.2;
const PROSE_PENALTY: f64 = 0.2;

const START_INDENTED_MIN_SCORE: f64 = 0.5;
const START_STRONG_SCORE: f64 = 0.7;
const START_PAIR_SCORE: f64 = 0.45;
const START_PAIR_NEXT_SCORE: f64 = 0.35;
const EXTEND_MIN_SCORE: f64 = 0.33;
const EXTEND_ACROSS_BLANK_SCORE: f64 = 0.4;

const LANGUAGE_BONUS: f64 = 0.05;
const CONFIDENCE_CAP: f64 = 0.95;
pub const SUGGESTION_PREVIEW_CHARS: usize = 80;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("language fingerprint must compile")
}

static JSON_PAIR: LazyLock<Regex> = LazyLock::new(|| compile(r#""[^"\n]+"\s*:"#));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)</?(?:html|head|body|div|span|p|a|ul|ol|li|table|tr|td|section|header|footer|img|form|input|button|h[1-6])\b[^>]*>")
});
static JS_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:function|const|let|var|return)\b|=>"));
static PYTHON: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^\s*(?:def\s+\w+\s*\(.*\)\s*(?:->\s*[^:]+)?:\s*$|class\s+\w+(?:\(.*\))?:\s*$|from\s+[\w.]+\s+import\s+\w+|import\s+[\w.]+\s*$|elif\b|print\()|\bself\.\w+")
});
static GO: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?m)^\s*package\s+\w+\s*$|\bfunc\s+(?:\(\w+\s+\*?\w+\)\s*)?\w+\s*\(|\w+\s*:=\s*|\bfmt\.\w+\(")
});
static RUST: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\bfn\s+\w+\s*[<(]|\blet\s+mut\b|\bimpl\b|\bpub\s+(?:fn|struct|enum|mod|trait)\b|\w+!\(|&mut\s|\bOption<|\bResult<")
});
static CSHARP: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\busing\s+System\b|\bnamespace\s+[\w.]+|\bpublic\s+(?:class|static|void|async\s+Task)\b|\bConsole\.Write")
});
static SQL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?im)^\s*(?:SELECT\s+.+\s+FROM|SELECT\b|INSERT\s+INTO|UPDATE\s+\w+\s+SET|DELETE\s+FROM|CREATE\s+(?:TABLE|INDEX|VIEW)|ALTER\s+TABLE)\b")
});
static CSS_RULE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^\s*[.#]?[\w\-\[\]=:>+~*\s,]+\{"));
static CSS_DECL: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*[\w-]+\s*:\s*[^;{}]+;"));
static GENERIC_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:import|export|interface|type|const|let|function|require)\b")
});
static YAML_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?:-\s+)?[\w.\-]+:(?:\s+\S.*)?\s*$"));

/// 一个被判定为代码并补全围栏的区域，行号指向原文，从1开始
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecoverySuggestion {
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub confidence: f64,
    pub preview: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecoveryResult {
    pub changed: bool,
    pub recovered_block_count: usize,
    pub suggestions: Vec<CodeRecoverySuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_text: Option<String>,
}

/// 恢复选项
#[derive(Debug, Clone, Copy)]
pub struct CodeRecoveryOptions {
    /// 是否在结果中附带完整改写后的文本
    pub include_text: bool,
}

impl Default for CodeRecoveryOptions {
    fn default() -> Self {
        Self { include_text: true }
    }
}

/// 单行的代码可能性评分，范围[0, 1]
pub fn score_code_line(line: &str) -> f64 {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return 0.0;
    }

    let mut score: f64 = 0.0;
    if SHELL_PROMPT.is_match(line) {
        score += SHELL_WEIGHT;
    }
    let has_code_punct = CODE_PUNCT_OR_KEYWORD.is_match(line);
    if has_code_punct {
        score += PUNCT_WEIGHT;
    }
    if INDENT_4.is_match(line) {
        score += INDENT_WEIGHT;
    }
    if LIST_LINE.is_match(line) {
        score -= LIST_PENALTY;
    }
    if TERMINAL_PUNCT.is_match(line) && !has_code_punct {
        score -= PROSE_PENALTY;
    }
    score.clamp(0.0, 1.0)
}

/// 按优先级推断代码块语言，无法判断时返回空字符串
pub fn detect_code_language(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let language = if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && JSON_PAIR.is_match(trimmed)
    {
        "json"
    } else if trimmed.lines().any(|line| SHELL_PROMPT.is_match(line)) {
        "bash"
    } else if HTML_TAG.is_match(trimmed) && !JS_KEYWORDS.is_match(trimmed) {
        "html"
    } else if PYTHON.is_match(trimmed) && !trimmed.contains(';') {
        "python"
    } else if GO.is_match(trimmed) && !RUST.is_match(trimmed) {
        "go"
    } else if RUST.is_match(trimmed) {
        "rust"
    } else if CSHARP.is_match(trimmed) {
        "csharp"
    } else if SQL.is_match(trimmed) {
        "sql"
    } else if CSS_RULE.is_match(trimmed) && CSS_DECL.is_match(trimmed) {
        "css"
    } else if GENERIC_KEYWORDS.is_match(trimmed) {
        "javascript"
    } else if !trimmed.contains('{')
        && !trimmed.contains('}')
        && trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .all(|line| YAML_LINE.is_match(line))
    {
        "yaml"
    } else {
        ""
    };
    language.to_string()
}

/// 扫描全文，为未围栏的代码区域插入带语言标记的围栏
///
/// 已有围栏内的内容原样保留；输出仅在插入了新围栏时与输入不同。
pub fn recover_code_blocks(text: &str, options: CodeRecoveryOptions) -> CodeRecoveryResult {
    let lines: Vec<&str> = text.split('\n').collect();
    let scores: Vec<f64> = lines.iter().map(|line| score_code_line(line)).collect();
    let score_at = |index: usize| scores.get(index).copied().unwrap_or(0.0);

    let mut output: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut suggestions = Vec::new();
    let mut in_fence = false;
    let mut cursor = 0;

    while cursor < lines.len() {
        let line = lines[cursor];

        if is_fence_line(line) {
            in_fence = !in_fence;
            output.push(line.to_string());
            cursor += 1;
            continue;
        }
        if in_fence || !starts_code_block(line, score_at(cursor), score_at(cursor + 1)) {
            output.push(line.to_string());
            cursor += 1;
            continue;
        }

        let start = cursor;
        let mut end = cursor;
        while end + 1 < lines.len() && extends_code_block(&lines, &scores, end + 1) {
            end += 1;
        }

        let block = &lines[start..=end];
        let joined = block
            .iter()
            .map(|line| line.trim_end_matches('\r'))
            .collect::<Vec<_>>()
            .join("\n");
        let language = detect_code_language(&joined);

        let scored: Vec<f64> = (start..=end)
            .filter(|index| !lines[*index].trim().is_empty())
            .map(|index| scores[index])
            .collect();
        let mean = scored.iter().sum::<f64>() / scored.len().max(1) as f64;
        let bonus = if language.is_empty() { 0.0 } else { LANGUAGE_BONUS };
        let confidence = round2((mean + bonus).min(CONFIDENCE_CAP));

        output.push(format!("```{}", language));
        output.extend(block.iter().map(|line| line.to_string()));
        output.push("```".to_string());

        suggestions.push(CodeRecoverySuggestion {
            start_line: start + 1,
            end_line: end + 1,
            language,
            confidence,
            preview: preview(&joined, SUGGESTION_PREVIEW_CHARS),
        });
        cursor = end + 1;
    }

    let recovered = output.join("\n");
    let changed = recovered != text;
    CodeRecoveryResult {
        changed,
        recovered_block_count: suggestions.len(),
        suggestions,
        recovered_text: options.include_text.then_some(recovered),
    }
}

fn starts_code_block(line: &str, score: f64, next_score: f64) -> bool {
    if line.trim().is_empty() || LIST_LINE.is_match(line) {
        return false;
    }
    (INDENT_4.is_match(line) && score >= START_INDENTED_MIN_SCORE)
        || SHELL_PROMPT.is_match(line)
        || score >= START_STRONG_SCORE
        || (score >= START_PAIR_SCORE && next_score >= START_PAIR_NEXT_SCORE)
}

fn extends_code_block(lines: &[&str], scores: &[f64], index: usize) -> bool {
    let line = lines[index];
    if is_fence_line(line) {
        return false;
    }
    if line.trim().is_empty() {
        return lines
            .get(index + 1)
            .is_some_and(|next| !is_fence_line(next))
            && scores.get(index + 1).copied().unwrap_or(0.0) >= EXTEND_ACROSS_BLANK_SCORE;
    }
    scores[index] >= EXTEND_MIN_SCORE || INDENT_2.is_match(line)
}
