//! 启发式规则共享的正则与谓词

use regex::Regex;
use std::sync::LazyLock;

use crate::utils::token_estimator::is_cjk_char;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("heuristic pattern must compile")
}

// Markdown语法探针
pub static MD_HEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s{0,3}#{1,6}\s+\S"));
pub static MD_LIST: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^\s{0,3}(?:[-*+]|\d{1,3}[.)])\s+\S"));
pub static MD_FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s{0,3}(?:```|~~~)"));
pub static MD_BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s{0,3}>"));
pub static MD_LINK: LazyLock<Regex> = LazyLock::new(|| compile(r"!?\[[^\]]+\]\([^)\s]+\)"));
pub static MD_TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*\|.+\|\s*$"));

pub static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| compile(r"\n[ \t]*\r?\n"));

/// 单行的代码/命令线索
pub static CODE_CUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"^\s*(?:```|~~~)",
        r"|^\s*(?:\$|>>>|PS [^>]*>)\s+\S",
        r"|[{};]\s*$|=>|->|::|==|!=|&&|\|\|",
        r"|^\s*(?:sudo\s+)?(?:npm|npx|pnpm|yarn|pip3?|cargo|brew|apt(?:-get)?|docker|kubectl|git|gem|composer|dotnet|mvn|gradle)\s+\S",
        r"|^\s*go\s+(?:run|build|test|get|mod|install)\b",
        r"|`[^`\n]+`",
    ))
});

/// 行内列表标记，例如 "步骤 1) 安装 2) 配置" 或 "• a • b"
pub static INLINE_LIST_CUE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:^|[\s:;：；])(?:\d{1,2}[.)）]|[•●▪◦])\s*[^\s\d]"));

/// 行首列表标记
pub static LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?:[-*+•●▪]|\d{1,3}[.)）])\s+\S"));

/// 命令行提示符或包管理器/常见命令调用前缀
pub static SHELL_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"^\s*(?:\$|>>>|PS [^>]*>|[A-Za-z]:\\[^>]*>)\s*\S",
        r"|^\s*(?:sudo\s+)?(?:npm|npx|pnpm|yarn|pip3?|cargo|brew|apt(?:-get)?|docker|kubectl|git|curl|wget|chmod|mkdir|gem|composer|dotnet|mvn|gradle)\s+[\w./~@:=-]",
        r"|^\s*go\s+(?:run|build|test|get|mod|install)\b",
        r"|^\s*export\s+\w+=|^\s*cd\s+[\w./~-]+\s*$",
    ))
});

/// 代码标点或关键字
pub static CODE_PUNCT_OR_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"[{}\[\];]|=>|->|::|==|!=|<=|>=|&&|\|\||:=",
        r"|\w\([^)]*\)",
        r"|^\s*(?:fn|def|class|function|const|let|var|import|export|return|if|elif|else|for|while|package|func|pub|use|public|private|static|async|await|SELECT|INSERT|UPDATE|DELETE|CREATE)\b",
        r"|</?[a-zA-Z][\w-]*(?:\s[^>]*)?>",
    ))
});

pub static INDENT_4: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?: {4,}|\t)\S"));
pub static INDENT_2: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?: {2,}|\t)\S"));

/// 自然语言句末标点
pub static TERMINAL_PUNCT: LazyLock<Regex> = LazyLock::new(|| compile(r"[.!?。！？]\s*$"));

const HEADING_TERMINAL_PUNCT: &[char] = &[
    '.', '!', '?', ';', ':', ',', '。', '！', '？', '；', '：', '，', '…',
];

/// 统计单行的词数：拉丁文按空白分词，中日韩文字每个字计一个词
pub fn count_words(line: &str) -> usize {
    line.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk_char(*c)).count();
            let has_other = token
                .chars()
                .any(|c| c.is_alphanumeric() && !is_cjk_char(c));
            cjk + usize::from(has_other)
        })
        .sum()
}

/// 判断一行是否"像标题"：长度3-90、不超过12个词、且不以句末标点结尾
pub fn is_heading_like(line: &str) -> bool {
    let trimmed = line.trim();
    let length = trimmed.chars().count();
    if !(3..=90).contains(&length) {
        return false;
    }
    if count_words(trimmed) > 12 {
        return false;
    }
    !trimmed.ends_with(HEADING_TERMINAL_PUNCT)
}

pub fn is_fence_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    indent <= 3 && (trimmed.starts_with("```") || trimmed.starts_with("~~~"))
}

/// 折叠空白并按字符数截断，超出部分以省略号代替
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_chars).collect();
    format!("{}…", truncated.trim_end())
}
