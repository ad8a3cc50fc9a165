use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

pub const MAX_NUMBERS: usize = 40;
pub const MAX_URLS: usize = 20;
pub const MAX_VERSIONS: usize = 20;

const URL_TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]{3,}").expect("word token pattern"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?%?").expect("number pattern"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("url pattern"));
static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bv?\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z][0-9A-Za-z.\-]*)?\b").expect("version pattern")
});

/// 原文的事实基线，请求开始时构建一次，之后只读
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactualBaseline {
    pub normalized_text: String,
    pub tokens: BTreeSet<String>,
    pub numbers: Vec<String>,
    pub urls: Vec<String>,
    pub versions: Vec<String>,
}

impl FactualBaseline {
    pub fn from_text(text: &str) -> Self {
        Self {
            normalized_text: normalize_text(text),
            tokens: tokenize(text),
            numbers: extract_numbers(text),
            urls: extract_urls(text),
            versions: extract_versions(text),
        }
    }

    pub fn has_facts(&self) -> bool {
        !(self.numbers.is_empty() && self.urls.is_empty() && self.versions.is_empty())
    }
}

/// 折叠所有空白为单个空格
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 小写化的字母数字词元集合（长度不少于3）
pub fn tokenize(text: &str) -> BTreeSet<String> {
    WORD_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub fn extract_numbers(text: &str) -> Vec<String> {
    dedupe_limited(number_matches(text), MAX_NUMBERS)
}

pub fn extract_urls(text: &str) -> Vec<String> {
    dedupe_limited(url_matches(text), MAX_URLS)
}

pub fn extract_versions(text: &str) -> Vec<String> {
    dedupe_limited(version_matches(text), MAX_VERSIONS)
}

/// 不截断的提取结果，比对候选文本时使用
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AllFacts {
    pub numbers: Vec<String>,
    pub urls: Vec<String>,
    pub versions: Vec<String>,
}

impl AllFacts {
    pub(crate) fn from_text(text: &str) -> Self {
        Self {
            numbers: dedupe_limited(number_matches(text), usize::MAX),
            urls: dedupe_limited(url_matches(text), usize::MAX),
            versions: dedupe_limited(version_matches(text), usize::MAX),
        }
    }
}

fn number_matches(text: &str) -> impl Iterator<Item = &str> {
    NUMBER.find_iter(text).map(|m| m.as_str())
}

fn url_matches(text: &str) -> impl Iterator<Item = &str> {
    URL.find_iter(text)
        .map(|m| m.as_str().trim_end_matches(URL_TRAILING_PUNCT))
}

fn version_matches(text: &str) -> impl Iterator<Item = &str> {
    VERSION.find_iter(text).map(|m| m.as_str())
}

/// 按首次出现顺序去重（忽略大小写），并截断到上限
fn dedupe_limited<'a>(items: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for item in items {
        if item.is_empty() {
            continue;
        }
        if seen.insert(item.to_lowercase()) {
            result.push(item.to_string());
            if result.len() >= limit {
                break;
            }
        }
    }
    result
}
