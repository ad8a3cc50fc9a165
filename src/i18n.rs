use serde::{Deserialize, Serialize};

/// 审阅意见使用的语言
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "中文",
            TargetLanguage::English => "English",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 审阅意见的语言指令；只约束点评与改进要点，不要求翻译正文
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => {
                "请使用中文撰写点评与改进要点。不要翻译被审阅的正文，正文保持其原有语言。"
            }
            TargetLanguage::English => {
                "Write the review and improvement notes in English. Do not translate the document under review; keep it in its original language."
            }
            TargetLanguage::Japanese => {
                "講評と改善点は日本語で記述してください。レビュー対象の本文は翻訳せず、元の言語のままにしてください。"
            }
            TargetLanguage::Korean => {
                "검토 의견과 개선 사항은 한국어로 작성해 주세요. 검토 대상 본문은 번역하지 말고 원래 언어를 유지해 주세요."
            }
            TargetLanguage::German => {
                "Verfassen Sie die Bewertung und die Verbesserungshinweise auf Deutsch. Übersetzen Sie das geprüfte Dokument nicht, es bleibt in seiner Originalsprache."
            }
            TargetLanguage::French => {
                "Rédigez l'évaluation et les pistes d'amélioration en français. Ne traduisez pas le document relu, il reste dans sa langue d'origine."
            }
            TargetLanguage::Russian => {
                "Пишите отзыв и рекомендации на русском языке. Не переводите проверяемый документ, сохраните его исходный язык."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_english() {
        assert_eq!(TargetLanguage::default(), TargetLanguage::English);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("中文".parse::<TargetLanguage>().unwrap(), TargetLanguage::Chinese);
        assert_eq!("FR".parse::<TargetLanguage>().unwrap(), TargetLanguage::French);
        assert!("klingon".parse::<TargetLanguage>().is_err());
        assert_eq!(TargetLanguage::Korean.to_string(), "ko");
    }
}
