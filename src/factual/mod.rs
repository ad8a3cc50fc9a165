//! 事实保真：从原文提取数字、URL、版本号作为基线，并评估改写稿的偏离风险

pub mod baseline;
pub mod guard;

pub use baseline::{FactualBaseline, normalize_text};
pub use guard::{FactualGuardResult, RiskLevel, evaluate_factual_risk};
