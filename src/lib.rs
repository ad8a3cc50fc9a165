pub mod analysis;
pub mod cli;
pub mod config;
pub mod factual;
pub mod i18n;
pub mod llm;
pub mod review;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use factual::{FactualBaseline, FactualGuardResult, RiskLevel, evaluate_factual_risk};
pub use llm::{Generation, GenerationRequest, LLMClient, TextGenerator};
pub use review::{AiReviewPayload, ReviewError, ReviewOrchestrator, ReviewSettings, StageEvent};
