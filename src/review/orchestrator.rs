use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::factual::{FactualGuardResult, evaluate_factual_risk, normalize_text};
use crate::i18n::TargetLanguage;
use crate::llm::{AgentRole, GenerationRequest, StructuredOutput, TextGenerator};

use super::context::{WorkflowContext, resolve_workflow_context};
use super::editor::{RewriteOutcome, run_rewrite_pass};
use super::error::ReviewError;
use super::events::{StageAgent, StageEvent, StageObserver};
use super::prompts::{
    build_editor_prompt, build_formatter_prompt, build_reviewer_prompt, editor_system_prompt,
    formatter_system_prompt, reviewer_system_prompt,
};
use super::reviewer::run_reviewer;
use super::router::WorkflowRoute;
use super::types::{AiReviewPayload, ReviewerResult, ReviewerSource, ToolInsights};
use super::usage::UsageLedger;

const FALLBACK_REVIEW: &str = "The document was checked and no further changes were required.";
const FALLBACK_IMPROVEMENT: &str = "No specific improvements were identified.";

const RECOVERY_REVIEW: &str = "The text looked like unstructured plain text, so its structure was restored in a single formatting pass.";
const RECOVERY_IMPROVEMENTS: [&str; 3] = [
    "Restored headings, paragraphs and lists from plain-text layout cues.",
    "Wrapped probable code, log and configuration regions in fenced code blocks.",
    "Kept the original wording and every number, URL and version string intact.",
];

/// 编排器运行所需的模型与参数
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    pub reviewer_model: String,
    pub editor_model: String,
    pub formatter_model: String,
    pub max_raw_blocks: usize,
    pub target_language: TargetLanguage,
}

impl ReviewSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reviewer_model: config.model_for(AgentRole::Reviewer),
            editor_model: config.model_for(AgentRole::Editor),
            formatter_model: config.model_for(AgentRole::Formatter),
            max_raw_blocks: config.review.max_raw_blocks,
            target_language: config.review.target_language,
        }
    }
}

/// 流程状态；每个状态只携带进入下一步所需的数据
enum ReviewState {
    Routing,
    FormatterPass,
    ReviewerPass,
    EditorGate(ReviewerVerdict),
    EditorPass(ReviewerVerdict),
    Finalize(Draft),
    Done(AiReviewPayload),
}

struct ReviewerVerdict {
    result: ReviewerResult,
    source: ReviewerSource,
}

/// 定稿前的候选结果
struct Draft {
    review: String,
    key_improvements: Vec<String>,
    candidate: String,
    reviewer_source: Option<ReviewerSource>,
    editor_skipped: bool,
}

/// 单个请求的可变状态，由一次`run`独占
struct ReviewRun<'a> {
    original: &'a str,
    observer: &'a dyn StageObserver,
    cancel: &'a CancellationToken,
    context: Option<WorkflowContext>,
    usage: UsageLedger,
}

impl ReviewRun<'_> {
    fn context(&self) -> Result<&WorkflowContext, ReviewError> {
        self.context
            .as_ref()
            .ok_or_else(|| ReviewError::Pipeline("workflow context not resolved".to_string()))
    }

    fn emit(&self, event: StageEvent) {
        self.observer.on_stage(&event);
    }

    /// 每个await之后都要重新检查取消信号
    fn ensure_active(&self) -> Result<(), ReviewError> {
        if self.cancel.is_cancelled() {
            Err(ReviewError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// 双角色审阅编排器
#[derive(Clone)]
pub struct ReviewOrchestrator {
    generator: Arc<dyn TextGenerator>,
    settings: ReviewSettings,
}

impl ReviewOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ReviewSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    /// 处理一次审阅请求
    pub async fn run(
        &self,
        text: &str,
        observer: &dyn StageObserver,
        cancel: &CancellationToken,
    ) -> Result<AiReviewPayload, ReviewError> {
        let mut run = ReviewRun {
            original: text,
            observer,
            cancel,
            context: None,
            usage: UsageLedger::new(),
        };

        let mut state = ReviewState::Routing;
        loop {
            run.ensure_active()?;
            state = match state {
                ReviewState::Routing => self.route(&mut run),
                ReviewState::FormatterPass => self.formatter_pass(&mut run).await?,
                ReviewState::ReviewerPass => self.reviewer_pass(&mut run).await?,
                ReviewState::EditorGate(verdict) => Self::editor_gate(&run, verdict),
                ReviewState::EditorPass(verdict) => self.editor_pass(&mut run, verdict).await?,
                ReviewState::Finalize(draft) => Self::finalize(&mut run, draft)?,
                ReviewState::Done(payload) => return Ok(payload),
            };
        }
    }

    fn route(&self, run: &mut ReviewRun<'_>) -> ReviewState {
        let context = resolve_workflow_context(run.original, self.settings.max_raw_blocks);
        info!(route = %context.route, cues = ?context.signals.cues, "route selected");
        let next = match context.route {
            WorkflowRoute::StructureRecovery => ReviewState::FormatterPass,
            WorkflowRoute::ReviewThenEdit => ReviewState::ReviewerPass,
        };
        run.context = Some(context);
        next
    }

    async fn formatter_pass(&self, run: &mut ReviewRun<'_>) -> Result<ReviewState, ReviewError> {
        run.emit(StageEvent::completed(
            StageAgent::Reviewer,
            "Reviewer skipped: the text needs structure recovery rather than review.",
            None,
        ));
        run.emit(StageEvent::started(
            StageAgent::Editor,
            "Formatter is restoring the document structure.",
        ));

        let context = run.context()?;
        let user_prompt =
            build_formatter_prompt(run.original, &context.raw_blocks, &context.code_recovery);
        // 格式化失败时优先使用确定性的代码块恢复结果
        let recovered = context
            .code_recovery
            .recovered_text
            .clone()
            .filter(|_| context.code_recovery.changed);
        let request = GenerationRequest::text(
            AgentRole::Formatter,
            &self.settings.formatter_model,
            formatter_system_prompt(),
            user_prompt,
        );

        let outcome = run_rewrite_pass(
            self.generator.as_ref(),
            request,
            run.cancel,
            run.usage.role_mut(AgentRole::Formatter),
        )
        .await?;
        run.ensure_active()?;

        let (candidate, message) = match outcome {
            RewriteOutcome::Rewritten(text) => (
                text,
                "Formatter restored the document structure.".to_string(),
            ),
            RewriteOutcome::Empty => (
                run.original.to_string(),
                "Formatter returned no text; kept the original.".to_string(),
            ),
            RewriteOutcome::Failed(reason) => match recovered {
                Some(text) => (
                    text,
                    format!("Formatter failed ({}); applied deterministic code recovery.", reason),
                ),
                None => (
                    run.original.to_string(),
                    format!("Formatter failed ({}); kept the original.", reason),
                ),
            },
        };
        run.emit(StageEvent::completed(
            StageAgent::Editor,
            message,
            Some(run.usage.snapshot(AgentRole::Formatter)),
        ));

        Ok(ReviewState::Finalize(Draft {
            review: RECOVERY_REVIEW.to_string(),
            key_improvements: RECOVERY_IMPROVEMENTS.iter().map(|s| s.to_string()).collect(),
            candidate,
            reviewer_source: None,
            editor_skipped: false,
        }))
    }

    async fn reviewer_pass(&self, run: &mut ReviewRun<'_>) -> Result<ReviewState, ReviewError> {
        run.emit(StageEvent::started(
            StageAgent::Reviewer,
            "Reviewer is assessing the document.",
        ));

        let context = run.context()?;
        let user_prompt = build_reviewer_prompt(run.original, &context.signals, &context.raw_blocks);
        let request = GenerationRequest::text(
            AgentRole::Reviewer,
            &self.settings.reviewer_model,
            reviewer_system_prompt(self.settings.target_language),
            user_prompt,
        )
        .with_structured_output(StructuredOutput::ReviewerVerdict);

        let outcome = run_reviewer(
            self.generator.as_ref(),
            request,
            run.cancel,
            run.usage.role_mut(AgentRole::Reviewer),
        )
        .await?;
        run.ensure_active()?;

        let message = match (&outcome.note, outcome.result.needs_edit) {
            (Some(note), _) => note.clone(),
            (None, true) => "Reviewer recommends an editing pass.".to_string(),
            (None, false) => "Reviewer found nothing that requires editing.".to_string(),
        };
        run.emit(StageEvent::completed(
            StageAgent::Reviewer,
            message,
            Some(run.usage.snapshot(AgentRole::Reviewer)),
        ));

        Ok(ReviewState::EditorGate(ReviewerVerdict {
            result: outcome.result,
            source: outcome.source,
        }))
    }

    fn editor_gate(run: &ReviewRun<'_>, verdict: ReviewerVerdict) -> ReviewState {
        if verdict.result.needs_edit {
            return ReviewState::EditorPass(verdict);
        }

        debug!("editor skipped");
        run.emit(StageEvent::completed(
            StageAgent::Editor,
            "Editor skipped: no edits were needed.",
            None,
        ));
        ReviewState::Finalize(Draft {
            review: verdict.result.review,
            key_improvements: verdict.result.key_improvements,
            candidate: run.original.to_string(),
            reviewer_source: Some(verdict.source),
            editor_skipped: true,
        })
    }

    async fn editor_pass(
        &self,
        run: &mut ReviewRun<'_>,
        verdict: ReviewerVerdict,
    ) -> Result<ReviewState, ReviewError> {
        run.emit(StageEvent::started(
            StageAgent::Editor,
            "Editor is applying the rewrite plan.",
        ));

        let context = run.context()?;
        let user_prompt = build_editor_prompt(run.original, &verdict.result, &context.baseline);
        let request = GenerationRequest::text(
            AgentRole::Editor,
            &self.settings.editor_model,
            editor_system_prompt(),
            user_prompt,
        );

        let outcome = run_rewrite_pass(
            self.generator.as_ref(),
            request,
            run.cancel,
            run.usage.role_mut(AgentRole::Editor),
        )
        .await?;
        run.ensure_active()?;

        let message = match &outcome {
            RewriteOutcome::Rewritten(_) => "Editor produced a polished draft.".to_string(),
            RewriteOutcome::Empty => "Editor returned no text; kept the original.".to_string(),
            RewriteOutcome::Failed(reason) => {
                format!("Editor failed ({}); kept the original.", reason)
            }
        };
        let candidate = outcome.text_or(run.original);
        run.emit(StageEvent::completed(
            StageAgent::Editor,
            message,
            Some(run.usage.snapshot(AgentRole::Editor)),
        ));

        Ok(ReviewState::Finalize(Draft {
            review: verdict.result.review,
            key_improvements: verdict.result.key_improvements,
            candidate,
            reviewer_source: Some(verdict.source),
            editor_skipped: false,
        }))
    }

    fn finalize(run: &mut ReviewRun<'_>, draft: Draft) -> Result<ReviewState, ReviewError> {
        let context = run
            .context
            .take()
            .ok_or_else(|| ReviewError::Pipeline("workflow context not resolved".to_string()))?;

        let changed = normalize_text(&draft.candidate) != normalize_text(run.original);
        let factual = if changed {
            evaluate_factual_risk(&context.baseline, &draft.candidate)
        } else {
            FactualGuardResult::unchanged()
        };
        info!(changed, risk = %factual.risk_level, "review finalized");

        let review = if draft.review.trim().is_empty() {
            FALLBACK_REVIEW.to_string()
        } else {
            draft.review
        };
        let key_improvements = if draft.key_improvements.is_empty() {
            vec![FALLBACK_IMPROVEMENT.to_string()]
        } else {
            draft.key_improvements
        };

        let tool_insights = ToolInsights {
            route: context.route,
            structure_cues: context.signals.cues.clone(),
            has_markdown_signals: context.signals.has_markdown_signals,
            is_likely_unstructured_plain_text: context.signals.is_likely_unstructured_plain_text,
            raw_block_count: context.raw_blocks.block_count,
            heading_block_count: context.raw_blocks.heading_count,
            paragraph_block_count: context.raw_blocks.paragraph_count,
            list_block_count: context.raw_blocks.list_count,
            code_block_count: context.raw_blocks.code_count,
            recovered_code_block_count: context.code_recovery.recovered_block_count,
            recovered_code_languages: context
                .code_recovery
                .suggestions
                .iter()
                .map(|s| s.language.clone())
                .filter(|language| !language.is_empty())
                .collect(),
            reviewer_source: draft.reviewer_source,
            editor_skipped: draft.editor_skipped,
            factual,
        };

        Ok(ReviewState::Done(AiReviewPayload {
            review,
            key_improvements,
            polished_text: draft.candidate,
            changed,
            usage: std::mem::take(&mut run.usage).into_summary(),
            tool_insights,
        }))
    }
}
