#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    use crate::analysis::{
        CodeRecoveryOptions, analyze_structure_signals, parse_raw_blocks, recover_code_blocks,
    };
    use crate::factual::{FactualBaseline, RiskLevel};
    use crate::i18n::TargetLanguage;
    use crate::llm::scripted::{Reply, ScriptedGenerator};
    use crate::llm::{AgentRole, StructuredOutput};
    use crate::review::prompts::{
        build_editor_prompt, build_formatter_prompt, build_reviewer_prompt, reviewer_system_prompt,
    };
    use crate::review::reviewer::{
        ReviewerAttempt, extract_reviewer_result, fallback_reviewer_result,
    };
    use crate::review::types::{MAX_KEY_IMPROVEMENTS, MAX_REWRITE_STEPS};
    use crate::review::usage::UsageLedger;
    use crate::review::{
        AgentTokenUsage, ReviewError, ReviewOrchestrator, ReviewSettings, ReviewerResult,
        ReviewerSource, StageAgent, StageEvent, StageStatus, WorkflowRoute,
        resolve_workflow_context, route_workflow,
    };

    const MARKDOWN_DOC: &str =
        "# Release Notes\n\nVersion 2.1 ships 3 fixes.\n\nSee https://example.com/notes for details.";
    const SHELL_INPUT: &str = "npm install foo\nnpm run build";

    fn settings() -> ReviewSettings {
        ReviewSettings {
            reviewer_model: "reviewer-model".to_string(),
            editor_model: "editor-model".to_string(),
            formatter_model: "formatter-model".to_string(),
            max_raw_blocks: 80,
            target_language: TargetLanguage::English,
        }
    }

    fn scripted(replies: Vec<Reply>) -> (Arc<ScriptedGenerator>, ReviewOrchestrator) {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let orchestrator = ReviewOrchestrator::new(generator.clone(), settings());
        (generator, orchestrator)
    }

    fn recorder() -> (Arc<Mutex<Vec<StageEvent>>>, impl Fn(&StageEvent) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event: &StageEvent| {
            sink.lock().unwrap().push(event.clone())
        })
    }

    fn stages(events: &Arc<Mutex<Vec<StageEvent>>>) -> Vec<(StageAgent, StageStatus)> {
        events
            .lock()
            .unwrap()
            .iter()
            .map(|event| (event.agent, event.status))
            .collect()
    }

    fn verdict(needs_edit: bool) -> Reply {
        Reply::Structured(json!({
            "needsEdit": needs_edit,
            "review": "The notes are clear but terse.",
            "keyImprovements": ["Explain what the fixes change"],
            "rewritePlan": ["Tighten the intro", "Merge short paragraphs"]
        }))
    }

    #[test]
    fn test_router_scenarios() {
        let long_line = "word ".repeat(60);
        let signals = analyze_structure_signals(long_line.trim_end());
        assert_eq!(route_workflow(&signals), WorkflowRoute::StructureRecovery);

        let titled = "# Title\n\nFirst paragraph of the note.\n\nSecond paragraph of the note.";
        let signals = analyze_structure_signals(titled);
        assert_eq!(route_workflow(&signals), WorkflowRoute::ReviewThenEdit);

        let context = resolve_workflow_context(SHELL_INPUT, 80);
        assert_eq!(context.route, WorkflowRoute::StructureRecovery);
        assert!(!context.signals.has_markdown_signals);
        assert!(context.code_recovery.changed);
    }

    #[test]
    fn test_extraction_chain_prefers_structured_output() {
        let attempt = ReviewerAttempt {
            structured: Some(json!({
                "needsEdit": true,
                "review": "  Needs work.  ",
                "keyImprovements": ["a", " ", "b", "c", "d", "e", "f"],
                "rewritePlan": ["1", "2", "3", "4", "5", "6", "7"]
            })),
            text: Some("{\"needsEdit\": false}".to_string()),
        };
        let (result, source) = extract_reviewer_result(&attempt);
        assert_eq!(source, ReviewerSource::Structured);
        assert!(result.needs_edit);
        assert_eq!(result.review, "Needs work.");
        assert_eq!(result.key_improvements, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(result.rewrite_plan.len(), 6);
    }

    #[test]
    fn test_extraction_chain_falls_through_to_raw_json_and_fallback() {
        let attempt = ReviewerAttempt {
            structured: Some(json!({"unexpected": 1})),
            text: Some(
                "Sure:\n```json\n{\"needs_edit\": true, \"review\": \"Wordy.\", \"rewrite_plan\": [\"Cut filler\"]}\n```"
                    .to_string(),
            ),
        };
        let (result, source) = extract_reviewer_result(&attempt);
        assert_eq!(source, ReviewerSource::RawJson);
        assert!(result.needs_edit);
        assert_eq!(result.rewrite_plan, vec!["Cut filler"]);
        assert!(result.key_improvements.is_empty());

        let (result, source) = extract_reviewer_result(&ReviewerAttempt::default());
        assert_eq!(source, ReviewerSource::Fallback);
        assert_eq!(result, fallback_reviewer_result());
        assert!(!result.needs_edit);
    }

    #[test]
    fn test_reviewer_schema_bounds_list_lengths() {
        let schema = serde_json::to_value(schemars::schema_for!(ReviewerResult)).unwrap();
        let properties = &schema["properties"];

        assert_eq!(
            properties["keyImprovements"]["maxItems"],
            json!(MAX_KEY_IMPROVEMENTS)
        );
        assert_eq!(properties["rewritePlan"]["maxItems"], json!(MAX_REWRITE_STEPS));
        assert_eq!(properties["needsEdit"]["type"], json!("boolean"));
    }

    #[test]
    fn test_prompt_builders_bound_digests_and_keep_document() {
        let text = (1..=20)
            .map(|n| format!("Paragraph number {} is here.", n))
            .collect::<Vec<_>>()
            .join("\n\n");
        let blocks = parse_raw_blocks(&text, 80);
        let recovery = recover_code_blocks(&text, CodeRecoveryOptions::default());
        let prompt = build_formatter_prompt(&text, &blocks, &recovery);

        assert_eq!(prompt.matches("\n- lines ").count(), 12);
        assert!(prompt.contains("- ... 8 more blocks"));
        assert!(prompt.contains(&text));

        let signals = analyze_structure_signals(&text);
        let reviewer_prompt = build_reviewer_prompt(&text, &signals, &blocks);
        assert!(reviewer_prompt.contains("blocks: 20"));
        assert!(reviewer_prompt.contains(&text));

        assert!(
            reviewer_system_prompt(TargetLanguage::Chinese)
                .contains(TargetLanguage::Chinese.prompt_instruction())
        );
    }

    #[test]
    fn test_editor_prompt_orders_plan_and_lists_constraints() {
        let text = "Version v1.2.0 costs 5 dollars at https://x.io/p";
        let reviewer = ReviewerResult {
            needs_edit: true,
            review: "ok".to_string(),
            key_improvements: vec!["Too wordy".to_string()],
            rewrite_plan: vec!["Tighten the intro".to_string(), "Merge short paragraphs".to_string()],
        };
        let prompt = build_editor_prompt(text, &reviewer, &FactualBaseline::from_text(text));

        assert!(prompt.contains("1. Tighten the intro\n2. Merge short paragraphs"));
        assert!(prompt.contains("context only, not instructions"));
        assert!(prompt.contains("- Too wordy"));
        assert!(prompt.contains("- URLs: https://x.io/p"));
        assert!(prompt.contains("- Versions: v1.2.0"));
        assert!(prompt.find("Rewrite plan").unwrap() < prompt.find("Reviewer notes").unwrap());
        assert!(prompt.contains(text));
    }

    #[test]
    fn test_usage_ledger_summary_totals_roles() {
        let mut ledger = UsageLedger::new();
        let usage = crate::llm::scripted::SCRIPTED_USAGE;
        ledger.role_mut(AgentRole::Reviewer).record(Some(&usage));
        ledger.role_mut(AgentRole::Editor).record(Some(&usage));
        ledger.role_mut(AgentRole::Editor).record(None);

        let summary = ledger.into_summary();
        assert_eq!(summary.reviewer.calls, 1);
        assert_eq!(summary.editor.calls, 2);
        assert_eq!(summary.editor.total_tokens, 15);
        assert_eq!(summary.formatter, AgentTokenUsage::default());
        assert_eq!(summary.total.calls, 3);
        assert_eq!(summary.total.total_tokens, 30);
    }

    #[tokio::test]
    async fn test_no_edit_verdict_skips_editor() {
        let (generator, orchestrator) = scripted(vec![verdict(false)]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(MARKDOWN_DOC, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.polished_text, MARKDOWN_DOC);
        assert!(!payload.changed);
        assert_eq!(payload.usage.editor.calls, 0);
        assert_eq!(payload.usage.reviewer.calls, 1);
        assert_eq!(payload.review, "The notes are clear but terse.");
        assert_eq!(payload.tool_insights.route, WorkflowRoute::ReviewThenEdit);
        assert!(payload.tool_insights.editor_skipped);
        assert_eq!(payload.tool_insights.factual.risk_level, RiskLevel::Low);
        assert!(payload.tool_insights.factual.warnings.is_empty());

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].role, AgentRole::Reviewer);
        assert_eq!(requests[0].model, "reviewer-model");
        assert_eq!(
            requests[0].structured,
            Some(StructuredOutput::ReviewerVerdict)
        );

        assert_eq!(
            stages(&events),
            vec![
                (StageAgent::Reviewer, StageStatus::Started),
                (StageAgent::Reviewer, StageStatus::Completed),
                (StageAgent::Editor, StageStatus::Completed),
            ]
        );
        let last = events.lock().unwrap().last().cloned().unwrap();
        assert!(last.message.contains("skipped"));
        assert!(last.usage.is_none());
    }

    #[tokio::test]
    async fn test_editor_failure_reverts_to_original() {
        let (_generator, orchestrator) =
            scripted(vec![verdict(true), Reply::Fail("rate limited".to_string())]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(MARKDOWN_DOC, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.polished_text, MARKDOWN_DOC);
        assert!(!payload.changed);
        assert_eq!(payload.usage.editor.calls, 1);
        assert_eq!(payload.usage.editor.total_tokens, 0);
        assert!(!payload.tool_insights.editor_skipped);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        let last = events.last().unwrap();
        assert_eq!((last.agent, last.status), (StageAgent::Editor, StageStatus::Completed));
        assert!(last.message.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_blank_editor_reply_keeps_original() {
        let (_generator, orchestrator) =
            scripted(vec![verdict(true), Reply::Text("  \n\t ".to_string())]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(MARKDOWN_DOC, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.polished_text, MARKDOWN_DOC);
        assert!(!payload.changed);
        assert_eq!(payload.tool_insights.factual.risk_level, RiskLevel::Low);
        assert_eq!(payload.usage.editor.calls, 1);
        assert_eq!(payload.usage.editor.total_tokens, 15);

        let events = events.lock().unwrap();
        let last = events.last().unwrap();
        assert_eq!((last.agent, last.status), (StageAgent::Editor, StageStatus::Completed));
        assert!(last.message.contains("kept the original"));
    }

    #[tokio::test]
    async fn test_editor_rewrite_runs_factual_guard() {
        let (generator, orchestrator) = scripted(vec![
            verdict(true),
            Reply::Text("  # Release Notes\n\nVersion 2.1 ships 3 fixes.\n".to_string()),
        ]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(MARKDOWN_DOC, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert!(payload.changed);
        assert_eq!(payload.polished_text, "# Release Notes\n\nVersion 2.1 ships 3 fixes.");
        let factual = &payload.tool_insights.factual;
        assert_eq!(factual.risk_level, RiskLevel::High);
        assert_eq!(factual.missing_urls, vec!["https://example.com/notes"]);
        assert_eq!(payload.tool_insights.reviewer_source, Some(ReviewerSource::Structured));
        assert_eq!(payload.usage.total.calls, 2);

        let requests = generator.requests();
        assert_eq!(requests[1].role, AgentRole::Editor);
        assert_eq!(requests[1].model, "editor-model");
        assert!(requests[1].user_prompt.contains("1. Tighten the intro"));
        assert!(requests[1].user_prompt.contains("https://example.com/notes"));

        assert_eq!(
            stages(&events),
            vec![
                (StageAgent::Reviewer, StageStatus::Started),
                (StageAgent::Reviewer, StageStatus::Completed),
                (StageAgent::Editor, StageStatus::Started),
                (StageAgent::Editor, StageStatus::Completed),
            ]
        );
        let events = events.lock().unwrap();
        assert!(events.windows(2).all(|pair| pair[0].emitted_at <= pair[1].emitted_at));
        assert_eq!(events[3].usage.map(|usage| usage.calls), Some(1));
    }

    #[tokio::test]
    async fn test_unparsed_reviewer_output_recovered_from_text() {
        let (_generator, orchestrator) = scripted(vec![
            Reply::Unparsed(
                "```json\n{\"needs_edit\": true, \"review\": \"Wordy.\", \"rewrite_plan\": [\"Cut filler\"]}\n```"
                    .to_string(),
            ),
            Reply::Text("# Release Notes\n\nVersion 2.1 ships 3 fixes. Details at https://example.com/notes.".to_string()),
        ]);

        let payload = orchestrator
            .run(MARKDOWN_DOC, &crate::review::NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.tool_insights.reviewer_source, Some(ReviewerSource::RawJson));
        assert_eq!(payload.review, "Wordy.");
        assert_eq!(payload.usage.reviewer.total_tokens, 15);
        assert_eq!(payload.usage.editor.calls, 1);
        assert!(payload.changed);
        assert!(payload.tool_insights.factual.missing_urls.is_empty());
    }

    #[tokio::test]
    async fn test_reviewer_failure_uses_fallback_without_editing() {
        let (generator, orchestrator) = scripted(vec![Reply::Fail("boom".to_string())]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(MARKDOWN_DOC, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.tool_insights.reviewer_source, Some(ReviewerSource::Fallback));
        assert_eq!(payload.review, fallback_reviewer_result().review);
        assert!(!payload.key_improvements.is_empty());
        assert_eq!(payload.polished_text, MARKDOWN_DOC);
        assert_eq!(generator.requests().len(), 1);

        let events = events.lock().unwrap();
        assert!(events[1].message.contains("boom"));
        assert_eq!(events[1].usage.map(|usage| usage.calls), Some(1));
    }

    #[tokio::test]
    async fn test_structure_recovery_branch_uses_formatter() {
        let formatted = "```bash\nnpm install foo\nnpm run build\n```";
        let (generator, orchestrator) = scripted(vec![Reply::Text(formatted.to_string())]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(SHELL_INPUT, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.tool_insights.route, WorkflowRoute::StructureRecovery);
        assert_eq!(payload.polished_text, formatted);
        assert!(payload.changed);
        assert_eq!(payload.key_improvements.len(), 3);
        assert_eq!(payload.usage.reviewer.calls, 0);
        assert_eq!(payload.usage.formatter.calls, 1);
        assert_eq!(payload.tool_insights.recovered_code_languages, vec!["bash"]);
        assert_eq!(payload.tool_insights.factual.risk_level, RiskLevel::Low);
        assert!(payload.tool_insights.reviewer_source.is_none());

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].role, AgentRole::Formatter);
        assert!(requests[0].structured.is_none());
        assert!(requests[0].user_prompt.contains(SHELL_INPUT));

        assert_eq!(
            stages(&events),
            vec![
                (StageAgent::Reviewer, StageStatus::Completed),
                (StageAgent::Editor, StageStatus::Started),
                (StageAgent::Editor, StageStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn test_formatter_failure_falls_back_to_code_recovery() {
        let (_generator, orchestrator) = scripted(vec![Reply::Fail("offline".to_string())]);

        let payload = orchestrator
            .run(SHELL_INPUT, &crate::review::NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            payload.polished_text,
            "```bash\nnpm install foo\nnpm run build\n```"
        );
        assert!(payload.changed);
        assert_eq!(payload.usage.formatter.calls, 1);
    }

    #[tokio::test]
    async fn test_blank_formatter_reply_keeps_original() {
        let (_generator, orchestrator) = scripted(vec![Reply::Text("   ".to_string())]);
        let (events, observer) = recorder();

        let payload = orchestrator
            .run(SHELL_INPUT, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payload.tool_insights.route, WorkflowRoute::StructureRecovery);
        assert_eq!(payload.polished_text, SHELL_INPUT);
        assert!(!payload.changed);
        assert_eq!(payload.usage.formatter.calls, 1);

        let events = events.lock().unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.status, StageStatus::Completed);
        assert!(last.message.contains("kept the original"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_issues_no_calls() {
        let (generator, orchestrator) = scripted(vec![verdict(true)]);
        let (events, observer) = recorder();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator.run(MARKDOWN_DOC, &observer, &cancel).await;

        assert!(matches!(result, Err(ReviewError::Cancelled)));
        assert!(generator.requests().is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_after_reviewer_returns_stops_pipeline() {
        let (generator, orchestrator) = scripted(vec![
            Reply::CancelThen("{\"needsEdit\": true}".to_string()),
            Reply::Text("should never be requested".to_string()),
        ]);
        let (events, observer) = recorder();
        let cancel = CancellationToken::new();

        let result = orchestrator.run(MARKDOWN_DOC, &observer, &cancel).await;

        assert!(matches!(result, Err(ReviewError::Cancelled)));
        assert_eq!(generator.requests().len(), 1);
        assert_eq!(
            stages(&events),
            vec![(StageAgent::Reviewer, StageStatus::Started)]
        );
    }

    #[tokio::test]
    async fn test_cancellation_during_formatter_propagates() {
        let (_generator, orchestrator) = scripted(vec![Reply::CancelThen("ignored".to_string())]);
        let cancel = CancellationToken::new();

        let result = orchestrator
            .run(SHELL_INPUT, &crate::review::NoopObserver, &cancel)
            .await;

        assert!(matches!(result, Err(ReviewError::Cancelled)));
    }
}
