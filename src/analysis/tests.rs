#[cfg(test)]
mod tests {
    use crate::analysis::patterns::{count_words, is_heading_like, preview};
    use crate::analysis::{
        CodeRecoveryOptions, RawBlockKind, StructureCue, StructureSignals,
        analyze_structure_signals, detect_code_language, parse_raw_blocks, recover_code_blocks,
        score_code_line,
    };
    use std::collections::BTreeSet;

    const SHELL_INPUT: &str = "npm install foo\nnpm run build";

    #[test]
    fn test_empty_text_yields_zero_signals() {
        assert_eq!(analyze_structure_signals(""), StructureSignals::default());
        assert_eq!(analyze_structure_signals("   \n\t\n"), StructureSignals::default());
    }

    #[test]
    fn test_signals_are_idempotent() {
        let text = "Overview\nSome text that goes on for a while.\n\n# Heading\n- item";
        assert_eq!(
            analyze_structure_signals(text),
            analyze_structure_signals(text)
        );
    }

    #[test]
    fn test_markdown_markers_disable_unstructured_flag() {
        for text in [
            "# Title\n\nSome text here.",
            "Intro line\n- first\n- second",
            "Look:\n```\nlet x = 1;\n```",
            "1. step one\n2. step two",
            "> quoted wisdom",
        ] {
            let signals = analyze_structure_signals(text);
            assert!(signals.has_markdown_signals, "expected markdown in {:?}", text);
            assert!(!signals.is_likely_unstructured_plain_text);
        }
    }

    #[test]
    fn test_shell_lines_fire_code_cue() {
        let signals = analyze_structure_signals(SHELL_INPUT);
        assert!(!signals.has_markdown_signals);
        assert_eq!(signals.code_cue_line_count, 2);
        assert!(signals.has_cue(StructureCue::CODE_OR_LIST_CUES));
        assert!(signals.is_likely_unstructured_plain_text);
    }

    #[test]
    fn test_single_long_line_is_unstructured() {
        let text = "lorem ".repeat(50);
        let signals = analyze_structure_signals(&text);
        assert_eq!(signals.non_empty_line_count, 1);
        assert!(signals.has_cue(StructureCue::VERY_LONG_LINES));
        assert!(signals.has_cue(StructureCue::NO_PARAGRAPH_BREAKS));
        assert!(signals.is_likely_unstructured_plain_text);
    }

    #[test]
    fn test_heading_like_lines_cue() {
        let text = "Overview\nThe system reads files and writes output to disk.\nInstallation\nRun the installer and follow the prompts on screen.";
        let signals = analyze_structure_signals(text);
        assert_eq!(signals.heading_like_line_count, 2);
        assert!(signals.has_cue(StructureCue::HEADING_LIKE_LINES));
        assert!(signals.is_likely_unstructured_plain_text);
    }

    #[test]
    fn test_short_plain_paragraphs_fire_no_cue() {
        let text = "Hello there.\n\nThis is a short note.";
        let signals = analyze_structure_signals(text);
        assert!(signals.has_paragraph_break);
        assert!(signals.cues.is_empty());
        assert!(!signals.is_likely_unstructured_plain_text);
    }

    #[test]
    fn test_heading_like_predicate_is_script_aware() {
        assert!(is_heading_like("Installation Guide"));
        assert!(is_heading_like("第一章 系统概述"));
        assert!(!is_heading_like("This is a sentence."));
        assert!(!is_heading_like("这是一个完整的句子。"));
        assert!(!is_heading_like("ab"));
        // 汉字逐字计词，超过12个词
        assert!(!is_heading_like("这一行包含二十个汉字所以它不应该被当作标题看"));
        assert_eq!(count_words("第一章 系统概述"), 7);
        assert_eq!(count_words("hello world 你好"), 4);
    }

    #[test]
    fn test_parse_raw_blocks_classifies_each_kind() {
        let text = "Getting Started\n\nThis guide explains the setup.\nIt has two lines.\n\n- first item\n- second item\n- third item\n\nfn main() {\n    println!(\"hi\");\n}";
        let result = parse_raw_blocks(text, 80);

        assert_eq!(result.block_count, 4);
        assert_eq!(result.blocks.len(), result.block_count);
        let kinds: Vec<RawBlockKind> = result.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RawBlockKind::HeadingCandidate,
                RawBlockKind::Paragraph,
                RawBlockKind::ListCandidate,
                RawBlockKind::CodeCandidate,
            ]
        );
        assert_eq!(result.heading_count, 1);
        assert_eq!(result.paragraph_count, 1);
        assert_eq!(result.list_count, 1);
        assert_eq!(result.code_count, 1);

        let code = &result.blocks[3];
        assert_eq!((code.start_line, code.end_line, code.line_count), (10, 12, 3));
        assert!(code.confidence <= 0.92 && code.confidence > 0.55);
        assert_eq!(result.blocks[0].confidence, 0.72);
        assert_eq!(result.blocks[1].confidence, 0.55);
        assert_eq!(result.blocks[2].confidence, 0.78);
        assert!(!result.truncated);
    }

    #[test]
    fn test_raw_blocks_cover_every_non_blank_line_once() {
        let text = "alpha\nbeta\n\n\ngamma\n  \ndelta\nepsilon\n\nzeta";
        let result = parse_raw_blocks(text, 80);

        let expected: BTreeSet<usize> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, _)| i + 1)
            .collect();
        let mut covered = BTreeSet::new();
        let mut previous_end = 0;
        for block in &result.blocks {
            assert!(block.start_line > previous_end, "blocks must not overlap");
            assert_eq!(block.line_count, block.end_line - block.start_line + 1);
            for line in block.start_line..=block.end_line {
                assert!(covered.insert(line));
            }
            previous_end = block.end_line;
        }
        assert_eq!(covered, expected);
        assert_eq!(result.block_count, 4);
    }

    #[test]
    fn test_raw_blocks_respect_cap() {
        let result = parse_raw_blocks("a\n\nb\n\nc", 2);
        assert_eq!(result.block_count, 2);
        assert!(result.truncated);
    }

    #[test]
    fn test_preview_is_truncated_with_ellipsis() {
        let long = "word ".repeat(60);
        let result = parse_raw_blocks(&long, 80);
        let preview_text = &result.blocks[0].preview;
        assert!(preview_text.ends_with('…'));
        assert!(preview_text.chars().count() <= 97);
        assert_eq!(preview("a \n  b\tc", 10), "a b c");
    }

    #[test]
    fn test_score_code_line() {
        assert!(score_code_line("$ ls -la") >= 0.55);
        assert_eq!(score_code_line("This is prose."), 0.0);
        assert_eq!(score_code_line("- item"), 0.0);
        assert_eq!(score_code_line(""), 0.0);
        assert!((score_code_line("    let x = 1;") - 0.75).abs() < 1e-9);
        let score = score_code_line("$ cargo build --release && ./target/release/app {}");
        assert!(score <= 1.0);
    }

    #[test]
    fn test_detect_code_language() {
        assert_eq!(
            detect_code_language("{\n  \"name\": \"demo\",\n  \"version\": \"1.0.0\"\n}"),
            "json"
        );
        assert_eq!(detect_code_language("$ cargo build"), "bash");
        assert_eq!(detect_code_language("def greet(name):\n    print(name)"), "python");
        assert_eq!(
            detect_code_language("package main\n\nfunc main() {\n    fmt.Println(\"hi\")\n}"),
            "go"
        );
        assert_eq!(
            detect_code_language("fn main() {\n    let mut x = 1;\n    println!(\"{}\", x);\n}"),
            "rust"
        );
        assert_eq!(
            detect_code_language("SELECT id, name FROM users WHERE id = 1;"),
            "sql"
        );
        assert_eq!(
            detect_code_language(".button {\n  color: red;\n  margin: 0;\n}"),
            "css"
        );
        assert_eq!(
            detect_code_language("name: demo\nversion: 2\nenabled: true"),
            "yaml"
        );
        assert_eq!(detect_code_language("hello there"), "");
        assert_eq!(detect_code_language("   "), "");
    }

    #[test]
    fn test_recover_shell_lines_into_bash_fence() {
        let result = recover_code_blocks(SHELL_INPUT, CodeRecoveryOptions::default());
        assert!(result.changed);
        assert_eq!(result.recovered_block_count, 1);
        assert_eq!(
            result.recovered_text.as_deref(),
            Some("```bash\nnpm install foo\nnpm run build\n```")
        );
        let suggestion = &result.suggestions[0];
        assert_eq!((suggestion.start_line, suggestion.end_line), (1, 2));
        assert_eq!(suggestion.language, "bash");
        assert!(suggestion.confidence <= 0.95);
    }

    #[test]
    fn test_recovery_is_idempotent_on_its_output() {
        let text = "Install the tool first.\n\nnpm install foo\nnpm run build\n\nThen open the app.";
        let first = recover_code_blocks(text, CodeRecoveryOptions::default());
        assert!(first.changed);
        let recovered = first.recovered_text.unwrap();

        let second = recover_code_blocks(&recovered, CodeRecoveryOptions::default());
        assert!(!second.changed);
        assert_eq!(second.recovered_block_count, 0);
        assert_eq!(second.recovered_text.as_deref(), Some(recovered.as_str()));
    }

    #[test]
    fn test_prose_and_existing_fences_pass_through() {
        let prose = "This is a normal sentence.\nAnother one follows here.";
        let result = recover_code_blocks(prose, CodeRecoveryOptions::default());
        assert!(!result.changed);
        assert_eq!(result.recovered_block_count, 0);

        let fenced = "```\nnpm install foo\n```\n";
        let result = recover_code_blocks(fenced, CodeRecoveryOptions { include_text: false });
        assert!(!result.changed);
        assert!(result.recovered_text.is_none());
    }
}
