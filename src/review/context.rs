use tracing::debug;

use crate::analysis::{
    CodeRecoveryOptions, CodeRecoveryResult, RawBlocksResult, StructureSignals,
    analyze_structure_signals, parse_raw_blocks, recover_code_blocks,
};
use crate::factual::FactualBaseline;

use super::router::{WorkflowRoute, route_workflow};

/// 一次请求的全部确定性分析结果，路由之前一次性算好，之后只读
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub route: WorkflowRoute,
    pub signals: StructureSignals,
    pub raw_blocks: RawBlocksResult,
    pub code_recovery: CodeRecoveryResult,
    pub baseline: FactualBaseline,
}

pub fn resolve_workflow_context(text: &str, max_raw_blocks: usize) -> WorkflowContext {
    let signals = analyze_structure_signals(text);
    let raw_blocks = parse_raw_blocks(text, max_raw_blocks);
    let code_recovery = recover_code_blocks(text, CodeRecoveryOptions { include_text: true });
    let baseline = FactualBaseline::from_text(text);
    let route = route_workflow(&signals);

    debug!(
        %route,
        cues = ?signals.cues,
        blocks = raw_blocks.block_count,
        recovered = code_recovery.recovered_block_count,
        "workflow context resolved"
    );

    WorkflowContext {
        route,
        signals,
        raw_blocks,
        code_recovery,
        baseline,
    }
}
