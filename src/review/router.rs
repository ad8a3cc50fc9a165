use serde::{Deserialize, Serialize};

use crate::analysis::StructureSignals;

/// 代码线索行数超过该值且没有markdown标记时，直接走结构恢复分支
pub const CODE_CUE_ROUTE_THRESHOLD: usize = 2;

/// 每个请求只决策一次的工作流分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRoute {
    /// 单次排版：基于确定性启发式结果恢复结构
    StructureRecovery,
    /// 先审阅，再按需编辑
    ReviewThenEdit,
}

impl std::fmt::Display for WorkflowRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowRoute::StructureRecovery => write!(f, "structure_recovery"),
            WorkflowRoute::ReviewThenEdit => write!(f, "review_then_edit"),
        }
    }
}

pub fn route_workflow(signals: &StructureSignals) -> WorkflowRoute {
    if signals.is_likely_unstructured_plain_text
        || (signals.code_cue_line_count > CODE_CUE_ROUTE_THRESHOLD && !signals.has_markdown_signals)
    {
        WorkflowRoute::StructureRecovery
    } else {
        WorkflowRoute::ReviewThenEdit
    }
}
