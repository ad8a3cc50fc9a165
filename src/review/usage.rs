use serde::{Deserialize, Serialize};

use crate::llm::{AgentRole, TokenUsage};

/// 单个角色在一次请求内的累计用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub reasoning_tokens: u64,
    pub cached_tokens: u64,
    pub calls: u32,
}

impl AgentTokenUsage {
    /// 记录一次调用；失败调用的用量未知时传入`None`，仍计入调用次数
    pub fn record(&mut self, usage: Option<&TokenUsage>) {
        self.calls += 1;
        if let Some(usage) = usage {
            self.input_tokens += usage.input_tokens;
            self.output_tokens += usage.output_tokens;
            self.total_tokens += usage.total_tokens;
            self.reasoning_tokens += usage.reasoning_tokens;
            self.cached_tokens += usage.cached_tokens;
        }
    }

    pub fn merge(&mut self, other: &AgentTokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.reasoning_tokens += other.reasoning_tokens;
        self.cached_tokens += other.cached_tokens;
        self.calls += other.calls;
    }
}

/// 按角色划分的用量汇总，`total`为三者之和
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub reviewer: AgentTokenUsage,
    pub editor: AgentTokenUsage,
    pub formatter: AgentTokenUsage,
    pub total: AgentTokenUsage,
}

/// 请求级用量账本，由编排器独占持有，结束时一次性转换为汇总
#[derive(Debug, Default)]
pub struct UsageLedger {
    reviewer: AgentTokenUsage,
    editor: AgentTokenUsage,
    formatter: AgentTokenUsage,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role_mut(&mut self, role: AgentRole) -> &mut AgentTokenUsage {
        match role {
            AgentRole::Reviewer => &mut self.reviewer,
            AgentRole::Editor => &mut self.editor,
            AgentRole::Formatter => &mut self.formatter,
        }
    }

    pub fn snapshot(&self, role: AgentRole) -> AgentTokenUsage {
        match role {
            AgentRole::Reviewer => self.reviewer,
            AgentRole::Editor => self.editor,
            AgentRole::Formatter => self.formatter,
        }
    }

    pub fn into_summary(self) -> UsageSummary {
        let mut total = AgentTokenUsage::default();
        total.merge(&self.reviewer);
        total.merge(&self.editor);
        total.merge(&self.formatter);
        UsageSummary {
            reviewer: self.reviewer,
            editor: self.editor,
            formatter: self.formatter,
            total,
        }
    }
}
