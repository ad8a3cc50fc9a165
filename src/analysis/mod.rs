//! 确定性文本启发式分析：结构信号、原始块解析与代码块恢复
//!
//! 本模块内的函数均为纯函数且不会失败，异常输入（如空文本）降级为全零结果。

pub mod blocks;
pub mod code_recovery;
pub mod patterns;
pub mod signals;

pub use blocks::{DEFAULT_MAX_RAW_BLOCKS, RawBlock, RawBlockKind, RawBlocksResult, parse_raw_blocks};
pub use code_recovery::{
    CodeRecoveryOptions, CodeRecoveryResult, CodeRecoverySuggestion, detect_code_language,
    recover_code_blocks, score_code_line,
};
pub use signals::{StructureCue, StructureSignals, analyze_structure_signals};

// Include tests
#[cfg(test)]
mod tests;
