//! 错误恢复引擎
//!
//! 根据计划提取失败与已重试次数返回 RecoveryAction：先带纠错指令重试一次，仍失败则降级为仅建议
//! （原始回复作为 thought，actions 为空）。

use crate::actions::AnalysisResult;
use crate::llm::LlmError;
use crate::planner::prompt::{FALLBACK_THOUGHT, RETRY_PROMPT};
use crate::planner::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 追加一轮纠错指令后重新解析
    RetryWithPrompt(String),
    /// 放弃解析，返回仅建议的结果
    AdviceOnly(AnalysisResult),
}

#[derive(Debug)]
pub struct RecoveryEngine {
    max_retries: u8,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

impl RecoveryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// retries 为已经做过的重试次数
    pub fn handle(&self, err: &ExtractError, raw: &str, retries: u8) -> RecoveryAction {
        if retries < self.max_retries {
            tracing::warn!(error = %err, "Malformed response, retrying once");
            return RecoveryAction::RetryWithPrompt(RETRY_PROMPT.to_string());
        }
        tracing::error!(error = %err, "Could not parse JSON, falling back to advice-only");
        RecoveryAction::AdviceOnly(advice_only(raw))
    }

    /// 会话建立后的传输失败：不抛出，降级为带错误信息的建议
    pub fn transport_failure(&self, err: &LlmError) -> AnalysisResult {
        tracing::error!(error = %err, "Model call failed, returning advice-only result");
        AnalysisResult::advice(format!("Error: the model request failed ({err})."))
    }
}

fn advice_only(raw: &str) -> AnalysisResult {
    if raw.trim().is_empty() {
        AnalysisResult::advice(FALLBACK_THOUGHT)
    } else {
        AnalysisResult::advice(raw)
    }
}
