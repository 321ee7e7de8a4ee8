//! LLM 客户端抽象
//!
//! 所有后端（Gemini / OpenAI 兼容 / Mock）实现 LlmClient：complete 接收完整对话历史，只返回文本。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Transport(e.to_string())
    }
}

/// LLM 客户端 trait：无状态的多轮完成，会话由调用方（ChatSession）维护
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}
