//! Mock LLM 客户端（用于测试与离线模式，无需 API）
//!
//! 按顺序返回预置回复；脚本耗尽后取最后一条 User 消息，回显为 advice-only JSON。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：脚本化回复 + 记录每次收到的完整消息列表
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(reply.into()));
        }
    }

    /// 下一次调用返回传输错误
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(LlmError::Transport(message.into())));
        }
    }

    /// 已收到的请求（每次 complete 的完整消息列表）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(serde_json::json!({
            "thought": format!("Echo from Mock: {last_user}"),
            "actions": []
        })
        .to_string())
    }
}
