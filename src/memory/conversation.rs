//! 对话状态：消息与 ChatSession
//!
//! ChatSession 是显式的会话值（历史 + 单调递增的轮次计数），由 Orchestrator 独占持有；
//! 发送失败时历史保持不变。超出 max_turns 时剪枝，但始终保留首轮（系统指令 + 初始状态）。

use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 首轮（priming 指令 + 模型确认）占用的消息条数
const PRIMING_MESSAGES: usize = 2;

/// 与模型的一次会话：每轮含 user + assistant 两条消息
#[derive(Clone, Debug)]
pub struct ChatSession {
    messages: Vec<Message>,
    turn: u64,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            turn: 0,
            max_turns: max_turns.max(1),
        }
    }

    /// 发送一轮：history + user(text) 交给模型；成功才写入历史并递增 turn
    pub async fn send(&mut self, llm: &dyn LlmClient, text: &str) -> Result<String, LlmError> {
        let mut outgoing = self.messages.clone();
        outgoing.push(Message::user(text));

        let reply = llm.complete(&outgoing).await?;

        self.messages.push(Message::user(text));
        self.messages.push(Message::assistant(reply.clone()));
        self.turn += 1;
        self.prune();
        Ok(reply)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 已完成的轮次数（单调递增，剪枝不影响）
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 超出 max_turns*2 时丢弃首轮之后最旧的消息；首轮与最近一轮始终保留
    fn prune(&mut self) {
        let keep = (self.max_turns * 2).max(PRIMING_MESSAGES + 2);
        if self.messages.len() > keep {
            let excess = self.messages.len() - keep;
            self.messages.drain(PRIMING_MESSAGES..PRIMING_MESSAGES + excess);
        }
    }
}
