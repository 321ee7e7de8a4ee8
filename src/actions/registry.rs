//! 动作注册表
//!
//! 每种 ActionKind 对应一个 ActionHandler（校验字段 → 计算撤销动作 → 预演或执行），
//! 由 ActionRegistry 按类型注册与查找。standard() 在启动时一次性构建完整表，
//! 穷举 match 保证新增类型时编译期就会提示缺少 Handler。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::actions::{comment, label, project, task};
use crate::actions::{Action, ActionKind, ActionStatus, Compensation};
use crate::backend::TaskBackend;
use crate::core::EngineError;

/// Handler 的成功产出（Failed 由 Err 表达，在 dispatch 边界转换）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: ActionStatus,
    pub message: String,
    pub api_call: String,
    pub undo: Option<Compensation>,
}

impl Outcome {
    /// 预演结果：撤销动作标记为 Preview
    pub fn simulated(message: impl Into<String>, api_call: impl Into<String>, undo: Option<Action>) -> Self {
        Self {
            status: ActionStatus::Simulated,
            message: message.into(),
            api_call: api_call.into(),
            undo: undo.map(Compensation::Preview),
        }
    }

    /// 真实执行成功：撤销动作可重放
    pub fn success(message: impl Into<String>, api_call: impl Into<String>, undo: Option<Action>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            api_call: api_call.into(),
            undo: undo.map(Compensation::Replayable),
        }
    }

    /// 无需改动（如标签已存在）：不写远端，也没有可撤销的内容
    pub fn unchanged(dry_run: bool, message: impl Into<String>, api_call: impl Into<String>) -> Self {
        if dry_run {
            Self::simulated(message, api_call, None)
        } else {
            Self::success(message, api_call, None)
        }
    }
}

/// 动作 Handler：类型、给 LLM 的说明与示例、异步处理
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// 给 LLM 的一行说明
    fn description(&self) -> &str;

    /// 示例 JSON（写入 system prompt 的动作词汇表）
    fn example(&self) -> Value;

    /// dry_run 为 true 时不得调用任何写接口；只读查询允许
    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError>;
}

/// 必填字段检查
pub(crate) fn require<'a>(
    value: &'a Option<String>,
    field: &'static str,
    kind: ActionKind,
) -> Result<&'a str, EngineError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(EngineError::MissingField { kind, field })
}

/// 请求体预览，写入 api_call
pub(crate) fn body_preview(body: &impl serde::Serialize) -> String {
    serde_json::to_string(body).unwrap_or_default()
}

fn handler_for(kind: ActionKind) -> Arc<dyn ActionHandler> {
    match kind {
        ActionKind::CreateTask => Arc::new(task::CreateTask),
        ActionKind::UpdateTask => Arc::new(task::UpdateTask),
        ActionKind::CloseTask => Arc::new(task::CloseTask),
        ActionKind::ReopenTask => Arc::new(task::ReopenTask),
        ActionKind::DeleteTask => Arc::new(task::DeleteTask),
        ActionKind::MoveTask => Arc::new(task::MoveTask),
        ActionKind::CreateProject => Arc::new(project::CreateProject),
        ActionKind::DeleteProject => Arc::new(project::DeleteProject),
        ActionKind::CreateSection => Arc::new(project::CreateSection),
        ActionKind::DeleteSection => Arc::new(project::DeleteSection),
        ActionKind::CreateLabel => Arc::new(label::CreateLabel),
        ActionKind::DeleteLabel => Arc::new(label::DeleteLabel),
        ActionKind::AddLabel => Arc::new(label::AddLabel),
        ActionKind::RemoveLabel => Arc::new(label::RemoveLabel),
        ActionKind::AddComment => Arc::new(comment::AddComment),
        ActionKind::DeleteComment => Arc::new(comment::DeleteComment),
    }
}

/// 动作注册表：按 ActionKind 存储 Arc<dyn ActionHandler>
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 完整的 16 种动作
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in ActionKind::iter() {
            registry.handlers.insert(kind, handler_for(kind));
        }
        registry
    }

    pub fn register(&mut self, handler: impl ActionHandler + 'static) {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 已注册的类型（按 ActionKind 声明顺序）
    pub fn kinds(&self) -> Vec<ActionKind> {
        ActionKind::iter()
            .filter(|k| self.handlers.contains_key(k))
            .collect()
    }

    /// 生成 prompt 中的动作词汇表：每行一个示例 JSON + 说明，与实际注册的 Handler 一致
    pub fn vocabulary(&self) -> String {
        self.kinds()
            .into_iter()
            .filter_map(|kind| self.handlers.get(&kind))
            .map(|handler| format!("{}  // {}", handler.example(), handler.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
