//! 动作数据模型：Action（模型提出的一次变更）、ActionKind（封闭的类型集合）、
//! Compensation（撤销动作，区分真实可重放与预演占位）、ActionResult（单个动作的执行结果）

use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// 预演时创建类动作的撤销目标 id（永远不会由后端分配）
pub const PLACEHOLDER_ID: &str = "<simulated-id>";

/// 封闭的动作类型集合；线上格式为 snake_case（如 "close_task"）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    CreateTask,
    UpdateTask,
    CloseTask,
    ReopenTask,
    DeleteTask,
    MoveTask,
    CreateProject,
    DeleteProject,
    CreateSection,
    DeleteSection,
    CreateLabel,
    DeleteLabel,
    AddLabel,
    RemoveLabel,
    AddComment,
    DeleteComment,
}

impl ActionKind {
    /// 硬删除：执行后无法忠实重建，因此不产生撤销动作
    pub fn is_hard_delete(self) -> bool {
        matches!(
            self,
            ActionKind::DeleteTask
                | ActionKind::DeleteProject
                | ActionKind::DeleteSection
                | ActionKind::DeleteLabel
                | ActionKind::DeleteComment
        )
    }
}

/// 模型提出的单个动作：type + 稀疏可选字段，只填与类型相关的字段
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", default)]
    pub action_type: String,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    /// 原始 JSON 无法按字段读取时的原因；dispatch 时直接判为 Failed
    #[serde(skip)]
    pub defect: Option<String>,
}

/// id 类字段接受字符串或整数（模型偶尔输出 "id": 42）
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or integer id, got {other}"
        ))),
    }
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            action_type: kind.to_string(),
            ..Self::default()
        }
    }

    /// 从模型输出的任意 JSON 元素构造；无法读取的元素保留 type 并记录 defect
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Action>(value.clone()) {
            Ok(action) => action,
            Err(e) => Self {
                action_type: value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                defect: Some(e.to_string()),
                ..Self::default()
            },
        }
    }

    /// 解析 type；未知类型返回 None
    pub fn kind(&self) -> Option<ActionKind> {
        ActionKind::from_str(&self.action_type).ok()
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..self
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    pub fn with_priority(self, priority: u8) -> Self {
        Self {
            priority: Some(priority),
            ..self
        }
    }

    pub fn with_project_id(self, project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..self
        }
    }

    pub fn with_section_id(self, section_id: impl Into<String>) -> Self {
        Self {
            section_id: Some(section_id.into()),
            ..self
        }
    }

    pub fn with_labels(self, labels: Vec<String>) -> Self {
        Self {
            labels: Some(labels),
            ..self
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    pub fn with_task_id(self, task_id: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id.into()),
            ..self
        }
    }

    pub fn with_due_string(self, due_string: impl Into<String>) -> Self {
        Self {
            due_string: Some(due_string.into()),
            ..self
        }
    }

    /// 单行摘要（日志与 CLI 展示用）
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.action_type.clone())
    }
}

/// 执行状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionStatus {
    Simulated,
    Success,
    Failed,
}

/// 撤销动作：Replayable 来自真实执行（id 真实），Preview 来自预演（可能含 PLACEHOLDER_ID）。
/// 只有 Replayable 能进入 UndoLedger。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "action", rename_all = "snake_case")]
pub enum Compensation {
    Replayable(Action),
    Preview(Action),
}

impl Compensation {
    pub fn action(&self) -> &Action {
        match self {
            Compensation::Replayable(action) | Compensation::Preview(action) => action,
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Compensation::Preview(_))
    }

    /// 仅 Replayable 返回动作本身
    pub fn into_replayable(self) -> Option<Action> {
        match self {
            Compensation::Replayable(action) => Some(action),
            Compensation::Preview(_) => None,
        }
    }
}

/// 单个动作的执行结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub action: Action,
    pub status: ActionStatus,
    pub message: String,
    /// 对应的 HTTP 调用描述（如 "POST https://.../tasks/42/close"）
    pub api_call: String,
    pub undo: Option<Compensation>,
}

impl ActionResult {
    pub fn failed(action: Action, message: impl Into<String>) -> Self {
        Self {
            action,
            status: ActionStatus::Failed,
            message: message.into(),
            api_call: String::new(),
            undo: None,
        }
    }

    /// Success 或 Simulated
    pub fn is_ok(&self) -> bool {
        self.status != ActionStatus::Failed
    }
}

/// 模型一次回复解析后的结构：actions 可为空（仅建议），thought 总存在
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub thought: String,
    pub actions: Vec<Action>,
}

impl AnalysisResult {
    pub fn advice(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            actions: Vec::new(),
        }
    }
}
