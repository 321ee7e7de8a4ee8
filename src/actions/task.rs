//! 任务类动作：创建 / 更新 / 关闭 / 重开 / 删除 / 移动
//!
//! update_task 与 move_task 会先读取任务当前值，撤销动作由「被覆盖前的值」构造。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::registry::{body_preview, require, ActionHandler, Outcome};
use crate::actions::{Action, ActionKind, PLACEHOLDER_ID};
use crate::backend::{NewTask, Task, TaskBackend, TaskPatch};
use crate::core::EngineError;

/// Todoist 用于清除截止日期的 due_string
const CLEAR_DUE: &str = "no date";

fn checked_priority(action: &Action) -> Result<Option<u8>, EngineError> {
    match action.priority {
        Some(p) if !(1..=4).contains(&p) => Err(EngineError::InvalidAction(format!(
            "priority must be between 1 and 4, got {p}"
        ))),
        other => Ok(other),
    }
}

pub struct CreateTask;

#[async_trait]
impl ActionHandler for CreateTask {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateTask
    }

    fn description(&self) -> &str {
        "create a task; project_id, section_id, labels, priority (1-4, 4 = urgent) and due_string are optional"
    }

    fn example(&self) -> Value {
        json!({"type": "create_task", "content": "Task Name", "project_id": "optional_id", "due_string": "tomorrow", "labels": ["label1"]})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let content = require(&action.content, "content", self.kind())?;
        let body = NewTask {
            content: content.to_string(),
            project_id: action.project_id.clone(),
            section_id: action.section_id.clone(),
            labels: action.labels.clone(),
            priority: checked_priority(action)?,
            due_string: action.due_string.clone(),
        };
        let api_call = format!("POST {} with {}", backend.endpoint("/tasks"), body_preview(&body));
        let undo = Action::new(ActionKind::DeleteTask).with_id(PLACEHOLDER_ID);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would create task '{content}'"),
                api_call,
                Some(undo),
            ));
        }

        let created = backend.create_task(&body).await?;
        tracing::info!(task_id = %created.id, "Created task");
        Ok(Outcome::success(
            format!("Created task '{content}' ({})", created.id),
            api_call,
            Some(undo.with_id(created.id)),
        ))
    }
}

pub struct UpdateTask;

impl UpdateTask {
    fn patch(action: &Action) -> Result<TaskPatch, EngineError> {
        Ok(TaskPatch {
            content: action.content.clone(),
            priority: checked_priority(action)?,
            labels: action.labels.clone(),
            due_string: action.due_string.clone(),
            ..TaskPatch::default()
        })
    }

    /// 只还原本次要覆盖的字段
    fn restore(id: &str, patch: &TaskPatch, current: &Task) -> Action {
        let mut undo = Action::new(ActionKind::UpdateTask).with_id(id);
        if patch.content.is_some() {
            undo = undo.with_content(current.content.clone());
        }
        if patch.priority.is_some() {
            undo = undo.with_priority(current.priority);
        }
        if patch.labels.is_some() {
            undo = undo.with_labels(current.labels.clone());
        }
        if patch.due_string.is_some() {
            let previous = current
                .due
                .as_ref()
                .map(|d| d.string.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| CLEAR_DUE.to_string());
            undo = undo.with_due_string(previous);
        }
        undo
    }
}

#[async_trait]
impl ActionHandler for UpdateTask {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateTask
    }

    fn description(&self) -> &str {
        "change content, priority, labels (replaces the whole list) or due_string of a task"
    }

    fn example(&self) -> Value {
        json!({"type": "update_task", "id": "task_id", "content": "New Name", "priority": 4})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let patch = Self::patch(action)?;
        if patch.is_empty() {
            return Err(EngineError::InvalidAction(format!(
                "update_task for {id} changes nothing (expected content, priority, labels or due_string)"
            )));
        }

        let url = backend.endpoint(&format!("/tasks/{id}"));
        let current = match backend.get_task(id).await {
            Ok(task) => task,
            Err(e) if dry_run => {
                return Ok(Outcome::simulated(
                    format!("Would update task {id} (current values unavailable: {e})"),
                    format!("GET {url}"),
                    None,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let undo = Self::restore(id, &patch, &current);
        let api_call = format!("GET {url} -> POST {url} with {}", body_preview(&patch));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would update task {id} with {}", body_preview(&patch)),
                api_call,
                Some(undo),
            ));
        }

        backend.update_task(id, &patch).await?;
        tracing::info!(task_id = %id, "Updated task");
        Ok(Outcome::success(format!("Updated task {id}"), api_call, Some(undo)))
    }
}

pub struct CloseTask;

#[async_trait]
impl ActionHandler for CloseTask {
    fn kind(&self) -> ActionKind {
        ActionKind::CloseTask
    }

    fn description(&self) -> &str {
        "complete a task"
    }

    fn example(&self) -> Value {
        json!({"type": "close_task", "id": "task_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("POST {}", backend.endpoint(&format!("/tasks/{id}/close")));
        let undo = Action::new(ActionKind::ReopenTask).with_id(id);

        if dry_run {
            return Ok(Outcome::simulated(format!("Would close task {id}"), api_call, Some(undo)));
        }

        backend.close_task(id).await?;
        tracing::info!(task_id = %id, "Closed task");
        Ok(Outcome::success(format!("Closed task {id}"), api_call, Some(undo)))
    }
}

pub struct ReopenTask;

#[async_trait]
impl ActionHandler for ReopenTask {
    fn kind(&self) -> ActionKind {
        ActionKind::ReopenTask
    }

    fn description(&self) -> &str {
        "reopen a completed task"
    }

    fn example(&self) -> Value {
        json!({"type": "reopen_task", "id": "task_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("POST {}", backend.endpoint(&format!("/tasks/{id}/reopen")));
        let undo = Action::new(ActionKind::CloseTask).with_id(id);

        if dry_run {
            return Ok(Outcome::simulated(format!("Would reopen task {id}"), api_call, Some(undo)));
        }

        backend.reopen_task(id).await?;
        tracing::info!(task_id = %id, "Reopened task");
        Ok(Outcome::success(format!("Reopened task {id}"), api_call, Some(undo)))
    }
}

pub struct DeleteTask;

#[async_trait]
impl ActionHandler for DeleteTask {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteTask
    }

    fn description(&self) -> &str {
        "permanently delete a task (cannot be undone)"
    }

    fn example(&self) -> Value {
        json!({"type": "delete_task", "id": "task_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("DELETE {}", backend.endpoint(&format!("/tasks/{id}")));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would permanently delete task {id}"),
                api_call,
                None,
            ));
        }

        backend.delete_task(id).await?;
        tracing::info!(task_id = %id, "Deleted task");
        Ok(Outcome::success(format!("Deleted task {id}"), api_call, None))
    }
}

pub struct MoveTask;

#[async_trait]
impl ActionHandler for MoveTask {
    fn kind(&self) -> ActionKind {
        ActionKind::MoveTask
    }

    fn description(&self) -> &str {
        "move a task to another project and/or section"
    }

    fn example(&self) -> Value {
        json!({"type": "move_task", "id": "task_id", "project_id": "optional_p_id", "section_id": "optional_s_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let patch = TaskPatch {
            project_id: action.project_id.clone(),
            section_id: action.section_id.clone(),
            ..TaskPatch::default()
        };
        if patch.is_empty() {
            return Err(EngineError::InvalidAction(format!(
                "No destination provided for move_task {id}"
            )));
        }

        let url = backend.endpoint(&format!("/tasks/{id}"));
        let current = match backend.get_task(id).await {
            Ok(task) => task,
            Err(e) if dry_run => {
                return Ok(Outcome::simulated(
                    format!("Would move task {id} (current location unavailable: {e})"),
                    format!("GET {url}"),
                    None,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let mut undo = Action::new(ActionKind::MoveTask)
            .with_id(id)
            .with_project_id(current.project_id.clone());
        if let Some(section_id) = &current.section_id {
            undo = undo.with_section_id(section_id.clone());
        }
        let api_call = format!("GET {url} -> POST {url} with {}", body_preview(&patch));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would move task {id} to {}", body_preview(&patch)),
                api_call,
                Some(undo),
            ));
        }

        backend.update_task(id, &patch).await?;
        tracing::info!(task_id = %id, "Moved task");
        Ok(Outcome::success(format!("Moved task {id}"), api_call, Some(undo)))
    }
}
