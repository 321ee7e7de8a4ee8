//! 标签：创建 / 删除标签本身，以及给任务加 / 去标签
//!
//! 后端的更新接口会整体替换标签列表，因此 add_label / remove_label 是「读 → 拼接 → 写回」。
//! 标签已存在（或本就不存在）时视为成功且不产生撤销动作。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::registry::{body_preview, require, ActionHandler, Outcome};
use crate::actions::{Action, ActionKind, PLACEHOLDER_ID};
use crate::backend::{BackendError, TaskBackend, TaskPatch};
use crate::core::EngineError;

pub struct CreateLabel;

#[async_trait]
impl ActionHandler for CreateLabel {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateLabel
    }

    fn description(&self) -> &str {
        "create a personal label"
    }

    fn example(&self) -> Value {
        json!({"type": "create_label", "name": "Label Name"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let name = require(&action.name, "name", self.kind())?;
        let api_call = format!(
            "POST {} with {}",
            backend.endpoint("/labels"),
            json!({ "name": name })
        );
        let undo = Action::new(ActionKind::DeleteLabel).with_id(PLACEHOLDER_ID);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would create label '{name}'"),
                api_call,
                Some(undo),
            ));
        }

        let label = backend.create_label(name).await?;
        tracing::info!(label_id = %label.id, "Created label");
        Ok(Outcome::success(
            format!("Created label '{name}' ({})", label.id),
            api_call,
            Some(undo.with_id(label.id)),
        ))
    }
}

pub struct DeleteLabel;

#[async_trait]
impl ActionHandler for DeleteLabel {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteLabel
    }

    fn description(&self) -> &str {
        "permanently delete a label by id or name (cannot be undone)"
    }

    fn example(&self) -> Value {
        json!({"type": "delete_label", "name": "Label Name"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = match (action.id.as_deref(), action.name.as_deref()) {
            (Some(id), _) if !id.trim().is_empty() => id.to_string(),
            (_, Some(name)) if !name.trim().is_empty() => backend
                .list_labels()
                .await?
                .into_iter()
                .find(|l| l.name == name)
                .map(|l| l.id)
                .ok_or_else(|| BackendError::NotFound(format!("label '{name}'")))?,
            _ => {
                return Err(EngineError::MissingField {
                    kind: self.kind(),
                    field: "id",
                })
            }
        };
        let api_call = format!("DELETE {}", backend.endpoint(&format!("/labels/{id}")));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would permanently delete label {id}"),
                api_call,
                None,
            ));
        }

        backend.delete_label(&id).await?;
        tracing::info!(label_id = %id, "Deleted label");
        Ok(Outcome::success(format!("Deleted label {id}"), api_call, None))
    }
}

pub struct AddLabel;

#[async_trait]
impl ActionHandler for AddLabel {
    fn kind(&self) -> ActionKind {
        ActionKind::AddLabel
    }

    fn description(&self) -> &str {
        "attach a label to a task, keeping its other labels"
    }

    fn example(&self) -> Value {
        json!({"type": "add_label", "task_id": "task_id", "label": "Label Name"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let task_id = require(&action.task_id, "task_id", self.kind())?;
        let label = require(&action.label, "label", self.kind())?;
        let url = backend.endpoint(&format!("/tasks/{task_id}"));

        let task = match backend.get_task(task_id).await {
            Ok(task) => task,
            Err(e) if dry_run => {
                return Ok(Outcome::simulated(
                    format!("Would add label '{label}' to task {task_id} (task unavailable: {e})"),
                    format!("GET {url}"),
                    None,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        if task.labels.iter().any(|l| l == label) {
            tracing::info!(%task_id, %label, "Label already present");
            return Ok(Outcome::unchanged(
                dry_run,
                format!("Label '{label}' already on task {task_id}"),
                format!("GET {url}"),
            ));
        }

        let mut labels = task.labels;
        labels.push(label.to_string());
        let patch = TaskPatch::labels(labels);
        let api_call = format!("GET {url} -> POST {url} with {}", body_preview(&patch));
        let undo = Action::new(ActionKind::RemoveLabel)
            .with_task_id(task_id)
            .with_label(label);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would add label '{label}' to task {task_id}"),
                api_call,
                Some(undo),
            ));
        }

        backend.update_task(task_id, &patch).await?;
        tracing::info!(%task_id, %label, "Added label");
        Ok(Outcome::success(
            format!("Added label '{label}' to task {task_id}"),
            api_call,
            Some(undo),
        ))
    }
}

pub struct RemoveLabel;

#[async_trait]
impl ActionHandler for RemoveLabel {
    fn kind(&self) -> ActionKind {
        ActionKind::RemoveLabel
    }

    fn description(&self) -> &str {
        "detach a label from a task"
    }

    fn example(&self) -> Value {
        json!({"type": "remove_label", "task_id": "task_id", "label": "Label Name"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let task_id = require(&action.task_id, "task_id", self.kind())?;
        let label = require(&action.label, "label", self.kind())?;
        let url = backend.endpoint(&format!("/tasks/{task_id}"));

        let task = match backend.get_task(task_id).await {
            Ok(task) => task,
            Err(e) if dry_run => {
                return Ok(Outcome::simulated(
                    format!("Would remove label '{label}' from task {task_id} (task unavailable: {e})"),
                    format!("GET {url}"),
                    None,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        if !task.labels.iter().any(|l| l == label) {
            tracing::info!(%task_id, %label, "Label not on task");
            return Ok(Outcome::unchanged(
                dry_run,
                format!("Label '{label}' not found on task {task_id}"),
                format!("GET {url}"),
            ));
        }

        let labels: Vec<String> = task.labels.into_iter().filter(|l| l != label).collect();
        let patch = TaskPatch::labels(labels);
        let api_call = format!("GET {url} -> POST {url} with {}", body_preview(&patch));
        let undo = Action::new(ActionKind::AddLabel)
            .with_task_id(task_id)
            .with_label(label);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would remove label '{label}' from task {task_id}"),
                api_call,
                Some(undo),
            ));
        }

        backend.update_task(task_id, &patch).await?;
        tracing::info!(%task_id, %label, "Removed label");
        Ok(Outcome::success(
            format!("Removed label '{label}' from task {task_id}"),
            api_call,
            Some(undo),
        ))
    }
}
