//! 评论：添加（撤销 = 删除该评论）/ 删除（不可撤销）

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::registry::{require, ActionHandler, Outcome};
use crate::actions::{Action, ActionKind, PLACEHOLDER_ID};
use crate::backend::TaskBackend;
use crate::core::EngineError;

pub struct AddComment;

#[async_trait]
impl ActionHandler for AddComment {
    fn kind(&self) -> ActionKind {
        ActionKind::AddComment
    }

    fn description(&self) -> &str {
        "add a comment to a task"
    }

    fn example(&self) -> Value {
        json!({"type": "add_comment", "task_id": "task_id", "content": "Comment content"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let task_id = require(&action.task_id, "task_id", self.kind())?;
        let content = require(&action.content, "content", self.kind())?;
        let api_call = format!(
            "POST {} with {}",
            backend.endpoint("/comments"),
            json!({ "task_id": task_id, "content": content })
        );
        let undo = Action::new(ActionKind::DeleteComment).with_id(PLACEHOLDER_ID);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would add comment to task {task_id}"),
                api_call,
                Some(undo),
            ));
        }

        let comment = backend.create_comment(task_id, content).await?;
        tracing::info!(%task_id, comment_id = %comment.id, "Added comment");
        Ok(Outcome::success(
            format!("Added comment to task {task_id}"),
            api_call,
            Some(undo.with_id(comment.id)),
        ))
    }
}

pub struct DeleteComment;

#[async_trait]
impl ActionHandler for DeleteComment {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteComment
    }

    fn description(&self) -> &str {
        "permanently delete a comment (cannot be undone)"
    }

    fn example(&self) -> Value {
        json!({"type": "delete_comment", "id": "comment_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("DELETE {}", backend.endpoint(&format!("/comments/{id}")));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would permanently delete comment {id}"),
                api_call,
                None,
            ));
        }

        backend.delete_comment(id).await?;
        tracing::info!(comment_id = %id, "Deleted comment");
        Ok(Outcome::success(format!("Deleted comment {id}"), api_call, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, Task};

    #[tokio::test]
    async fn test_comment_round_trip() {
        let backend = MockBackend::new().with_task(Task::new("7", "Call Bob", "p1"));
        let action = Action::new(ActionKind::AddComment)
            .with_task_id("7")
            .with_content("left a voicemail");

        let outcome = AddComment.handle(&action, false, &backend).await.unwrap();
        assert_eq!(backend.comments().len(), 1);

        let undo = outcome.undo.unwrap().into_replayable().unwrap();
        let outcome = DeleteComment.handle(&undo, false, &backend).await.unwrap();
        assert!(outcome.undo.is_none());
        assert!(backend.comments().is_empty());
    }

    #[tokio::test]
    async fn test_add_comment_requires_content() {
        let backend = MockBackend::new();
        let action = Action::new(ActionKind::AddComment).with_task_id("7");
        let err = AddComment.handle(&action, false, &backend).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing 'content' for add_comment");
    }
}
