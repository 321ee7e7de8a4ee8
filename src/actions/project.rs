//! 项目与分区：创建（撤销 = 删除新建的 id）/ 删除（不可撤销）

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::actions::registry::{require, ActionHandler, Outcome};
use crate::actions::{Action, ActionKind, PLACEHOLDER_ID};
use crate::backend::TaskBackend;
use crate::core::EngineError;

pub struct CreateProject;

#[async_trait]
impl ActionHandler for CreateProject {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateProject
    }

    fn description(&self) -> &str {
        "create a project"
    }

    fn example(&self) -> Value {
        json!({"type": "create_project", "name": "New Project Name"})
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
            backend.endpoint("/projects"),
            json!({ "name": name })
        );
        let undo = Action::new(ActionKind::DeleteProject).with_id(PLACEHOLDER_ID);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would create project '{name}'"),
                api_call,
                Some(undo),
            ));
        }

        let project = backend.create_project(name).await?;
        tracing::info!(project_id = %project.id, "Created project");
        Ok(Outcome::success(
            format!("Created project '{name}' ({})", project.id),
            api_call,
            Some(undo.with_id(project.id)),
        ))
    }
}

pub struct DeleteProject;

#[async_trait]
impl ActionHandler for DeleteProject {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteProject
    }

    fn description(&self) -> &str {
        "permanently delete a project and everything in it (cannot be undone)"
    }

    fn example(&self) -> Value {
        json!({"type": "delete_project", "id": "project_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("DELETE {}", backend.endpoint(&format!("/projects/{id}")));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would permanently delete project {id}"),
                api_call,
                None,
            ));
        }

        backend.delete_project(id).await?;
        tracing::info!(project_id = %id, "Deleted project");
        Ok(Outcome::success(format!("Deleted project {id}"), api_call, None))
    }
}

pub struct CreateSection;

#[async_trait]
impl ActionHandler for CreateSection {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateSection
    }

    fn description(&self) -> &str {
        "create a section inside a project"
    }

    fn example(&self) -> Value {
        json!({"type": "create_section", "name": "Section Name", "project_id": "project_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let name = require(&action.name, "name", self.kind())?;
        let project_id = require(&action.project_id, "project_id", self.kind())?;
        let api_call = format!(
            "POST {} with {}",
            backend.endpoint("/sections"),
            json!({ "name": name, "project_id": project_id })
        );
        let undo = Action::new(ActionKind::DeleteSection).with_id(PLACEHOLDER_ID);

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would create section '{name}' in project {project_id}"),
                api_call,
                Some(undo),
            ));
        }

        let section = backend.create_section(name, project_id).await?;
        tracing::info!(section_id = %section.id, %project_id, "Created section");
        Ok(Outcome::success(
            format!("Created section '{name}' ({})", section.id),
            api_call,
            Some(undo.with_id(section.id)),
        ))
    }
}

pub struct DeleteSection;

#[async_trait]
impl ActionHandler for DeleteSection {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteSection
    }

    fn description(&self) -> &str {
        "permanently delete a section (cannot be undone)"
    }

    fn example(&self) -> Value {
        json!({"type": "delete_section", "id": "section_id"})
    }

    async fn handle(
        &self,
        action: &Action,
        dry_run: bool,
        backend: &dyn TaskBackend,
    ) -> Result<Outcome, EngineError> {
        let id = require(&action.id, "id", self.kind())?;
        let api_call = format!("DELETE {}", backend.endpoint(&format!("/sections/{id}")));

        if dry_run {
            return Ok(Outcome::simulated(
                format!("Would permanently delete section {id}"),
                api_call,
                None,
            ));
        }

        backend.delete_section(id).await?;
        tracing::info!(section_id = %id, "Deleted section");
        Ok(Outcome::success(format!("Deleted section {id}"), api_call, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionStatus;
    use crate::backend::{MockBackend, Project};

    #[tokio::test]
    async fn test_create_project_then_undo_deletes_it() {
        let backend = MockBackend::new();
        let action = Action::new(ActionKind::CreateProject).with_name("Garden");

        let outcome = CreateProject.handle(&action, false, &backend).await.unwrap();
        let undo = outcome.undo.unwrap().into_replayable().unwrap();
        assert_eq!(backend.projects().len(), 1);

        let outcome = DeleteProject.handle(&undo, false, &backend).await.unwrap();
        assert_eq!(outcome.status, ActionStatus::Success);
        assert!(outcome.undo.is_none());
        assert!(backend.projects().is_empty());
    }

    #[tokio::test]
    async fn test_create_section_requires_project() {
        let backend = MockBackend::new();
        let action = Action::new(ActionKind::CreateSection).with_name("Someday");
        let err = CreateSection.handle(&action, true, &backend).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing 'project_id' for create_section");
    }

    #[tokio::test]
    async fn test_create_section_in_existing_project() {
        let backend = MockBackend::new().with_project(Project::new("p1", "Home"));
        let action = Action::new(ActionKind::CreateSection)
            .with_name("Someday")
            .with_project_id("p1");

        let outcome = CreateSection.handle(&action, false, &backend).await.unwrap();

        let undo = outcome.undo.unwrap().into_replayable().unwrap();
        assert_eq!(undo.kind(), Some(ActionKind::DeleteSection));
        assert_eq!(undo.id, Some(backend.sections()[0].id.clone()));
    }

    #[tokio::test]
    async fn test_delete_section_dry_run() {
        let backend = MockBackend::new();
        let action = Action::new(ActionKind::DeleteSection).with_id("s9");
        let outcome = DeleteSection.handle(&action, true, &backend).await.unwrap();
        assert_eq!(outcome.status, ActionStatus::Simulated);
        assert!(outcome.undo.is_none());
        assert!(backend.calls().is_empty());
    }
}
