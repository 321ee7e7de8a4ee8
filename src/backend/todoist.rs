//! Todoist REST v2 客户端
//!
//! Bearer Token 鉴权；写操作一律 POST / DELETE。base_url 可配置（代理或测试用 mock server）。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::backend::{
    BackendError, Comment, Label, NewTask, Project, Section, Task, TaskBackend, TaskPatch,
};

pub const TODOIST_API_BASE: &str = "https://api.todoist.com/rest/v2";

/// Todoist 客户端：持有 reqwest Client、token 与 API 根地址
pub struct TodoistClient {
    client: Client,
    token: String,
    base_url: String,
}

impl TodoistClient {
    pub fn new(token: impl Into<String>, base_url: Option<&str>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            token: token.into(),
            base_url: base_url
                .unwrap_or(TODOIST_API_BASE)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.endpoint(path))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .bearer_auth(&self.token)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(self.endpoint(path))
            .bearer_auth(&self.token)
    }

    async fn send(request: RequestBuilder, what: &str) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        let response = Self::send(request, what).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TaskBackend for TodoistClient {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        Self::send_json(self.get("/tasks"), "tasks").await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        Self::send_json(self.get("/projects"), "projects").await
    }

    async fn list_sections(&self) -> Result<Vec<Section>, BackendError> {
        Self::send_json(self.get("/sections"), "sections").await
    }

    async fn list_labels(&self) -> Result<Vec<Label>, BackendError> {
        Self::send_json(self.get("/labels"), "labels").await
    }

    async fn get_task(&self, id: &str) -> Result<Task, BackendError> {
        Self::send_json(self.get(&format!("/tasks/{id}")), &format!("task {id}")).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, BackendError> {
        Self::send_json(self.post("/tasks").json(task), "tasks").await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), BackendError> {
        Self::send(self.post(&format!("/tasks/{id}")).json(patch), &format!("task {id}")).await?;
        Ok(())
    }

    async fn close_task(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.post(&format!("/tasks/{id}/close")), &format!("task {id}")).await?;
        Ok(())
    }

    async fn reopen_task(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.post(&format!("/tasks/{id}/reopen")), &format!("task {id}")).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.delete(&format!("/tasks/{id}")), &format!("task {id}")).await?;
        Ok(())
    }

    async fn create_project(&self, name: &str) -> Result<Project, BackendError> {
        Self::send_json(self.post("/projects").json(&json!({ "name": name })), "projects").await
    }

    async fn delete_project(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.delete(&format!("/projects/{id}")), &format!("project {id}")).await?;
        Ok(())
    }

    async fn create_section(&self, name: &str, project_id: &str) -> Result<Section, BackendError> {
        let body = json!({ "name": name, "project_id": project_id });
        Self::send_json(self.post("/sections").json(&body), "sections").await
    }

    async fn delete_section(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.delete(&format!("/sections/{id}")), &format!("section {id}")).await?;
        Ok(())
    }

    async fn create_label(&self, name: &str) -> Result<Label, BackendError> {
        Self::send_json(self.post("/labels").json(&json!({ "name": name })), "labels").await
    }

    async fn delete_label(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.delete(&format!("/labels/{id}")), &format!("label {id}")).await?;
        Ok(())
    }

    async fn create_comment(&self, task_id: &str, content: &str) -> Result<Comment, BackendError> {
        let body = json!({ "task_id": task_id, "content": content });
        Self::send_json(self.post("/comments").json(&body), "comments").await
    }

    async fn delete_comment(&self, id: &str) -> Result<(), BackendError> {
        Self::send(self.delete(&format!("/comments/{id}")), &format!("comment {id}")).await?;
        Ok(())
    }
}
