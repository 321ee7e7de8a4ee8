//! 任务后端：TaskBackend trait（Handler 只经由它访问远端）、Todoist REST 实现、内存 Mock

pub mod mock;
pub mod todoist;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use mock::{BackendCall, MockBackend};
pub use todoist::{TodoistClient, TODOIST_API_BASE};
pub use types::{Comment, Due, Label, NewTask, Project, Section, Task, TaskPatch};

/// 后端调用错误（传输失败 / 非 2xx / 响应无法解析）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// 任务后端：读操作（列表 / 单任务）与每种写操作一一对应
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// 资源路径对应的完整 URL（用于 ActionResult.api_call 描述）
    fn endpoint(&self, path: &str) -> String;

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError>;
    async fn list_projects(&self) -> Result<Vec<Project>, BackendError>;
    async fn list_sections(&self) -> Result<Vec<Section>, BackendError>;
    async fn list_labels(&self) -> Result<Vec<Label>, BackendError>;
    async fn get_task(&self, id: &str) -> Result<Task, BackendError>;

    async fn create_task(&self, task: &NewTask) -> Result<Task, BackendError>;
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), BackendError>;
    async fn close_task(&self, id: &str) -> Result<(), BackendError>;
    async fn reopen_task(&self, id: &str) -> Result<(), BackendError>;
    async fn delete_task(&self, id: &str) -> Result<(), BackendError>;

    async fn create_project(&self, name: &str) -> Result<Project, BackendError>;
    async fn delete_project(&self, id: &str) -> Result<(), BackendError>;

    async fn create_section(&self, name: &str, project_id: &str) -> Result<Section, BackendError>;
    async fn delete_section(&self, id: &str) -> Result<(), BackendError>;

    async fn create_label(&self, name: &str) -> Result<Label, BackendError>;
    async fn delete_label(&self, id: &str) -> Result<(), BackendError>;

    async fn create_comment(&self, task_id: &str, content: &str) -> Result<Comment, BackendError>;
    async fn delete_comment(&self, id: &str) -> Result<(), BackendError>;
}
