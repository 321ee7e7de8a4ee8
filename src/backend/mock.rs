//! 内存后端（测试与离线模式）
//!
//! 行为与 Todoist 一致到 Handler 关心的程度：新建分配自增 id，关闭的任务不再出现在列表中。
//! 每次调用都记录为 BackendCall，可断言「预演模式下没有写操作」等性质；fail_on 可注入失败。

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::{
    BackendError, Comment, Label, NewTask, Project, Section, Task, TaskBackend, TaskPatch,
    TODOIST_API_BASE,
};

/// 一次后端调用记录
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendCall {
    pub method: &'static str,
    pub target: String,
    pub mutating: bool,
}

#[derive(Debug, Default)]
struct MockState {
    tasks: Vec<Task>,
    projects: Vec<Project>,
    sections: Vec<Section>,
    labels: Vec<Label>,
    comments: Vec<Comment>,
    next_id: u64,
    calls: Vec<BackendCall>,
    failing: HashSet<&'static str>,
}

impl MockState {
    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 1000 + self.next_id)
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, BackendError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("task {id}")))
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

fn remove_by_id<T>(items: &mut Vec<T>, id: &str, key: impl Fn(&T) -> &str, what: &str) -> Result<(), BackendError> {
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        Err(BackendError::NotFound(format!("{what} {id}")))
    } else {
        Ok(())
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 记录调用；若该方法被注入失败则返回 HTTP 500
    fn record(&self, state: &mut MockState, method: &'static str, target: String, mutating: bool) -> Result<(), BackendError> {
        state.calls.push(BackendCall {
            method,
            target,
            mutating,
        });
        if state.failing.contains(method) {
            return Err(BackendError::Status {
                status: 500,
                body: format!("injected failure for {method}"),
            });
        }
        Ok(())
    }

    pub fn with_task(self, task: Task) -> Self {
        self.lock().tasks.push(task);
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        self.lock().projects.push(project);
        self
    }

    pub fn with_section(self, section: Section) -> Self {
        self.lock().sections.push(section);
        self
    }

    pub fn with_label(self, label: Label) -> Self {
        self.lock().labels.push(label);
        self
    }

    /// 之后所有 `method` 调用都失败（如 "close_task"）
    pub fn fail_on(&self, method: &'static str) {
        self.lock().failing.insert(method);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.mutating).count()
    }

    /// 按 id 取任务（含已关闭的）
    pub fn task(&self, id: &str) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.lock().projects.clone()
    }

    pub fn sections(&self) -> Vec<Section> {
        self.lock().sections.clone()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.lock().labels.clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.lock().comments.clone()
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    fn endpoint(&self, path: &str) -> String {
        format!("{TODOIST_API_BASE}{path}")
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "list_tasks", "/tasks".into(), false)?;
        Ok(state.tasks.iter().filter(|t| !t.is_completed).cloned().collect())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "list_projects", "/projects".into(), false)?;
        Ok(state.projects.clone())
    }

    async fn list_sections(&self) -> Result<Vec<Section>, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "list_sections", "/sections".into(), false)?;
        Ok(state.sections.clone())
    }

    async fn list_labels(&self) -> Result<Vec<Label>, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "list_labels", "/labels".into(), false)?;
        Ok(state.labels.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Task, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "get_task", format!("/tasks/{id}"), false)?;
        state.task_mut(id).map(|t| t.clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "create_task", "/tasks".into(), true)?;
        let id = state.mint_id();
        let inbox = state
            .projects
            .iter()
            .find(|p| p.is_inbox_project)
            .map(|p| p.id.clone())
            .unwrap_or_default();
        let mut created = Task::new(id, task.content.clone(), task.project_id.clone().unwrap_or(inbox));
        created.section_id = task.section_id.clone();
        created.labels = task.labels.clone().unwrap_or_default();
        created.priority = task.priority.unwrap_or(1);
        created.due = task.due_string.as_ref().map(|s| crate::backend::Due {
            string: s.clone(),
            date: String::new(),
            is_recurring: false,
        });
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "update_task", format!("/tasks/{id}"), true)?;
        let task = state.task_mut(id)?;
        if let Some(content) = &patch.content {
            task.content = content.clone();
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(labels) = &patch.labels {
            task.labels = labels.clone();
        }
        if let Some(due) = &patch.due_string {
            task.due = (due != "no date").then(|| crate::backend::Due {
                string: due.clone(),
                date: String::new(),
                is_recurring: false,
            });
        }
        if let Some(project_id) = &patch.project_id {
            task.project_id = project_id.clone();
            task.section_id = None;
        }
        if let Some(section_id) = &patch.section_id {
            task.section_id = Some(section_id.clone());
        }
        Ok(())
    }

    async fn close_task(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "close_task", format!("/tasks/{id}/close"), true)?;
        state.task_mut(id)?.is_completed = true;
        Ok(())
    }

    async fn reopen_task(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "reopen_task", format!("/tasks/{id}/reopen"), true)?;
        state.task_mut(id)?.is_completed = false;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "delete_task", format!("/tasks/{id}"), true)?;
        remove_by_id(&mut state.tasks, id, |t| t.id.as_str(), "task")
    }

    async fn create_project(&self, name: &str) -> Result<Project, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "create_project", "/projects".into(), true)?;
        let project = Project::new(state.mint_id(), name);
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn delete_project(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "delete_project", format!("/projects/{id}"), true)?;
        remove_by_id(&mut state.projects, id, |p| p.id.as_str(), "project")
    }

    async fn create_section(&self, name: &str, project_id: &str) -> Result<Section, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "create_section", "/sections".into(), true)?;
        if !state.projects.iter().any(|p| p.id == project_id) {
            return Err(BackendError::NotFound(format!("project {project_id}")));
        }
        let section = Section {
            id: state.mint_id(),
            project_id: project_id.to_string(),
            name: name.to_string(),
        };
        state.sections.push(section.clone());
        Ok(section)
    }

    async fn delete_section(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "delete_section", format!("/sections/{id}"), true)?;
        remove_by_id(&mut state.sections, id, |s| s.id.as_str(), "section")
    }

    async fn create_label(&self, name: &str) -> Result<Label, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "create_label", "/labels".into(), true)?;
        let label = Label {
            id: state.mint_id(),
            name: name.to_string(),
        };
        state.labels.push(label.clone());
        Ok(label)
    }

    async fn delete_label(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "delete_label", format!("/labels/{id}"), true)?;
        remove_by_id(&mut state.labels, id, |l| l.id.as_str(), "label")
    }

    async fn create_comment(&self, task_id: &str, content: &str) -> Result<Comment, BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "create_comment", "/comments".into(), true)?;
        state.task_mut(task_id)?;
        let comment = Comment {
            id: state.mint_id(),
            task_id: Some(task_id.to_string()),
            content: content.to_string(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        self.record(&mut state, "delete_comment", format!("/comments/{id}"), true)?;
        remove_by_id(&mut state.comments, id, |c| c.id.as_str(), "comment")
    }
}
