//! TodoistClient 的 HTTP 形态：路径、Bearer 头、JSON 请求体，经由 wiremock 验证

use std::sync::Arc;

use serde_json::json;
use taskpilot::actions::{Action, ActionExecutor, ActionKind, ActionRegistry, ActionStatus};
use taskpilot::backend::{BackendError, NewTask, TaskBackend, TodoistClient};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> TodoistClient {
    TodoistClient::new(TOKEN, Some(&server.uri()), 5)
}

fn task_json(id: &str, labels: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "content": "Call Bob",
        "description": "",
        "project_id": "p1",
        "section_id": null,
        "labels": labels,
        "priority": 1,
        "due": null,
        "is_completed": false,
        "url": "https://todoist.com/showTask?id=7"
    })
}

#[tokio::test]
async fn test_list_tasks_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([task_json("7", &["phone"])])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client(&server).list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "7");
    assert_eq!(tasks[0].labels, vec!["phone"]);
}

#[tokio::test]
async fn test_create_task_posts_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(body_json(json!({"content": "Buy milk", "due_string": "tomorrow"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("99", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_task(&NewTask {
            content: "Buy milk".into(),
            due_string: Some("tomorrow".into()),
            ..NewTask::default()
        })
        .await
        .unwrap();

    assert_eq!(created.id, "99");
}

#[tokio::test]
async fn test_close_task_path_and_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/42/close"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).close_task("42").await.unwrap();
}

#[tokio::test]
async fn test_status_errors_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/projects/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.delete_project("1").await,
        Err(BackendError::NotFound(_))
    ));
    assert_eq!(
        client.delete_project("2").await,
        Err(BackendError::Status {
            status: 403,
            body: "forbidden".into()
        })
    );
}

#[tokio::test]
async fn test_add_label_reads_then_writes_full_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("7", &["phone"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks/7"))
        .and(body_json(json!({"labels": ["phone", "waiting"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json("7", &["phone", "waiting"])))
        .expect(1)
        .mount(&server)
        .await;

    let executor = ActionExecutor::new(ActionRegistry::standard(), Arc::new(client(&server)), 5);
    let action = Action::new(ActionKind::AddLabel)
        .with_task_id("7")
        .with_label("waiting");

    let result = executor.dispatch(&action, false).await;

    assert_eq!(result.status, ActionStatus::Success);
    assert!(result.api_call.starts_with(&format!("GET {}/tasks/7", server.uri())));
}

#[tokio::test]
async fn test_dry_run_reaches_no_write_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let executor = ActionExecutor::new(ActionRegistry::standard(), Arc::new(client(&server)), 5);
    let result = executor
        .dispatch(&Action::new(ActionKind::CloseTask).with_id("42"), true)
        .await;

    assert_eq!(result.status, ActionStatus::Simulated);
    assert_eq!(result.api_call, format!("POST {}/tasks/42/close", server.uri()));
}
