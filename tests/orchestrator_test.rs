//! 编排器集成测试：内存后端 + 脚本化 LLM，走完整的 分析 → 执行 → 撤销 流程

use std::sync::Arc;

use taskpilot::actions::{Action, ActionKind, ActionStatus, Compensation, PLACEHOLDER_ID};
use taskpilot::backend::{Label, MockBackend, Project, Section, Task};
use taskpilot::config::AppConfig;
use taskpilot::core::{EngineError, EnginePhase, Orchestrator};
use taskpilot::llm::MockLlmClient;
use taskpilot::memory::Role;

fn backend() -> Arc<MockBackend> {
    let mut labelled = Task::new("2", "Call Bob", "p1");
    labelled.labels = vec!["phone".into()];
    Arc::new(
        MockBackend::new()
            .with_project(Project::new("p1", "Work"))
            .with_project(Project::new("p2", "Home"))
            .with_section(Section {
                id: "s1".into(),
                project_id: "p2".into(),
                name: "Garden".into(),
            })
            .with_label(Label {
                id: "l1".into(),
                name: "phone".into(),
            })
            .with_task(Task::new("1", "Write report", "p1"))
            .with_task(labelled)
            .with_task(Task::new("3", "Pay rent", "p1"))
            .with_task(Task::new("42", "Review PR", "p1")),
    )
}

fn orchestrator(backend: &Arc<MockBackend>, llm: &Arc<MockLlmClient>) -> Orchestrator {
    Orchestrator::new(llm.clone(), backend.clone(), &AppConfig::default())
}

fn close(id: &str) -> Action {
    Action::new(ActionKind::CloseTask).with_id(id)
}

fn reopen(id: &str) -> Action {
    Action::new(ActionKind::ReopenTask).with_id(id)
}

#[tokio::test]
async fn test_fenced_close_task_scenario() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::with_replies([
        "Understood.",
        "Sure! ```json\n{\"thought\":\"Closing it.\",\"actions\":[{\"type\":\"close_task\",\"id\":\"42\"}]}\n``` Done.",
    ]));
    let mut engine = orchestrator(&backend, &llm);

    let state = engine.fetch_state().await.unwrap();
    let analysis = engine.analyze(&state, "I finished reviewing the PR").await.unwrap();
    assert_eq!(analysis.thought, "Closing it.");
    assert_eq!(analysis.actions, vec![close("42")]);

    let results = engine.execute(&analysis.actions, false).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ActionStatus::Success);
    assert_eq!(results[0].undo, Some(Compensation::Replayable(reopen("42"))));
    assert_eq!(engine.undo_depth(), 1);
    assert!(backend.task("42").unwrap().is_completed);
}

#[tokio::test]
async fn test_undo_reverses_batch_order() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    engine.execute(&[close("1"), close("2"), close("3")], false).await;
    assert_eq!(engine.pending_undo(), &[reopen("3"), reopen("2"), reopen("1")]);
    let before = backend.calls().len();

    let results = engine.undo().await.unwrap();

    assert!(results.iter().all(|r| r.status == ActionStatus::Success));
    let targets: Vec<String> = backend.calls()[before..]
        .iter()
        .map(|c| c.target.clone())
        .collect();
    assert_eq!(targets, vec!["/tasks/3/reopen", "/tasks/2/reopen", "/tasks/1/reopen"]);
    assert_eq!(engine.undo_depth(), 0);
    assert!(!backend.task("1").unwrap().is_completed);
}

#[tokio::test]
async fn test_hard_deletes_are_left_out_of_the_batch() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let results = engine
        .execute(
            &[close("1"), Action::new(ActionKind::DeleteTask).with_id("3")],
            false,
        )
        .await;

    assert_eq!(results[1].status, ActionStatus::Success);
    assert!(results[1].undo.is_none());
    assert_eq!(engine.pending_undo(), &[reopen("1")]);
}

#[tokio::test]
async fn test_batch_with_only_hard_deletes_pushes_nothing() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    engine
        .execute(&[Action::new(ActionKind::DeleteTask).with_id("3")], false)
        .await;

    assert_eq!(engine.undo_depth(), 0);
    assert!(matches!(engine.undo().await, Err(EngineError::NothingToUndo)));
}

#[tokio::test]
async fn test_partial_failure_keeps_going() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let results = engine
        .execute(
            &[
                close("1"),
                Action::new(ActionKind::CloseTask),
                Action::from_value(serde_json::json!({"type": "launch_rocket"})),
                close("missing"),
                close("3"),
            ],
            false,
        )
        .await;

    let statuses: Vec<ActionStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ActionStatus::Success,
            ActionStatus::Failed,
            ActionStatus::Failed,
            ActionStatus::Failed,
            ActionStatus::Success,
        ]
    );
    assert_eq!(results[1].message, "Missing 'id' for close_task");
    assert_eq!(results[2].message, "unknown action type: launch_rocket");
    assert_eq!(engine.pending_undo(), &[reopen("3"), reopen("1")]);
}

fn every_kind() -> Vec<Action> {
    vec![
        Action::new(ActionKind::CreateTask).with_content("New").with_project_id("p1"),
        Action::new(ActionKind::UpdateTask).with_id("1").with_priority(4),
        close("1"),
        reopen("1"),
        Action::new(ActionKind::DeleteTask).with_id("3"),
        Action::new(ActionKind::MoveTask).with_id("1").with_section_id("s1"),
        Action::new(ActionKind::CreateProject).with_name("Garden"),
        Action::new(ActionKind::DeleteProject).with_id("p2"),
        Action::new(ActionKind::CreateSection).with_name("Later").with_project_id("p1"),
        Action::new(ActionKind::DeleteSection).with_id("s1"),
        Action::new(ActionKind::CreateLabel).with_name("errand"),
        Action::new(ActionKind::DeleteLabel).with_name("phone"),
        Action::new(ActionKind::AddLabel).with_task_id("1").with_label("urgent"),
        Action::new(ActionKind::RemoveLabel).with_task_id("2").with_label("phone"),
        Action::new(ActionKind::AddComment).with_task_id("1").with_content("note"),
        Action::new(ActionKind::DeleteComment).with_id("c1"),
    ]
}

#[tokio::test]
async fn test_dry_run_is_pure_for_every_kind() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let actions = every_kind();
    let results = engine.execute(&actions, true).await;

    assert_eq!(results.len(), 16);
    for result in &results {
        assert_eq!(result.status, ActionStatus::Simulated, "{}", result.action.summary());
        if let Some(undo) = &result.undo {
            assert!(undo.is_preview());
        }
    }
    assert_eq!(backend.mutation_count(), 0);
    assert_eq!(engine.undo_depth(), 0);
    assert!(engine.pending_undo().is_empty());

    let create = &results[0];
    assert_eq!(
        create.undo,
        Some(Compensation::Preview(
            Action::new(ActionKind::DeleteTask).with_id(PLACEHOLDER_ID)
        ))
    );
}

#[tokio::test]
async fn test_dry_run_on_missing_task_is_still_simulated() {
    let backend = Arc::new(MockBackend::new());
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let actions = [
        close("999"),
        Action::new(ActionKind::UpdateTask).with_id("999").with_priority(4),
        Action::new(ActionKind::AddLabel).with_task_id("999").with_label("x"),
        Action::new(ActionKind::RemoveLabel).with_task_id("999").with_label("x"),
        Action::new(ActionKind::MoveTask).with_id("999").with_project_id("p1"),
    ];
    let results = engine.execute(&actions, true).await;

    for result in &results {
        assert_eq!(result.status, ActionStatus::Simulated, "{}", result.message);
    }
    for result in &results[1..] {
        assert!(result.undo.is_none());
        assert!(result.message.contains("unavailable"), "{}", result.message);
    }
    assert_eq!(backend.mutation_count(), 0);
    assert_eq!(engine.undo_depth(), 0);
}

#[tokio::test]
async fn test_idempotent_label_ops_record_nothing() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let results = engine
        .execute(
            &[
                Action::new(ActionKind::AddLabel).with_task_id("2").with_label("phone"),
                Action::new(ActionKind::RemoveLabel).with_task_id("1").with_label("phone"),
            ],
            false,
        )
        .await;

    assert!(results.iter().all(|r| r.status == ActionStatus::Success && r.undo.is_none()));
    assert_eq!(backend.mutation_count(), 0);
    assert_eq!(engine.undo_depth(), 0);
}

#[tokio::test]
async fn test_update_undo_restores_original_values() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    engine
        .execute(
            &[Action::new(ActionKind::UpdateTask)
                .with_id("1")
                .with_content("Write final report")
                .with_priority(4)],
            false,
        )
        .await;
    assert_eq!(backend.task("1").unwrap().content, "Write final report");

    engine.undo().await.unwrap();

    let task = backend.task("1").unwrap();
    assert_eq!(task.content, "Write report");
    assert_eq!(task.priority, 1);
}

#[tokio::test]
async fn test_create_then_undo_removes_created_task() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);

    let results = engine
        .execute(
            &[Action::new(ActionKind::CreateTask).with_content("Buy milk")],
            false,
        )
        .await;
    let undo = results[0].undo.clone().unwrap().into_replayable().unwrap();
    assert_eq!(undo.kind(), Some(ActionKind::DeleteTask));
    let created = undo.id.clone().unwrap();
    assert_ne!(created, PLACEHOLDER_ID);
    assert!(backend.task(&created).is_some());

    engine.undo().await.unwrap();

    assert!(backend.task(&created).is_none());
    assert_eq!(engine.undo_depth(), 0);
}

#[tokio::test]
async fn test_analyze_never_fails_after_session_start() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::with_replies(["Understood."]));
    llm.push_error("connection reset");
    llm.push_reply("");
    llm.push_reply("   ");
    let mut engine = orchestrator(&backend, &llm);
    let state = engine.fetch_state().await.unwrap();

    let first = engine.analyze(&state, "hello").await.unwrap();
    assert!(first.actions.is_empty());
    assert!(first.thought.contains("connection reset"));

    let second = engine.analyze(&state, "hello again").await.unwrap();
    assert!(second.actions.is_empty());
    assert_eq!(second.thought, "Error: No response or invalid JSON.");
    assert_eq!(engine.phase(), EnginePhase::ChatStarted);
}

#[tokio::test]
async fn test_session_start_failure_is_setup_failed() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    llm.push_error("no route to host");
    let mut engine = orchestrator(&backend, &llm);
    let state = engine.fetch_state().await.unwrap();

    let err = engine.analyze(&state, "hello").await.unwrap_err();

    assert!(matches!(err, EngineError::SetupFailed(_)));
    assert!(engine.session().is_none());
    assert_eq!(engine.phase(), EnginePhase::Idle);
}

#[tokio::test]
async fn test_sync_state_sends_system_update_and_keeps_priming() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::with_replies([
        "Understood.",
        r#"{"thought": "ok", "actions": []}"#,
    ]));
    let mut cfg = AppConfig::default();
    cfg.llm.max_context_turns = 2;
    let mut engine = Orchestrator::new(llm.clone(), backend.clone(), &cfg);

    let state = engine.fetch_state().await.unwrap();
    engine.analyze(&state, "hello").await.unwrap();
    engine.sync_state(&state).await;
    engine.sync_state(&state).await;
    engine.analyze(&state, "anything new?").await.unwrap();

    let requests = llm.requests();
    let sync = requests[2].last().unwrap();
    assert_eq!(sync.role, Role::User);
    assert!(sync.content.starts_with("SYSTEM UPDATE: The actions have been executed."));

    let last = requests.last().unwrap();
    assert!(last[0].content.contains("Here is the current state:"));
    assert_eq!(engine.session().unwrap().len(), 4);
    assert_eq!(engine.session().unwrap().turn(), 5);
}

#[tokio::test]
async fn test_retry_keeps_request_with_single_turn_context() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::with_replies([
        "Understood.",
        "not json at all",
        r#"{"thought": "fixed", "actions": []}"#,
    ]));
    let mut cfg = AppConfig::default();
    cfg.llm.max_context_turns = 1;
    let mut engine = Orchestrator::new(llm.clone(), backend.clone(), &cfg);

    let state = engine.fetch_state().await.unwrap();
    let analysis = engine.analyze(&state, "close the report").await.unwrap();
    assert_eq!(analysis.thought, "fixed");

    let retry = &llm.requests()[2];
    let contents: Vec<&str> = retry.iter().map(|m| m.content.as_str()).collect();
    assert!(contents.contains(&"close the report"));
    assert!(contents.contains(&"not json at all"));
    assert!(retry[0].content.contains("Here is the current state:"));
}

#[tokio::test]
async fn test_reset_session_keeps_undo_history() {
    let backend = backend();
    let llm = Arc::new(MockLlmClient::new());
    let mut engine = orchestrator(&backend, &llm);
    let state = engine.fetch_state().await.unwrap();

    engine.analyze(&state, "hello").await.unwrap();
    engine.execute(&[close("1")], false).await;
    engine.reset_session();

    assert!(engine.session().is_none());
    assert_eq!(engine.pending_undo(), &[reopen("1")]);
    engine.analyze(&state, "hello again").await.unwrap();
    assert_eq!(engine.session().unwrap().turn(), 2);
}
