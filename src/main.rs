//! Taskpilot 命令行
//!
//! 入口：初始化日志、加载配置、创建编排器，并在 stdin 上运行交互循环。
//! 自由文本交给模型分析；以 `:` 开头的是命令（:preview / :apply / :drop N / :undo / :history / :refresh / :reset / :quit）。
//! `--offline` 使用内存后端与 Mock LLM，无需任何凭据。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use taskpilot::actions::{Action, ActionResult, ActionStatus};
use taskpilot::backend::{MockBackend, Project, Task, TaskBackend, TodoistClient};
use taskpilot::config::{credential, load_config, AppConfig, TODOIST_TOKEN_ENV};
use taskpilot::core::{create_llm_from_config, EngineError, Orchestrator};
use taskpilot::llm::{LlmClient, MockLlmClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// 用户在一行里输入的指令
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// 自由文本：交给模型分析
    Ask(String),
    Preview,
    Apply,
    /// 从待执行列表移除第 N 个（从 1 开始）
    Drop(usize),
    Undo,
    History,
    Refresh,
    Reset,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let Some(rest) = line.strip_prefix(':') else {
            return Command::Ask(line.to_string());
        };
        let mut parts = rest.split_whitespace();
        match (parts.next().unwrap_or_default(), parts.next()) {
            ("preview", None) => Command::Preview,
            ("apply", None) => Command::Apply,
            ("drop", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Drop(n),
                _ => Command::Unknown(line.to_string()),
            },
            ("undo", None) => Command::Undo,
            ("history", None) => Command::History,
            ("refresh", None) => Command::Refresh,
            ("reset", None) => Command::Reset,
            ("quit" | "q" | "exit", None) => Command::Quit,
            ("help" | "h", None) => Command::Help,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "Commands: :preview  :apply  :drop N  :undo  :history  :refresh  :reset  :quit\nAnything else is sent to the assistant.";

/// 离线演示数据
fn demo_backend() -> MockBackend {
    let mut inbox = Project::new("2001", "Inbox");
    inbox.is_inbox_project = true;
    let mut urgent = Task::new("3002", "Renew passport", "2002");
    urgent.priority = 4;
    MockBackend::new()
        .with_project(inbox)
        .with_project(Project::new("2002", "Personal"))
        .with_task(Task::new("3001", "Buy milk", "2001"))
        .with_task(urgent)
        .with_task(Task::new("3003", "Plan garden", "2002"))
}

fn print_actions(actions: &[Action]) {
    if actions.is_empty() {
        println!("(no pending actions)");
    }
    for (i, action) in actions.iter().enumerate() {
        println!("  {}. {}", i + 1, action.summary());
    }
}

fn print_results(results: &[ActionResult]) {
    for result in results {
        let mark = match result.status {
            ActionStatus::Success => "ok",
            ActionStatus::Simulated => "dry",
            ActionStatus::Failed => "FAILED",
        };
        println!("  [{mark}] {}", result.message);
        if !result.api_call.is_empty() {
            println!("        {}", result.api_call);
        }
        match &result.undo {
            Some(undo) => println!("        undo: {}", undo.action().summary()),
            None if result.is_ok() => println!("        undo: (not reversible)"),
            None => {}
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskpilot::observability::init();

    let mut offline = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--offline" => offline = true,
            _ => config_path = Some(PathBuf::from(arg)),
        }
    }

    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let (backend, llm): (Arc<dyn TaskBackend>, Arc<dyn LlmClient>) = if offline {
        tracing::info!("Offline mode: in-memory backend and mock LLM");
        (Arc::new(demo_backend()), Arc::new(MockLlmClient::new()))
    } else {
        let token = credential(TODOIST_TOKEN_ENV).with_context(|| {
            format!("{TODOIST_TOKEN_ENV} is not set (run with --offline to try without it)")
        })?;
        let backend = TodoistClient::new(token, cfg.backend.base_url.as_deref(), cfg.backend.timeout_secs);
        (Arc::new(backend), create_llm_from_config(&cfg))
    };

    let mut orchestrator = Orchestrator::new(llm, backend, &cfg);
    let mut state = orchestrator
        .fetch_state()
        .await
        .context("Failed to fetch initial state")?;
    let mut pending: Vec<Action> = Vec::new();

    println!(
        "{} ready: {} tasks in {} projects.",
        cfg.app.name.as_deref().unwrap_or("taskpilot"),
        state.tasks.len(),
        state.projects.len()
    );
    println!("{HELP}");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Command::Ask(text) => {
                let analysis = match orchestrator.analyze(&state, &text).await {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        println!("Could not reach the assistant: {e}");
                        continue;
                    }
                };
                println!("\n{}\n", analysis.thought);
                pending = analysis.actions;
                if !pending.is_empty() {
                    println!("Proposed actions (:preview to simulate, :apply to run):");
                    print_actions(&pending);
                }
            }
            Command::Preview => {
                let results = orchestrator.execute(&pending, true).await;
                print_results(&results);
            }
            Command::Apply => {
                if pending.is_empty() {
                    println!("(no pending actions)");
                    continue;
                }
                let results = orchestrator.execute(&pending, false).await;
                print_results(&results);
                pending.clear();
                match orchestrator.fetch_state().await {
                    Ok(fresh) => {
                        state = fresh;
                        orchestrator.sync_state(&state).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Refresh after apply failed"),
                }
            }
            Command::Drop(n) => {
                if n <= pending.len() {
                    let dropped = pending.remove(n - 1);
                    println!("Dropped: {}", dropped.summary());
                } else {
                    println!("No pending action #{n}");
                }
                print_actions(&pending);
            }
            Command::Undo => match orchestrator.undo().await {
                Ok(results) => {
                    print_results(&results);
                    if let Ok(fresh) = orchestrator.fetch_state().await {
                        state = fresh;
                        orchestrator.sync_state(&state).await;
                    }
                }
                Err(EngineError::NothingToUndo) => println!("Nothing to undo."),
                Err(e) => println!("Undo failed: {e}"),
            },
            Command::History => {
                println!("Undo history: {} batch(es). Next undo would run:", orchestrator.undo_depth());
                print_actions(orchestrator.pending_undo());
            }
            Command::Refresh => match orchestrator.fetch_state().await {
                Ok(fresh) => {
                    state = fresh;
                    orchestrator.sync_state(&state).await;
                    println!("Refreshed: {} tasks.", state.tasks.len());
                }
                Err(e) => println!("Refresh failed: {e}"),
            },
            Command::Reset => {
                orchestrator.reset_session();
                pending.clear();
                println!("Conversation reset.");
            }
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Unknown(input) => println!("Unknown command: {input}\n{HELP}"),
        }
    }

    Ok(())
}
