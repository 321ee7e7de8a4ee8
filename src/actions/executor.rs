//! 动作执行器
//!
//! 持有 ActionRegistry、后端与单个动作的超时，dispatch(action, dry_run) 在超时内调用对应 Handler。
//! 任何失败（字段缺失、未知类型、后端错误、超时）都转为 Failed 结果而不是 Err；
//! 每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::actions::{Action, ActionRegistry, ActionResult, ActionStatus};
use crate::backend::TaskBackend;
use crate::core::EngineError;

pub struct ActionExecutor {
    registry: ActionRegistry,
    backend: Arc<dyn TaskBackend>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry, backend: Arc<dyn TaskBackend>, timeout_secs: u64) -> Self {
        Self {
            registry,
            backend,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行或预演单个动作；总是返回 ActionResult
    pub async fn dispatch(&self, action: &Action, dry_run: bool) -> ActionResult {
        let start = Instant::now();
        let result = self.run(action, dry_run).await;
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(action = %action.action_type, error = %e, "Action failed");
                ActionResult::failed(action.clone(), e.to_string())
            }
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "action": action.action_type,
            "dry_run": dry_run,
            "status": result.status.to_string(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "api_call": preview(&result.api_call),
        });
        tracing::info!(audit = %audit.to_string(), "action");
        result
    }

    async fn run(&self, action: &Action, dry_run: bool) -> Result<ActionResult, EngineError> {
        if let Some(defect) = &action.defect {
            return Err(EngineError::InvalidAction(defect.clone()));
        }
        let handler = action
            .kind()
            .and_then(|kind| self.registry.get(kind))
            .ok_or_else(|| EngineError::UnknownAction(action.action_type.clone()))?;

        let outcome = timeout(self.timeout, handler.handle(action, dry_run, self.backend.as_ref()))
            .await
            .map_err(|_| EngineError::ActionTimeout(action.action_type.clone()))??;

        // Handler 的约定：预演只产出 Preview，真实执行只产出 Replayable
        debug_assert!(
            outcome.status != ActionStatus::Simulated
                || outcome.undo.as_ref().map_or(true, |u| u.is_preview())
        );

        Ok(ActionResult {
            action: action.clone(),
            status: outcome.status,
            message: outcome.message,
            api_call: outcome.api_call,
            undo: outcome.undo,
        })
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn TaskBackend> {
        &self.backend
    }
}

fn preview(s: &str) -> String {
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
