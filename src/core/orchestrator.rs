//! 编排器：拉取状态 → 分析（模型提出动作）→ 执行 / 预演 → 撤销 → 同步状态
//!
//! Orchestrator 独占持有会话与撤销账本；所有会改变状态的方法都取 &mut self，
//! 同一实例同一时刻只有一个调用在进行。需要共享时由调用方包一层 tokio::sync::Mutex。

use std::sync::Arc;

use crate::actions::{
    Action, ActionExecutor, ActionRegistry, ActionResult, AnalysisResult, Compensation,
};
use crate::backend::TaskBackend;
use crate::config::{credential, AppConfig, ContextSection, GEMINI_KEY_ENV, OPENAI_KEY_ENV};
use crate::core::context;
use crate::core::ledger::UndoLedger;
use crate::core::recovery::{RecoveryAction, RecoveryEngine};
use crate::core::{EngineError, EnginePhase, RemoteState};
use crate::llm::{GeminiClient, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::ChatSession;
use crate::planner::{extract, prompt};

/// 根据配置与环境变量选择 LLM 后端（Gemini / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let model = cfg.llm.model.as_deref();

    match provider.as_str() {
        "gemini" => {
            if let Some(key) = credential(GEMINI_KEY_ENV) {
                let mut client = GeminiClient::new(&key, model, cfg.llm.timeouts.request);
                if let Some(base) = cfg.llm.base_url.as_deref() {
                    client = client.with_base_url(base);
                }
                tracing::info!("Using Gemini LLM ({})", model.unwrap_or("default model"));
                return Arc::new(client);
            }
        }
        "openai" => {
            if let Some(key) = credential(OPENAI_KEY_ENV) {
                let model = model.unwrap_or("gpt-4o-mini");
                tracing::info!("Using OpenAI LLM ({})", model);
                return Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), model, &key));
            }
        }
        "mock" => return Arc::new(MockLlmClient::new()),
        other => tracing::warn!(provider = %other, "Unknown LLM provider"),
    }

    tracing::warn!("No API key set or provider unknown, using Mock LLM");
    Arc::new(MockLlmClient::new())
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    executor: ActionExecutor,
    recovery: RecoveryEngine,
    ledger: UndoLedger,
    session: Option<ChatSession>,
    context: ContextSection,
    max_context_turns: usize,
    phase: EnginePhase,
}

impl Orchestrator {
    /// 使用完整的动作表
    pub fn new(llm: Arc<dyn LlmClient>, backend: Arc<dyn TaskBackend>, cfg: &AppConfig) -> Self {
        let executor = ActionExecutor::new(
            ActionRegistry::standard(),
            backend,
            cfg.engine.action_timeout_secs,
        );
        Self::with_executor(llm, executor, cfg)
    }

    pub fn with_executor(llm: Arc<dyn LlmClient>, executor: ActionExecutor, cfg: &AppConfig) -> Self {
        Self {
            llm,
            executor,
            recovery: RecoveryEngine::new(),
            ledger: UndoLedger::new(cfg.engine.max_undo_depth),
            session: None,
            context: cfg.context.clone(),
            max_context_turns: cfg.llm.max_context_turns,
            phase: EnginePhase::Idle,
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    pub fn undo_depth(&self) -> usize {
        self.ledger.depth()
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// 拉取任务、项目、分区（并发），渲染摘要
    pub async fn fetch_state(&self) -> Result<RemoteState, EngineError> {
        tracing::info!("Fetching state from backend");
        let backend = self.executor.backend();
        let (tasks, projects, sections) = tokio::try_join!(
            backend.list_tasks(),
            backend.list_projects(),
            backend.list_sections(),
        )
        .map_err(|e| EngineError::SetupFailed(format!("fetching state: {e}")))?;

        let today = chrono::Local::now().date_naive();
        let rendered_context = context::render(&tasks, &projects, &sections, &self.context, today);
        tracing::debug!(
            tasks = tasks.len(),
            projects = projects.len(),
            sections = sections.len(),
            "State fetched"
        );
        Ok(RemoteState {
            tasks,
            projects,
            sections,
            rendered_context,
        })
    }

    /// 建立会话：系统指令 + 当前状态作为首轮
    async fn start_session(&mut self, state: &RemoteState) -> Result<(), EngineError> {
        let mut session = ChatSession::new(self.max_context_turns);
        let priming = prompt::priming_message(self.executor.registry(), &state.rendered_context);
        session
            .send(self.llm.as_ref(), &priming)
            .await
            .map_err(|e| EngineError::SetupFailed(format!("starting chat session: {e}")))?;

        tracing::info!(llm = %self.llm.name(), "Chat session started");
        self.session = Some(session);
        self.phase = EnginePhase::ChatStarted;
        Ok(())
    }

    /// 把用户消息交给模型并解析出动作；会话建立后不会返回 Err
    pub async fn analyze(
        &mut self,
        state: &RemoteState,
        message: &str,
    ) -> Result<AnalysisResult, EngineError> {
        if self.session.is_none() {
            self.start_session(state).await?;
        }

        self.phase = EnginePhase::Analyzing;
        tracing::info!("Analyzing user message");
        let result = self.converse(message).await;
        self.phase = EnginePhase::ChatStarted;

        tracing::info!(actions = result.actions.len(), "Analysis complete");
        Ok(result)
    }

    async fn converse(&mut self, message: &str) -> AnalysisResult {
        let Some(session) = self.session.as_mut() else {
            return AnalysisResult::advice(prompt::FALLBACK_THOUGHT);
        };
        let llm = self.llm.as_ref();

        let mut text = message.to_string();
        let mut retries = 0;
        loop {
            let raw = match session.send(llm, &text).await {
                Ok(raw) => raw,
                Err(e) => return self.recovery.transport_failure(&e),
            };
            let err = match extract(&raw) {
                Ok(result) => return result,
                Err(e) => e,
            };
            match self.recovery.handle(&err, &raw, retries) {
                RecoveryAction::RetryWithPrompt(retry) => {
                    text = retry;
                    retries += 1;
                }
                RecoveryAction::AdviceOnly(result) => return result,
            }
        }
    }

    /// 按顺序执行（或预演）一批动作；真实执行产生的补偿按逆序压入撤销账本
    pub async fn execute(&mut self, actions: &[Action], dry_run: bool) -> Vec<ActionResult> {
        let previous = self.phase;
        self.phase = EnginePhase::Executing;
        tracing::info!(
            count = actions.len(),
            dry_run,
            "{} actions",
            if dry_run { "Simulating" } else { "Executing" }
        );

        let mut results = Vec::with_capacity(actions.len());
        let mut compensations = Vec::new();
        for action in actions {
            let result = self.executor.dispatch(action, dry_run).await;
            if let Some(Compensation::Replayable(undo)) = &result.undo {
                compensations.insert(0, undo.clone());
            }
            results.push(result);
        }

        if !dry_run {
            if let Some(batch_id) = self.ledger.push(compensations) {
                tracing::info!(%batch_id, depth = self.ledger.depth(), "Undo batch saved");
            }
        }

        self.phase = if previous == EnginePhase::Idle {
            EnginePhase::Idle
        } else {
            EnginePhase::ChatStarted
        };
        results
    }

    /// 最近一批的补偿动作（不弹出）
    pub fn pending_undo(&self) -> &[Action] {
        self.ledger
            .peek()
            .map(|batch| batch.actions.as_slice())
            .unwrap_or(&[])
    }

    /// 弹出最近一批并真实执行其补偿动作；撤销本身不再入账
    pub async fn undo(&mut self) -> Result<Vec<ActionResult>, EngineError> {
        let batch = self.ledger.pop().ok_or(EngineError::NothingToUndo)?;
        tracing::info!(batch_id = %batch.batch_id, count = batch.actions.len(), "Reverting batch");

        let mut results = Vec::with_capacity(batch.actions.len());
        for action in &batch.actions {
            results.push(self.executor.dispatch(action, false).await);
        }
        Ok(results)
    }

    /// 把新状态告知模型；回复丢弃，失败只记日志
    pub async fn sync_state(&mut self, state: &RemoteState) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let message = prompt::sync_message(&state.rendered_context);
        if let Err(e) = session.send(self.llm.as_ref(), &message).await {
            tracing::warn!(error = %e, "State sync failed");
        }
    }

    /// 丢弃会话，下次 analyze 重新建立；撤销账本不受影响
    pub fn reset_session(&mut self) {
        self.session = None;
        self.phase = EnginePhase::Idle;
        tracing::info!("Chat session reset");
    }
}
