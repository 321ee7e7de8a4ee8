//! Taskpilot - 用自然语言驱动 Todoist 的动作编排引擎
//!
//! 模块划分：
//! - **actions**: 动作模型、Handler 注册表、带超时与审计的执行器
//! - **backend**: TaskBackend 抽象、Todoist REST 客户端、内存后端
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、撤销账本、状态摘要、错误与恢复
//! - **llm**: LLM 客户端抽象与实现（Gemini / OpenAI 兼容 / Mock）
//! - **memory**: 对话会话
//! - **planner**: 模型输出解析与提示词

pub mod actions;
pub mod backend;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod planner;

pub use actions::{Action, ActionKind, ActionResult, ActionStatus, AnalysisResult};
pub use core::{EngineError, Orchestrator, RemoteState};
