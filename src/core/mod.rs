//! 核心编排层：错误与恢复、撤销账本、状态快照与摘要、主控编排器

pub mod context;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod recovery;
pub mod state;

pub use error::EngineError;
pub use ledger::{CompensationBatch, UndoLedger};
pub use orchestrator::{create_llm_from_config, Orchestrator};
pub use recovery::{RecoveryAction, RecoveryEngine};
pub use state::{EnginePhase, RemoteState};
