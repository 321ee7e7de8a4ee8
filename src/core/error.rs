//! 引擎错误类型
//!
//! 调用方可见的只有 SetupFailed（拉取状态 / 会话启动失败）与 NothingToUndo；
//! 其余错误在 dispatch 边界被转为单个动作的 Failed 结果。

use thiserror::Error;

use crate::actions::ActionKind;
use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Missing '{field}' for {kind}")]
    MissingField {
        kind: ActionKind,
        field: &'static str,
    },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("Action timed out: {0}")]
    ActionTimeout(String),

    #[error("Nothing to undo")]
    NothingToUndo,
}
