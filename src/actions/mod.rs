//! 动作层：数据模型、Handler 注册表与带超时 / 审计的执行器

pub mod comment;
pub mod executor;
pub mod label;
pub mod project;
pub mod registry;
pub mod task;
pub mod types;

pub use executor::ActionExecutor;
pub use registry::{ActionHandler, ActionRegistry, Outcome};
pub use types::{
    Action, ActionKind, ActionResult, ActionStatus, AnalysisResult, Compensation, PLACEHOLDER_ID,
};
