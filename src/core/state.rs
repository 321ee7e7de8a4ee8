//! 状态定义：远端快照 RemoteState 与引擎阶段 EnginePhase

use serde::Serialize;

use crate::backend::{Project, Section, Task};

/// 一次拉取得到的只读快照；每次 fetch 整体替换
#[derive(Clone, Debug, Default, Serialize)]
pub struct RemoteState {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub sections: Vec<Section>,
    /// 预先渲染好、直接发给模型的摘要
    pub rendered_context: String,
}

/// 引擎阶段：Idle 直到会话建立；analyze / execute 期间短暂切换，结束后回到 ChatStarted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EnginePhase {
    Idle,
    ChatStarted,
    Analyzing,
    Executing,
}
