//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TASKPILOT__*` 覆盖（双下划线表示嵌套，如 `TASKPILOT__LLM__PROVIDER=openai`）。
//! 凭据不进配置文件：TODOIST_API_TOKEN / GEMINI_API_KEY / OPENAI_API_KEY 直接读环境变量。

use std::path::PathBuf;

use serde::Deserialize;

pub const TODOIST_TOKEN_ENV: &str = "TODOIST_API_TOKEN";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub backend: BackendSection,
    pub engine: EngineSection,
    pub context: ContextSection,
}

/// [app] 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择、模型、会话长度与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// gemini / openai / mock；对应的 Key 缺失时回退到 mock
    pub provider: String,
    /// 为空时使用各后端的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 会话保留的轮数（首轮始终保留）
    pub max_context_turns: usize,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            base_url: None,
            max_context_turns: 20,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [backend] 段：Todoist 地址与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 15,
        }
    }
}

/// [engine] 段：单个动作超时、撤销栈深度
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub action_timeout_secs: u64,
    pub max_undo_depth: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            action_timeout_secs: 30,
            max_undo_depth: 50,
        }
    }
}

/// [context] 段：给模型的状态摘要如何筛选任务
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    /// 优先级 ≥ 此值的任务总是列出（4 = 紧急）
    pub min_priority: u8,
    pub due_soon_days: i64,
    pub always_show_inbox: bool,
    pub include_overdue: bool,
    /// 任务数不超过此值时不筛选，全部列出
    pub skip_filter_threshold: usize,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            min_priority: 3,
            due_soon_days: 3,
            always_show_inbox: true,
            include_overdue: true,
            skip_filter_threshold: 30,
        }
    }
}

/// 从 config 目录加载配置，环境变量 TASKPILOT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TASKPILOT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TASKPILOT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 读取非空的环境变量
pub fn credential(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.max_context_turns, 20);
        assert_eq!(cfg.engine.action_timeout_secs, 30);
        assert_eq!(cfg.engine.max_undo_depth, 50);
        assert_eq!(cfg.context.min_priority, 3);
        assert_eq!(cfg.context.skip_filter_threshold, 30);
        assert!(cfg.context.always_show_inbox);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[engine]\nmax_undo_depth = 5\n[context]\ndue_soon_days = 7\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.engine.max_undo_depth, 5);
        assert_eq!(cfg.engine.action_timeout_secs, 30);
        assert_eq!(cfg.context.due_soon_days, 7);
        assert_eq!(cfg.context.min_priority, 3);
        assert_eq!(cfg.llm.provider, "gemini");
    }
}
