//! 发给模型的固定文本：系统指令（含动作词汇表）、纠错重试、状态同步

use crate::actions::ActionRegistry;

/// 解析失败后的纠错指令
pub const RETRY_PROMPT: &str =
    "Your previous response violated the JSON schema. Respond ONLY with valid JSON.";

/// 两次解析都失败且回复为空时的 thought
pub const FALLBACK_THOUGHT: &str = "Error: No response or invalid JSON.";

/// 系统指令：角色、输出格式、当前注册的动作词汇表
pub fn system_prompt(registry: &ActionRegistry) -> String {
    format!(
        r#"You are the Todoist Architect, an advanced productivity assistant.
Your goal is to help the user organize their life by analyzing their tasks and executing changes to their Todoist.

When you propose changes, you MUST output a JSON object in this specific format ONLY:

{{
    "thought": "Your reasoning here...",
    "actions": [ ...one object per change... ]
}}

Available actions (one per line, with what each does):
{vocabulary}

Priorities follow Todoist: 4 is urgent, 1 is normal. Only use ids that appear in the current state;
ids of items created in this batch are not known yet, so act on them in a later turn.

If you just want to talk or give advice without actions, return:
{{
    "thought": "Your advice...",
    "actions": []
}}"#,
        vocabulary = registry.vocabulary()
    )
}

/// 首轮：系统指令 + 当前状态
pub fn priming_message(registry: &ActionRegistry, rendered_context: &str) -> String {
    format!(
        "{}\n\nHere is the current state:\n{rendered_context}",
        system_prompt(registry)
    )
}

/// 执行后把新状态告知模型
pub fn sync_message(rendered_context: &str) -> String {
    format!(
        "SYSTEM UPDATE: The actions have been executed. Here is the new state of tasks and projects:\n{rendered_context}\n\nPlease proceed with this new state."
    )
}
