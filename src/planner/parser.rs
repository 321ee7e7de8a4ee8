//! 计划提取：从模型的原始文本中取出 {thought, actions}
//!
//! 模型输出常带 Markdown 围栏或前后闲聊：从第一个 `{` 开始只解析一个 JSON 文档，忽略其后的文字，
//! 再校验顶层结构。纯函数，不会 panic。

use serde_json::Value;
use thiserror::Error;

use crate::actions::{Action, AnalysisResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("response does not match the plan schema: {0}")]
    Schema(&'static str),
}

pub fn extract(raw: &str) -> Result<AnalysisResult, ExtractError> {
    let start = raw.find('{').ok_or(ExtractError::NoJsonObject)?;

    let value = serde_json::Deserializer::from_str(&raw[start..])
        .into_iter::<Value>()
        .next()
        .ok_or(ExtractError::NoJsonObject)?
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(ExtractError::Schema("top level is not an object"));
    };
    let thought = match object.remove("thought") {
        Some(Value::String(thought)) => thought,
        _ => return Err(ExtractError::Schema("'thought' must be a string")),
    };
    let actions = match object.remove("actions") {
        Some(Value::Array(items)) => items.into_iter().map(Action::from_value).collect(),
        _ => return Err(ExtractError::Schema("'actions' must be an array")),
    };

    Ok(AnalysisResult { thought, actions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;

    const PLAN: &str = r#"{"thought": "Close it.", "actions": [{"type": "close_task", "id": "42"}]}"#;

    #[test]
    fn test_extract_plain_object() {
        let result = extract(PLAN).unwrap();
        assert_eq!(result.thought, "Close it.");
        assert_eq!(result.actions, vec![Action::new(ActionKind::CloseTask).with_id("42")]);
    }

    #[test]
    fn test_extract_ignores_surrounding_text() {
        let expected = extract(PLAN).unwrap();
        for (prefix, suffix) in [
            ("Sure! Here you go:\n```json\n", "\n```"),
            ("", "\n\nLet me know if you need anything else. {not json}"),
            ("Thinking...\n\n", " }}}"),
        ] {
            let wrapped = format!("{prefix}{PLAN}{suffix}");
            assert_eq!(extract(&wrapped).unwrap(), expected, "wrapped: {wrapped}");
        }
    }

    #[test]
    fn test_extract_advice_only() {
        let result = extract(r#"{"thought": "Take a break.", "actions": []}"#).unwrap();
        assert!(result.actions.is_empty());
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract("I can't help with that."), Err(ExtractError::NoJsonObject));
        assert_eq!(extract(""), Err(ExtractError::NoJsonObject));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            extract(r#"{"thought": "oops", "actions": [}"#),
            Err(ExtractError::Malformed(_))
        ));
    }

    #[test]
    fn test_schema_violations() {
        assert!(matches!(extract(r#"{"actions": []}"#), Err(ExtractError::Schema(_))));
        assert!(matches!(
            extract(r#"{"thought": 3, "actions": []}"#),
            Err(ExtractError::Schema(_))
        ));
        assert!(matches!(
            extract(r#"{"thought": "x", "actions": {"type": "close_task"}}"#),
            Err(ExtractError::Schema(_))
        ));
    }

    #[test]
    fn test_unknown_types_survive_extraction() {
        let result = extract(r#"{"thought": "", "actions": [{"type": "launch_rocket"}, 5]}"#).unwrap();
        assert_eq!(result.actions.len(), 2);
        assert_eq!(result.actions[0].action_type, "launch_rocket");
        assert!(result.actions[0].kind().is_none());
        assert!(result.actions[1].defect.is_some());
    }
}
