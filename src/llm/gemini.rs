//! Google Gemini 客户端（generateContent REST 接口）
//!
//! 多轮历史映射为 contents（assistant → "model"），System 消息合并进 systemInstruction。
//! 只消费返回的文本部分，不关心其它元数据。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini 客户端：api_key 以 query 参数传递
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: Option<&str>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.unwrap_or(GEMINI_DEFAULT_MODEL).to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// 覆盖 API 根地址（代理或测试用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn build_request(messages: &[Message]) -> GenerateContentRequest {
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        let system_instruction = (!system_text.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part {
                text: Some(system_text.join("\n\n")),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction,
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> String {
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url,
            self.model_path(),
            self.api_key
        );
        let request = Self::build_request(messages);

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = Self::extract_text(&parsed);
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}
