//! Google Gemini adapter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{ChatMessage, Llm, LlmRequest, LlmResponse, Role, TokenUsage};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiModel {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        )
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::Assistant => "model".to_string(),
                    _ => "user".to_string(),
                },
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect()
    }

    fn build_request_body(&self, request: &LlmRequest) -> GeminiRequest {
        GeminiRequest {
            contents: Self::convert_messages(&request.messages),
            system_instruction: request.system_prompt.as_ref().map(|text| {
                GeminiSystemInstruction {
                    parts: vec![GeminiPart { text: text.clone() }],
                }
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait]
impl Llm for GeminiModel {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        debug!(model = %self.model, messages = request.messages.len(), "generating Gemini completion");

        let body = self.build_request_body(&request);
        let response = self
            .client
            .post(self.api_url())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<GeminiErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => format!("API returned status {status}"),
            };
            return Err(anyhow::anyhow!("Gemini API error: {message}"));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .context("failed to parse Gemini response")?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no candidates in Gemini model output"))?;

        let content = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse {
            content,
            model: api_response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            usage: api_response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            }),
        })
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_conversion_maps_assistant_to_model_role() {
        let messages = vec![
            ChatMessage {
                role: Role::User,
                content: "Hello".to_string(),
            },
            ChatMessage {
                role: Role::Assistant,
                content: "Hi there!".to_string(),
            },
        ];

        let contents = GeminiModel::convert_messages(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
    }

    #[test]
    fn request_body_carries_system_instruction_and_sampling() {
        let model = GeminiModel::new("test-key", "gemini-1.5-flash");
        let request = LlmRequest::user("Analyze this")
            .with_system("You are a critical thinker.")
            .with_temperature(0.25)
            .with_max_tokens(Some(256));

        let body = model.build_request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a critical thinker."
        );
        assert_eq!(json["generationConfig"]["temperature"], 0.25);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Analyze this");
    }

    #[test]
    fn api_url_embeds_model_and_key() {
        let model = GeminiModel::new("secret", "gemini-1.5-flash");
        assert_eq!(
            model.api_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=secret"
        );
    }
}
