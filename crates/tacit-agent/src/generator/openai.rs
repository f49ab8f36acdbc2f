//! OpenAI-compatible `/chat/completions` backend.
//!
//! API key: `OPENAI_API_KEY` unless `generator.api_key_env` names another
//! variable. `generator.base_url` points it at any compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tacit_core::config::GeneratorSettings;
use tacit_core::error::{Error, Result};

use super::{http_client, CompletionRequest, ResponseGenerator};
use crate::prompt::Role;

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, settings: &GeneratorSettings) -> Result<Self> {
        Ok(Self {
            api_key,
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens: settings.max_tokens,
            client: http_client(settings)?,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage { role: Role::System.as_str(), content: request.system_context.clone() });
        for turn in &request.history {
            let role = match turn.role {
                Role::User => Role::User,
                Role::Assistant | Role::System => Role::Assistant,
            };
            messages.push(ChatMessage { role: role.as_str(), content: turn.content.clone() });
        }
        messages.push(ChatMessage { role: Role::User.as_str(), content: request.message.clone() });
        ChatRequest { model: self.model.clone(), messages, max_tokens: self.max_tokens }
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generator(format!("OpenAI request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Generator(format!("OpenAI returned {status}: {text}")));
        }
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generator(format!("OpenAI response was not valid JSON: {e}")))?;
        Ok(first_choice(parsed))
    }
}

fn first_choice(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ChatTurn;

    fn generator() -> OpenAiGenerator {
        let settings = GeneratorSettings {
            model: Some("test-model".to_string()),
            base_url: Some("http://localhost:9/v1/".to_string()),
            ..GeneratorSettings::default()
        };
        OpenAiGenerator::new("key".to_string(), &settings).unwrap()
    }

    #[test]
    fn request_puts_system_context_first_and_message_last() {
        let request = CompletionRequest {
            system_context: "SYSTEM".to_string(),
            tacit_knowledge: String::new(),
            history: vec![ChatTurn::new(Role::User, "hi"), ChatTurn::new(Role::Assistant, "hello")],
            message: "next".to_string(),
            context: Vec::new(),
        };
        let body = serde_json::to_value(generator().build_request(&request)).unwrap();
        assert_eq!(body["model"], "test-model");
        let roles: Vec<&str> = body["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body["messages"][3]["content"], "next");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(generator().base_url, "http://localhost:9/v1");
    }

    #[test]
    fn missing_content_parses_as_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(first_choice(parsed), "");
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":"ok"}}]}"#).unwrap();
        assert_eq!(first_choice(parsed), "ok");
    }
}
