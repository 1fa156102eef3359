use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{LLMProvider, Message, Role};

// OpenAI Provider
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, base_url: &str, model: &str, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        }
    }

    fn request_body(&self, messages: &[Message]) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": format_plain_messages(messages),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = self.request_body(messages);
        debug!("OpenAI request: {}", serde_json::to_string_pretty(&body)?);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response_body: Value = response.json().await?;
        debug!(
            "OpenAI response: {}",
            serde_json::to_string_pretty(&response_body)?
        );

        parse_openai_response(&response_body)
    }
}

fn parse_openai_response(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        anyhow::bail!("OpenAI API error: {}", error);
    }

    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

    Ok(choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string())
}

// Anthropic Provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }

    /// Anthropic takes the system prompt as a top-level field.
    fn request_body(&self, messages: &[Message]) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let formatted: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": formatted,
        });

        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }

        body
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = self.request_body(messages);
        debug!(
            "Anthropic request: {}",
            serde_json::to_string_pretty(&body)?
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response_body: Value = response.json().await?;
        debug!(
            "Anthropic response: {}",
            serde_json::to_string_pretty(&response_body)?
        );

        parse_anthropic_response(&response_body)
    }
}

fn parse_anthropic_response(body: &Value) -> Result<String> {
    if let Some(error) = body.get("error") {
        anyhow::bail!("Anthropic API error: {}", error);
    }

    let content = body["content"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("No content in response"))?;

    Ok(content
        .iter()
        .filter(|c| c["type"] == "text")
        .map(|c| c["text"].as_str().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(""))
}

// Ollama Provider (for local models)
pub struct OllamaProvider {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": format_plain_messages(messages),
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        debug!("Ollama request: {}", serde_json::to_string_pretty(&body)?);

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response_body: Value = response.json().await?;
        debug!(
            "Ollama response: {}",
            serde_json::to_string_pretty(&response_body)?
        );

        if let Some(error) = response_body.get("error") {
            anyhow::bail!("Ollama error: {}", error);
        }

        Ok(response_body["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

fn format_plain_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_lifts_system_prompt() {
        let provider = AnthropicProvider::new("k", "https://api.anthropic.com/", "claude-x", 0.1, 512);
        let body = provider.request_body(&[
            Message::system("be terse"),
            Message::user("write a UI"),
        ]);

        assert_eq!(body["system"], "be terse");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(provider.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn openai_body_keeps_message_order() {
        let provider = OpenAIProvider::new("k", "https://api.openai.com/v1", "gpt-4o-mini", 0.1);
        let body = provider.request_body(&[Message::system("sys"), Message::user("hi")]);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn openai_response_parsing() {
        let ok = json!({"choices": [{"message": {"content": "print(1)"}}]});
        assert_eq!(parse_openai_response(&ok).unwrap(), "print(1)");

        let err = json!({"error": {"message": "bad key"}});
        assert!(
            parse_openai_response(&err)
                .unwrap_err()
                .to_string()
                .contains("bad key")
        );

        assert!(parse_openai_response(&json!({"choices": []})).is_err());
    }

    #[test]
    fn anthropic_response_joins_text_blocks() {
        let body = json!({"content": [
            {"type": "text", "text": "part one, "},
            {"type": "thinking", "thinking": "ignored"},
            {"type": "text", "text": "part two"}
        ]});
        assert_eq!(parse_anthropic_response(&body).unwrap(), "part one, part two");
    }
}
