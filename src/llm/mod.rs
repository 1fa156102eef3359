//! Chat-completion client abstraction used by the generator.

mod providers;

pub use providers::{AnthropicProvider, OllamaProvider, OpenAIProvider};

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the conversation and return the assistant's text reply.
    async fn chat(&self, messages: &[Message]) -> Result<String>;
}

/// Pick a provider from the model name.
pub fn create_provider(model: &str, config: &Config) -> Result<Box<dyn LLMProvider>> {
    let temperature = config.generator.temperature;
    let max_tokens = config.generator.max_tokens;

    if model.starts_with("gpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
    {
        let openai_config = config
            .providers
            .openai
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("OpenAI provider not configured"))?;

        let api_key = openai_config.resolved_api_key();
        if api_key.is_empty() || api_key.starts_with('$') {
            anyhow::bail!("OpenAI API key is not set (providers.openai.api_key)");
        }

        Ok(Box::new(OpenAIProvider::new(
            &api_key,
            &openai_config.base_url,
            model,
            temperature,
        )))
    } else if model.starts_with("claude-") {
        let anthropic_config = config
            .providers
            .anthropic
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Anthropic provider not configured"))?;

        Ok(Box::new(AnthropicProvider::new(
            &anthropic_config.resolved_api_key(),
            &anthropic_config.base_url,
            model,
            temperature,
            max_tokens,
        )))
    } else if let Some(ollama_config) = &config.providers.ollama {
        Ok(Box::new(OllamaProvider::new(
            &ollama_config.endpoint,
            model,
            temperature,
        )))
    } else {
        anyhow::bail!("Unknown model or provider not configured: {}", model)
    }
}

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:python|py)?[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("valid regex")
});

/// Pull the program out of a model reply.
///
/// Returns the body of the first fenced block tagged `python` (or untagged);
/// if there is none the whole reply is returned, trimmed.
pub fn extract_code_block(response: &str) -> String {
    match CODE_BLOCK.captures(response) {
        Some(caps) => caps[1].to_string(),
        None => response.trim().to_string(),
    }
}

static HTML_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:html)?[ \t]*\r?\n(.*?)\r?\n[ \t]*```").expect("valid regex")
});

/// Same as [`extract_code_block`], for replies that should be an HTML page.
pub fn extract_html_document(response: &str) -> String {
    match HTML_BLOCK.captures(response) {
        Some(caps) => caps[1].to_string(),
        None => response.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_python_fence() {
        let reply = "Here you go:\n```python\nimport gradio as gr\nprint('hi')\n```\nEnjoy!";
        assert_eq!(extract_code_block(reply), "import gradio as gr\nprint('hi')");
    }

    #[test]
    fn extracts_untagged_fence() {
        let reply = "```\nprint(1)\n```";
        assert_eq!(extract_code_block(reply), "print(1)");
    }

    #[test]
    fn first_block_wins() {
        let reply = "```python\nfirst()\n```\ntext\n```python\nsecond()\n```";
        assert_eq!(extract_code_block(reply), "first()");
    }

    #[test]
    fn html_fence_is_unwrapped() {
        let reply = "Sure!\n```html\n<!DOCTYPE html>\n<html></html>\n```";
        assert_eq!(extract_html_document(reply), "<!DOCTYPE html>\n<html></html>");
        assert_eq!(extract_html_document("  <html></html>\n"), "<html></html>");
    }

    #[test]
    fn plain_reply_is_trimmed() {
        assert_eq!(extract_code_block("\n  print(1)\n\n"), "print(1)");
    }

    #[test]
    fn other_language_fence_is_not_taken() {
        let reply = "```bash\npip install gradio\n```";
        assert_eq!(extract_code_block(reply), reply);
    }

    #[test]
    fn unconfigured_provider_is_an_error() {
        let config = Config::default();
        let err = create_provider("claude-sonnet-4-5", &config)
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("Anthropic provider not configured"));

        let err = create_provider("llama3", &config).err().unwrap().to_string();
        assert!(err.contains("llama3"));
    }

    #[test]
    fn unexpanded_openai_key_is_rejected() {
        let config = Config::parse(
            r#"
[providers.openai]
api_key = "${UIFORGE_TEST_SURELY_UNSET_KEY}"
"#,
        )
        .unwrap();
        let err = create_provider("gpt-4o-mini", &config)
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("API key is not set"));
    }

    #[test]
    fn ollama_catches_other_models() {
        let config = Config::parse(
            r#"
[providers.ollama]
endpoint = "http://localhost:11434"
"#,
        )
        .unwrap();
        assert!(create_provider("qwen2.5-coder", &config).is_ok());
    }
}
