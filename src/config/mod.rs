use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::Framework;
use crate::paths::Paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    /// File this config was loaded from (not serialized)
    #[serde(skip)]
    pub source: PathBuf,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub mock_server: MockServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens for LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Generate-and-run attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub framework: Framework,

    /// Inference endpoint the generated UI should call
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: Option<OpenAIConfig>,

    #[serde(default)]
    pub anthropic: Option<AnthropicConfig>,

    #[serde(default)]
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// As written in the file; may be a `${VAR}` reference
    pub api_key: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl OpenAIConfig {
    pub fn resolved_api_key(&self) -> String {
        expand_env(&self.api_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// As written in the file; may be a `${VAR}` reference
    pub api_key: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn resolved_api_key(&self) -> String {
        expand_env(&self.api_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Interpreter used to launch the generated app
    #[serde(default = "default_python")]
    pub python: String,

    /// Target file for the generated app (default: workspace/app.py)
    #[serde(default)]
    pub app_file: Option<String>,

    /// Startup observation window in seconds
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Grace period before a terminated app is force-killed, in milliseconds
    #[serde(default = "default_stop_grace")]
    pub stop_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> usize {
    4096
}
fn default_max_attempts() -> u32 {
    3
}
fn default_api_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_python() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}
fn default_startup_timeout() -> u64 {
    10
}
fn default_stop_grace() -> u64 {
    3000
}
fn default_port() -> u16 {
    8000
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            framework: Framework::default(),
            api_endpoint: default_api_endpoint(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            app_file: None,
            startup_timeout_secs: default_startup_timeout(),
            stop_grace_ms: default_stop_grace(),
        }
    }
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config, optionally from an explicit file.
    ///
    /// The default file is created from a commented template on first run.
    /// An explicit file that does not exist is an error.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;

        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => paths.config_file(),
        };

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Created default config at {}", path.display());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::parse(&content)?;
        config.paths = paths;
        config.source = path;

        Ok(config)
    }

    /// Parse TOML content. Secret references stay unexpanded so that
    /// `save` never writes a resolved key back to disk.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = if self.source.as_os_str().is_empty() {
            self.paths.config_file()
        } else {
            self.source.clone()
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let paths = Paths::resolve()?;
        Ok(paths.config_file())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["generator", "model"] => Ok(self.generator.model.clone()),
            ["generator", "temperature"] => Ok(self.generator.temperature.to_string()),
            ["generator", "max_tokens"] => Ok(self.generator.max_tokens.to_string()),
            ["generator", "max_attempts"] => Ok(self.generator.max_attempts.to_string()),
            ["generator", "framework"] => Ok(self.generator.framework.to_string()),
            ["generator", "api_endpoint"] => Ok(self.generator.api_endpoint.clone()),
            ["supervisor", "python"] => Ok(self.supervisor.python.clone()),
            ["supervisor", "app_file"] => Ok(self.app_file().display().to_string()),
            ["supervisor", "startup_timeout_secs"] => {
                Ok(self.supervisor.startup_timeout_secs.to_string())
            }
            ["supervisor", "stop_grace_ms"] => Ok(self.supervisor.stop_grace_ms.to_string()),
            ["mock_server", "port"] => Ok(self.mock_server.port.to_string()),
            ["mock_server", "bind"] => Ok(self.mock_server.bind.clone()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["generator", "model"] => self.generator.model = value.to_string(),
            ["generator", "temperature"] => self.generator.temperature = value.parse()?,
            ["generator", "max_tokens"] => self.generator.max_tokens = value.parse()?,
            ["generator", "max_attempts"] => {
                let attempts: u32 = value.parse()?;
                if attempts == 0 {
                    anyhow::bail!("generator.max_attempts must be at least 1");
                }
                self.generator.max_attempts = attempts;
            }
            ["generator", "framework"] => self.generator.framework = value.parse()?,
            ["generator", "api_endpoint"] => self.generator.api_endpoint = value.to_string(),
            ["supervisor", "python"] => self.supervisor.python = value.to_string(),
            ["supervisor", "app_file"] => self.supervisor.app_file = Some(value.to_string()),
            ["supervisor", "startup_timeout_secs"] => {
                self.supervisor.startup_timeout_secs = value.parse()?
            }
            ["supervisor", "stop_grace_ms"] => self.supervisor.stop_grace_ms = value.parse()?,
            ["mock_server", "port"] => self.mock_server.port = value.parse()?,
            ["mock_server", "bind"] => self.mock_server.bind = value.to_string(),
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }

    /// Target file for the generated app.
    ///
    /// `supervisor.app_file` wins when set (tilde-expanded, relative paths
    /// resolve against the workspace); otherwise workspace/app.py.
    pub fn app_file(&self) -> PathBuf {
        match self.supervisor.app_file.as_deref().map(str::trim) {
            Some(file) if !file.is_empty() => {
                let path = PathBuf::from(shellexpand::tilde(file).to_string());
                if path.is_absolute() {
                    path
                } else {
                    self.paths.workspace.join(path)
                }
            }
            _ => self.paths.app_file(),
        }
    }
}

fn expand_env(s: &str) -> String {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else if let Some(var_name) = s.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}

/// Default config template with helpful comments (used for first-time setup)
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# uiforge configuration
# Auto-created on first run. Edit as needed.

[generator]
# Model name picks the provider: gpt-*/o1*/o3*/o4* -> OpenAI, claude-* -> Anthropic,
# anything else -> Ollama (when configured)
model = "gpt-4o-mini"
temperature = 0.1
max_attempts = 3
# gradio | streamlit
framework = "gradio"
# Inference endpoint the generated UI calls (default: bundled mock server)
api_endpoint = "http://127.0.0.1:8000"

[providers.openai]
api_key = "${OPENAI_API_KEY}"

# [providers.anthropic]
# api_key = "${ANTHROPIC_API_KEY}"

# [providers.ollama]
# endpoint = "http://localhost:11434"

[supervisor]
# python = "python3"
# app_file = "~/projects/demo/app.py"   # default: <workspace>/app.py
startup_timeout_secs = 10
stop_grace_ms = 3000

[mock_server]
bind = "127.0.0.1"
port = 8000

[logging]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::parse(DEFAULT_CONFIG_TEMPLATE).unwrap();

        assert_eq!(config.generator.model, "gpt-4o-mini");
        assert_eq!(config.generator.max_attempts, 3);
        assert_eq!(config.generator.framework, Framework::Gradio);
        assert_eq!(config.supervisor.startup_timeout_secs, 10);
        assert_eq!(config.mock_server.port, 8000);
        assert!(config.providers.openai.is_some());
        assert!(config.providers.anthropic.is_none());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.generator.api_endpoint, "http://127.0.0.1:8000");
        assert_eq!(config.supervisor.stop_grace_ms, 3000);
        assert_eq!(config.logging.level, "info");
        assert!(config.providers.openai.is_none());
    }

    #[test]
    fn literal_api_key_is_kept() {
        let config = Config::parse(
            r#"
[providers.anthropic]
api_key = "sk-literal"
"#,
        )
        .unwrap();

        let anthropic = config.providers.anthropic.unwrap();
        assert_eq!(anthropic.api_key, "sk-literal");
        assert_eq!(anthropic.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn unset_env_reference_is_left_verbatim() {
        assert_eq!(
            expand_env("${UIFORGE_TEST_SURELY_UNSET_VAR}"),
            "${UIFORGE_TEST_SURELY_UNSET_VAR}"
        );
        assert_eq!(expand_env("plain"), "plain");
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut config = Config::default();

        config.set_value("generator.framework", "streamlit").unwrap();
        config.set_value("generator.max_attempts", "5").unwrap();
        config.set_value("mock_server.port", "9100").unwrap();

        assert_eq!(config.get_value("generator.framework").unwrap(), "streamlit");
        assert_eq!(config.get_value("generator.max_attempts").unwrap(), "5");
        assert_eq!(config.get_value("mock_server.port").unwrap(), "9100");
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut config = Config::default();

        assert!(config.set_value("generator.max_attempts", "0").is_err());
        assert!(config.set_value("generator.framework", "tkinter").is_err());
        assert!(config.set_value("mock_server.port", "not-a-port").is_err());
        assert!(config.set_value("nope.nothing", "1").is_err());
    }

    #[test]
    fn saving_keeps_secret_references() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("config.toml");
        fs::write(
            &file,
            "[providers.openai]\napi_key = \"${UIFORGE_TEST_SAVE_KEY}\"\n",
        )
        .unwrap();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("UIFORGE_TEST_SAVE_KEY", "sk-secret-value") };

        let mut config = Config::parse(&fs::read_to_string(&file).unwrap()).unwrap();
        config.source = file.clone();
        assert_eq!(
            config.providers.openai.as_ref().unwrap().resolved_api_key(),
            "sk-secret-value"
        );

        config.set_value("generator.framework", "streamlit").unwrap();
        config.save().unwrap();

        let written = fs::read_to_string(&file).unwrap();
        assert!(written.contains("${UIFORGE_TEST_SAVE_KEY}"), "{written}");
        assert!(!written.contains("sk-secret-value"));
        assert!(written.contains("streamlit"));
    }

    #[test]
    fn relative_app_file_resolves_against_workspace() {
        let mut config = Config::default();
        config.paths.workspace = PathBuf::from("/ws");

        assert_eq!(config.app_file(), PathBuf::from("/ws/app.py"));

        config.supervisor.app_file = Some("ui/demo.py".to_string());
        assert_eq!(config.app_file(), PathBuf::from("/ws/ui/demo.py"));

        config.supervisor.app_file = Some("/abs/demo.py".to_string());
        assert_eq!(config.app_file(), PathBuf::from("/abs/demo.py"));
    }

    #[test]
    fn save_writes_to_source_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("custom.toml");

        let mut config = Config::default();
        config.source = file.clone();
        config.generator.model = "claude-sonnet-4-5".to_string();
        config.save().unwrap();

        let reloaded = Config::parse(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(reloaded.generator.model, "claude-sonnet-4-5");
    }
}
