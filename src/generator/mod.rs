//! LLM-driven UI generation with a run-and-repair loop.
//!
//! A task description is analyzed once; the analysis then drives up to
//! `max_attempts` rounds of code generation, each round launched through the
//! [`AppSupervisor`]. A failed launch feeds its error text into the next
//! round's prompt.
//!
//! A standalone HTML visualizer page can be generated from the same API
//! context; it is only written to disk.

pub mod prompts;
pub mod task;

pub use prompts::ApiContext;
pub use task::{InputModality, TaskKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{LLMProvider, Message, extract_code_block, extract_html_document};
use crate::supervisor::{APP_PLACEHOLDER, AppSupervisor, Launcher, RunOutcome};

/// UI framework the generated app targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Gradio,
    Streamlit,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Gradio => "gradio",
            Framework::Streamlit => "streamlit",
        }
    }

    /// How `python` starts an app written for this framework.
    pub fn launcher(&self, python: &str) -> Launcher {
        match self {
            Framework::Gradio => Launcher::new(python),
            Framework::Streamlit => Launcher::new(python).args([
                "-m",
                "streamlit",
                "run",
                APP_PLACEHOLDER,
                "--server.headless",
                "true",
            ]),
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gradio" => Ok(Framework::Gradio),
            "streamlit" => Ok(Framework::Streamlit),
            other => anyhow::bail!(
                "Unknown framework '{}' (expected 'gradio' or 'streamlit')",
                other
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("LLM request failed: {0:#}")]
    Llm(anyhow::Error),

    #[error("Failed to generate working code after {attempts} attempts. Last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Error writing to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a successful `generate_and_run` produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub analysis: String,
    pub code: String,
    /// 1-based attempt that succeeded
    pub attempts: u32,
    pub outcome: RunOutcome,
}

/// Turns a task description into a component analysis.
pub struct RequirementsAnalyzer<'a> {
    provider: &'a dyn LLMProvider,
}

impl<'a> RequirementsAnalyzer<'a> {
    pub fn new(provider: &'a dyn LLMProvider) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, task: &str, kind: Option<TaskKind>) -> anyhow::Result<String> {
        let prompt = prompts::analysis_prompt(task, kind);
        self.provider.chat(&[Message::user(prompt)]).await
    }
}

/// Turns an analysis into framework source code.
pub struct CodeGenerator<'a> {
    provider: &'a dyn LLMProvider,
    framework: Framework,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(provider: &'a dyn LLMProvider, framework: Framework) -> Self {
        Self {
            provider,
            framework,
        }
    }

    /// Returns bare source; a fenced block in the reply is unwrapped.
    pub async fn generate(
        &self,
        analysis: &str,
        api: &ApiContext,
        error_log: &str,
    ) -> anyhow::Result<String> {
        let prompt = prompts::codegen_prompt(self.framework, analysis, api, error_log);
        let reply = self.provider.chat(&[Message::user(prompt)]).await?;
        Ok(extract_code_block(&reply))
    }
}

pub struct Generator {
    provider: Box<dyn LLMProvider>,
    framework: Framework,
    api: ApiContext,
    max_attempts: u32,
}

impl Generator {
    pub fn new(
        provider: Box<dyn LLMProvider>,
        framework: Framework,
        api: ApiContext,
        max_attempts: u32,
    ) -> Self {
        Self {
            provider,
            framework,
            api,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn analyze(&self, task: &str, kind: Option<TaskKind>) -> Result<String, GenerateError> {
        RequirementsAnalyzer::new(self.provider.as_ref())
            .analyze(task, kind)
            .await
            .map_err(GenerateError::Llm)
    }

    pub async fn generate_code(&self, analysis: &str, error_log: &str) -> Result<String, GenerateError> {
        CodeGenerator::new(self.provider.as_ref(), self.framework)
            .generate(analysis, &self.api, error_log)
            .await
            .map_err(GenerateError::Llm)
    }

    /// Generate a standalone HTML visualizer for the API and write it to
    /// `output`. The page is not launched, so there is no repair loop.
    pub async fn generate_page(&self, task: &str, output: &Path) -> Result<PathBuf, GenerateError> {
        info!("Generating HTML page");
        let prompt = prompts::page_prompt(&self.api, task);
        let reply = self
            .provider
            .chat(&[Message::user(prompt)])
            .await
            .map_err(GenerateError::Llm)?;
        let html = extract_html_document(&reply);

        let write_err = |source| GenerateError::Write {
            path: output.to_path_buf(),
            source,
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(output, &html).map_err(write_err)?;
        debug!("Wrote {} bytes to {}", html.len(), output.display());

        Ok(output.to_path_buf())
    }

    /// Analyze `task`, then generate and launch until an attempt starts cleanly.
    pub async fn generate_and_run(
        &self,
        task: &str,
        kind: Option<TaskKind>,
        supervisor: &mut AppSupervisor,
    ) -> Result<GenerationReport, GenerateError> {
        info!("Analyzing requirements");
        let analysis = self.analyze(task, kind).await?;
        debug!("Analysis:\n{}", analysis);

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            info!(
                "Generating {} code (attempt {}/{})",
                self.framework, attempt, self.max_attempts
            );
            let code = self.generate_code(&analysis, &last_error).await?;

            match supervisor.run(&code).await {
                Ok(outcome) if outcome.is_success() => {
                    info!("Attempt {} succeeded: {}", attempt, outcome);
                    return Ok(GenerationReport {
                        analysis,
                        code,
                        attempts: attempt,
                        outcome,
                    });
                }
                Ok(outcome) => {
                    last_error = outcome.error_text().unwrap_or_default();
                    warn!("Attempt {} failed: {}", attempt, last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!("Attempt {} could not run: {}", attempt, last_error);
                }
            }
        }

        Err(GenerateError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLLMProvider;
    use super::prompts::ERROR_FEEDBACK_PREFIX;
    use std::sync::{Arc, Mutex};

    #[test]
    fn framework_parsing_and_display() {
        assert_eq!("Gradio".parse::<Framework>().unwrap(), Framework::Gradio);
        assert_eq!(" streamlit ".parse::<Framework>().unwrap(), Framework::Streamlit);
        assert!("tkinter".parse::<Framework>().is_err());
        assert_eq!(Framework::Streamlit.to_string(), "streamlit");
        assert_eq!(Framework::default(), Framework::Gradio);
    }

    #[test]
    fn framework_launchers() {
        let app = std::path::Path::new("/ws/app.py");
        assert_eq!(
            Framework::Gradio.launcher("python3").display_for(app),
            "python3 /ws/app.py"
        );
        assert_eq!(
            Framework::Streamlit.launcher("python3").display_for(app),
            "python3 -m streamlit run /ws/app.py --server.headless true"
        );
    }

    #[test]
    fn exhausted_message() {
        let err = GenerateError::Exhausted {
            attempts: 3,
            last_error: "SyntaxError".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to generate working code after 3 attempts. Last error: SyntaxError"
        );
    }

    /// Mock that replies in order and records every prompt it was sent.
    fn scripted(replies: Vec<&str>) -> (MockLLMProvider, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let seen = sent.clone();
        let count = replies.len();
        let mut replies = replies
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
            .into_iter();

        let mut mock = MockLLMProvider::new();
        mock.expect_chat().times(count).returning(move |messages| {
            seen.lock()
                .unwrap()
                .push(messages.last().unwrap().content.clone());
            Ok(replies.next().unwrap())
        });
        (mock, sent)
    }

    #[tokio::test]
    async fn generate_code_unwraps_fenced_reply() {
        let (mock, sent) = scripted(vec!["Here you go:\n```python\nimport gradio as gr\n```\n"]);
        let generator = Generator::new(
            Box::new(mock),
            Framework::Gradio,
            ApiContext::with_endpoint("http://127.0.0.1:8000"),
            3,
        );

        let code = generator.generate_code("Inputs: image", "").await.unwrap();

        assert_eq!(code, "import gradio as gr");
        let sent = sent.lock().unwrap();
        assert!(sent[0].contains("Inputs: image"));
        assert!(!sent[0].contains(ERROR_FEEDBACK_PREFIX));
    }

    #[tokio::test]
    async fn llm_failure_is_propagated() {
        let mut mock = MockLLMProvider::new();
        mock.expect_chat()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        let generator = Generator::new(
            Box::new(mock),
            Framework::Gradio,
            ApiContext::with_endpoint("http://127.0.0.1:8000"),
            3,
        );

        let err = generator.analyze("classify images", None).await.unwrap_err();
        assert!(matches!(err, GenerateError::Llm(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn page_is_written_without_analysis() {
        let (mock, sent) = scripted(vec!["```html\n<!DOCTYPE html>\n<title>Visualizer</title>\n```"]);
        let generator = Generator::new(
            Box::new(mock),
            Framework::Gradio,
            ApiContext::with_endpoint("http://127.0.0.1:8000"),
            3,
        );
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site").join("index.html");

        let written = generator
            .generate_page("one card per image", &output)
            .await
            .unwrap();

        assert_eq!(written, output);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "<!DOCTYPE html>\n<title>Visualizer</title>"
        );
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("User requirement: one card per image"));
        assert!(sent[0].contains("API ENDPOINT: http://127.0.0.1:8000"));
    }

    #[tokio::test]
    async fn page_write_failure_is_reported() {
        let (mock, _sent) = scripted(vec!["<html></html>"]);
        let generator = Generator::new(
            Box::new(mock),
            Framework::Gradio,
            ApiContext::with_endpoint("http://127.0.0.1:8000"),
            3,
        );
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let err = generator
            .generate_page("anything", &blocker.join("index.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Write { .. }), "{err:?}");
    }

    #[cfg(unix)]
    mod run_loop {
        use super::*;
        use crate::supervisor::{Launcher, SupervisorOptions};
        use std::time::Duration;
        use tempfile::TempDir;

        fn sh_supervisor() -> (TempDir, AppSupervisor) {
            let tmp = tempfile::tempdir().unwrap();
            let options = SupervisorOptions {
                app_file: tmp.path().join("app.sh"),
                pid_file: tmp.path().join("app.pid"),
                log_dir: tmp.path().join("logs"),
                launcher: Launcher::new("sh"),
                startup_timeout: Duration::from_millis(600),
                stop_grace: Duration::from_secs(2),
            };
            (tmp, AppSupervisor::new(options))
        }

        #[tokio::test]
        async fn failure_is_fed_back_into_next_attempt() {
            let (mock, sent) = scripted(vec![
                "Inputs: image upload. Outputs: label.",
                "```python\necho \"NameError: name 'gr' is not defined\" >&2\nexit 1\n```",
                "```\nexec sleep 30\n```",
            ]);
            let generator = Generator::new(
                Box::new(mock),
                Framework::Gradio,
                ApiContext::with_endpoint("http://127.0.0.1:8000"),
                3,
            );
            let (_tmp, mut supervisor) = sh_supervisor();

            let report = generator
                .generate_and_run("classify dog photos", Some(TaskKind::ImageClassification), &mut supervisor)
                .await
                .unwrap();

            assert_eq!(report.attempts, 2);
            assert_eq!(report.code, "exec sleep 30");
            assert!(matches!(report.outcome, RunOutcome::Running { .. }));
            assert_eq!(report.analysis, "Inputs: image upload. Outputs: label.");

            {
                let sent = sent.lock().unwrap();
                assert_eq!(sent.len(), 3);
                assert!(sent[0].contains("classify dog photos"));
                assert!(!sent[1].contains(ERROR_FEEDBACK_PREFIX));
                assert!(sent[2].contains(ERROR_FEEDBACK_PREFIX));
                assert!(sent[2].contains("name 'gr' is not defined"));
            }

            supervisor.stop().await.unwrap();
        }

        #[tokio::test]
        async fn gives_up_after_max_attempts() {
            let (mock, sent) = scripted(vec![
                "analysis",
                "echo 'SyntaxError: one' >&2\nexit 1",
                "echo 'SyntaxError: two' >&2\nexit 1",
            ]);
            let generator = Generator::new(
                Box::new(mock),
                Framework::Streamlit,
                ApiContext::with_endpoint("http://127.0.0.1:8000"),
                2,
            );
            let (_tmp, mut supervisor) = sh_supervisor();

            let err = generator
                .generate_and_run("predict house prices", None, &mut supervisor)
                .await
                .unwrap_err();

            match err {
                GenerateError::Exhausted {
                    attempts,
                    last_error,
                } => {
                    assert_eq!(attempts, 2);
                    assert!(last_error.contains("SyntaxError: two"), "{last_error}");
                }
                other => panic!("expected Exhausted, got {other:?}"),
            }
            assert_eq!(sent.lock().unwrap().len(), 3);
            assert!(!supervisor.pid_file().exists());
        }
    }
}
