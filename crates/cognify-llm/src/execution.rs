//! Remote code execution through the Piston API.
//!
//! API: `POST {base}/execute` with
//! `{language, version, files, stdin, run_timeout}`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LlmError;

/// Piston-side wall clock limit for one run, in milliseconds.
pub const RUN_TIMEOUT_MS: u64 = 10_000;

/// A runnable playground language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    pub id: &'static str,
    pub label: &'static str,
    pub piston_id: &'static str,
    pub piston_version: &'static str,
    pub extension: &'static str,
    pub supports_stdin: bool,
    /// Rendered in the browser instead of executed remotely.
    pub is_web: bool,
}

const fn lang(
    id: &'static str,
    label: &'static str,
    piston_id: &'static str,
    piston_version: &'static str,
    extension: &'static str,
    supports_stdin: bool,
) -> LanguageConfig {
    LanguageConfig { id, label, piston_id, piston_version, extension, supports_stdin, is_web: false }
}

pub const LANGUAGES: [LanguageConfig; 15] = [
    lang("python", "Python", "python", "3.10.0", ".py", true),
    lang("javascript", "JavaScript", "javascript", "18.15.0", ".js", false),
    lang("typescript", "TypeScript", "typescript", "5.0.3", ".ts", false),
    lang("c", "C", "c", "10.2.0", ".c", true),
    lang("cpp", "C++", "c++", "10.2.0", ".cpp", true),
    lang("java", "Java", "java", "15.0.2", ".java", true),
    lang("csharp", "C#", "csharp.net", "5.0.201", ".cs", true),
    lang("go", "Go", "go", "1.16.2", ".go", true),
    lang("rust", "Rust", "rust", "1.68.2", ".rs", true),
    lang("ruby", "Ruby", "ruby", "3.0.1", ".rb", true),
    lang("php", "PHP", "php", "8.2.3", ".php", true),
    lang("swift", "Swift", "swift", "5.3.3", ".swift", false),
    lang("kotlin", "Kotlin", "kotlin", "1.8.20", ".kt", true),
    lang("lua", "Lua", "lua", "5.4.4", ".lua", true),
    LanguageConfig {
        id: "html",
        label: "HTML/CSS/JS",
        piston_id: "",
        piston_version: "",
        extension: ".html",
        supports_stdin: false,
        is_web: true,
    },
];

pub fn language(id: &str) -> Option<&'static LanguageConfig> {
    LANGUAGES.iter().find(|l| l.id == id)
}

impl LanguageConfig {
    /// Java needs the file to match its public class.
    pub fn file_name(&self) -> String {
        if self.id == "java" {
            "Main.java".to_owned()
        } else {
            format!("main{}", self.extension)
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub signal: Option<String>,
    pub language: String,
    pub version: String,
}

#[derive(Serialize)]
struct ExecuteBody<'a> {
    language: &'a str,
    version: &'a str,
    files: [SourceFile<'a>; 1],
    stdin: &'a str,
    run_timeout: u64,
}

#[derive(Serialize)]
struct SourceFile<'a> {
    name: String,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct PistonResponse {
    language: Option<String>,
    version: Option<String>,
    run: Option<PistonStage>,
    compile: Option<PistonStage>,
}

#[derive(Debug, Default, Deserialize)]
struct PistonStage {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    code: Option<i32>,
    signal: Option<String>,
}

impl PistonResponse {
    fn into_result(self, lang: &LanguageConfig) -> ExecutionResult {
        let run = self.run.unwrap_or_default();
        let stderr = if run.stderr.is_empty() {
            self.compile.map(|c| c.stderr).unwrap_or_default()
        } else {
            run.stderr
        };
        ExecutionResult {
            stdout: run.stdout,
            stderr,
            exit_code: run.code.unwrap_or(-1),
            signal: run.signal.filter(|s| !s.is_empty()),
            language: self.language.unwrap_or_else(|| lang.label.to_owned()),
            version: self.version.unwrap_or_else(|| lang.piston_version.to_owned()),
        }
    }
}

/// Thin client for a Piston deployment.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    base_url: String,
    client: Client,
}

impl ExecutionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(concat!("cognify-llm/", env!("CARGO_PKG_VERSION")))
            // Compile time counts against the HTTP request, not `run_timeout`.
            .timeout(Duration::from_millis(RUN_TIMEOUT_MS * 3))
            .build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_owned(), client })
    }

    pub async fn execute(
        &self,
        language_id: &str,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, LlmError> {
        let lang = language(language_id)
            .ok_or_else(|| LlmError::UnsupportedLanguage(language_id.to_owned()))?;

        if lang.is_web {
            return Ok(ExecutionResult {
                stdout: "[Live Preview] HTML/CSS/JS is rendered in the preview tab.".into(),
                stderr: String::new(),
                exit_code: 0,
                signal: None,
                language: lang.label.into(),
                version: "Browser".into(),
            });
        }

        debug!(language = lang.id, code_len = code.len(), "submitting code to piston");
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&ExecuteBody {
                language: lang.piston_id,
                version: lang.piston_version,
                files: [SourceFile { name: lang.file_name(), content: code }],
                stdin,
                run_timeout: RUN_TIMEOUT_MS,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let result = response.json::<PistonResponse>().await?.into_result(lang);
        info!(language = lang.id, exit_code = result.exit_code, "code executed");
        Ok(result)
    }
}
