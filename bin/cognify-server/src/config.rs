//! Server configuration, loaded from environment variables at startup.

use clap::Parser;
use cognify_llm::LlmConfig;

/// Runtime configuration for cognify-server.
///
/// Every field has a default so the server starts against a local Ollama
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3001"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://cognify.db?mode=rwc"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rotated log files; stdout only when unset.
    pub log_dir: Option<String>,

    /// Comma-separated CORS allow-list; any origin when unset.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    pub llm: LlmConfig,

    /// Base URL of the Piston code-execution API.
    pub piston_url: String,

    /// How many recent room messages a persona sees.
    pub room_context: usize,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let completion_url = env_or("LLAMA_API_URL", "http://localhost:11434/api/chat");
        let stream_url = std::env::var("LLAMA_STREAM_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| LlmConfig::stream_url_for(&completion_url));
        Self {
            bind_address: env_or("COGNIFY_BIND", "0.0.0.0:3001"),
            database_url: env_or("COGNIFY_DATABASE_URL", "sqlite://cognify.db?mode=rwc"),
            log_level: env_or("COGNIFY_LOG", "info"),
            log_json: env_flag("COGNIFY_LOG_JSON", false),
            log_dir: env_opt("COGNIFY_LOG_DIR"),
            cors_allowed_origins: env_opt("COGNIFY_CORS_ORIGINS"),
            enable_swagger: env_flag("COGNIFY_ENABLE_SWAGGER", true),
            llm: LlmConfig {
                completion_url,
                stream_url,
                model: env_or("LLAMA_MODEL", "kimi-k2.5:cloud"),
                api_key: env_opt("LLAMA_API_KEY"),
            },
            piston_url: env_or("PISTON_API_URL", "https://emkc.org/api/v2/piston"),
            room_context: parse_env("COGNIFY_ROOM_CONTEXT", 10),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(bind) = cli.bind {
            self.bind_address = bind;
        }
        if let Some(url) = cli.database_url {
            self.database_url = url;
        }
        if let Some(level) = cli.log {
            self.log_level = level;
        }
        if cli.log_json {
            self.log_json = true;
        }
        if let Some(dir) = cli.log_dir {
            self.log_dir = Some(dir);
        }
        if cli.no_swagger {
            self.enable_swagger = false;
        }
        self
    }
}

/// Command-line flags; each overrides its environment variable.
#[derive(Debug, Default, Parser)]
#[command(name = "cognify-server", version, about = "Cognify tutoring backend")]
pub struct Cli {
    /// Address to listen on (COGNIFY_BIND).
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite connection URL (COGNIFY_DATABASE_URL).
    #[arg(long)]
    pub database_url: Option<String>,

    /// Tracing filter (COGNIFY_LOG).
    #[arg(long)]
    pub log: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    pub log_json: bool,

    /// Write daily-rotated logs into this directory.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Do not serve Swagger UI.
    #[arg(long)]
    pub no_swagger: bool,
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// Defaults with an in-memory database, independent of the environment.
    pub fn for_tests() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            log_level: "debug".into(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: false,
            llm: LlmConfig {
                completion_url: "http://127.0.0.1:9/api/chat".into(),
                stream_url: "http://127.0.0.1:9/api/generate".into(),
                model: "test".into(),
                api_key: None,
            },
            piston_url: "http://127.0.0.1:9".into(),
            room_context: 10,
        }
    }
}
