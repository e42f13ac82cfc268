// Configuration Storage Service
// Builds the immutable process-wide configuration from an optional config file and the environment

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "http://localhost:11434";
pub const DEFAULT_MODEL_NAME: &str = "llama3.2";
pub const DEFAULT_SECRET_KEY: &str = "fallacy-detection-secret-key";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MIN_TEXT_CHARS: usize = 3;
pub const MODEL_REQUEST_TIMEOUT_SECS: u64 = 60;

const CONFIG_DIR_ENV: &str = "FALLACY_GUARD_CONFIG_DIR";

/// Upstream request/response shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Ollama-style `/api/chat`.
    LocalChat,
    /// `/v1/chat/completions` with JSON-object output.
    OpenAiCompatible,
}

impl Dialect {
    pub fn from_use_ollama(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("true") {
            Self::LocalChat
        } else {
            Self::OpenAiCompatible
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Dialect::LocalChat => "/api/chat",
            Dialect::OpenAiCompatible => "/v1/chat/completions",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::LocalChat => "local_chat",
            Dialect::OpenAiCompatible => "openai_compatible",
        }
    }
}

/// On-disk overrides. Every field is optional; environment variables win over it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub api_base: Option<String>,
    pub model_name: Option<String>,
    pub use_ollama: Option<bool>,
    pub secret_key: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub min_text_chars: Option<usize>,
}

#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub api_base: String,
    pub model_name: String,
    pub dialect: Dialect,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    pub min_text_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            dialect: Dialect::LocalChat,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            request_timeout_secs: MODEL_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base", &self.api_base)
            .field("model_name", &self.model_name)
            .field("dialect", &self.dialect)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("min_text_chars", &self.min_text_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load once at startup: config file first, then environment overrides.
    pub fn load() -> Self {
        let file = match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir).load().unwrap_or_else(|e| {
                warn!("[CONFIG] {}; ignoring config file", e);
                ConfigFile::default()
            }),
            None => ConfigFile::default(),
        };
        Self::from_sources(file, |key| env::var(key).ok())
    }

    /// Merge file values with an environment lookup. Unparseable numbers keep the
    /// previous value.
    pub fn from_sources<F>(file: ConfigFile, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base = non_empty("LOCAL_API_BASE")
            .or(file.api_base)
            .unwrap_or(defaults.api_base);
        let model_name = non_empty("LOCAL_MODEL_NAME")
            .or(file.model_name)
            .unwrap_or(defaults.model_name);
        let dialect = match non_empty("USE_OLLAMA") {
            Some(flag) => Dialect::from_use_ollama(&flag),
            None => match file.use_ollama {
                Some(false) => Dialect::OpenAiCompatible,
                _ => defaults.dialect,
            },
        };
        let secret_key = non_empty("SECRET_KEY")
            .or(file.secret_key)
            .unwrap_or(defaults.secret_key);
        let host = non_empty("HOST").or(file.host).unwrap_or(defaults.host);
        let port = parse_or(
            "PORT",
            non_empty("PORT"),
            file.port.unwrap_or(defaults.port),
        );
        let min_text_chars = parse_or(
            "MIN_TEXT_CHARS",
            non_empty("MIN_TEXT_CHARS"),
            file.min_text_chars.unwrap_or(defaults.min_text_chars),
        );
        let min_text_chars = if min_text_chars == 0 {
            warn!("MIN_TEXT_CHARS must be at least 1, using 1");
            1
        } else {
            min_text_chars
        };

        Self {
            api_base,
            model_name,
            dialect,
            secret_key,
            host,
            port,
            min_text_chars,
            request_timeout_secs: defaults.request_timeout_secs,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), self.dialect.path())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, fallback: T) -> T
where
    T: std::str::FromStr + fmt::Display + Copy,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {}='{}', falling back to {}", key, raw, fallback);
            fallback
        }),
        None => fallback,
    }
}

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_file }
    }

    /// `$FALLACY_GUARD_CONFIG_DIR`, else the platform config dir.
    pub fn default_config_dir() -> Option<PathBuf> {
        match env::var(CONFIG_DIR_ENV) {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => dirs::config_dir().map(|p| p.join("fallacyGuard")),
        }
    }

    /// A missing file is not an error.
    pub fn load(&self) -> Result<ConfigFile, String> {
        if !self.config_file.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }
}
