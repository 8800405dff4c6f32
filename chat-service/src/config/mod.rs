use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Default Gemini REST endpoint (model and method are appended per call).
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    /// Echo raw upstream/internal error text in `details`. Never set in production.
    pub dev_mode: bool,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Absent key is not fatal at startup; chat requests fail with 500 instead.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base_url: DEFAULT_GEMINI_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source so tests never touch the process environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout_secs = match non_empty("GEMINI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "GEMINI_TIMEOUT_SECS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let environment = non_empty("ENVIRONMENT").unwrap_or_else(|| "production".to_string());

        Ok(ChatConfig {
            common,
            gemini: GeminiSettings {
                api_key: non_empty("GEMINI_API_KEY").map(Secret::new),
                model: non_empty("GEMINI_MODEL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base_url: non_empty("GEMINI_API_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
            dev_mode: is_development(&environment),
            otlp_endpoint: non_empty("OTLP_ENDPOINT"),
        })
    }
}

fn is_development(environment: &str) -> bool {
    matches!(
        environment.trim().to_ascii_lowercase().as_str(),
        "dev" | "development"
    )
}
