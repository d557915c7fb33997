use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the assessment binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub rules: RulesConfig,
    pub llm: LlmConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("CARE_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let rules = RulesConfig {
            path: non_empty("CARE_RULES_PATH").map(PathBuf::from),
        };

        let timeout_secs = env::var("CARE_LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let enabled = match non_empty("CARE_LLM_ENABLED") {
            Some(raw) => parse_flag("CARE_LLM_ENABLED", &raw)?,
            None => true,
        };

        let llm = LlmConfig {
            enabled,
            endpoint: non_empty("CARE_LLM_ENDPOINT"),
            model: non_empty("CARE_LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            api_key: non_empty("CARE_LLM_API_KEY"),
            timeout: Duration::from_secs(timeout_secs),
        };

        let log_level = env::var("CARE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            rules,
            llm,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where the rule document is read from; `None` selects the bundled rule set.
#[derive(Debug, Clone, Default)]
pub struct RulesConfig {
    pub path: Option<PathBuf>,
}

/// Advisory LLM settings. The overlay only runs when enabled and an endpoint is configured.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && self.endpoint.is_some()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "CARE_LLM_TIMEOUT_SECS must be a positive whole number")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}
