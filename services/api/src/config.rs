//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tax_blog_core::{ModelSelection, SiteProfile};
use tracing::Level;

/// Used when `ACCESS_CODE` is not set. Anyone who knows it can use the portal.
pub const INSECURE_ACCESS_CODE: &str = "admin123";
/// Used when the active provider has no API key; every model call will then fail upstream.
pub const PLACEHOLDER_API_KEY: &str = "DUMMY_KEY_FOR_BUILD";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which hosted AI service the adapters talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

impl FromStr for AiProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(ConfigError::InvalidValue(
                "AI_PROVIDER".to_string(),
                format!("'{}' is not one of gemini, openai", other),
            )),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub access_code: String,
    /// True when `access_code` is the built-in placeholder.
    pub access_code_is_placeholder: bool,
    pub provider: AiProvider,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub openai_api_key: String,
    pub models: ModelSelection,
    pub history_path: PathBuf,
    pub connectivity_probe_addr: String,
    pub cors_origin: String,
    pub site: SiteProfile,
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Access Gate ---
        let (access_code, access_code_is_placeholder) = match std::env::var("ACCESS_CODE") {
            Ok(code) if !code.is_empty() => (code, false),
            _ => (INSECURE_ACCESS_CODE.to_string(), true),
        };

        // --- AI Service ---
        let provider = var_or("AI_PROVIDER", "gemini").parse::<AiProvider>()?;
        let gemini_api_key = var_or("GEMINI_API_KEY", PLACEHOLDER_API_KEY);
        let gemini_base_url = var_or(
            "GEMINI_BASE_URL",
            "https://generativelanguage.googleapis.com/v1beta",
        );
        let openai_api_key = var_or("OPENAI_API_KEY", PLACEHOLDER_API_KEY);

        let defaults = ModelSelection::default();
        let thinking_budget_str = var_or("THINKING_BUDGET", &defaults.thinking_budget.to_string());
        let thinking_budget = thinking_budget_str.parse::<u32>().map_err(|e| {
            ConfigError::InvalidValue("THINKING_BUDGET".to_string(), e.to_string())
        })?;
        let models = ModelSelection {
            research: var_or("RESEARCH_MODEL", &defaults.research),
            keywords: var_or("KEYWORD_MODEL", &defaults.keywords),
            draft: var_or("DRAFT_MODEL", &defaults.draft),
            draft_fallback: var_or("DRAFT_FALLBACK_MODEL", &defaults.draft_fallback),
            metadata: var_or("METADATA_MODEL", &defaults.metadata),
            image: var_or("IMAGE_MODEL", &defaults.image),
            thinking_budget,
        };

        // --- Storage, Network and Publishing ---
        let history_path = std::env::var("HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/history.json"));
        let connectivity_probe_addr =
            var_or("CONNECTIVITY_PROBE_ADDR", "generativelanguage.googleapis.com:443");
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:5173");

        let site_defaults = SiteProfile::default();
        let site = SiteProfile {
            name: var_or("SITE_NAME", &site_defaults.name),
            url: var_or("SITE_URL", &site_defaults.url),
            logo_url: var_or("SITE_LOGO_URL", &site_defaults.logo_url),
            default_image_url: var_or("SITE_DEFAULT_IMAGE_URL", &site_defaults.default_image_url),
        };

        Ok(Self {
            bind_address,
            log_level,
            access_code,
            access_code_is_placeholder,
            provider,
            gemini_api_key,
            gemini_base_url,
            openai_api_key,
            models,
            history_path,
            connectivity_probe_addr,
            cors_origin,
            site,
        })
    }

    /// True when the active provider runs with the placeholder key.
    pub fn api_key_is_placeholder(&self) -> bool {
        let key = match self.provider {
            AiProvider::Gemini => &self.gemini_api_key,
            AiProvider::OpenAi => &self.openai_api_key,
        };
        key == PLACEHOLDER_API_KEY
    }
}
