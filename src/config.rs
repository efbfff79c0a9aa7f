//! Configuration for devpanel.
//!
//! Everything comes from environment variables:
//! - `ANTHROPIC_API_KEY` - Required. Key for the LLM completion API.
//! - `GREPTILE_API_KEY` - Required. Key forwarded to the indexing plugin.
//! - `GITHUB_TOKEN` - Required. Token for the GitHub API and the plugin.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8080`.
//! - `DEFAULT_MODEL` - Optional. LLM model id.
//! - `PLUGIN_RUNTIME` - Optional. Plugin runtime binary. Defaults to `extism`.
//! - `PLUGIN_WASM` - Optional. Path to the indexing plugin WASM module.

use thiserror::Error;

use crate::llm::DEFAULT_MODEL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key for the LLM completion API
    pub anthropic_api_key: String,

    /// Key forwarded to the indexing plugin
    pub greptile_api_key: String,

    /// GitHub token for the repo browser and the plugin
    pub github_token: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Default LLM model identifier
    pub default_model: String,

    /// Plugin runtime binary
    pub plugin_runtime: String,

    /// Path to the indexing plugin WASM module
    pub plugin_wasm: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if any of the required keys is
    /// not set, or `ConfigError::InvalidValue` for an unparseable `PORT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let anthropic_api_key = require_env("ANTHROPIC_API_KEY")?;
        let greptile_api_key = require_env("GREPTILE_API_KEY")?;
        let github_token = require_env("GITHUB_TOKEN")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let plugin_runtime =
            std::env::var("PLUGIN_RUNTIME").unwrap_or_else(|_| "extism".to_string());

        let plugin_wasm = std::env::var("PLUGIN_WASM")
            .unwrap_or_else(|_| "plugins/wasm/greptile.wasm".to_string());

        Ok(Self {
            anthropic_api_key,
            greptile_api_key,
            github_token,
            host,
            port,
            default_model,
            plugin_runtime,
            plugin_wasm,
        })
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}
