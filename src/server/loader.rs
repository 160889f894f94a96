//! Configuration loading
//!
//! Embedded defaults, then optional files, then environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let env_name = std::env::var("CREWRELAY_ENV").unwrap_or_else(|_| "development".to_string());
    let port = std::env::var("PORT").ok();
    build_config(&env_name, port.as_deref())
}

fn build_config(env_name: &str, port: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
        .add_source(File::with_name("config/local").required(false))
        // prefix_separator("_") so CREWRELAY_LLM__MODEL works with a single _
        .add_source(
            Environment::with_prefix("CREWRELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    if let Some(port) = port {
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        builder = builder
            .set_override("server.port", i64::from(port))
            .context("Failed to apply PORT override")?;
    }

    builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewrelay_core::ReviewMode;

    #[test]
    fn test_embedded_defaults() {
        let config = build_config("test-no-such-env", None).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.sessions.max_turns, 100);
        assert_eq!(config.review.mode, ReviewMode::DesignOnly);
        assert!(config.llm.max_tokens.is_none());
    }

    #[test]
    fn test_port_override() {
        let config = build_config("test-no-such-env", Some("8088")).unwrap();
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_invalid_port() {
        assert!(build_config("test-no-such-env", Some("eighty")).is_err());
    }
}
