//! Startup configuration checks

use super::config::AppConfig;
use anyhow::{bail, Result};
use tracing::warn;

/// Reject settings the relay cannot run with; warn on risky production ones
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.sessions.max_turns == 1 {
        bail!("sessions.max_turns must be 0 (unbounded) or at least 2 to hold one exchange");
    }

    if config.llm.request_timeout_secs == 0 {
        bail!("llm.request_timeout_secs must be greater than 0");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!(
            "llm.temperature must be between 0.0 and 2.0, got {}",
            config.llm.temperature
        );
    }

    let is_production = std::env::var("CREWRELAY_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if is_production && config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             The relay has no authentication; consider binding to 127.0.0.1 behind a proxy."
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_single_turn_retention() {
        let mut config = AppConfig::default();
        config.sessions.max_turns = 1;
        assert!(validate_config(&config).is_err());

        config.sessions.max_turns = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_bad_llm_settings() {
        let mut config = AppConfig::default();
        config.llm.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.llm.temperature = 3.5;
        assert!(validate_config(&config).is_err());
    }
}
