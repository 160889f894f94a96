//! Error types for crewrelay-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Role is not one of the registered agents
    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    /// Completion engine call failed
    #[error("completion engine error: {0}")]
    Upstream(#[from] crewrelay_llm::Error),

    /// Completion engine call exceeded the request timeout
    #[error("completion engine timed out after {0}ms")]
    Timeout(u64),

    /// A review pipeline task failed; the remaining tasks were not run
    #[error("pipeline step '{step}' failed: {source}")]
    PipelineStepFailure {
        /// Task name
        step: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable kind, used as a log field
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownAgent(_) => "unknown_agent",
            Error::Upstream(_) => "upstream_failure",
            Error::Timeout(_) => "timeout",
            Error::PipelineStepFailure { .. } => "pipeline_step_failure",
            Error::Configuration(_) => "configuration",
        }
    }

    /// Text sent to clients in an `error` event.
    ///
    /// Only completion-engine text is sanitized; it may echo credentials.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Error::Upstream(_) => crewrelay_llm::util::sanitize_error_for_user(&self.to_string()),
            Error::PipelineStepFailure { step, source } => {
                format!("pipeline step '{}' failed: {}", step, source.client_message())
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_agent_message() {
        let err = Error::UnknownAgent("DevOps".to_string());
        assert_eq!(err.to_string(), "Agent not found: DevOps");
        assert_eq!(err.kind(), "unknown_agent");
    }

    #[test]
    fn test_pipeline_step_failure_wraps_source() {
        let err = Error::PipelineStepFailure {
            step: "design".to_string(),
            source: Box::new(Error::Timeout(1500)),
        };
        let msg = err.to_string();
        assert!(msg.contains("design"));
        assert!(msg.contains("1500ms"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_upstream_from_llm_error() {
        let err: Error = crewrelay_llm::Error::RateLimit.into();
        assert_eq!(err.kind(), "upstream_failure");
        assert!(err.client_message().contains("rate limit"));
    }

    #[test]
    fn test_client_message_hides_credentials() {
        let err: Error = crewrelay_llm::Error::Api("bad bearer header".to_string()).into();
        assert_eq!(
            err.client_message(),
            "An API error occurred. Please try again."
        );
    }

    #[test]
    fn test_unknown_agent_message_is_not_sanitized() {
        let err = Error::UnknownAgent("secret agent".to_string());
        assert_eq!(err.client_message(), "Agent not found: secret agent");
    }

    #[test]
    fn test_pipeline_failure_sanitizes_only_the_source() {
        let err = Error::PipelineStepFailure {
            step: "backend".to_string(),
            source: Box::new(crewrelay_llm::Error::Api("bad bearer header".to_string()).into()),
        };
        assert_eq!(
            err.client_message(),
            "pipeline step 'backend' failed: An API error occurred. Please try again."
        );
    }
}
