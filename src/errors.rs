//! Error types shared across the audit pipeline.

use std::time::Duration;

use thiserror::Error;

/// Fatal configuration problems detected before any browser action.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {name} is not set; add it to your .env file")]
    Missing { name: &'static str },
}

/// Failures raised by the browser layer.
///
/// The session driver absorbs these into boolean or empty results; only
/// `initialize` lets them escape, since without an engine there is nothing
/// to continue with.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("selector {selector:?} did not appear within {timeout_ms}ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },

    #[error("interaction with {selector:?} failed: {reason}")]
    Interaction { selector: String, reason: String },

    #[error("page script evaluation failed: {0}")]
    Evaluation(String),

    #[error("browser session is not initialized")]
    NotInitialized,

    #[error("operator confirmation failed: {0}")]
    OperatorInput(String),
}

impl SessionError {
    pub fn launch(reason: impl ToString) -> Self {
        Self::Launch(reason.to_string())
    }

    pub fn navigation(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn selector_timeout(selector: impl Into<String>, timeout: Duration) -> Self {
        Self::SelectorTimeout {
            selector: selector.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn interaction(selector: impl Into<String>, reason: impl ToString) -> Self {
        Self::Interaction {
            selector: selector.into(),
            reason: reason.to_string(),
        }
    }

    pub fn evaluation(reason: impl ToString) -> Self {
        Self::Evaluation(reason.to_string())
    }
}

/// Failures of one remote generation attempt.
///
/// Generator implementations fold these into failure outcomes; they never
/// cross the generator boundary as errors.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference endpoint returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("inference endpoint returned no generations")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_timeout_reports_selector_and_budget() {
        let err = SessionError::selector_timeout("#password", Duration::from_secs(30));
        let text = err.to_string();
        assert!(text.contains("#password"));
        assert!(text.contains("30000ms"));
    }

    #[test]
    fn missing_config_names_the_variable() {
        let err = ConfigError::Missing {
            name: "TRELLO_EMAIL",
        };
        assert!(err.to_string().contains("TRELLO_EMAIL"));
        assert!(err.to_string().contains(".env"));
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = InferenceError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }
}
