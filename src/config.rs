//! Environment-derived configuration.
//!
//! Everything behavior-affecting comes from the environment; a `.env` file
//! is honored via dotenv at startup. The config is built once in `main`
//! and passed by reference, nothing reads the environment afterwards.

use std::env;
use std::path::PathBuf;

use crate::errors::ConfigError;

pub const DEFAULT_HF_MODEL: &str = "microsoft/DialoGPT-medium";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";
const DEFAULT_DATA_DIR: &str = "data";

/// Login identity for the Trello session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Which inference backend serves generation requests.
#[derive(Debug, Clone)]
pub enum InferenceBackend {
    /// Hosted HuggingFace Inference API, authenticated with an API key.
    HuggingFace { api_key: String, model: String },
    /// OpenAI-compatible local endpoint (Ollama, LM Studio and friends).
    Local { endpoint: String, model: String },
}

/// Full runtime configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub board_url: String,
    pub backend: InferenceBackend,
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Read configuration from the environment. Missing required variables
    /// are fatal; setting `LOCAL_INFERENCE_URL` switches the run to the
    /// local backend and relaxes the API key requirement.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Credentials {
            email: required("TRELLO_EMAIL")?,
            password: required("TRELLO_PASSWORD")?,
        };
        let board_url = required("TRELLO_BOARD_URL")?;

        let backend = match optional("LOCAL_INFERENCE_URL") {
            Some(endpoint) => InferenceBackend::Local {
                endpoint,
                model: optional("LOCAL_INFERENCE_MODEL")
                    .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            },
            None => InferenceBackend::HuggingFace {
                api_key: required("HUGGINGFACE_API_KEY")?,
                model: optional("HF_MODEL_NAME").unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            },
        };

        let data_dir = optional("BOARDAUDIT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            credentials,
            board_url,
            backend,
            data_dir,
        })
    }

    pub fn members_csv_path(&self) -> PathBuf {
        self.data_dir.join("members.csv")
    }

    pub fn analysis_path(&self) -> PathBuf {
        self.data_dir.join("analysis_results.txt")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing { name })
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 8] = [
        "TRELLO_EMAIL",
        "TRELLO_PASSWORD",
        "TRELLO_BOARD_URL",
        "HUGGINGFACE_API_KEY",
        "HF_MODEL_NAME",
        "LOCAL_INFERENCE_URL",
        "LOCAL_INFERENCE_MODEL",
        "BOARDAUDIT_DATA_DIR",
    ];

    fn clear_env() {
        for name in ALL_VARS {
            env::remove_var(name);
        }
    }

    fn set_required() {
        env::set_var("TRELLO_EMAIL", "ops@example.com");
        env::set_var("TRELLO_PASSWORD", "hunter2");
        env::set_var("TRELLO_BOARD_URL", "https://trello.com/b/abc/team");
        env::set_var("HUGGINGFACE_API_KEY", "hf_test");
    }

    #[test]
    #[serial]
    fn missing_credentials_are_fatal() {
        clear_env();
        let err = AppConfig::from_env().expect_err("must fail without credentials");
        assert!(err.to_string().contains("TRELLO_EMAIL"));
    }

    #[test]
    #[serial]
    fn defaults_fill_model_and_data_dir() {
        clear_env();
        set_required();
        let config = AppConfig::from_env().expect("config");
        match &config.backend {
            InferenceBackend::HuggingFace { model, .. } => assert_eq!(model, DEFAULT_HF_MODEL),
            other => panic!("unexpected backend: {other:?}"),
        }
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.members_csv_path(), PathBuf::from("data/members.csv"));
        assert_eq!(config.analysis_path(), PathBuf::from("data/analysis_results.txt"));
        clear_env();
    }

    #[test]
    #[serial]
    fn local_endpoint_selects_the_local_backend() {
        clear_env();
        env::set_var("TRELLO_EMAIL", "ops@example.com");
        env::set_var("TRELLO_PASSWORD", "hunter2");
        env::set_var("TRELLO_BOARD_URL", "https://trello.com/b/abc/team");
        env::set_var("LOCAL_INFERENCE_URL", "http://localhost:11434/v1");
        let config = AppConfig::from_env().expect("config");
        match &config.backend {
            InferenceBackend::Local { endpoint, model } => {
                assert_eq!(endpoint, "http://localhost:11434/v1");
                assert_eq!(model, DEFAULT_LOCAL_MODEL);
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn blank_values_count_as_missing() {
        clear_env();
        set_required();
        env::set_var("TRELLO_BOARD_URL", "   ");
        let err = AppConfig::from_env().expect_err("must fail on blank URL");
        assert!(err.to_string().contains("TRELLO_BOARD_URL"));
        clear_env();
    }
}
