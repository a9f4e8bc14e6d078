//! ============================================================================
//! Application Configuration
//! ============================================================================
//! Settings read from the process environment (after `.env` has been loaded
//! by the binary). Malformed values fail here, before any session starts.
//! ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{QaError, Result};
use crate::security::{FilterMethod, ServiceErrorPolicy};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4";
pub const DEFAULT_JUDGE_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_PII_LANGUAGE: &str = "es";
pub const DEFAULT_VECTOR_STORE_PATH: &str = "df_vector_store.json";
pub const DEFAULT_BAN_LIST_PATH: &str = "security_basic_filtering.txt";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOP_K: usize = 5;

/// Local data files; readable without any service credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub vector_store: PathBuf,
    pub ban_list: PathBuf,
}

impl DataPaths {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            vector_store: PathBuf::from(
                get("VECTOR_STORE_PATH").unwrap_or_else(|| DEFAULT_VECTOR_STORE_PATH.to_string()),
            ),
            ban_list: PathBuf::from(get("BAN_LIST_PATH").unwrap_or_else(|| DEFAULT_BAN_LIST_PATH.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    /// NER service credentials; the check fails per policy when absent
    pub language_key: Option<String>,
    pub language_endpoint: Option<String>,
    pub pii_language: String,
    pub judge_model: String,
    pub judge_temperature: f32,
    pub vector_store_path: PathBuf,
    pub ban_list_path: PathBuf,
    pub filter_method: FilterMethod,
    pub pii_on_error: ServiceErrorPolicy,
    pub judge_on_error: ServiceErrorPolicy,
    pub request_timeout: Duration,
    pub top_k: usize,
}

impl AppConfig {
    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let paths = DataPaths::from_lookup(&lookup);
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_KEY")
            .ok_or_else(|| QaError::config("OPENAI_KEY is not set"))?;

        let filter_method = match get("FILTER_METHOD") {
            Some(v) => v.parse()?,
            None => FilterMethod::Regex,
        };
        let pii_on_error = match get("PII_ON_ERROR") {
            Some(v) => v.parse()?,
            None => ServiceErrorPolicy::FailOpen,
        };
        let judge_on_error = match get("JUDGE_ON_ERROR") {
            Some(v) => v.parse()?,
            None => ServiceErrorPolicy::FailOpen,
        };

        let judge_temperature = parse_or(get("JUDGE_TEMPERATURE"), "JUDGE_TEMPERATURE", DEFAULT_JUDGE_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&judge_temperature) {
            return Err(QaError::config(format!(
                "JUDGE_TEMPERATURE out of range: {}",
                judge_temperature
            )));
        }

        let timeout_secs = parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(QaError::config("REQUEST_TIMEOUT_SECS must be positive"));
        }

        let config = Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            language_key: get("LANGUAGE_KEY"),
            language_endpoint: get("LANGUAGE_ENDPOINT"),
            pii_language: get("PII_LANGUAGE").unwrap_or_else(|| DEFAULT_PII_LANGUAGE.to_string()),
            judge_model: get("JUDGE_MODEL").unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string()),
            judge_temperature,
            vector_store_path: paths.vector_store,
            ban_list_path: paths.ban_list,
            filter_method,
            pii_on_error,
            judge_on_error,
            request_timeout: Duration::from_secs(timeout_secs),
            top_k: parse_or(get("TOP_K"), "TOP_K", DEFAULT_TOP_K)?,
        };

        debug!(
            "Loaded config: base_url={}, embedding_model={}, judge_model={}, top_k={}",
            config.openai_base_url, config.embedding_model, config.judge_model, config.top_k
        );

        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| QaError::config(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_KEY", "sk-test")])).unwrap();
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.judge_model, DEFAULT_JUDGE_MODEL);
        assert_eq!(config.judge_temperature, DEFAULT_JUDGE_TEMPERATURE);
        assert_eq!(config.pii_language, "es");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(matches!(config.filter_method, FilterMethod::Regex));
        assert_eq!(config.pii_on_error, ServiceErrorPolicy::FailOpen);
        assert_eq!(config.judge_on_error, ServiceErrorPolicy::FailOpen);
        assert!(config.language_key.is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, QaError::Configuration(_)));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_KEY", "sk-test"),
            ("TOP_K", "  "),
            ("LANGUAGE_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert!(config.language_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("FILTER_METHOD", "simple"),
            ("PII_ON_ERROR", "fail-closed"),
            ("TOP_K", "3"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
        assert!(matches!(config.filter_method, FilterMethod::Simple));
        assert_eq!(config.pii_on_error, ServiceErrorPolicy::FailClosed);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unsupported_filter_method_fails_fast() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_KEY", "sk-test"),
            ("FILTER_METHOD", "FUZZY"),
        ]))
        .unwrap_err();
        assert!(matches!(err, QaError::Configuration(_)));
    }

    #[test]
    fn test_data_paths_without_credentials() {
        let paths = DataPaths::from_lookup(lookup(&[("VECTOR_STORE_PATH", "  "), ("BAN_LIST_PATH", "ban.txt")]));
        assert_eq!(paths.vector_store, PathBuf::from(DEFAULT_VECTOR_STORE_PATH));
        assert_eq!(paths.ban_list, PathBuf::from("ban.txt"));
    }

    #[test]
    fn test_data_paths_match_app_config() {
        let pairs = [("OPENAI_KEY", "k"), ("VECTOR_STORE_PATH", ""), ("BAN_LIST_PATH", "lista.txt")];
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        let paths = DataPaths::from_lookup(lookup(&pairs));
        assert_eq!(config.vector_store_path, paths.vector_store);
        assert_eq!(config.ban_list_path, paths.ban_list);
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(AppConfig::from_lookup(lookup(&[("OPENAI_KEY", "k"), ("TOP_K", "five")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("OPENAI_KEY", "k"), ("REQUEST_TIMEOUT_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("OPENAI_KEY", "k"), ("JUDGE_TEMPERATURE", "9")])).is_err());
    }
}
