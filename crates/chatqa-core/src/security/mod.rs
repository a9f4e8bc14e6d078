//! ============================================================================
//! Security Module - Pre-generation checks on every user query
//! ============================================================================
//! Three independent checks run in a fixed order; the first that fires
//! short-circuits the query with that category's refusal message:
//!
//! 1. Lexical filter (ban-list match on normalized text)
//! 2. Personal-information detector (external NER service)
//! 3. Policy validator (LLM judge over forbidden topics)
//!
//! A check that fails to run is resolved by its `ServiceErrorPolicy`.
//! ============================================================================

mod gate;
mod lexical;
mod pii;
mod validator;

pub use gate::SecurityGate;
pub use lexical::{
    basic_word_occurrence, clean_text, load_ban_list, regex_word_occurrence, FilterMethod,
    LexicalFilter, WordMatcher,
};
pub use pii::{AzurePiiDetector, PiiCheck, PiiDetector, PiiEntity};
pub use validator::{JudgeVerdict, PolicyValidator, DEFAULT_POLICY_RULES};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// Which check refused a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCategory {
    InappropriateContent,
    PersonalInformation,
    OutOfContext,
}

impl SecurityCategory {
    /// Fixed user-facing refusal
    pub fn message(&self) -> &'static str {
        match self {
            SecurityCategory::InappropriateContent => {
                "Se ha detectado contenido inapropiado en tu consulta, por favor intenta de nuevo."
            }
            SecurityCategory::PersonalInformation => {
                "Se ha detectado información personal en tu consulta, por favor intenta de nuevo."
            }
            SecurityCategory::OutOfContext => {
                "Se ha detectado consulta fuera de contexto, por favor intenta de nuevo."
            }
        }
    }
}

impl std::fmt::Display for SecurityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SecurityCategory::InappropriateContent => "inappropriate_content",
            SecurityCategory::PersonalInformation => "personal_information",
            SecurityCategory::OutOfContext => "out_of_context",
        };
        f.write_str(name)
    }
}

/// Outcome of running the gate on one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityVerdict {
    Clear,
    Triggered {
        category: SecurityCategory,
        message: &'static str,
    },
}

impl SecurityVerdict {
    pub fn triggered(category: SecurityCategory) -> Self {
        SecurityVerdict::Triggered {
            category,
            message: category.message(),
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, SecurityVerdict::Clear)
    }
}

/// What a check reports when it could not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceErrorPolicy {
    /// Treat as not triggered
    #[default]
    FailOpen,
    /// Treat as triggered
    FailClosed,
}

impl std::str::FromStr for ServiceErrorPolicy {
    type Err = QaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-open" | "open" => Ok(ServiceErrorPolicy::FailOpen),
            "fail-closed" | "closed" => Ok(ServiceErrorPolicy::FailClosed),
            _ => Err(QaError::config(format!(
                "Unknown service error policy '{}'. Valid values: fail-open, fail-closed",
                s
            ))),
        }
    }
}

/// One predicate of the gate
#[async_trait]
pub trait SecurityCheck: Send + Sync {
    fn category(&self) -> SecurityCategory;

    fn on_service_error(&self) -> ServiceErrorPolicy {
        ServiceErrorPolicy::FailOpen
    }

    async fn is_triggered(&self, text: &str) -> Result<bool>;
}
