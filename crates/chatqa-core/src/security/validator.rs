//! ============================================================================
//! Policy Validator - LLM judge over forbidden topics
//! ============================================================================
//! The judge must answer with exactly one token: `T` (a rule is broken) or
//! `F`. Any other answer is a contract violation, resolved by the error
//! policy like a failed call.
//! ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{SecurityCategory, SecurityCheck, ServiceErrorPolicy};
use crate::error::{QaError, Result};
use crate::llm::{ChatCompletion, CompletionRequest};
use crate::types::ChatMessage;

pub const DEFAULT_POLICY_RULES: &[&str] = &["No hablar de política."];

const VIOLATION_TOKEN: &str = "T";
const NO_VIOLATION_TOKEN: &str = "F";

/// Parsed judge answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeVerdict {
    Violation,
    NoViolation,
}

impl JudgeVerdict {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            VIOLATION_TOKEN => Ok(JudgeVerdict::Violation),
            NO_VIOLATION_TOKEN => Ok(JudgeVerdict::NoViolation),
            other => Err(QaError::ContractViolation(format!(
                "judge answered {:?}, expected '{}' or '{}'",
                other, VIOLATION_TOKEN, NO_VIOLATION_TOKEN
            ))),
        }
    }
}

/// Third check of the gate
pub struct PolicyValidator {
    judge: Arc<dyn ChatCompletion>,
    model: String,
    temperature: f32,
    system_prompt: String,
    on_error: ServiceErrorPolicy,
}

impl PolicyValidator {
    pub fn new(
        judge: Arc<dyn ChatCompletion>,
        model: String,
        temperature: f32,
        on_error: ServiceErrorPolicy,
    ) -> Self {
        Self {
            judge,
            model,
            temperature,
            system_prompt: build_system_prompt(DEFAULT_POLICY_RULES),
            on_error,
        }
    }

    /// Replace the forbidden-topic rules
    pub fn with_rules(mut self, rules: &[&str]) -> Self {
        self.system_prompt = build_system_prompt(rules);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub async fn judge(&self, text: &str) -> Result<JudgeVerdict> {
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(text),
        ];
        let request = CompletionRequest::new(&self.model, self.temperature, &messages).with_max_tokens(1);

        let answer = self.judge.complete(&request).await?;
        debug!("Judge answered {:?}", answer);
        JudgeVerdict::parse(&answer)
    }
}

fn build_system_prompt(rules: &[&str]) -> String {
    let numbered = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}", i + 1, rule))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the best validator agent, you must analyze the input prompts [in Spanish] \
         and check if any of the rules are broken.\n\
         If any rule is broken, return exactly '{}'. If no rule is broken, return exactly '{}'. \
         Return nothing else.\n\
         Rules:\n{}\n",
        VIOLATION_TOKEN, NO_VIOLATION_TOKEN, numbered
    )
}

#[async_trait]
impl SecurityCheck for PolicyValidator {
    fn category(&self) -> SecurityCategory {
        SecurityCategory::OutOfContext
    }

    fn on_service_error(&self) -> ServiceErrorPolicy {
        self.on_error
    }

    async fn is_triggered(&self, text: &str) -> Result<bool> {
        Ok(self.judge(text).await? == JudgeVerdict::Violation)
    }
}
