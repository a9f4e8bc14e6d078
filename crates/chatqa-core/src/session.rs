//! ============================================================================
//! Session - One interactive conversation
//! ============================================================================
//! `QaPipeline` holds the shared, read-only services; `ChatSession` holds
//! the per-user state (settings + history) and drives one turn at a time:
//!
//! ```text
//! Idle → Processing: gate ─┬─ triggered → refusal message
//!                          └─ clear → rank → prompt → completion
//!      → append user + response turns → Idle
//! ```
//!
//! A turn that errors leaves the history untouched.
//! ============================================================================

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::{ChatCompletion, CompletionRequest, OpenAiClient};
use crate::prompt;
use crate::retrieval::{SimilarityRanker, VectorStore};
use crate::security::{
    AzurePiiDetector, LexicalFilter, PiiCheck, PolicyValidator, SecurityCategory, SecurityGate,
    SecurityVerdict,
};
use crate::types::{ConversationTurn, SessionConfig};

/// Result of one processed message
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answered {
        response: String,
        context: Vec<String>,
    },
    Refused {
        category: SecurityCategory,
        message: &'static str,
    },
}

impl TurnOutcome {
    /// Text shown to the user and stored as the assistant turn
    pub fn response(&self) -> &str {
        match self {
            TurnOutcome::Answered { response, .. } => response,
            TurnOutcome::Refused { message, .. } => message,
        }
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, TurnOutcome::Refused { .. })
    }
}

/// Services shared by every session
pub struct QaPipeline {
    gate: SecurityGate,
    ranker: SimilarityRanker,
    completion: Arc<dyn ChatCompletion>,
    top_k: usize,
}

impl QaPipeline {
    pub fn new(
        gate: SecurityGate,
        ranker: SimilarityRanker,
        completion: Arc<dyn ChatCompletion>,
        top_k: usize,
    ) -> Self {
        Self {
            gate,
            ranker,
            completion,
            top_k,
        }
    }

    /// Wire the HTTP clients, ban-list and vector store described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let openai = Arc::new(OpenAiClient::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.embedding_model.clone(),
            config.request_timeout,
        )?);

        let detector = AzurePiiDetector::new(
            config.language_endpoint.clone(),
            config.language_key.clone(),
            config.pii_language.clone(),
            config.request_timeout,
        )?;

        let gate = SecurityGate::new(
            LexicalFilter::from_file(config.filter_method, &config.ban_list_path)?,
            PiiCheck::new(Arc::new(detector), config.pii_on_error),
            PolicyValidator::new(
                openai.clone(),
                config.judge_model.clone(),
                config.judge_temperature,
                config.judge_on_error,
            ),
        );

        let store = Arc::new(VectorStore::load(&config.vector_store_path)?);
        let ranker = SimilarityRanker::new(openai.clone(), store);

        Ok(Self::new(gate, ranker, openai, config.top_k))
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn store(&self) -> &VectorStore {
        self.ranker.store()
    }

    /// Gate, then retrieve and generate. No retrieval or generation runs
    /// for a refused message.
    pub async fn answer(
        &self,
        config: &SessionConfig,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<TurnOutcome> {
        if let SecurityVerdict::Triggered { category, message: refusal } =
            self.gate.evaluate(message).await
        {
            return Ok(TurnOutcome::Refused { category, message: refusal });
        }

        let context = self.ranker.rank(message, self.top_k).await?;
        debug!("Retrieved {} chunks", context.len());

        let messages = prompt::build_messages(&context, history, message);
        let request = CompletionRequest::new(config.model.api_name(), config.temperature(), &messages);
        let response = self.completion.complete(&request).await?;

        Ok(TurnOutcome::Answered { response, context })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Processing,
}

/// Settings and history of one conversation
pub struct ChatSession {
    id: Uuid,
    config: SessionConfig,
    history: Vec<ConversationTurn>,
    state: SessionState,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        info!("Session {} started ({}, temperature {})", id, config.model, config.temperature());
        Self {
            id,
            config,
            history: Vec::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    /// Turns in append order
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Process one user message to completion
    pub async fn submit(&mut self, pipeline: &QaPipeline, message: &str) -> Result<TurnOutcome> {
        self.state = SessionState::Processing;

        let span = info_span!("turn", session = %self.id, turn = self.history.len() / 2 + 1);
        let result = pipeline
            .answer(&self.config, &self.history, message)
            .instrument(span)
            .await;

        self.state = SessionState::Idle;
        let outcome = result?;

        self.history.push(ConversationTurn::user(message.to_string()));
        self.history
            .push(ConversationTurn::assistant(outcome.response().to_string()));

        Ok(outcome)
    }
}
