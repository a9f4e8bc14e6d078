//! ============================================================================
//! Core Types for the Q&A chat
//! ============================================================================
//! Conversation turns, chat messages, model selection and session settings.
//! Messages serialize to the OpenAI-compatible `{role, content}` shape.
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{QaError, Result};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{role, content}` entry sent to a completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A single turn of the session history
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    /// Only `User` or `Assistant`; the constructors below are the only way in
    role: Role,
    content: String,
    /// Unix timestamp
    timestamp: i64,
}

impl ConversationTurn {
    pub fn user(content: String) -> Self {
        Self {
            role: Role::User,
            content,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn assistant(content: String) -> Self {
        Self {
            role: Role::Assistant,
            content,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Completion models offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatModel {
    #[default]
    Gpt35Turbo,
    Gpt4,
    Gpt4o,
}

impl ChatModel {
    pub const ALL: [ChatModel; 3] = [ChatModel::Gpt35Turbo, ChatModel::Gpt4, ChatModel::Gpt4o];

    /// Identifier sent to the completion API
    pub fn api_name(&self) -> &'static str {
        match self {
            ChatModel::Gpt35Turbo => "gpt-3.5-turbo",
            ChatModel::Gpt4 => "gpt-4",
            ChatModel::Gpt4o => "gpt-4o",
        }
    }

    /// Label shown in the model picker
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatModel::Gpt35Turbo => "GPT-3.5",
            ChatModel::Gpt4 => "GPT-4",
            ChatModel::Gpt4o => "GPT-4o",
        }
    }
}

impl std::fmt::Display for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ChatModel {
    type Err = QaError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ChatModel::ALL
            .into_iter()
            .find(|m| m.api_name() == wanted || m.display_name().to_lowercase() == wanted)
            .ok_or_else(|| {
                QaError::config(format!(
                    "Unknown model '{}'. Valid values: GPT-3.5, GPT-4, GPT-4o",
                    s
                ))
            })
    }
}

/// User-selected settings for one session, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionConfigFields")]
pub struct SessionConfig {
    pub model: ChatModel,
    temperature: f32,
}

/// Unchecked wire shape; deserialization goes through `SessionConfig::new`
#[derive(Deserialize)]
struct SessionConfigFields {
    model: ChatModel,
    temperature: f32,
}

impl TryFrom<SessionConfigFields> for SessionConfig {
    type Error = QaError;

    fn try_from(fields: SessionConfigFields) -> Result<Self> {
        Self::new(fields.model, fields.temperature)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: ChatModel::default(),
            temperature: 0.0,
        }
    }
}

impl SessionConfig {
    pub fn new(model: ChatModel, temperature: f32) -> Result<Self> {
        let mut config = Self { model, ..Self::default() };
        config.set_temperature(temperature)?;
        Ok(config)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Accepts values in `[0, 1]`; anything else leaves the current value
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        if !temperature.is_finite() || !(0.0..=1.0).contains(&temperature) {
            return Err(QaError::config(format!(
                "Temperature must be within [0, 1], got {}",
                temperature
            )));
        }
        self.temperature = temperature;
        Ok(())
    }
}
