//! ============================================================================
//! Prompt Assembly
//! ============================================================================
//! [system: template + retrieved chunks] + [history...] + [new user message]
//! ============================================================================

use crate::types::{ChatMessage, ConversationTurn};

/// Substituted for the chunk block when retrieval found nothing
pub const NO_CONTEXT: &str = "(sin contexto relevante)";

const SOURCE_PLACEHOLDER: &str = "{source}";

pub const SYSTEM_TEMPLATE: &str = "
Eres una Inteligencia Artificial super avanzada que trabaja como asistente personal.
Utiliza los RESULTADOS DE BÚSQUEDA SEMÁNTICA para responder las preguntas del usuario.
Solo debes utilizar la información de la BÚSQUEDA SEMÁNTICA si tiene sentido y tiene relación con la pregunta del usuario.
Si la respuesta no se encuentra dentro del contexto de la búsqueda semántica, no inventes una respuesta, y responde amablemente que no tienes información para responder.

RESULTADOS DE BÚSQUEDA SEMÁNTICA:
{source}

Lee cuidadosamente las instrucciones, respira profundo y escribe una respuesta para el usuario!
";

/// Render retrieved chunks as one text block
pub fn format_context(chunks: &[String]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    // One JSON string per chunk
    serde_json::to_string(chunks).unwrap_or_else(|_| chunks.join("\n"))
}

pub fn system_message(chunks: &[String]) -> ChatMessage {
    ChatMessage::system(SYSTEM_TEMPLATE.replace(SOURCE_PLACEHOLDER, &format_context(chunks)))
}

/// Build the full message list for the completion call
pub fn build_messages(
    chunks: &[String],
    history: &[ConversationTurn],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(system_message(chunks));
    messages.extend(history.iter().map(ConversationTurn::to_message));
    messages.push(ChatMessage::user(user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_chunks_substituted_verbatim() {
        let chunks = vec![
            "Arauco produce celulosa".to_string(),
            "Arauco tiene plantas en Chile".to_string(),
        ];
        let msg = system_message(&chunks);
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.contains("[\"Arauco produce celulosa\",\"Arauco tiene plantas en Chile\"]"));
        assert!(!msg.content.contains(SOURCE_PLACEHOLDER));
        assert!(msg.content.contains("no inventes una respuesta"));
    }

    #[test]
    fn test_empty_context_marker() {
        let msg = system_message(&[]);
        assert!(msg.content.contains(NO_CONTEXT));
        assert!(msg.content.contains("responde amablemente que no tienes información"));
    }

    #[test]
    fn test_message_order() {
        let history = vec![
            ConversationTurn::user("primera".to_string()),
            ConversationTurn::assistant("respuesta".to_string()),
        ];
        let messages = build_messages(&["ctx".to_string()], &history, "segunda");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[1].content, "primera");
        assert_eq!(messages[2].content, "respuesta");
        assert_eq!(messages[3].content, "segunda");
    }

    #[test]
    fn test_braces_in_chunks_are_kept() {
        let chunks = vec!["usa {source} literal".to_string()];
        let msg = system_message(&chunks);
        assert!(msg.content.contains("usa {source} literal"));
    }
}
