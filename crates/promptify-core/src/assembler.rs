//! Builds the outbound `generateContent` request from conversation history
//! and maps the reply back to display text.

use crate::ai::gemini::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, TurnRole,
    APOLOGY,
};
use crate::state::{Message, Sender};

/// Number of prior messages sent as context.
pub const HISTORY_WINDOW: usize = 6;

/// The last `HISTORY_WINDOW` non-transient messages, oldest first.
pub fn history_window(history: &[Message]) -> Vec<&Message> {
    let kept: Vec<&Message> = history
        .iter()
        .filter(|m| m.sender != Sender::Typing)
        .collect();
    let start = kept.len().saturating_sub(HISTORY_WINDOW);
    kept[start..].to_vec()
}

pub fn role_for(sender: Sender) -> TurnRole {
    match sender {
        Sender::User => TurnRole::User,
        _ => TurnRole::Model,
    }
}

pub fn compose_user_text(text: &str, extracted: &str) -> String {
    if extracted.is_empty() {
        text.to_string()
    } else {
        format!("{}\n\n[File contents: {}]", text, extracted)
    }
}

pub fn build_request(history: &[Message], text: &str, extracted: &str) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history_window(history)
        .into_iter()
        .map(|m| Content {
            role: Some(role_for(m.sender)),
            parts: vec![Part::text(m.text.clone())],
        })
        .collect();

    contents.push(Content {
        role: Some(TurnRole::User),
        parts: vec![Part::text(compose_user_text(text, extracted))],
    });

    GenerateContentRequest {
        contents,
        generation_config: GenerationConfig::default(),
    }
}

/// First candidate's first text part, or the apology when it is missing or empty.
pub fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .filter(|text| !text.is_empty())
        .unwrap_or(APOLOGY)
        .to_string()
}
