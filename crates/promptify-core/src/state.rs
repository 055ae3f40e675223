//! UI-agnostic conversation state
//!
//! `Conversation` is the single owner of the message list, input text, pending
//! attachments and typing flag. A send goes through `begin_send` and
//! `resolve`; whatever runs in between never touches this state.

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;

/// Text of the transient placeholder shown while a reply is pending.
pub const TYPING_TEXT: &str = "Typing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
    /// Transient status entry, never sent to the API.
    Typing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
}

/// Canned follow-ups applied to the latest bot reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Summarize,
    ExplainMore,
    ExplainShorter,
}

impl QuickAction {
    pub fn all() -> [QuickAction; 3] {
        [
            QuickAction::Summarize,
            QuickAction::ExplainMore,
            QuickAction::ExplainShorter,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::Summarize => "Summarize",
            QuickAction::ExplainMore => "Explain more",
            QuickAction::ExplainShorter => "Explain shorter",
        }
    }

    pub fn prompt(&self, bot_text: &str) -> String {
        format!("{} this:\n\n{}", self.label(), bot_text)
    }
}

/// Everything the send pipeline needs, captured when the send starts.
#[derive(Debug, Clone)]
pub struct PendingSend {
    /// Messages as they were before this send.
    pub history: Vec<Message>,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
    pub input: String,
    attachments: Vec<Attachment>,
    typing: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Out-of-range indices leave the list untouched.
    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn last_bot_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Bot)
            .map(|m| m.text.as_str())
    }

    /// Prompt for a quick action, if one is available right now.
    pub fn quick_action_prompt(&self, action: QuickAction) -> Option<String> {
        if self.typing {
            return None;
        }
        self.last_bot_text()
            .filter(|text| !text.is_empty())
            .map(|text| action.prompt(text))
    }

    fn push(&mut self, text: String, sender: Sender) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message { id, text, sender });
        id
    }

    /// Start a send with `prompt`, or with the current input when `None`.
    ///
    /// Returns `None` without touching any state when the text is blank and
    /// nothing is attached, or when a send is already in flight.
    pub fn begin_send(&mut self, prompt: Option<String>) -> Option<PendingSend> {
        if self.typing {
            return None;
        }

        let text = prompt.unwrap_or_else(|| self.input.clone());
        if text.trim().is_empty() && self.attachments.is_empty() {
            return None;
        }

        let history = self.messages.clone();

        self.push(text.clone(), Sender::User);
        self.input.clear();
        self.push(TYPING_TEXT.to_string(), Sender::Typing);
        self.typing = true;

        Some(PendingSend {
            history,
            text,
            attachments: self.attachments.clone(),
        })
    }

    /// Finish the in-flight send: drop the placeholder, append the reply and
    /// clear the pending attachments.
    pub fn resolve(&mut self, bot_text: String) {
        self.messages.retain(|m| m.sender != Sender::Typing);
        self.typing = false;
        self.push(bot_text, Sender::Bot);
        self.attachments.clear();
    }
}
