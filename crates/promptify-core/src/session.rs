use tracing::info;

use crate::ai::gemini::GeminiClient;
use crate::assembler::{build_request, response_text};
use crate::extract::Extractor;
use crate::state::{Conversation, PendingSend};

/// The send pipeline: attachment extraction, request assembly, remote call.
#[derive(Clone)]
pub struct ChatSession {
    extractor: Extractor,
    client: GeminiClient,
}

impl ChatSession {
    pub fn new(extractor: Extractor, client: GeminiClient) -> Self {
        Self { extractor, client }
    }

    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Produce the bot reply for a started send. Never fails.
    pub async fn respond(&self, pending: &PendingSend) -> String {
        let extracted = self.extractor.extract_all(&pending.attachments).await;
        let request = build_request(&pending.history, &pending.text, &extracted);
        let response = self.client.generate_or_apology(&request).await;

        info!(
            attachments = pending.attachments.len(),
            failed = response.is_failure(),
            "send resolved"
        );
        response_text(&response)
    }

    /// Run a complete send against `conversation`. Returns false when the
    /// send was a no-op.
    pub async fn send(&self, conversation: &mut Conversation, prompt: Option<String>) -> bool {
        let Some(pending) = conversation.begin_send(prompt) else {
            return false;
        };
        let reply = self.respond(&pending).await;
        conversation.resolve(reply);
        true
    }
}
