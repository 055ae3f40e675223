use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{error, info};

use promptify_core::{
    format, Attachment, ChatSession, Conversation, QuickAction, Sender, APOLOGY,
};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Attachments,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation (messages, input text, pending attachments)
    pub conversation: Conversation,
    pub input_cursor: usize, // cursor position in conversation.input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Attachments panel
    pub attachment_state: ListState,

    // Attach popup
    pub show_attach_input: bool,
    pub attach_input: String,
    pub attach_input_cursor: usize,

    // One-line feedback shown above the footer
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub session: ChatSession,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(session: ChatSession, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,

            conversation: Conversation::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            attachment_state: ListState::default(),

            show_attach_input: false,
            attach_input: String::new(),
            attach_input_cursor: 0,

            status: None,

            animation_frame: 0,

            session,
            events,
        }
    }

    pub fn model_name(&self) -> &str {
        self.session.client().model()
    }

    /// Add a PDF from disk to the pending attachments.
    pub fn attach_path(&mut self, path: &str) -> bool {
        let path = path.trim().trim_matches(|c| c == '"' || c == '\'');
        if path.is_empty() {
            return false;
        }

        match Attachment::from_path(path) {
            Ok(attachment) => {
                self.status = Some(format!("Attached {}", attachment.name));
                self.conversation.add_attachment(attachment);
                if self.attachment_state.selected().is_none() {
                    self.attachment_state.select(Some(0));
                }
                true
            }
            Err(e) => {
                self.status = Some(e.to_string());
                false
            }
        }
    }

    // Attachments panel navigation
    pub fn attachments_nav_down(&mut self) {
        let len = self.conversation.attachments().len();
        if len > 0 {
            let i = self.attachment_state.selected().unwrap_or(0);
            self.attachment_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn attachments_nav_up(&mut self) {
        let i = self.attachment_state.selected().unwrap_or(0);
        self.attachment_state.select(Some(i.saturating_sub(1)));
    }

    pub fn remove_selected_attachment(&mut self) {
        let Some(i) = self.attachment_state.selected() else {
            return;
        };
        if let Some(removed) = self.conversation.remove_attachment(i) {
            self.status = Some(format!("Removed {}", removed.name));
        }

        // Adjust selection
        let len = self.conversation.attachments().len();
        if len == 0 {
            self.attachment_state.select(None);
            self.focus = FocusPane::Chat;
        } else if i >= len {
            self.attachment_state.select(Some(len - 1));
        }
    }

    /// Start a send and run the pipeline in the background. The reply comes
    /// back as `AppEvent::Reply`.
    pub fn submit(&mut self, prompt: Option<String>) -> bool {
        let Some(pending) = self.conversation.begin_send(prompt) else {
            return false;
        };
        self.input_cursor = 0;
        self.status = None;
        self.scroll_chat_to_bottom();

        info!(attachments = pending.attachments.len(), "sending message");

        let session = self.session.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let worker = tokio::spawn(async move { session.respond(&pending).await });
            // A dead worker still has to clear the typing placeholder
            let reply = match worker.await {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "send task failed");
                    APOLOGY.to_string()
                }
            };
            let _ = events.send(AppEvent::Reply(reply));
        });
        true
    }

    pub fn quick_action(&mut self, action: QuickAction) -> bool {
        match self.conversation.quick_action_prompt(action) {
            Some(prompt) => self.submit(Some(prompt)),
            None => false,
        }
    }

    pub fn receive_reply(&mut self, text: String) {
        if !self.conversation.is_typing() {
            return;
        }
        self.conversation.resolve(text);
        self.attachment_state.select(None);
        if self.focus == FocusPane::Attachments {
            self.focus = FocusPane::Chat;
        }
        self.scroll_chat_to_bottom();
    }

    pub fn quick_actions_available(&self) -> bool {
        !self.conversation.is_typing() && self.conversation.last_bot_text().is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.chat_line_count();
        let visible_height = self.visible_chat_height();

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Wrapped line count of the chat as rendered by `ui::render_chat`.
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.conversation.messages() {
            total_lines += 1; // Sender line
            if msg.sender == Sender::Typing {
                total_lines += 1;
            } else {
                for line in format::format_message(&msg.text) {
                    // Character count, not byte length, for UTF-8
                    let char_count: usize = line.iter().map(|s| s.text.chars().count()).sum();
                    total_lines += char_count / wrap_width + 1;
                }
            }
            total_lines += 1; // Blank line after message
        }

        total_lines.min(u16::MAX as usize) as u16
    }
}
