pub mod ai;
pub mod assembler;
pub mod attachment;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{GeminiClient, APOLOGY};
pub use attachment::Attachment;
pub use config::Config;
pub use error::{AttachmentError, ExtractError, GeminiError};
pub use extract::{Extractor, PdfRuntime};
pub use session::ChatSession;
pub use state::{Conversation, Message, PendingSend, QuickAction, Sender};
