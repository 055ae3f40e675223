//! Error types for the Promptify core library.
//!
//! None of these reach the user as a fault: extraction errors become a
//! placeholder string and API errors become the apology response.

/// Why a single attachment could not be turned into text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {name}: {message}")]
    Parse { name: String, message: String },

    #[error("PDF backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

/// Failures talking to the Gemini endpoint.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Rejected file selections.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("{name} is not a PDF file")]
    NotPdf { name: String },

    #[error("{path} has no file name")]
    NoFileName { path: String },
}
