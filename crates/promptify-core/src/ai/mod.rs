pub mod gemini;

pub use gemini::{
    GeminiClient, GenerateContentRequest, GenerateContentResponse, APOLOGY, DEFAULT_ENDPOINT,
    DEFAULT_MODEL,
};
