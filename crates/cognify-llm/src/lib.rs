pub mod client;
pub mod error;
pub mod execution;
pub mod extract;
pub mod persona;
pub mod stream;
pub mod tutor;

pub use client::{ChatMessage, Completion, LanguageModel, LlmClient, LlmConfig, Role};
pub use error::LlmError;
pub use execution::{ExecutionClient, ExecutionResult, LANGUAGES, LanguageConfig};
pub use persona::{PERSONAS, Persona};
pub use stream::TokenAccumulator;
pub use tutor::{CodeAnalysis, GeneratedQuestion, LevelOutline, SubtopicOutline, Tutor};
