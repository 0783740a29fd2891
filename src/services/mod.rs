//! Clients for the external services the app talks to.

pub mod llm;
pub mod mailer;

pub use llm::{ChatMessage, LlmClient, LlmError};
pub use mailer::{MailError, Mailer, SupportMessage};
