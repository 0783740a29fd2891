//! OpenAI-compatible chat completions client and the tutoring prompts.
//!
//! The API key is never logged. Requests log model, latency and response size only.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::LlmSettings;
use crate::domain::HintLevel;

const HINT_SYSTEM_PROMPT: &str = "You are a mathematics tutor providing helpful hints. Create clear, well-formatted LaTeX hints without any additional text, document headers, or explanations. Just the clean LaTeX hint that can be directly rendered.";

const PROBLEM_SYSTEM_PROMPT: &str = "You are a mathematics problem creator. Create clear, well-formatted LaTeX problems without any additional text, document headers, or explanations. Just the clean LaTeX problem that can be directly rendered.";

const TUTOR_SYSTEM_PROMPT: &str =
  "provide brief socratic conversation and help if there is a mistake. (no latex, do NOT reveal final answer)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: String,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: "system".into(), content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: "user".into(), content: content.into() }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
  #[error("OpenAI API key is not configured")]
  MissingApiKey,
  #[error("OpenAI HTTP {status}: {message}")]
  Upstream { status: u16, message: String },
  #[error("OpenAI request failed: {0}")]
  Transport(#[from] reqwest::Error),
}

/// Instructions for each hint level
pub fn hint_instructions(level: HintLevel) -> &'static str {
  match level {
    HintLevel::Subtle => "Create a very subtle hint that just nudges the student in the right direction without revealing the approach. This should be a gentle reminder of a concept or a question that makes them think about the right approach.",
    HintLevel::Medium => "Create a medium-level hint that points to the specific approach or equations needed, without solving any steps. Include relevant formulas or concepts that should be applied.",
    HintLevel::Detailed => "Create a detailed hint that outlines the solution approach with specific steps to take, but without giving the full solution. Include the key equations and the specific transformations or techniques needed.",
    HintLevel::General => "Create a helpful hint that guides the student in the right direction without giving away the full solution.",
  }
}

pub fn hint_prompt(problem: &str, level: HintLevel) -> String {
  format!(
    "{}\n\nProblem: {}\n\nFormat the output as clean LaTeX that can be directly rendered, without any document headers or extra text. For example:\n\nConsider applying the probability addition rule: \\(P(A \\cup B) = P(A) + P(B) - P(A \\cap B)\\)",
    hint_instructions(level),
    problem
  )
}

pub fn problem_prompt(subject: &str, idea: &str) -> String {
  format!(
    "Create a math problem in LaTeX format about {}. Idea: {}. \n\nFormat the output as clean LaTeX that can be directly rendered, without any document headers or extra text. For example:\n\nConsider a random variable \\( X \\) with a probability density function. It is given that  \n\\[\\Pr(X < 5) = 0.6\\]\nand  \n\\[\\Pr(X > 2) = 0.7\\]\nFind  \n\\[\\Pr(2 \\leq X \\leq 5).\\]",
    subject, idea
  )
}

/// Conversation sent for the tutoring chat: system prompts, then the problem
/// as the opening user message, then the running history.
pub fn tutor_messages(problem: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
  let mut messages = vec![
    ChatMessage::system(TUTOR_SYSTEM_PROMPT),
    ChatMessage::system(format!("Context: {}", problem)),
    ChatMessage::user(problem),
  ];
  messages.extend(history.iter().filter(|m| m.role != "system").cloned());
  messages
}

#[derive(Clone)]
pub struct LlmClient {
  client: reqwest::Client,
  api_key: Option<String>,
  base_url: String,
  model: String,
  temperature: f32,
}

impl LlmClient {
  pub fn new(settings: &LlmSettings) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()
      .unwrap_or_default();
    Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      model: settings.model.clone(),
      temperature: settings.temperature,
    }
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }

  /// One chat completion; returns the first choice's text, trimmed.
  #[instrument(level = "info", skip(self, messages), fields(model = %self.model, messages = messages.len()))]
  pub async fn complete(
    &self,
    messages: &[ChatMessage],
    temperature: Option<f32>,
  ) -> Result<String, LlmError> {
    let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: &self.model,
      messages,
      temperature,
    };

    let started = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, concat!("daily_problems/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(LlmError::Upstream { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .unwrap_or_default()
      .trim()
      .to_string();

    info!(
      elapsed_ms = started.elapsed().as_millis() as u64,
      response_chars = text.len(),
      "OpenAI completion"
    );
    Ok(text)
  }

  pub async fn generate_hint(&self, problem: &str, level: HintLevel) -> Result<String, LlmError> {
    let messages = [
      ChatMessage::system(HINT_SYSTEM_PROMPT),
      ChatMessage::user(hint_prompt(problem, level)),
    ];
    self.complete(&messages, Some(self.temperature)).await
  }

  pub async fn generate_problem(&self, subject: &str, idea: &str) -> Result<String, LlmError> {
    let messages = [
      ChatMessage::system(PROBLEM_SYSTEM_PROMPT),
      ChatMessage::user(problem_prompt(subject, idea)),
    ];
    self.complete(&messages, Some(self.temperature)).await
  }

  /// Free-form chat; the model's default temperature applies
  pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
    self.complete(messages, None).await
  }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<String>,
}

/// Pull `error.message` out of an OpenAI error body
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
