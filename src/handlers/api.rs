//! JSON endpoints used by the browser: tutoring chat, AI generation,
//! support mail, KaTeX macros, and drag-and-drop scheduling.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{AdminContext, AuthContext};
use crate::db::{self, try_lock, MoveOutcome};
use crate::domain::problem::{format_date, parse_date};
use crate::domain::HintLevel;
use crate::error::AppError;
use crate::latex;
use crate::services::llm::tutor_messages;
use crate::services::{ChatMessage, SupportMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
  #[serde(default)]
  pub messages: Vec<ChatMessage>,
  /// Problem the conversation is about; loaded server-side
  pub problem_id: Option<i64>,
  /// Problem text, used when no id is given
  pub problem: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
  pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
  #[serde(default)]
  pub problem: String,
  #[serde(default)]
  pub hint_level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRequest {
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub problem_idea: String,
}

#[derive(Debug, Deserialize)]
pub struct SupportRequest {
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
  pub date: String,
}

/// POST /api/chat
pub async fn chat(
  State(state): State<AppState>,
  _auth: AuthContext,
  Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
  let problem = match req.problem_id {
    Some(id) => {
      let conn = try_lock(&state.db)?;
      let problem = db::get_problem(&conn, id)?.ok_or_else(|| AppError::not_found("Problem not found"))?;
      Some(latex::strip_html(&problem.content))
    }
    None => req.problem.filter(|p| !p.trim().is_empty()),
  };

  let messages = match problem {
    Some(problem) => tutor_messages(&problem, &req.messages),
    None if req.messages.is_empty() => return Err(AppError::bad_request("Messages are required")),
    None => req.messages,
  };

  let message = state
    .llm
    .chat(&messages)
    .await
    .map_err(|e| AppError::from_llm(e, "get a response"))?;
  Ok(Json(ChatResponse { message }))
}

/// POST /api/generate-hint
pub async fn generate_hint(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Json(req): Json<HintRequest>,
) -> Result<Json<Value>, AppError> {
  if req.problem.trim().is_empty() || req.hint_level.trim().is_empty() {
    return Err(AppError::bad_request("Problem and hint level are required"));
  }

  let level = HintLevel::from_str(req.hint_level.trim());
  tracing::info!("{} requested a {} hint", auth.username, level.as_str());
  let hint = state
    .llm
    .generate_hint(&req.problem, level)
    .await
    .map_err(|e| AppError::from_llm(e, "generate hint"))?;
  Ok(Json(json!({ "hint": hint })))
}

/// POST /api/generate-problem
pub async fn generate_problem(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Json(req): Json<ProblemRequest>,
) -> Result<Json<Value>, AppError> {
  if req.subject.trim().is_empty() || req.problem_idea.trim().is_empty() {
    return Err(AppError::bad_request("Subject and problem idea are required"));
  }

  tracing::info!("{} requested a problem about {}", auth.username, req.subject.trim());
  let problem = state
    .llm
    .generate_problem(req.subject.trim(), req.problem_idea.trim())
    .await
    .map_err(|e| AppError::from_llm(e, "generate problem"))?;
  Ok(Json(json!({ "problem": problem })))
}

/// POST /api/send-email - Support contact form
pub async fn send_email(
  State(state): State<AppState>,
  auth: AuthContext,
  Json(req): Json<SupportRequest>,
) -> Result<Json<Value>, AppError> {
  if req.subject.trim().is_empty() || req.message.trim().is_empty() {
    return Err(AppError::bad_request("Subject and message are required"));
  }

  let message = SupportMessage {
    reply_to: auth.email,
    subject: req.subject.trim().to_string(),
    text: req.message,
  };
  state.mailer.send_support(&message).await?;
  Ok(Json(json!({ "success": true })))
}

/// GET /api/katex-macros
pub async fn katex_macros() -> Json<Value> {
  Json(latex::katex_macros_json())
}

/// POST /api/problems/{id}/move - Reschedule a problem
pub async fn move_problem(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(problem_id): Path<i64>,
  Json(req): Json<MoveRequest>,
) -> Result<Json<Value>, AppError> {
  let date = parse_date(&req.date).ok_or_else(|| AppError::bad_request("Invalid date"))?;

  let conn = try_lock(&state.db)?;
  match db::move_problem(&conn, problem_id, date)? {
    MoveOutcome::Moved => {
      tracing::info!("{} moved problem {} to {}", auth.username, problem_id, date);
      Ok(Json(json!({ "ok": true, "id": problem_id, "date": format_date(date) })))
    }
    MoveOutcome::DateTaken(other) => Err(AppError::Conflict(format!(
      "Another problem (#{}) is already scheduled for {}",
      other,
      format_date(date)
    ))),
    MoveOutcome::NotFound => Err(AppError::not_found("Problem not found")),
  }
}
