//! Bookmark, rate and note forms on the problem of the day.
//!
//! Each handler redirects back to the problem's day with a toast.

use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::Form;
use serde::Deserialize;

use super::{redirect_error, redirect_notice};
use crate::auth::AuthContext;
use crate::db::{self, try_lock};
use crate::domain::problem::format_date;
use crate::domain::Difficulty;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RatingForm {
  pub rating: String,
}

#[derive(Deserialize)]
pub struct NoteForm {
  #[serde(default)]
  pub content: String,
}

/// Home URL showing the problem's day
fn problem_home(conn: &rusqlite::Connection, problem_id: i64) -> Result<Option<String>, AppError> {
  Ok(db::get_problem(conn, problem_id)?.map(|p| match p.publish_date {
    Some(date) => format!("/?date={}", format_date(date)),
    None => "/".to_string(),
  }))
}

/// POST /problems/{id}/bookmark
pub async fn toggle_bookmark(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(problem_id): Path<i64>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(back) = problem_home(&conn, problem_id)? else {
    return Ok(redirect_error("/", "Problem not found"));
  };

  match db::toggle_bookmark(&conn, auth.user_id, problem_id) {
    Ok(true) => Ok(redirect_notice(&back, "Bookmark added")),
    Ok(false) => Ok(redirect_notice(&back, "Bookmark removed")),
    Err(e) => {
      tracing::error!("Error toggling bookmark: {}", e);
      Ok(redirect_error(&back, "Failed to update bookmark"))
    }
  }
}

/// POST /problems/{id}/rating
pub async fn rate_problem(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(problem_id): Path<i64>,
  Form(form): Form<RatingForm>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(back) = problem_home(&conn, problem_id)? else {
    return Ok(redirect_error("/", "Problem not found"));
  };
  let Some(rating) = Difficulty::from_str(&form.rating) else {
    return Ok(redirect_error(&back, "Unknown difficulty"));
  };

  match db::rate_problem(&conn, auth.user_id, problem_id, rating) {
    Ok(()) => Ok(redirect_notice(&back, &format!("Rated as {}", rating.label()))),
    Err(e) => {
      tracing::error!("Error rating question: {}", e);
      Ok(redirect_error(&back, "Failed to save rating"))
    }
  }
}

/// POST /problems/{id}/note
pub async fn save_note(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(problem_id): Path<i64>,
  Form(form): Form<NoteForm>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(back) = problem_home(&conn, problem_id)? else {
    return Ok(redirect_error("/", "Problem not found"));
  };

  match db::save_note(&conn, auth.user_id, problem_id, &form.content) {
    Ok(()) => Ok(redirect_notice(&back, "Note saved")),
    Err(e) => {
      tracing::error!("Error saving note: {}", e);
      Ok(redirect_error(&back, "Failed to save note"))
    }
  }
}
