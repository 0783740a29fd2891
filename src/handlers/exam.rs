//! Practice exam pages.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::Form as MultiForm;
use serde::Deserialize;

use super::{redirect_error, redirect_notice, Flash, PageContext};
use crate::auth::AuthContext;
use crate::db::{self, try_lock};
use crate::domain::Difficulty;
use crate::error::AppError;
use crate::exam;
use crate::filters;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateExamForm {
  /// Repeated `difficulty` keys, one per checked box
  #[serde(default)]
  pub difficulty: Vec<String>,
}

#[derive(Deserialize)]
pub struct ExamRatingForm {
  pub problem_id: i64,
  pub rating: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExamQuery {
  #[serde(default)]
  pub welcome: bool,
}

pub struct ExamProblemView {
  pub number: usize,
  pub id: i64,
  pub content: String,
  pub rating: Option<&'static str>,
}

impl ExamProblemView {
  pub fn is_rated(&self, value: &str) -> bool {
    self.rating == Some(value)
  }
}

#[derive(Template)]
#[template(path = "exam.html")]
pub struct ExamTemplate {
  pub page: PageContext,
  pub exam_id: String,
  pub problems: Vec<ExamProblemView>,
  pub welcome: Option<String>,
  pub difficulties: Vec<(&'static str, &'static str)>,
}

fn selected_difficulties(values: &[String]) -> Vec<Difficulty> {
  values.iter().filter_map(|v| Difficulty::from_str(v)).collect()
}

/// POST /exam - Generate an exam from the user's rated problems
pub async fn generate(
  State(state): State<AppState>,
  auth: AuthContext,
  MultiForm(form): MultiForm<GenerateExamForm>,
) -> Result<Redirect, AppError> {
  let selected = selected_difficulties(&form.difficulty);

  let ratings = {
    let conn = try_lock(&state.db)?;
    db::rated_problems(&conn, auth.user_id)?
  };

  match exam::generate_exam(auth.user_id, &ratings, &selected) {
    Ok(exam) => {
      tracing::info!(
        "Generated exam {} with {} problems for {}",
        exam.id,
        exam.problem_ids.len(),
        auth.username
      );
      Ok(Redirect::to(&format!("/exam/{}?welcome=true", exam.id)))
    }
    Err(e) => Ok(redirect_error("/", &e.to_string())),
  }
}

/// GET /exam/{id}
pub async fn show(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(exam_id): Path<String>,
  Query(query): Query<ExamQuery>,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let Some(exam) = exam::get_exam(&exam_id, auth.user_id) else {
    return Ok(redirect_error("/", "Exam not found or expired").into_response());
  };

  let conn = try_lock(&state.db)?;
  let found = db::get_problems_by_ids(&conn, &exam.problem_ids)?;

  // Keep the exam's order; skip problems deleted since generation
  let mut problems = Vec::with_capacity(exam.problem_ids.len());
  for id in &exam.problem_ids {
    let Some(problem) = found.iter().find(|p| p.id == *id) else {
      continue;
    };
    problems.push(ExamProblemView {
      number: problems.len() + 1,
      id: problem.id,
      content: problem.content.clone(),
      rating: db::get_rating(&conn, auth.user_id, problem.id)?.map(|d| d.as_str()),
    });
  }
  drop(conn);

  let welcome = query
    .welcome
    .then(|| format!("Your exam has {} problems. Good luck!", problems.len()));

  let template = ExamTemplate {
    page: PageContext::new(&auth, flash),
    exam_id: exam.id,
    problems,
    welcome,
    difficulties: Difficulty::ALL.iter().map(|d| (d.as_str(), d.label())).collect(),
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /exam/{id}/rating - Rate one exam problem and jump back to it
pub async fn rate(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(exam_id): Path<String>,
  Form(form): Form<ExamRatingForm>,
) -> Result<Redirect, AppError> {
  let Some(exam) = exam::get_exam(&exam_id, auth.user_id) else {
    return Ok(redirect_error("/", "Exam not found or expired"));
  };
  let back = format!("/exam/{}#problem-{}", exam.id, form.problem_id);

  if !exam.problem_ids.contains(&form.problem_id) {
    return Ok(redirect_error(&back, "Problem is not part of this exam"));
  }
  let Some(rating) = Difficulty::from_str(&form.rating) else {
    return Ok(redirect_error(&back, "Unknown difficulty"));
  };

  let conn = try_lock(&state.db)?;
  match db::rate_problem(&conn, auth.user_id, form.problem_id, rating) {
    Ok(()) => Ok(redirect_notice(&back, &format!("Rated as {}", rating.label()))),
    Err(e) => {
      tracing::error!("Error updating rating: {}", e);
      Ok(redirect_error(&back, "Failed to save rating"))
    }
  }
}
