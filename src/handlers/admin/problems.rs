//! Problem authoring, keyed by publish date.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::Form as MultiForm;
use chrono::Local;
use serde::Deserialize;

use crate::auth::AdminContext;
use crate::db::{self, try_lock, SaveOutcome};
use crate::domain::problem::{format_date, parse_date, parse_tags};
use crate::domain::{Course, ProblemDraft};
use crate::error::AppError;
use crate::filters;
use crate::handlers::{redirect_error, redirect_notice, Flash, PageContext};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProblemFormQuery {
  pub date: Option<String>,
  pub course: Option<i64>,
}

#[derive(Deserialize)]
pub struct ProblemForm {
  #[serde(default)]
  pub date: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub hint: String,
  /// Comma-separated
  #[serde(default)]
  pub tags: String,
  #[serde(default)]
  pub w_solution: String,
  #[serde(default)]
  pub v_solution: String,
  /// One `topic_ids` key per checked topic
  #[serde(default)]
  pub topic_ids: Vec<i64>,
}

pub struct TopicOption {
  pub id: i64,
  pub name: String,
  pub course_name: String,
  pub checked: bool,
}

#[derive(Template)]
#[template(path = "admin/problem_form.html")]
pub struct ProblemFormTemplate {
  pub page: PageContext,
  pub date: String,
  pub problem_id: Option<i64>,
  pub content: String,
  pub hint: String,
  pub tags: String,
  pub w_solution: String,
  pub v_solution: String,
  pub courses: Vec<Course>,
  pub selected_course: Option<i64>,
  pub topics: Vec<TopicOption>,
}

impl ProblemFormTemplate {
  pub fn is_course_selected(&self, course_id: &i64) -> bool {
    self.selected_course == Some(*course_id)
  }
}

fn non_blank(value: &str) -> Option<String> {
  let trimmed = value.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl ProblemForm {
  fn to_draft(&self) -> Option<ProblemDraft> {
    let date = parse_date(&self.date)?;
    if self.content.trim().is_empty() {
      return None;
    }
    Some(ProblemDraft {
      content: self.content.trim().to_string(),
      publish_date: Some(date),
      hint: non_blank(&self.hint),
      tags: parse_tags(&self.tags),
      w_solution: non_blank(&self.w_solution),
      v_solution: non_blank(&self.v_solution),
    })
  }
}

/// GET /admin/problems/new?date=&course= - Blank form, or the existing problem for the date
pub async fn new_problem(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Query(query): Query<ProblemFormQuery>,
  Query(mut flash): Query<Flash>,
) -> Result<Response, AppError> {
  let date = query
    .date
    .as_deref()
    .and_then(parse_date)
    .unwrap_or_else(|| Local::now().date_naive());

  let conn = try_lock(&state.db)?;
  let existing = db::get_problem_by_date(&conn, date)?;
  let linked = match &existing {
    Some(problem) => db::get_problem_topic_ids(&conn, problem.id)?,
    None => Vec::new(),
  };
  let courses = db::list_courses(&conn)?;
  let all_topics = db::list_topics(&conn, None)?;
  drop(conn);

  // Filtered by course, but linked topics always stay visible
  let topics = all_topics
    .into_iter()
    .filter(|t| query.course.is_none() || t.course_id == query.course || linked.contains(&t.id))
    .map(|t| TopicOption {
      checked: linked.contains(&t.id),
      course_name: courses
        .iter()
        .find(|c| Some(c.id) == t.course_id)
        .map(|c| c.name.clone())
        .unwrap_or_default(),
      id: t.id,
      name: t.name,
    })
    .collect();

  if existing.is_some() && flash.notice.is_none() {
    flash.notice = Some("Existing problem loaded for this date".to_string());
  }

  let template = match existing {
    Some(problem) => ProblemFormTemplate {
      page: PageContext::new(&auth, flash),
      date: format_date(date),
      problem_id: Some(problem.id),
      content: problem.content,
      hint: problem.hint.unwrap_or_default(),
      tags: problem.tags.join(", "),
      w_solution: problem.w_solution.unwrap_or_default(),
      v_solution: problem.v_solution.unwrap_or_default(),
      courses,
      selected_course: query.course,
      topics,
    },
    None => ProblemFormTemplate {
      page: PageContext::new(&auth, flash),
      date: format_date(date),
      problem_id: None,
      content: String::new(),
      hint: String::new(),
      tags: String::new(),
      w_solution: String::new(),
      v_solution: String::new(),
      courses,
      selected_course: query.course,
      topics,
    },
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /admin/problems - Create or update the problem for the form's date
pub async fn save_problem(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  MultiForm(form): MultiForm<ProblemForm>,
) -> Result<Redirect, AppError> {
  let Some(draft) = form.to_draft() else {
    let back = match parse_date(&form.date) {
      Some(date) => format!("/admin/problems/new?date={}", format_date(date)),
      None => "/admin/problems/new".to_string(),
    };
    return Ok(redirect_error(&back, "Please fill in all required fields"));
  };
  let date = draft.publish_date.map(format_date).unwrap_or_default();
  let back = format!("/admin/problems/new?date={}", date);

  let conn = try_lock(&state.db)?;
  match db::save_problem_for_date(&conn, &draft, &form.topic_ids) {
    Ok(SaveOutcome::Created(id)) => {
      tracing::info!("{} created problem {} for {}", auth.username, id, date);
      Ok(redirect_notice(&back, "Problem created"))
    }
    Ok(SaveOutcome::Updated(id)) => {
      tracing::info!("{} updated problem {} for {}", auth.username, id, date);
      Ok(redirect_notice(&back, "Problem updated"))
    }
    Err(e) => {
      tracing::error!("Error saving problem: {}", e);
      Ok(redirect_error(&back, "Failed to save problem"))
    }
  }
}

/// POST /admin/problems/{id}/delete
pub async fn delete_problem(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(problem_id): Path<i64>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  if db::delete_problem(&conn, problem_id)? {
    tracing::info!("{} deleted problem {}", auth.username, problem_id);
    Ok(redirect_notice("/admin/schedule", "Problem deleted"))
  } else {
    Ok(redirect_error("/admin/schedule", "Problem not found"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form(date: &str, content: &str) -> ProblemForm {
    ProblemForm {
      date: date.into(),
      content: content.into(),
      hint: "  ".into(),
      tags: "limits, , series".into(),
      w_solution: "https://example.com/w".into(),
      v_solution: String::new(),
      topic_ids: vec![],
    }
  }

  #[test]
  fn test_draft_requires_date_and_content() {
    assert!(form("", "x").to_draft().is_none());
    assert!(form("2024-03-01", "   ").to_draft().is_none());
  }

  fn template(selected_course: Option<i64>) -> ProblemFormTemplate {
    ProblemFormTemplate {
      page: PageContext::default(),
      date: "2024-03-01".into(),
      problem_id: None,
      content: String::new(),
      hint: String::new(),
      tags: String::new(),
      w_solution: String::new(),
      v_solution: String::new(),
      courses: vec![],
      selected_course,
      topics: vec![],
    }
  }

  #[test]
  fn test_is_course_selected() {
    assert!(template(Some(2)).is_course_selected(&2));
    assert!(!template(Some(2)).is_course_selected(&3));
    assert!(!template(None).is_course_selected(&2));
  }

  #[test]
  fn test_draft_normalizes_optional_fields() {
    let draft = form("2024-03-01", "Find the limit").to_draft().unwrap();
    assert_eq!(draft.hint, None);
    assert_eq!(draft.tags, vec!["limits", "series"]);
    assert_eq!(draft.w_solution.as_deref(), Some("https://example.com/w"));
    assert_eq!(draft.v_solution, None);
  }
}
