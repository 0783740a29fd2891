//! Course and topic management.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use super::parse_optional_id;
use crate::auth::AdminContext;
use crate::db::{self, try_lock};
use crate::domain::problem::{format_date, preview};
use crate::domain::{Course, Topic};
use crate::error::AppError;
use crate::filters;
use crate::handlers::{parse_id_list, redirect_error, redirect_notice, Flash, PageContext};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CoursesQuery {
  pub course: Option<i64>,
  #[serde(default)]
  pub q: String,
}

#[derive(Template)]
#[template(path = "admin/courses.html")]
pub struct CoursesTemplate {
  pub page: PageContext,
  pub courses: Vec<Course>,
  pub selected: Option<Course>,
  pub topics: Vec<Topic>,
  pub query: String,
}

#[derive(Deserialize)]
pub struct CourseForm {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
}

#[derive(Deserialize)]
pub struct TopicForm {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub course_id: String,
  /// Only used on update; blank keeps the current order
  #[serde(default)]
  pub sort_order: String,
}

#[derive(Deserialize)]
pub struct DeleteTopicForm {
  #[serde(default)]
  pub confirmation: String,
}

#[derive(Deserialize)]
pub struct SortForm {
  /// Comma-separated topic ids in their new order
  #[serde(default)]
  pub order: String,
}

pub struct TopicProblemView {
  pub id: i64,
  pub date: Option<String>,
  pub preview: String,
  pub topic_names: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin/topic.html")]
pub struct TopicDetailsTemplate {
  pub page: PageContext,
  pub topic: Topic,
  pub course: Option<Course>,
  pub problems: Vec<TopicProblemView>,
}

#[derive(Template)]
#[template(path = "admin/sort.html")]
pub struct SortTemplate {
  pub page: PageContext,
  pub course: Course,
  pub topics: Vec<Topic>,
}

fn course_url(course_id: i64) -> String {
  format!("/admin/courses?course={}", course_id)
}

/// GET /admin/courses - Courses with the selected course's topics
pub async fn topics_page(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Query(query): Query<CoursesQuery>,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let conn = try_lock(&state.db)?;
  let courses = db::list_courses(&conn)?;

  // First course is selected when none is given
  let selected = match query.course {
    Some(id) => courses.iter().find(|c| c.id == id).cloned(),
    None => courses.first().cloned(),
  };
  let topics = match &selected {
    Some(course) => db::list_topics(&conn, Some(course.id))?
      .into_iter()
      .filter(|t| t.matches(&query.q))
      .collect(),
    None => Vec::new(),
  };
  drop(conn);

  let template = CoursesTemplate {
    page: PageContext::new(&auth, flash),
    courses,
    selected,
    topics,
    query: query.q,
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /admin/courses
pub async fn create_course(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Form(form): Form<CourseForm>,
) -> Result<Redirect, AppError> {
  let name = form.name.trim();
  if name.is_empty() {
    return Ok(redirect_error("/admin/courses", "Course name is required"));
  }

  let conn = try_lock(&state.db)?;
  let id = db::create_course(&conn, name, form.description.trim())?;
  tracing::info!("{} created course {} ({})", auth.username, name, id);
  Ok(redirect_notice(&course_url(id), "Course created"))
}

/// POST /admin/courses/{id}
pub async fn update_course(
  State(state): State<AppState>,
  AdminContext(_auth): AdminContext,
  Path(course_id): Path<i64>,
  Form(form): Form<CourseForm>,
) -> Result<Redirect, AppError> {
  let back = course_url(course_id);
  let name = form.name.trim();
  if name.is_empty() {
    return Ok(redirect_error(&back, "Course name is required"));
  }

  let conn = try_lock(&state.db)?;
  if db::update_course(&conn, course_id, name, form.description.trim())? {
    Ok(redirect_notice(&back, "Course updated"))
  } else {
    Ok(redirect_error("/admin/courses", "Course not found"))
  }
}

/// POST /admin/topics
pub async fn create_topic(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Form(form): Form<TopicForm>,
) -> Result<Redirect, AppError> {
  let name = form.name.trim();
  let Some(course_id) = parse_optional_id(&form.course_id).filter(|_| !name.is_empty()) else {
    return Ok(redirect_error(
      "/admin/courses",
      "Topic name and course selection are required",
    ));
  };

  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, course_id)?.is_none() {
    return Ok(redirect_error("/admin/courses", "Course not found"));
  }
  let id = db::create_topic(&conn, course_id, name, form.description.trim())?;
  tracing::info!("{} created topic {} ({}) in course {}", auth.username, name, id, course_id);
  Ok(redirect_notice(&course_url(course_id), "Topic created"))
}

/// POST /admin/topics/{id}
pub async fn update_topic(
  State(state): State<AppState>,
  AdminContext(_auth): AdminContext,
  Path(topic_id): Path<i64>,
  Form(form): Form<TopicForm>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(topic) = db::get_topic(&conn, topic_id)? else {
    return Ok(redirect_error("/admin/courses", "Topic not found"));
  };

  let name = form.name.trim();
  let course_id = parse_optional_id(&form.course_id).or(topic.course_id);
  let back = course_id.map_or_else(|| "/admin/courses".to_string(), course_url);
  if name.is_empty() {
    return Ok(redirect_error(&back, "Topic name is required"));
  }
  let sort_order = form.sort_order.trim().parse().unwrap_or(topic.sort_order);

  db::update_topic(&conn, topic_id, name, form.description.trim(), course_id, sort_order)?;
  Ok(redirect_notice(&back, "Topic updated"))
}

/// GET /admin/topics/{id} - Problems linked to a topic
pub async fn topic_details(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(topic_id): Path<i64>,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(topic) = db::get_topic(&conn, topic_id)? else {
    return Ok(redirect_error("/admin/courses", "Topic not found").into_response());
  };
  let course = match topic.course_id {
    Some(id) => db::get_course(&conn, id)?,
    None => None,
  };
  let problems = db::topic_problems(&conn, topic_id)?
    .into_iter()
    .map(|tp| TopicProblemView {
      id: tp.problem.id,
      date: tp.problem.publish_date.map(format_date),
      preview: preview(&tp.problem.content, 160),
      topic_names: tp.topic_names,
    })
    .collect();
  drop(conn);

  let template = TopicDetailsTemplate {
    page: PageContext::new(&auth, flash),
    topic,
    course,
    problems,
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /admin/topics/{id}/delete - Requires typing the topic name
pub async fn delete_topic(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(topic_id): Path<i64>,
  Form(form): Form<DeleteTopicForm>,
) -> Result<Redirect, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(topic) = db::get_topic(&conn, topic_id)? else {
    return Ok(redirect_error("/admin/courses", "Topic not found"));
  };
  let back = topic.course_id.map_or_else(|| "/admin/courses".to_string(), course_url);

  if form.confirmation.trim() != topic.name {
    return Ok(redirect_error(
      &format!("/admin/topics/{}", topic_id),
      "Confirmation does not match the topic name",
    ));
  }

  db::delete_topic(&conn, topic_id)?;
  tracing::info!("{} deleted topic {} ({})", auth.username, topic.name, topic_id);
  Ok(redirect_notice(&back, "Topic deleted"))
}

/// GET /admin/courses/{id}/sort
pub async fn sort_page(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(course_id): Path<i64>,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let conn = try_lock(&state.db)?;
  let Some(course) = db::get_course(&conn, course_id)? else {
    return Ok(redirect_error("/admin/courses", "Course not found").into_response());
  };
  let topics = db::list_topics(&conn, Some(course_id))?;
  drop(conn);

  let template = SortTemplate {
    page: PageContext::new(&auth, flash),
    course,
    topics,
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /admin/courses/{id}/sort
pub async fn sort_submit(
  State(state): State<AppState>,
  AdminContext(_auth): AdminContext,
  Path(course_id): Path<i64>,
  Form(form): Form<SortForm>,
) -> Result<Redirect, AppError> {
  let ids = parse_id_list(&form.order);
  if ids.is_empty() {
    return Ok(redirect_error(
      &format!("/admin/courses/{}/sort", course_id),
      "No topics to sort",
    ));
  }

  let conn = try_lock(&state.db)?;
  let updated = db::sort_topics(&conn, course_id, &ids)?;
  tracing::debug!("Sorted {} topics in course {}", updated, course_id);
  Ok(redirect_notice(&course_url(course_id), "Topic order saved"))
}
