//! Drag-and-drop scheduling calendar.
//!
//! The page lists every month that has a problem (plus the current month).
//! Moving a card calls `POST /api/problems/{id}/move`; the browser reverts
//! the card if the server rejects the move.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeMap;

use crate::auth::AdminContext;
use crate::calendar;
use crate::db::{self, try_lock, ScheduleProblem};
use crate::domain::problem::{format_date, preview};
use crate::error::AppError;
use crate::filters;
use crate::handlers::{Flash, PageContext};
use crate::state::AppState;

const PREVIEW_CHARS: usize = 90;

pub struct ScheduleCard {
  pub id: i64,
  pub preview: String,
  pub tags: Vec<String>,
  pub topic_names: Vec<String>,
  pub rating: Option<&'static str>,
}

pub struct ScheduleDay {
  pub day: u32,
  pub date: String,
  pub is_today: bool,
  pub problems: Vec<ScheduleCard>,
}

pub struct ScheduleMonth {
  pub title: String,
  pub key: String,
  /// Empty cells before the 1st (Sunday = 0)
  pub blanks: u32,
  pub days: Vec<ScheduleDay>,
}

#[derive(Template)]
#[template(path = "admin/schedule.html")]
pub struct ScheduleTemplate {
  pub page: PageContext,
  pub months: Vec<ScheduleMonth>,
  pub unscheduled: Vec<ScheduleCard>,
}

fn to_card(item: ScheduleProblem) -> ScheduleCard {
  ScheduleCard {
    id: item.problem.id,
    preview: preview(&item.problem.content, PREVIEW_CHARS),
    tags: item.problem.tags,
    topic_names: item.topic_names,
    rating: item.rating.map(|r| r.as_str()),
  }
}

/// Group problems into month slots
pub fn build_months(problems: Vec<ScheduleProblem>, today: NaiveDate) -> (Vec<ScheduleMonth>, Vec<ScheduleCard>) {
  let dates: Vec<NaiveDate> = problems.iter().filter_map(|p| p.problem.publish_date).collect();

  let mut by_date: BTreeMap<NaiveDate, Vec<ScheduleCard>> = BTreeMap::new();
  let mut unscheduled = Vec::new();
  for item in problems {
    match item.problem.publish_date {
      Some(date) => by_date.entry(date).or_default().push(to_card(item)),
      None => unscheduled.push(to_card(item)),
    }
  }

  let months = calendar::schedule_months(&dates, today)
    .into_iter()
    .map(|month| ScheduleMonth {
      title: calendar::month_title(month),
      key: calendar::format_month(month),
      blanks: calendar::leading_blanks(month),
      days: calendar::days_in_month(month)
        .into_iter()
        .map(|date| ScheduleDay {
          day: date.day(),
          date: format_date(date),
          is_today: date == today,
          problems: by_date.remove(&date).unwrap_or_default(),
        })
        .collect(),
    })
    .collect();

  (months, unscheduled)
}

/// GET /admin/schedule
pub async fn schedule_page(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let problems = {
    let conn = try_lock(&state.db)?;
    db::list_schedule_problems(&conn, auth.user_id)?
  };
  let (months, unscheduled) = build_months(problems, Local::now().date_naive());

  let template = ScheduleTemplate {
    page: PageContext::new(&auth, flash),
    months,
    unscheduled,
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}
