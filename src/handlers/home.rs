//! Problem of the day: calendar, selected problem, and the user's annotations.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::{Flash, PageContext};
use crate::auth::AuthContext;
use crate::calendar;
use crate::db::{self, try_lock, LogOnError};
use crate::domain::problem::{format_date, parse_date};
use crate::domain::{Bookmark, Difficulty, Problem};
use crate::error::AppError;
use crate::filters;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
  pub date: Option<String>,
  pub month: Option<String>,
}

/// One cell of the learner calendar
pub struct DayCell {
  pub day: u32,
  pub date: String,
  pub in_month: bool,
  pub is_selected: bool,
  pub is_today: bool,
  pub is_future: bool,
  pub has_problem: bool,
  pub is_bookmarked: bool,
  /// "easy" / "medium" / "hard"
  pub rating: Option<&'static str>,
}

pub struct ProblemView {
  pub id: i64,
  pub content: String,
  pub hint: Option<String>,
  pub tags: Vec<String>,
  pub w_solution: Option<String>,
  pub v_solution: Option<String>,
  pub is_bookmarked: bool,
  pub rating: Option<&'static str>,
  pub note: String,
}

impl ProblemView {
  pub fn is_rated(&self, value: &str) -> bool {
    self.rating == Some(value)
  }
}

pub struct DifficultyCount {
  pub value: &'static str,
  pub label: &'static str,
  pub count: usize,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
  pub page: PageContext,
  pub month_title: String,
  pub prev_month: String,
  pub next_month: String,
  /// Next month starts after today; the button is disabled
  pub next_month_disabled: bool,
  pub weeks: Vec<Vec<DayCell>>,
  pub selected_date: String,
  pub selected_label: String,
  pub problem: Option<ProblemView>,
  pub difficulty_counts: Vec<DifficultyCount>,
  pub rated_total: usize,
  pub difficulties: Vec<(&'static str, &'static str)>,
}

/// Build the calendar grid with per-day problem, bookmark and rating flags
pub fn build_weeks(
  month: NaiveDate,
  today: NaiveDate,
  selected: NaiveDate,
  problem_dates: &HashSet<NaiveDate>,
  bookmarks: &HashMap<NaiveDate, Bookmark>,
  ratings: &HashMap<NaiveDate, Difficulty>,
) -> Vec<Vec<DayCell>> {
  calendar::month_grid(month, today)
    .into_iter()
    .map(|week| {
      week
        .into_iter()
        .map(|day| DayCell {
          day: day.date.day(),
          date: format_date(day.date),
          in_month: day.in_month,
          is_selected: day.date == selected,
          is_today: day.is_today,
          is_future: day.is_future,
          has_problem: problem_dates.contains(&day.date),
          is_bookmarked: bookmarks.contains_key(&day.date),
          rating: ratings.get(&day.date).map(|d| d.as_str()),
        })
        .collect()
    })
    .collect()
}

/// Selected day from the query; missing, malformed or future dates fall back to today
pub fn resolve_selected(date: Option<&str>, today: NaiveDate) -> NaiveDate {
  date
    .and_then(parse_date)
    .filter(|d| *d <= today)
    .unwrap_or(today)
}

fn problem_view(
  conn: &rusqlite::Connection,
  owner: i64,
  problem: Problem,
) -> Result<ProblemView, rusqlite::Error> {
  Ok(ProblemView {
    is_bookmarked: db::is_bookmarked(conn, owner, problem.id)?,
    rating: db::get_rating(conn, owner, problem.id)?.map(|d| d.as_str()),
    note: db::note_content(conn, owner, problem.id)?,
    id: problem.id,
    content: problem.content,
    hint: problem.hint.filter(|h| !h.trim().is_empty()),
    tags: problem.tags,
    w_solution: problem.w_solution.filter(|s| !s.trim().is_empty()),
    v_solution: problem.v_solution.filter(|s| !s.trim().is_empty()),
  })
}

/// GET / - Calendar and problem of the day
pub async fn index(
  State(state): State<AppState>,
  auth: AuthContext,
  Query(query): Query<HomeQuery>,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let today = Local::now().date_naive();
  let selected = resolve_selected(query.date.as_deref(), today);
  let month = query
    .month
    .as_deref()
    .and_then(calendar::parse_month)
    .unwrap_or_else(|| calendar::month_start(selected));

  let conn = try_lock(&state.db)?;

  let problem_dates: HashSet<NaiveDate> = db::list_problem_dates(&conn)
    .log_warn_default("Failed to list problem dates")
    .into_iter()
    .collect();
  let bookmarks = db::bookmarks_by_date(&conn, auth.user_id).log_warn_default("Failed to list bookmarks");
  let ratings = db::ratings_by_date(&conn, auth.user_id).log_warn_default("Failed to list ratings");

  let problem = match db::get_problem_by_date(&conn, selected)? {
    Some(problem) => Some(problem_view(&conn, auth.user_id, problem)?),
    None => None,
  };

  let rated = db::rated_problems(&conn, auth.user_id).log_warn_default("Failed to list ratings");
  drop(conn);

  let difficulty_counts = Difficulty::ALL
    .iter()
    .map(|d| DifficultyCount {
      value: d.as_str(),
      label: d.label(),
      count: rated.iter().filter(|(_, r)| r == d).count(),
    })
    .collect();

  let template = IndexTemplate {
    page: PageContext::new(&auth, flash),
    month_title: calendar::month_title(month),
    prev_month: calendar::format_month(calendar::prev_month(month)),
    next_month: calendar::format_month(calendar::next_month(month)),
    next_month_disabled: calendar::next_month(month) > today,
    weeks: build_weeks(month, today, selected, &problem_dates, &bookmarks, &ratings),
    selected_date: format_date(selected),
    selected_label: selected.format("%A, %B %-d, %Y").to_string(),
    problem,
    difficulty_counts,
    rated_total: rated.len(),
    difficulties: Difficulty::ALL.iter().map(|d| (d.as_str(), d.label())).collect(),
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
  }

  #[test]
  fn test_resolve_selected_defaults_and_clamps() {
    let today = date("2024-03-15");
    assert_eq!(resolve_selected(None, today), today);
    assert_eq!(resolve_selected(Some("garbage"), today), today);
    assert_eq!(resolve_selected(Some("2024-03-20"), today), today);
    assert_eq!(resolve_selected(Some("2024-03-02"), today), date("2024-03-02"));
  }

  #[test]
  fn test_build_weeks_marks_annotations() {
    let today = date("2024-03-15");
    let problems: HashSet<_> = [date("2024-03-01"), date("2024-03-02")].into();
    let bookmark = Bookmark { id: 1, owner: 1, problem_id: 2, date: date("2024-03-02") };
    let bookmarks: HashMap<_, _> = [(date("2024-03-02"), bookmark)].into();
    let ratings: HashMap<_, _> = [(date("2024-03-01"), Difficulty::Hard)].into();

    let weeks = build_weeks(date("2024-03-01"), today, date("2024-03-01"), &problems, &bookmarks, &ratings);
    let cells: Vec<_> = weeks.iter().flatten().collect();

    let first = cells.iter().find(|c| c.date == "2024-03-01").unwrap();
    assert!(first.is_selected && first.has_problem && !first.is_bookmarked);
    assert_eq!(first.rating, Some("hard"));

    let second = cells.iter().find(|c| c.date == "2024-03-02").unwrap();
    assert!(second.is_bookmarked);
    assert_eq!(second.rating, None);

    assert!(cells.iter().find(|c| c.date == "2024-03-16").unwrap().is_future);
  }
}
