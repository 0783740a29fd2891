use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Result};
use std::collections::BTreeSet;

use super::{optional, parse_timestamp};
use crate::domain::problem::{format_date, parse_date};
use crate::domain::{Difficulty, Problem, ProblemDraft};

const PROBLEM_COLUMNS: &str =
  "id, content, publish_date, hint, tags, w_solution, v_solution, created_at, updated_at";

pub(crate) fn row_to_problem(row: &rusqlite::Row) -> Result<Problem> {
  let publish_date: Option<String> = row.get(2)?;
  let tags_json: String = row.get(4)?;
  let created_at: String = row.get(7)?;
  let updated_at: String = row.get(8)?;

  Ok(Problem {
    id: row.get(0)?,
    content: row.get(1)?,
    publish_date: publish_date.as_deref().and_then(parse_date),
    hint: row.get(3)?,
    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
    w_solution: row.get(5)?,
    v_solution: row.get(6)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

fn tags_to_json(tags: &[String]) -> String {
  serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Every date that has a published problem, ascending
pub fn list_problem_dates(conn: &Connection) -> Result<Vec<NaiveDate>> {
  let mut stmt = conn.prepare(
    "SELECT publish_date FROM problems WHERE publish_date IS NOT NULL ORDER BY publish_date",
  )?;
  let dates = stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .filter_map(|r| r.ok())
    .filter_map(|s| parse_date(&s))
    .collect();
  Ok(dates)
}

pub fn get_problem(conn: &Connection, id: i64) -> Result<Option<Problem>> {
  optional(conn.query_row(
    &format!("SELECT {} FROM problems WHERE id = ?1", PROBLEM_COLUMNS),
    params![id],
    row_to_problem,
  ))
}

/// The problem of the day for `date`, if any
pub fn get_problem_by_date(conn: &Connection, date: NaiveDate) -> Result<Option<Problem>> {
  optional(conn.query_row(
    &format!("SELECT {} FROM problems WHERE publish_date = ?1", PROBLEM_COLUMNS),
    params![format_date(date)],
    row_to_problem,
  ))
}

/// Problems for the given ids, in the order of `ids`; unknown ids are skipped
pub fn get_problems_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Problem>> {
  let mut problems = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(problem) = get_problem(conn, *id)? {
      problems.push(problem);
    }
  }
  Ok(problems)
}

pub fn create_problem(conn: &Connection, draft: &ProblemDraft) -> Result<i64> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO problems (content, publish_date, hint, tags, w_solution, v_solution, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    params![
      draft.content,
      draft.publish_date.map(format_date),
      draft.hint,
      tags_to_json(&draft.tags),
      draft.w_solution,
      draft.v_solution,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn update_problem(conn: &Connection, id: i64, draft: &ProblemDraft) -> Result<()> {
  conn.execute(
    "UPDATE problems
     SET content = ?1, publish_date = ?2, hint = ?3, tags = ?4, w_solution = ?5, v_solution = ?6, updated_at = ?7
     WHERE id = ?8",
    params![
      draft.content,
      draft.publish_date.map(format_date),
      draft.hint,
      tags_to_json(&draft.tags),
      draft.w_solution,
      draft.v_solution,
      Utc::now().to_rfc3339(),
      id,
    ],
  )?;
  Ok(())
}

/// Remove a problem together with its topic links and every user's annotations
pub fn delete_problem(conn: &Connection, id: i64) -> Result<bool> {
  let tx = conn.unchecked_transaction()?;
  tx.execute("DELETE FROM problem_topics WHERE problem_id = ?1", params![id])?;
  tx.execute("DELETE FROM notes WHERE problem_id = ?1", params![id])?;
  tx.execute("DELETE FROM bookmarks WHERE problem_id = ?1", params![id])?;
  tx.execute("DELETE FROM ratings WHERE problem_id = ?1", params![id])?;
  let deleted = tx.execute("DELETE FROM problems WHERE id = ?1", params![id])?;
  tx.commit()?;
  Ok(deleted > 0)
}

pub fn get_problem_topic_ids(conn: &Connection, problem_id: i64) -> Result<Vec<i64>> {
  let mut stmt =
    conn.prepare("SELECT topic_id FROM problem_topics WHERE problem_id = ?1 ORDER BY topic_id")?;
  let ids = stmt
    .query_map(params![problem_id], |row| row.get(0))?
    .filter_map(|r| r.ok())
    .collect();
  Ok(ids)
}

/// Names of the topics linked to a problem, in topic order
pub fn get_problem_topic_names(conn: &Connection, problem_id: i64) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    r#"SELECT t.name
       FROM problem_topics pt
       JOIN topics t ON t.id = pt.topic_id
       WHERE pt.problem_id = ?1
       ORDER BY COALESCE(t.sort_order, 1000), t.name"#,
  )?;
  let names = stmt
    .query_map(params![problem_id], |row| row.get(0))?
    .filter_map(|r| r.ok())
    .collect();
  Ok(names)
}

/// Make the problem's topic links equal `topic_ids`.
/// Only deselected links are deleted and only new ones inserted.
/// Returns (added, removed).
pub fn set_problem_topics(
  conn: &Connection,
  problem_id: i64,
  topic_ids: &[i64],
) -> Result<(usize, usize)> {
  let current: BTreeSet<i64> = get_problem_topic_ids(conn, problem_id)?.into_iter().collect();
  let wanted: BTreeSet<i64> = topic_ids.iter().copied().collect();

  let mut removed = 0;
  for topic_id in current.difference(&wanted) {
    removed += conn.execute(
      "DELETE FROM problem_topics WHERE problem_id = ?1 AND topic_id = ?2",
      params![problem_id, topic_id],
    )?;
  }

  let mut added = 0;
  for topic_id in wanted.difference(&current) {
    added += conn.execute(
      "INSERT OR IGNORE INTO problem_topics (problem_id, topic_id) VALUES (?1, ?2)",
      params![problem_id, topic_id],
    )?;
  }

  Ok((added, removed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
  Created(i64),
  Updated(i64),
}

impl SaveOutcome {
  pub fn id(&self) -> i64 {
    match self {
      Self::Created(id) | Self::Updated(id) => *id,
    }
  }
}

/// Create or update the problem for the draft's publish date and sync its topics
pub fn save_problem_for_date(
  conn: &Connection,
  draft: &ProblemDraft,
  topic_ids: &[i64],
) -> Result<SaveOutcome> {
  let tx = conn.unchecked_transaction()?;

  let existing = match draft.publish_date {
    Some(date) => get_problem_by_date(&tx, date)?,
    None => None,
  };

  let outcome = match existing {
    Some(problem) => {
      update_problem(&tx, problem.id, draft)?;
      SaveOutcome::Updated(problem.id)
    }
    None => SaveOutcome::Created(create_problem(&tx, draft)?),
  };
  set_problem_topics(&tx, outcome.id(), topic_ids)?;

  tx.commit()?;
  Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
  Moved,
  /// Another problem already holds the target date
  DateTaken(i64),
  NotFound,
}

/// Reschedule a problem to `new_date`, refusing to double-book a day
pub fn move_problem(conn: &Connection, problem_id: i64, new_date: NaiveDate) -> Result<MoveOutcome> {
  if get_problem(conn, problem_id)?.is_none() {
    return Ok(MoveOutcome::NotFound);
  }
  if let Some(other) = get_problem_by_date(conn, new_date)? {
    if other.id != problem_id {
      return Ok(MoveOutcome::DateTaken(other.id));
    }
    return Ok(MoveOutcome::Moved);
  }

  conn.execute(
    "UPDATE problems SET publish_date = ?1, updated_at = ?2 WHERE id = ?3",
    params![format_date(new_date), Utc::now().to_rfc3339(), problem_id],
  )?;
  Ok(MoveOutcome::Moved)
}

/// Problem card on the admin scheduling calendar
#[derive(Debug, Clone)]
pub struct ScheduleProblem {
  pub problem: Problem,
  pub topic_names: Vec<String>,
  /// The viewing admin's own rating
  pub rating: Option<Difficulty>,
}

pub fn list_schedule_problems(conn: &Connection, owner: i64) -> Result<Vec<ScheduleProblem>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM problems ORDER BY publish_date IS NULL, publish_date, id",
    PROBLEM_COLUMNS
  ))?;
  let problems: Vec<Problem> = stmt
    .query_map([], row_to_problem)?
    .filter_map(|r| r.ok())
    .collect();

  let mut out = Vec::with_capacity(problems.len());
  for problem in problems {
    let topic_names = get_problem_topic_names(conn, problem.id)?;
    let rating = super::get_rating(conn, owner, problem.id)?;
    out.push(ScheduleProblem {
      problem,
      topic_names,
      rating,
    });
  }
  Ok(out)
}
