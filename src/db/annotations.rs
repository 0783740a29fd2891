//! Per-user bookmarks, ratings and notes.
//!
//! Each table holds at most one row per (owner, problem); writes are upserts.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Result};
use std::collections::HashMap;

use super::{optional, parse_timestamp};
use crate::domain::problem::{format_date, parse_date};
use crate::domain::{Bookmark, Difficulty, Note, Rating};

// ==================== Bookmarks ====================

pub fn list_bookmarks(conn: &Connection, owner: i64) -> Result<Vec<Bookmark>> {
  let mut stmt = conn.prepare(
    "SELECT id, owner, problem_id, date FROM bookmarks WHERE owner = ?1 ORDER BY date DESC, id DESC",
  )?;
  let bookmarks = stmt
    .query_map(params![owner], |row| {
      let date: String = row.get(3)?;
      Ok(Bookmark {
        id: row.get(0)?,
        owner: row.get(1)?,
        problem_id: row.get(2)?,
        date: parse_date(&date).unwrap_or_else(|| Utc::now().date_naive()),
      })
    })?
    .filter_map(|r| r.ok())
    .collect();
  Ok(bookmarks)
}

/// The user's bookmarks keyed by the bookmarked problem's publish date
pub fn bookmarks_by_date(conn: &Connection, owner: i64) -> Result<HashMap<NaiveDate, Bookmark>> {
  let mut stmt = conn.prepare(
    r#"SELECT b.id, b.owner, b.problem_id, b.date, p.publish_date
       FROM bookmarks b
       JOIN problems p ON p.id = b.problem_id
       WHERE b.owner = ?1 AND p.publish_date IS NOT NULL"#,
  )?;
  let map = stmt
    .query_map(params![owner], |row| {
      let date: String = row.get(3)?;
      let publish_date: String = row.get(4)?;
      Ok((
        publish_date,
        Bookmark {
          id: row.get(0)?,
          owner: row.get(1)?,
          problem_id: row.get(2)?,
          date: parse_date(&date).unwrap_or_else(|| Utc::now().date_naive()),
        },
      ))
    })?
    .filter_map(|r| r.ok())
    .filter_map(|(publish_date, bookmark)| Some((parse_date(&publish_date)?, bookmark)))
    .collect();
  Ok(map)
}

pub fn is_bookmarked(conn: &Connection, owner: i64, problem_id: i64) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM bookmarks WHERE owner = ?1 AND problem_id = ?2",
    params![owner, problem_id],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

/// Remove the bookmark if present, otherwise create it.
/// Returns whether the problem is bookmarked afterwards.
pub fn toggle_bookmark(conn: &Connection, owner: i64, problem_id: i64) -> Result<bool> {
  let removed = conn.execute(
    "DELETE FROM bookmarks WHERE owner = ?1 AND problem_id = ?2",
    params![owner, problem_id],
  )?;
  if removed > 0 {
    return Ok(false);
  }

  // Bookmarks are dated by the problem's day, falling back to today
  let publish_date: Option<String> = optional(conn.query_row(
    "SELECT publish_date FROM problems WHERE id = ?1",
    params![problem_id],
    |row| row.get(0),
  ))?
  .flatten();
  let date = publish_date.unwrap_or_else(|| format_date(Utc::now().date_naive()));

  conn.execute(
    "INSERT INTO bookmarks (owner, problem_id, date) VALUES (?1, ?2, ?3)",
    params![owner, problem_id, date],
  )?;
  Ok(true)
}

// ==================== Ratings ====================

fn row_to_rating(row: &rusqlite::Row) -> Result<Option<Rating>> {
  let rating: String = row.get(3)?;
  let date: String = row.get(4)?;
  let Some(rating) = Difficulty::from_str(&rating) else {
    return Ok(None);
  };
  Ok(Some(Rating {
    id: row.get(0)?,
    owner: row.get(1)?,
    problem_id: row.get(2)?,
    rating,
    date: parse_timestamp(&date),
  }))
}

pub fn list_ratings(conn: &Connection, owner: i64) -> Result<Vec<Rating>> {
  let mut stmt = conn.prepare(
    "SELECT id, owner, problem_id, rating, date FROM ratings WHERE owner = ?1 ORDER BY date DESC",
  )?;
  let ratings = stmt
    .query_map(params![owner], row_to_rating)?
    .filter_map(|r| r.ok())
    .flatten()
    .collect();
  Ok(ratings)
}

/// Ratings keyed by the rated problem's publish date
pub fn ratings_by_date(conn: &Connection, owner: i64) -> Result<HashMap<NaiveDate, Difficulty>> {
  let mut stmt = conn.prepare(
    r#"SELECT p.publish_date, r.rating
       FROM ratings r
       JOIN problems p ON p.id = r.problem_id
       WHERE r.owner = ?1 AND p.publish_date IS NOT NULL"#,
  )?;
  let map = stmt
    .query_map(params![owner], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .filter_map(|r| r.ok())
    .filter_map(|(date, rating)| Some((parse_date(&date)?, Difficulty::from_str(&rating)?)))
    .collect();
  Ok(map)
}

/// (problem id, difficulty) for every problem the user has rated
pub fn rated_problems(conn: &Connection, owner: i64) -> Result<Vec<(i64, Difficulty)>> {
  Ok(
    list_ratings(conn, owner)?
      .into_iter()
      .map(|r| (r.problem_id, r.rating))
      .collect(),
  )
}

pub fn get_rating(conn: &Connection, owner: i64, problem_id: i64) -> Result<Option<Difficulty>> {
  let rating: Option<String> = optional(conn.query_row(
    "SELECT rating FROM ratings WHERE owner = ?1 AND problem_id = ?2",
    params![owner, problem_id],
    |row| row.get(0),
  ))?;
  Ok(rating.as_deref().and_then(Difficulty::from_str))
}

/// Set the user's rating; re-rating overwrites the value and its date
pub fn rate_problem(
  conn: &Connection,
  owner: i64,
  problem_id: i64,
  rating: Difficulty,
) -> Result<()> {
  conn.execute(
    r#"INSERT INTO ratings (owner, problem_id, rating, date) VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (owner, problem_id) DO UPDATE SET rating = excluded.rating, date = excluded.date"#,
    params![owner, problem_id, rating.as_str(), Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

// ==================== Notes ====================

fn row_to_note(row: &rusqlite::Row) -> Result<Note> {
  let created_at: String = row.get(4)?;
  let updated_at: String = row.get(5)?;
  Ok(Note {
    id: row.get(0)?,
    owner: row.get(1)?,
    problem_id: row.get(2)?,
    content: row.get(3)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

pub fn list_notes(conn: &Connection, owner: i64) -> Result<Vec<Note>> {
  let mut stmt = conn.prepare(
    "SELECT id, owner, problem_id, content, created_at, updated_at
     FROM notes WHERE owner = ?1 ORDER BY updated_at DESC",
  )?;
  let notes = stmt
    .query_map(params![owner], row_to_note)?
    .filter_map(|r| r.ok())
    .collect();
  Ok(notes)
}

pub fn get_note(conn: &Connection, owner: i64, problem_id: i64) -> Result<Option<Note>> {
  optional(conn.query_row(
    "SELECT id, owner, problem_id, content, created_at, updated_at
     FROM notes WHERE owner = ?1 AND problem_id = ?2",
    params![owner, problem_id],
    row_to_note,
  ))
}

/// Note text for the problem, or an empty string
pub fn note_content(conn: &Connection, owner: i64, problem_id: i64) -> Result<String> {
  Ok(get_note(conn, owner, problem_id)?.map(|n| n.content).unwrap_or_default())
}

pub fn save_note(conn: &Connection, owner: i64, problem_id: i64, content: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    r#"INSERT INTO notes (owner, problem_id, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)
       ON CONFLICT (owner, problem_id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at"#,
    params![owner, problem_id, content, now],
  )?;
  Ok(())
}
