use chrono::Utc;
use rusqlite::{params, Connection, Result};

use super::optional;
use super::problems::{get_problem_topic_names, row_to_problem};
use crate::config::{TOPIC_DEFAULT_SORT_ORDER, TOPIC_SORT_STEP};
use crate::domain::{Course, Problem, Topic};

// ==================== Courses ====================

pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
  let mut stmt = conn.prepare("SELECT id, name, description FROM courses ORDER BY id")?;
  let courses = stmt
    .query_map([], |row| {
      Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
      })
    })?
    .filter_map(|r| r.ok())
    .collect();
  Ok(courses)
}

pub fn get_course(conn: &Connection, id: i64) -> Result<Option<Course>> {
  optional(conn.query_row(
    "SELECT id, name, description FROM courses WHERE id = ?1",
    params![id],
    |row| {
      Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
      })
    },
  ))
}

pub fn create_course(conn: &Connection, name: &str, description: &str) -> Result<i64> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO courses (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    params![name, description, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn update_course(conn: &Connection, id: i64, name: &str, description: &str) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE courses SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
    params![name, description, Utc::now().to_rfc3339(), id],
  )?;
  Ok(updated > 0)
}

// ==================== Topics ====================

const TOPIC_SELECT: &str = r#"
  SELECT t.id, t.name, t.description, t.course_id, COALESCE(t.sort_order, ?1) AS sort_key,
         (SELECT COUNT(*) FROM problem_topics pt WHERE pt.topic_id = t.id)
  FROM topics t"#;

fn row_to_topic(row: &rusqlite::Row) -> Result<Topic> {
  Ok(Topic {
    id: row.get(0)?,
    name: row.get(1)?,
    description: row.get(2)?,
    course_id: row.get(3)?,
    sort_order: row.get(4)?,
    problem_count: row.get(5)?,
  })
}

/// Topics ordered by sort order (unsorted ones last), optionally limited to a course
pub fn list_topics(conn: &Connection, course_id: Option<i64>) -> Result<Vec<Topic>> {
  let mut stmt = conn.prepare(&format!(
    "{} WHERE (?2 IS NULL OR t.course_id = ?2) ORDER BY sort_key, t.name",
    TOPIC_SELECT
  ))?;
  let topics = stmt
    .query_map(params![TOPIC_DEFAULT_SORT_ORDER, course_id], row_to_topic)?
    .filter_map(|r| r.ok())
    .collect();
  Ok(topics)
}

pub fn get_topic(conn: &Connection, id: i64) -> Result<Option<Topic>> {
  optional(conn.query_row(
    &format!("{} WHERE t.id = ?2", TOPIC_SELECT),
    params![TOPIC_DEFAULT_SORT_ORDER, id],
    row_to_topic,
  ))
}

/// Sort order for a new topic: one step past the course's current maximum
pub fn next_sort_order(conn: &Connection, course_id: i64) -> Result<i64> {
  let max: Option<i64> = conn.query_row(
    "SELECT MAX(sort_order) FROM topics WHERE course_id = ?1",
    params![course_id],
    |row| row.get(0),
  )?;
  Ok(max.map_or(TOPIC_SORT_STEP, |m| m + TOPIC_SORT_STEP))
}

pub fn create_topic(conn: &Connection, course_id: i64, name: &str, description: &str) -> Result<i64> {
  let sort_order = next_sort_order(conn, course_id)?;
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO topics (name, description, course_id, sort_order, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    params![name, description, course_id, sort_order, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn update_topic(
  conn: &Connection,
  id: i64,
  name: &str,
  description: &str,
  course_id: Option<i64>,
  sort_order: i64,
) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE topics SET name = ?1, description = ?2, course_id = ?3, sort_order = ?4, updated_at = ?5
     WHERE id = ?6",
    params![name, description, course_id, sort_order, Utc::now().to_rfc3339(), id],
  )?;
  Ok(updated > 0)
}

/// Delete a topic after removing every problem link that points at it
pub fn delete_topic(conn: &Connection, id: i64) -> Result<bool> {
  let tx = conn.unchecked_transaction()?;
  tx.execute("DELETE FROM problem_topics WHERE topic_id = ?1", params![id])?;
  let deleted = tx.execute("DELETE FROM topics WHERE id = ?1", params![id])?;
  tx.commit()?;
  Ok(deleted > 0)
}

/// Renumber a course's topics in the given order, starting at 1.
/// Ids that do not belong to the course are ignored.
pub fn sort_topics(conn: &Connection, course_id: i64, ordered_ids: &[i64]) -> Result<usize> {
  let tx = conn.unchecked_transaction()?;
  let now = Utc::now().to_rfc3339();
  let mut updated = 0;
  for (index, topic_id) in ordered_ids.iter().enumerate() {
    updated += tx.execute(
      "UPDATE topics SET sort_order = ?1, updated_at = ?2 WHERE id = ?3 AND course_id = ?4",
      params![index as i64 + 1, now, topic_id, course_id],
    )?;
  }
  tx.commit()?;
  Ok(updated)
}

/// A problem linked to a topic, with the names of all its topics
#[derive(Debug, Clone)]
pub struct TopicProblem {
  pub problem: Problem,
  pub topic_names: Vec<String>,
}

/// Problems linked to a topic, by publish date (undated first)
pub fn topic_problems(conn: &Connection, topic_id: i64) -> Result<Vec<TopicProblem>> {
  let mut stmt = conn.prepare(
    r#"SELECT p.id, p.content, p.publish_date, p.hint, p.tags, p.w_solution, p.v_solution,
              p.created_at, p.updated_at
       FROM problems p
       JOIN problem_topics pt ON pt.problem_id = p.id
       WHERE pt.topic_id = ?1
       ORDER BY p.publish_date IS NOT NULL, p.publish_date, p.id"#,
  )?;
  let problems: Vec<Problem> = stmt
    .query_map(params![topic_id], row_to_problem)?
    .filter_map(|r| r.ok())
    .collect();

  problems
    .into_iter()
    .map(|problem| {
      let topic_names = get_problem_topic_names(conn, problem.id)?;
      Ok(TopicProblem {
        problem,
        topic_names,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::set_problem_topics;
  use crate::testing::TestEnv;

  #[test]
  fn test_create_and_update_course() {
    let env = TestEnv::new().unwrap();
    let id = create_course(&env.conn, "Calculus", "Limits and series").unwrap();
    assert!(update_course(&env.conn, id, "Calculus I", "").unwrap());

    let course = get_course(&env.conn, id).unwrap().unwrap();
    assert_eq!(course.name, "Calculus I");
    assert_eq!(list_courses(&env.conn).unwrap().len(), 1);
    assert!(!update_course(&env.conn, 999, "x", "").unwrap());
  }

  #[test]
  fn test_new_topic_sort_order_steps_by_ten() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let other = env.add_course("Algebra");

    let t1 = create_topic(&env.conn, course, "Limits", "").unwrap();
    let t2 = create_topic(&env.conn, course, "Series", "").unwrap();
    let t3 = create_topic(&env.conn, other, "Groups", "").unwrap();

    assert_eq!(get_topic(&env.conn, t1).unwrap().unwrap().sort_order, 10);
    assert_eq!(get_topic(&env.conn, t2).unwrap().unwrap().sort_order, 20);
    assert_eq!(get_topic(&env.conn, t3).unwrap().unwrap().sort_order, 10);
  }

  #[test]
  fn test_list_topics_orders_and_counts() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let a = create_topic(&env.conn, course, "A", "").unwrap();
    let b = create_topic(&env.conn, course, "B", "").unwrap();
    update_topic(&env.conn, a, "A", "", Some(course), 50).unwrap();
    let pid = env.add_problem("2024-03-01", "p");
    set_problem_topics(&env.conn, pid, &[a]).unwrap();

    let topics = list_topics(&env.conn, Some(course)).unwrap();
    assert_eq!(topics.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b, a]);
    assert_eq!(topics[1].problem_count, 1);
    assert_eq!(topics[0].problem_count, 0);
  }

  #[test]
  fn test_topic_without_sort_order_sorts_last() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let a = create_topic(&env.conn, course, "A", "").unwrap();
    env
      .conn
      .execute("UPDATE topics SET sort_order = NULL WHERE id = ?1", params![a])
      .unwrap();
    let b = create_topic(&env.conn, course, "B", "").unwrap();

    let topics = list_topics(&env.conn, None).unwrap();
    assert_eq!(topics[0].id, b);
    assert_eq!(topics[1].sort_order, TOPIC_DEFAULT_SORT_ORDER);
  }

  #[test]
  fn test_sort_topics_assigns_index_plus_one() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let other = env.add_course("Algebra");
    let a = env.add_topic(course, "A");
    let b = env.add_topic(course, "B");
    let foreign = env.add_topic(other, "F");

    assert_eq!(sort_topics(&env.conn, course, &[b, a, foreign]).unwrap(), 2);
    assert_eq!(get_topic(&env.conn, b).unwrap().unwrap().sort_order, 1);
    assert_eq!(get_topic(&env.conn, a).unwrap().unwrap().sort_order, 2);
    assert_eq!(get_topic(&env.conn, foreign).unwrap().unwrap().sort_order, 10);
  }

  #[test]
  fn test_delete_topic_removes_links() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let topic = env.add_topic(course, "Limits");
    let pid = env.add_problem("2024-03-01", "p");
    set_problem_topics(&env.conn, pid, &[topic]).unwrap();

    assert!(delete_topic(&env.conn, topic).unwrap());
    assert!(get_topic(&env.conn, topic).unwrap().is_none());
    assert!(crate::db::get_problem_topic_ids(&env.conn, pid).unwrap().is_empty());
  }

  #[test]
  fn test_topic_problems_sorted_with_all_topic_names() {
    let env = TestEnv::new().unwrap();
    let course = env.add_course("Calculus");
    let limits = env.add_topic(course, "Limits");
    let series = env.add_topic(course, "Series");
    let late = env.add_problem("2024-05-01", "late");
    let early = env.add_problem("2024-01-01", "early");
    set_problem_topics(&env.conn, late, &[limits]).unwrap();
    set_problem_topics(&env.conn, early, &[limits, series]).unwrap();

    let problems = topic_problems(&env.conn, limits).unwrap();
    assert_eq!(problems[0].problem.id, early);
    assert_eq!(problems[0].topic_names, vec!["Limits", "Series"]);
    assert_eq!(problems[1].problem.id, late);
  }
}
