//! Test utilities for database setup.
//!
//! Reuses the real migrations so tests never carry their own copy of the schema.

use rusqlite::Connection;
use tempfile::TempDir;

use crate::domain::problem::parse_date;
use crate::domain::ProblemDraft;

/// Test environment with a fully migrated problems.db in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("problems.db"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        crate::db::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Insert a user with a throwaway hash, returning its id
    pub fn add_user(&self, username: &str) -> i64 {
        crate::auth::db::create_user(
            &self.conn,
            username,
            &format!("{}@example.com", username),
            "not-a-real-hash",
        )
        .expect("create test user")
    }

    pub fn add_course(&self, name: &str) -> i64 {
        crate::db::create_course(&self.conn, name, "").expect("create test course")
    }

    pub fn add_topic(&self, course_id: i64, name: &str) -> i64 {
        crate::db::create_topic(&self.conn, course_id, name, "").expect("create test topic")
    }

    /// Insert a problem published on `date` (YYYY-MM-DD)
    pub fn add_problem(&self, date: &str, content: &str) -> i64 {
        let draft = ProblemDraft {
            content: content.to_string(),
            publish_date: parse_date(date),
            ..Default::default()
        };
        crate::db::create_problem(&self.conn, &draft).expect("create test problem")
    }
}
