//! Auth database operations (users, sessions, groups).
//!
//! Tables are created by the shared migrations in `crate::db::schema`.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, Result};

/// Group whose members may manage courses, topics and problems
pub const ADMIN_GROUP: &str = "admin";

/// Create a new user, returns the user ID
pub fn create_user(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, email, password_hash, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by username, returns (user_id, password_hash)
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<(i64, String)>> {
    let mut stmt = conn.prepare("SELECT id, password_hash FROM users WHERE username = ?1")?;
    let result = stmt.query_row(params![username], |row| Ok((row.get(0)?, row.get(1)?)));
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if a username already exists
pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check if a user is an admin (member of the admin group or legacy username='admin')
pub fn is_user_admin(conn: &Connection, user_id: i64) -> Result<bool> {
    let is_admin: i64 = conn.query_row(
        r#"SELECT CASE
            WHEN EXISTS (SELECT 1 FROM user_group_members WHERE group_id = ?2 AND user_id = u.id) THEN 1
            WHEN LOWER(u.username) = 'admin' THEN 1
            ELSE 0
        END FROM users u WHERE u.id = ?1"#,
        params![user_id, ADMIN_GROUP],
        |row| row.get(0),
    )?;
    Ok(is_admin == 1)
}

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session_id,
            user_id,
            now.to_rfc3339(),
            expires.to_rfc3339(),
            now.to_rfc3339()
        ],
    )?;
    Ok(())
}

/// User resolved from a live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// Validate session and get the user it belongs to
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<SessionUser>> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn.prepare(
        r#"
        SELECT u.id, u.username, u.email
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.id = ?1 AND s.expires_at > ?2
    "#,
    )?;
    let result = stmt.query_row(params![session_id, now], |row| {
        Ok(SessionUser {
            user_id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
        })
    });
    match result {
        Ok(user) => {
            // Update last access time
            let _ = conn.execute(
                "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
                params![now, session_id],
            );
            Ok(Some(user))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
    Ok(count)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![now, user_id],
    )?;
    Ok(())
}

/// User info for admin display
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

/// Get all users for admin display
pub fn get_all_users(conn: &Connection) -> Result<Vec<UserInfo>> {
    let mut stmt = conn.prepare(
        r#"SELECT u.id, u.username, u.email, u.created_at, u.last_login_at,
                  EXISTS (SELECT 1 FROM user_group_members m WHERE m.user_id = u.id AND m.group_id = ?1)
           FROM users u
           ORDER BY u.created_at DESC, u.id DESC"#,
    )?;
    let users = stmt
        .query_map(params![ADMIN_GROUP], |row| {
            Ok(UserInfo {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                created_at: row.get(3)?,
                last_login_at: row.get(4)?,
                is_admin: row.get::<_, i64>(5)? == 1,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();
    Ok(users)
}

/// Add a user to a group
pub fn add_user_to_group(conn: &Connection, user_id: i64, group_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO user_group_members (group_id, user_id, added_at) VALUES (?1, ?2, ?3)",
        params![group_id, user_id, now],
    )?;
    Ok(())
}

/// Remove a user from a group
pub fn remove_user_from_group(conn: &Connection, user_id: i64, group_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM user_group_members WHERE group_id = ?1 AND user_id = ?2",
        params![group_id, user_id],
    )?;
    Ok(())
}

/// Names of the groups a user belongs to (the user's group claim)
pub fn get_user_groups(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT group_id FROM user_group_members WHERE user_id = ?1 ORDER BY group_id",
    )?;
    let groups = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(groups)
}

/// Group claim for a user; lookup failures yield no groups
pub fn check_admin_groups(conn: &Connection, user_id: i64) -> Vec<String> {
    get_user_groups(conn, user_id).unwrap_or_else(|e| {
        tracing::warn!("Failed to load groups for user {}: {}", user_id, e);
        Vec::new()
    })
}

/// Grant the admin group to configured bootstrap usernames that exist
pub fn grant_bootstrap_admins(conn: &Connection, usernames: &[String]) -> Result<usize> {
    let mut granted = 0;
    for username in usernames {
        if let Some((user_id, _)) = get_user_by_username(conn, username)? {
            granted += conn.execute(
                "INSERT OR IGNORE INTO user_group_members (group_id, user_id, added_at) VALUES (?1, ?2, ?3)",
                params![ADMIN_GROUP, user_id, Utc::now().to_rfc3339()],
            )?;
        }
    }
    Ok(granted)
}
