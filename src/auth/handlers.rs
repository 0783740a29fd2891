//! Authentication handlers for login, register, and logout.

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

use super::db as auth_db;
use super::middleware::{OptionalAuth, SESSION_COOKIE_NAME};
use super::password::{self, random_token, MIN_PASSWORD_LEN};
use crate::db::try_lock;
use crate::filters;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub username: String,
    pub version: &'static str,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

fn login_error(username: &str, error: &str) -> Response {
    let template = LoginTemplate {
        error: Some(error.to_string()),
        username: username.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

fn register_error(form: &RegisterForm, error: &str) -> Response {
    let template = RegisterTemplate {
        error: Some(error.to_string()),
        username: form.username.clone(),
        email: form.email.clone(),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

fn session_cookie(session_id: String, hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .path("/")
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .max_age(time::Duration::hours(hours))
        .build()
}

/// GET /login - Show login page (signed-in users go home)
pub async fn login_page(OptionalAuth(auth): OptionalAuth) -> Response {
    if auth.is_some() {
        return Redirect::to("/").into_response();
    }
    let template = LoginTemplate {
        error: None,
        username: String::new(),
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(template.render().unwrap_or_default()).into_response()
}

/// POST /login - Process login
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return login_error(username, "Username and password are required");
    }

    let conn = match try_lock(&state.db) {
        Ok(conn) => conn,
        Err(_) => return login_error(username, "Database error"),
    };

    let (user_id, password_hash) = match auth_db::get_user_by_username(&conn, username) {
        Ok(Some(user)) => user,
        Ok(None) => return login_error(username, "Invalid username or password"),
        Err(e) => {
            tracing::error!("Login lookup failed: {}", e);
            return login_error(username, "Database error");
        }
    };

    if !password::verify_password(&form.password, &password_hash) {
        tracing::info!("Failed login for {}", username);
        return login_error(username, "Invalid username or password");
    }

    // Update last login time (log but don't fail on error)
    if let Err(e) = auth_db::update_last_login(&conn, user_id) {
        tracing::warn!("Failed to update last login for user {}: {}", user_id, e);
    }

    let session_id = random_token(32);
    if auth_db::create_session(&conn, user_id, &session_id, state.settings.session_hours).is_err() {
        return login_error(username, "Failed to create session");
    }
    drop(conn);

    tracing::info!("User {} logged in", username);
    (
        jar.add(session_cookie(session_id, state.settings.session_hours)),
        Redirect::to("/"),
    )
        .into_response()
}

/// GET /register - Show registration page
pub async fn register_page() -> Html<String> {
    let template = RegisterTemplate {
        error: None,
        username: String::new(),
        email: String::new(),
    };
    Html(template.render().unwrap_or_default())
}

/// POST /register - Create the account and sign in
pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut form): Form<RegisterForm>,
) -> Response {
    form.username = form.username.trim().to_string();
    form.email = form.email.trim().to_string();

    if let Err(message) = validate_registration(&form) {
        return register_error(&form, message);
    }

    // Hash before taking the database lock
    let password_hash = match password::hash_password(&form.password) {
        Ok(hash) => hash,
        Err(_) => return register_error(&form, "Failed to process password"),
    };

    let conn = match try_lock(&state.db) {
        Ok(conn) => conn,
        Err(_) => return register_error(&form, "Database error"),
    };

    match auth_db::username_exists(&conn, &form.username) {
        Ok(true) => return register_error(&form, "Username already exists"),
        Err(_) => return register_error(&form, "Database error"),
        Ok(false) => {}
    }

    let user_id = match auth_db::create_user(&conn, &form.username, &form.email, &password_hash) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to create user {}: {}", form.username, e);
            return register_error(&form, "Failed to create account");
        }
    };

    if state.is_bootstrap_admin(&form.username) {
        if let Err(e) = auth_db::add_user_to_group(&conn, user_id, auth_db::ADMIN_GROUP) {
            tracing::warn!("Failed to grant admin to {}: {}", form.username, e);
        }
    }

    // Create session for auto-login
    let session_id = random_token(32);
    if let Err(e) = auth_db::create_session(&conn, user_id, &session_id, state.settings.session_hours) {
        tracing::error!("Failed to create session after registration: {}", e);
        return Redirect::to("/login").into_response();
    }
    drop(conn);

    tracing::info!("Registered user {}", form.username);
    (
        jar.add(session_cookie(session_id, state.settings.session_hours)),
        Redirect::to("/"),
    )
        .into_response()
}

/// POST /logout - Log out and clear session
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        if let Ok(conn) = try_lock(&state.db) {
            if let Err(e) = auth_db::delete_session(&conn, cookie.value()) {
                tracing::warn!("Failed to delete session during logout: {}", e);
            }
        }
    }

    let removal = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .build();

    (jar.remove(removal), Redirect::to("/login"))
}

fn validate_registration(form: &RegisterForm) -> Result<(), &'static str> {
    if !is_valid_username(&form.username) {
        return Err("Username must be 3-32 alphanumeric characters or underscores");
    }
    if !is_valid_email(&form.email) {
        return Err("A valid email address is required");
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 8 characters");
    }
    if form.password != form.confirm_password {
        return Err("Passwords do not match");
    }
    Ok(())
}

/// Validate username: 3-32 chars, alphanumeric + underscore only
fn is_valid_username(username: &str) -> bool {
    let len = username.len();
    (3..=32).contains(&len) && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Loose shape check: something@something.tld, no whitespace
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("user123"));
        assert!(is_valid_username("my_user"));
        assert!(is_valid_username("User_Name_123"));
        assert!(is_valid_username("a".repeat(32).as_str()));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username("ab")); // too short
        assert!(!is_valid_username(&"a".repeat(33))); // too long
        assert!(!is_valid_username("user name")); // space
        assert!(!is_valid_username("user-name")); // hyphen
        assert!(!is_valid_username("user@name")); // special char
        assert!(!is_valid_username("")); // empty
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("student@example.com"));
        assert!(!is_valid_email("student"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("student@localhost"));
        assert!(!is_valid_email("stu dent@example.com"));
    }

    #[test]
    fn test_registration_rules() {
        assert!(validate_registration(&form("alice", "a@b.co", "longenough", "longenough")).is_ok());
        assert_eq!(
            validate_registration(&form("alice", "a@b.co", "short", "short")),
            Err("Password must be at least 8 characters")
        );
        assert_eq!(
            validate_registration(&form("alice", "a@b.co", "longenough", "different")),
            Err("Passwords do not match")
        );
        assert!(validate_registration(&form("al", "a@b.co", "longenough", "longenough")).is_err());
    }
}
