//! Authentication extractors.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::db as auth_db;
use crate::db::try_lock;
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "dp_session";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
/// Page requests redirect to /login; `/api/` requests get a 401 JSON error.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// Group claim (e.g. `["admin"]`)
    pub groups: Vec<String>,
    pub is_admin: bool,
}

/// Full request path; nested routers only see the part after their prefix
fn request_path(parts: &Parts) -> &str {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
}

fn unauthenticated(parts: &Parts) -> Response {
    if request_path(parts).starts_with("/api/") {
        AppError::Unauthorized.into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| unauthenticated(parts))?;

        let session_id = jar
            .get(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or_else(|| unauthenticated(parts))?;

        let conn = try_lock(&state.db).map_err(|e| AppError::from(e).into_response())?;

        let user = auth_db::get_session_user(&conn, &session_id)
            .map_err(|e| AppError::from(e).into_response())?
            .ok_or_else(|| unauthenticated(parts))?;

        let groups = auth_db::check_admin_groups(&conn, user.user_id);
        let is_admin = groups.iter().any(|g| g == auth_db::ADMIN_GROUP)
            || state.is_bootstrap_admin(&user.username)
            || auth_db::is_user_admin(&conn, user.user_id)
                .unwrap_or_else(|_| user.username.eq_ignore_ascii_case("admin"));

        Ok(AuthContext {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            groups,
            is_admin,
        })
    }
}

/// Authenticated admin. Non-admins get 403.
#[derive(Clone, Debug)]
pub struct AdminContext(pub AuthContext);

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        if !auth.is_admin {
            tracing::warn!("Non-admin user {} denied access to {}", auth.username, request_path(parts));
            return Err(AppError::Forbidden.into_response());
        }
        Ok(AdminContext(auth))
    }
}

/// Optional authentication extractor.
/// Returns Some(AuthContext) if authenticated, None otherwise.
pub struct OptionalAuth(pub Option<AuthContext>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthContext::from_request_parts(parts, state).await {
            Ok(auth) => Ok(OptionalAuth(Some(auth))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}
