//! User list and admin group membership.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::db::{self as auth_db, UserInfo, ADMIN_GROUP};
use crate::auth::AdminContext;
use crate::db::try_lock;
use crate::error::AppError;
use crate::filters;
use crate::handlers::{redirect_error, redirect_notice, Flash, PageContext};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "admin/users.html")]
pub struct UsersTemplate {
  pub page: PageContext,
  pub users: Vec<UserInfo>,
  pub current_user_id: i64,
}

#[derive(Deserialize)]
pub struct AdminToggleForm {
  #[serde(default)]
  pub grant: bool,
}

/// GET /admin/users
pub async fn users_page(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
  let users = {
    let conn = try_lock(&state.db)?;
    auth_db::get_all_users(&conn)?
  };

  let template = UsersTemplate {
    current_user_id: auth.user_id,
    page: PageContext::new(&auth, flash),
    users,
  };
  Ok(Html(template.render().unwrap_or_default()).into_response())
}

/// POST /admin/users/{id}/admin - Grant or revoke admin group membership
pub async fn set_admin(
  State(state): State<AppState>,
  AdminContext(auth): AdminContext,
  Path(user_id): Path<i64>,
  Form(form): Form<AdminToggleForm>,
) -> Result<Redirect, AppError> {
  if user_id == auth.user_id && !form.grant {
    return Ok(redirect_error("/admin/users", "You cannot revoke your own admin access"));
  }

  let conn = try_lock(&state.db)?;
  if form.grant {
    auth_db::add_user_to_group(&conn, user_id, ADMIN_GROUP)?;
    tracing::info!("{} granted admin to user {}", auth.username, user_id);
    Ok(redirect_notice("/admin/users", "Admin access granted"))
  } else {
    auth_db::remove_user_from_group(&conn, user_id, ADMIN_GROUP)?;
    tracing::info!("{} revoked admin from user {}", auth.username, user_id);
    Ok(redirect_notice("/admin/users", "Admin access revoked"))
  }
}
