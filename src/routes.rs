//! Router assembly.

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{auth, handlers, paths};

pub fn build_router(state: AppState) -> Router {
  let admin_routes = Router::new()
    .route("/courses", get(handlers::admin::topics_page).post(handlers::admin::create_course))
    .route("/courses/{id}", post(handlers::admin::update_course))
    .route(
      "/courses/{id}/sort",
      get(handlers::admin::sort_page).post(handlers::admin::sort_submit),
    )
    .route("/topics", post(handlers::admin::create_topic))
    .route(
      "/topics/{id}",
      get(handlers::admin::topic_details).post(handlers::admin::update_topic),
    )
    .route("/topics/{id}/delete", post(handlers::admin::delete_topic))
    .route("/problems", post(handlers::admin::save_problem))
    .route("/problems/new", get(handlers::admin::new_problem))
    .route("/problems/{id}/delete", post(handlers::admin::delete_problem))
    .route("/schedule", get(handlers::admin::schedule_page))
    .route("/users", get(handlers::admin::users_page))
    .route("/users/{id}/admin", post(handlers::admin::set_admin));

  let api_routes = Router::new()
    .route("/chat", post(handlers::api::chat))
    .route("/generate-hint", post(handlers::api::generate_hint))
    .route("/generate-problem", post(handlers::api::generate_problem))
    .route("/send-email", post(handlers::api::send_email))
    .route("/katex-macros", get(handlers::api::katex_macros))
    .route("/problems/{id}/move", post(handlers::api::move_problem));

  Router::new()
    // Auth routes (no auth required)
    .route("/login", get(auth::login_page).post(auth::login_submit))
    .route("/register", get(auth::register_page).post(auth::register_submit))
    .route("/logout", post(auth::logout))
    // Problem of the day
    .route("/", get(handlers::home::index))
    .route("/problems/{id}/bookmark", post(handlers::annotations::toggle_bookmark))
    .route("/problems/{id}/rating", post(handlers::annotations::rate_problem))
    .route("/problems/{id}/note", post(handlers::annotations::save_note))
    // Exams
    .route("/exam", post(handlers::exam::generate))
    .route("/exam/{id}", get(handlers::exam::show))
    .route("/exam/{id}/rating", post(handlers::exam::rate))
    .nest("/admin", admin_routes)
    .nest("/api", api_routes)
    .nest_service("/static", ServeDir::new(paths::STATIC_DIR))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
