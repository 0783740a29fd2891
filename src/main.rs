use daily_problems::auth::db as auth_db;
use daily_problems::config::Settings;
use daily_problems::state::AppState;
use daily_problems::{db, routes, telemetry};

#[tokio::main]
async fn main() {
  telemetry::init_tracing();

  let settings = Settings::load();
  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");

  {
    let conn = pool.lock().expect("Database lock failed during startup");

    match auth_db::cleanup_expired_sessions(&conn) {
      Ok(0) => {}
      Ok(n) => tracing::info!("Removed {} expired sessions", n),
      Err(e) => tracing::warn!("Failed to clean up expired sessions: {}", e),
    }

    if let Err(e) = auth_db::grant_bootstrap_admins(&conn, &settings.admin_usernames) {
      tracing::warn!("Failed to grant bootstrap admins: {}", e);
    }
  }

  if settings.llm.api_key.is_none() {
    tracing::warn!("OPENAI_API_KEY not set; AI hints, problem generation and chat are disabled");
  }
  if settings.email.api_key.is_none() {
    tracing::warn!("SENDGRID_API_KEY not set; support emails cannot be sent");
  }

  let bind_addr = settings.bind_addr();
  let port = settings.server_port;
  let app = routes::build_router(AppState::new(pool, settings));

  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
