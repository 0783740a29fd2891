//! Application state shared by all handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::db::DbPool;
use crate::services::{LlmClient, Mailer};

#[derive(Clone)]
pub struct AppState {
    /// problems.db (users, sessions, catalog, annotations)
    pub db: DbPool,
    pub settings: Arc<Settings>,
    pub llm: LlmClient,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(db: DbPool, settings: Settings) -> Self {
        let llm = LlmClient::new(&settings.llm);
        let mailer = Mailer::new(&settings.email);
        Self {
            db,
            settings: Arc::new(settings),
            llm,
            mailer,
        }
    }

    /// Configured bootstrap admins are admins regardless of group membership
    pub fn is_bootstrap_admin(&self, username: &str) -> bool {
        self.settings
            .admin_usernames
            .iter()
            .any(|name| name.eq_ignore_ascii_case(username))
    }
}
