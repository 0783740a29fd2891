//! Application configuration.
//!
//! Values are resolved with priority config.toml > environment > default,
//! the same order used for the database path. API keys are only ever read
//! from the environment so they never end up in a checked-in config file.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;

// ==================== config.toml structure ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    database: Option<DatabaseSection>,
    llm: Option<LlmSection>,
    email: Option<EmailSection>,
    auth: Option<AuthSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EmailSection {
    base_url: Option<String>,
    support_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    admin_usernames: Option<Vec<String>>,
    session_hours: Option<i64>,
}

// ==================== Resolved settings ====================

/// Fully resolved settings, built once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub server_port: u16,
    pub database_path: PathBuf,
    pub llm: LlmSettings,
    pub email: EmailSettings,
    /// Usernames that are always treated as members of the admin group
    pub admin_usernames: Vec<String>,
    pub session_hours: i64,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub support_address: String,
}

impl Settings {
    /// Load settings from `.env`, `config.toml` and the process environment.
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = match std::fs::read_to_string("config.toml") {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config.toml");
                    config
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid config.toml: {}", e);
                    FileConfig::default()
                }
            },
            Err(_) => FileConfig::default(),
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values, environment lookups and defaults.
    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let server = file.server;
        let server_addr = server
            .as_ref()
            .and_then(|s| s.addr.clone())
            .or_else(|| env("SERVER_ADDR"))
            .unwrap_or_else(|| SERVER_ADDR.to_string());
        let server_port = server
            .as_ref()
            .and_then(|s| s.port)
            .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(SERVER_PORT);

        let database_path = file
            .database
            .and_then(|d| d.path)
            .or_else(|| env("DATABASE_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(paths::db_path()));

        let llm = file.llm;
        let llm = LlmSettings {
            api_key: env("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            base_url: llm
                .as_ref()
                .and_then(|l| l.base_url.clone())
                .or_else(|| env("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: llm
                .as_ref()
                .and_then(|l| l.model.clone())
                .or_else(|| env("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: llm
                .as_ref()
                .and_then(|l| l.temperature)
                .unwrap_or(DEFAULT_LLM_TEMPERATURE),
            timeout_secs: llm
                .as_ref()
                .and_then(|l| l.timeout_secs)
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
        };

        let email = file.email;
        let email = EmailSettings {
            api_key: env("SENDGRID_API_KEY").map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            base_url: email
                .as_ref()
                .and_then(|e| e.base_url.clone())
                .or_else(|| env("SENDGRID_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_MAIL_BASE_URL.to_string()),
            support_address: email
                .as_ref()
                .and_then(|e| e.support_address.clone())
                .or_else(|| env("SUPPORT_EMAIL"))
                .unwrap_or_else(|| DEFAULT_SUPPORT_ADDRESS.to_string()),
        };

        let auth = file.auth;
        let admin_usernames = auth
            .as_ref()
            .and_then(|a| a.admin_usernames.clone())
            .or_else(|| {
                env("ADMIN_USERNAMES").map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
            })
            .unwrap_or_default();
        let session_hours = auth
            .as_ref()
            .and_then(|a| a.session_hours)
            .unwrap_or(SESSION_DURATION_HOURS);

        Self {
            server_addr,
            server_port,
            database_path,
            llm,
            email,
            admin_usernames,
            session_hours,
        }
    }

    /// Defaults only (no config.toml, no environment), pointed at `database_path`.
    pub fn with_database(database_path: PathBuf) -> Self {
        let mut settings = Self::resolve(FileConfig::default(), |_| None);
        settings.database_path = database_path;
        settings
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

// ==================== Session Configuration ====================

/// Login session duration in hours (1 week)
pub const SESSION_DURATION_HOURS: i64 = 24 * 7;

/// Generated exams are kept in memory for this many hours
pub const EXAM_EXPIRY_HOURS: i64 = 24;

/// Probability threshold for exam store cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each store access
pub const EXAM_CLEANUP_THRESHOLD: u8 = 25;

// ==================== Exam Configuration ====================

/// Number of problems in a generated exam
pub const EXAM_SIZE: usize = 10;

// ==================== Taxonomy Configuration ====================

/// Sort order step used when appending a topic to a course
pub const TOPIC_SORT_STEP: i64 = 10;

/// Sort order reported for topics that never had one assigned
pub const TOPIC_DEFAULT_SORT_ORDER: i64 = 1000;

// ==================== External Services ====================

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MAIL_BASE_URL: &str = "https://api.sendgrid.com/v3";
pub const DEFAULT_SUPPORT_ADDRESS: &str = "support@learn4less.ca";
