use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state, loaded once at startup
/// and immutable afterwards. Components that need a secret or a path receive
/// it from this struct at construction time; nothing reads the environment at
/// call time.
#[derive(Clone)]
pub struct AppConfig {
    // SQLite connection string, e.g. "sqlite:institute.db".
    pub database_url: String,
    // Symmetric secret for signing and validating bearer tokens. Rotating it
    // invalidates every outstanding token.
    pub jwt_secret: String,
    // Root directory for stored attachments on disk. Reference paths
    // returned to clients always use the fixed "/uploads" prefix.
    pub upload_dir: String,
    // Plaintext of the single seeded admin credential; hashed once at
    // bootstrap when the row is first created.
    pub default_admin_password: String,
    // Telegram relay credentials for contact-message notifications. Either
    // may be absent; delivery then fails with an upstream error.
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    // Runtime environment marker. Controls log formatting.
    pub env: Env,
}

/// Env
///
/// Runtime context marker: pretty human-readable logs locally, JSON logs in
/// production for log aggregation.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for test setup. Uses an in-memory
    /// database and a fixed signing secret.
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "insecure-test-signing-secret".to_string(),
            upload_dir: "uploads".to_string(),
            default_admin_password: "admin".to_string(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// The canonical startup initializer: reads all parameters from
    /// environment variables.
    ///
    /// # Panics
    /// Panics if `SECRET_KEY` is missing in production. Starting with a
    /// fallback signing secret would make every deployment's tokens
    /// forgeable.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production.")
            }
            _ => env::var("SECRET_KEY")
                .unwrap_or_else(|_| "insecure-local-signing-secret".to_string()),
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:institute.db".to_string()),
            jwt_secret,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            env,
        }
    }
}
