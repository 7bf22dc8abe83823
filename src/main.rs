use institute_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    notify::{NotifierState, TelegramNotifier},
    repository::{self, RepositoryState, SqliteRepository},
    storage::{LocalFileStore, StorageState},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for initializing
/// all core components: Configuration, Logging, Database, Storage, Notifier,
/// and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Sets the default log level. It prioritizes the RUST_LOG environment variable,
    // falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "institute_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on the APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during local debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (SQLite)
    // Opens (creating if absent) the database file named in the configuration,
    // then runs schema creation and admin seeding.
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("FATAL: Invalid DATABASE_URL.")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("FATAL: Failed to open the SQLite database. Check DATABASE_URL.");

    repository::init_db(&pool, &config.default_admin_password)
        .await
        .expect("FATAL: Database initialization failed.");

    // Instantiate the Repository, wrapping it in an Arc for thread-safe sharing.
    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 5. Storage Initialization (local attachment directory)
    let storage =
        Arc::new(LocalFileStore::new(config.upload_dir.clone())) as StorageState;

    // 6. Notifier Initialization (Telegram)
    // Credentials may be absent in local setups; sends then fail with 502
    // while the rest of the service keeps working.
    let notifier = Arc::new(TelegramNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    )) as NotifierState;

    // 7. Unified State Assembly
    let app_state = AppState {
        repo,
        storage,
        notifier,
        config,
    };

    // 8. Router and Server Startup
    let app = create_router(app_state);

    // Binds the TCP listener and initiates the HTTP server.
    let listener = TcpListener::bind("0.0.0.0:8000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:8000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:8000/swagger-ui");

    // The long-running Axum server process.
    axum::serve(listener, app).await.unwrap();
}
