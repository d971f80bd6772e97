use chrono::TimeDelta;
use quest_board::auth::{CredentialStore, TokenService};
use quest_board::config::{load_config, ConfigError, Storage};
use quest_board::store::{MemoryStore, PgStore, Store, StoreError};
use quest_board::{router, AppState};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum StartupError {
    #[error("problem with config loading: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot reach the database: {0}")]
    Store(#[from] StoreError),
    #[error("cannot serve: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quest_board=debug,tower_http=info,info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("config.toml"));
    let config = load_config(&config_path)?;

    let store: Arc<dyn Store> = match (&config.storage, &config.database) {
        (Storage::Memory, _) => {
            tracing::warn!("using in-memory storage, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        (Storage::Postgres, Some(database)) => Arc::new(PgStore::connect(database)?),
        (Storage::Postgres, None) => return Err(ConfigError::MissingDatabase.into()),
    };

    let tokens = TokenService::new(
        config.auth.secret.as_bytes(),
        TimeDelta::days(i64::from(config.auth.token_ttl_days)),
    );
    let credentials = CredentialStore::new(config.auth.bcrypt_cost);
    let state = Arc::new(AppState::new(store, tokens, credentials));
    let app = router(state, &config.app.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.app.address).await?;
    tracing::info!(address = %config.app.address, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
