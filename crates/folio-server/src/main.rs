use std::net::SocketAddr;
use std::time::Duration;

use tracing::{info, warn};

use folio_api::auth::seed_admins;
use folio_db::Database;
use folio_editor::cleanup::run_expiry_loop;
use folio_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::open(&config.db_path)?;
    if !config.admins.is_empty() {
        info!("Admins: {}", config.admins.iter().cloned().collect::<Vec<_>>().join(", "));
        match &config.admin_password {
            Some(password) => {
                seed_admins(&db, &config.admins, password)?;
            }
            None => warn!("FOLIO_ADMIN_PASSWORD is unset; admins without an account cannot log in"),
        }
    }

    let state = folio_server::state(&config, db);

    // Sweep abandoned editor sessions every minute
    tokio::spawn(run_expiry_loop(
        state.editors.clone(),
        Duration::from_secs(60),
        config.editor_idle,
    ));

    let app = folio_server::app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Folio server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
