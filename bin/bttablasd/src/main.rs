//! `bt-tablasd` — the BT-Tablas server binary.
//!
//! Usage:
//!   bt-tablasd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/bttablas/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use bt_core::Module;
use config::ServerConfig;

/// BT-Tablas server.
#[derive(Parser, Debug)]
#[command(name = "bt-tablasd", about = "BT-Tablas RBAC server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    bootstrap::verify_config(&server_config)?;

    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let sql: Arc<dyn bt_sql::SQLStore> = Arc::new(
        bt_sql::sqlite::SqliteStore::open(&data_dir.join("data.sqlite"))
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {e}"))?,
    );

    let auth_config = auth::service::AuthConfig {
        jwt_secret: server_config.jwt.secret.clone(),
        access_token_ttl: config::parse_duration(&server_config.jwt.access_expires)?,
        refresh_token_ttl: config::parse_duration(&server_config.jwt.refresh_expires)?,
        ..Default::default()
    };
    let auth_module = auth::AuthModule::new(Arc::clone(&sql), auth_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize auth module: {e}"))?;
    info!("{} module initialized", auth_module.name());

    bootstrap::seed(auth_module.service(), &server_config)?;

    let app = auth_module.routes();

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("bt-tablasd listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
