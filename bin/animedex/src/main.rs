//! # Animedex Binary
//!
//! The entry point that assembles the application based on compile-time features.

use anyhow::Context;
use dex_api::{AppState, EntryService};
use dex_catalog::{CatalogEngine, EngineConfig};
use dex_config::{AppConfig, LogFormat};
use dex_core::traits::{CatalogGateway, ElevatedGateway, IdentityProvider};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(not(any(feature = "db-postgres", feature = "db-memory")))]
compile_error!("enable a gateway feature: `db-postgres` or `db-memory`");

#[cfg(not(feature = "auth-jwt"))]
compile_error!("the `auth-jwt` feature is required");

struct Gateways {
    catalog: Arc<dyn CatalogGateway>,
    elevated: Option<Arc<dyn ElevatedGateway>>,
}

#[cfg(feature = "db-postgres")]
async fn build_gateways(config: &AppConfig) -> anyhow::Result<Gateways> {
    use dex_db_postgres::{connect, migrate, PgCatalog, PgElevated};

    let pool = connect(config.require_database_url()?, config.database.max_connections)
        .await
        .context("connecting to database")?;
    if config.database.run_migrations {
        migrate(&pool).await.context("running migrations")?;
    }

    let elevated: Option<Arc<dyn ElevatedGateway>> = match &config.database.service_role_url {
        Some(url) => {
            let pool = connect(url, config.database.max_connections)
                .await
                .context("connecting with the service-role credential")?;
            Some(Arc::new(PgElevated::new(pool)))
        }
        None => None,
    };

    Ok(Gateways {
        catalog: Arc::new(PgCatalog::new(pool)),
        elevated,
    })
}

#[cfg(all(feature = "db-memory", not(feature = "db-postgres")))]
async fn build_gateways(_config: &AppConfig) -> anyhow::Result<Gateways> {
    let store = Arc::new(dex_db_memory::MemoryCatalog::new());
    Ok(Gateways {
        catalog: store.clone(),
        elevated: Some(store),
    })
}

#[cfg(feature = "auth-jwt")]
fn build_identity(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    Ok(Arc::new(dex_auth_jwt::JwtIdentityProvider::new(
        config.require_jwt_secret()?,
        config.auth.audience.as_deref(),
    )))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(config.log.format);

    // 1. Initialize Gateway Implementation
    let gateways = build_gateways(&config).await?;
    if gateways.elevated.is_none() {
        warn!("no service-role credential configured, deletes will be refused");
    }

    // 2. Initialize Identity Implementation
    let auth = build_identity(&config)?;

    // 3. Wrap in AppState
    let engine = CatalogEngine::with_config(
        gateways.catalog.clone(),
        EngineConfig {
            page_size: config.catalog.page_size,
            filter_cache_capacity: config.catalog.filter_cache_capacity,
            search_cache_capacity: config.catalog.search_cache_capacity,
        },
    );
    let state = Arc::new(AppState {
        entries: EntryService::new(gateways.catalog, gateways.elevated),
        auth,
        catalog: Mutex::new(engine),
        default_page_size: config.catalog.page_size,
    });

    let app = dex_api::router(state, config.server.body_limit_bytes);
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "animedex listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(err) => {
                warn!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
