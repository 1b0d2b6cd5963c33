use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use recordsd::{create_router, db, AppState, BackupStore, Config, Db};

const DEFAULT_LOG_FILTER: &str = "recordsd=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    info!(
        path = %config.db.path.display(),
        pool_size = config.db.pool_size,
        "opening database"
    );
    let db = Db::open(&config.db)?;

    let seed = config.seed_demo;
    db.run(move |conn| {
        db::init_schema(conn)?;
        if seed {
            db::seed_demo_data(conn)?;
        }
        Ok(())
    })
    .await
    .context("failed to prepare database schema")?;
    if seed {
        info!("demo data loaded");
    }

    let state = AppState::new(db.clone(), BackupStore::new(&config.backup_dir));
    let app = create_router(state);

    let address = config.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("listening on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let (connections, idle) = db.pool_state();
    info!(connections, idle, "server stopped, closing connection pool");
    drop(db);
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
