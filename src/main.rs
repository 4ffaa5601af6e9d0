use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use inventory_admin as admin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = admin::config::load_config().context("loading configuration")?;
    admin::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = admin::db::establish_connection_with_config(&cfg.db_config()).await?;
    if cfg.auto_migrate {
        admin::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    admin::db::check_connection(&db_pool).await?;

    let state = admin::AppState::new(Arc::new(db_pool), cfg.clone());
    state
        .images
        .ensure_layout()
        .await
        .context("preparing image storage")?;

    let app = admin::build_router(&state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!(environment = %cfg.environment, "inventory-admin listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    // Clones share one pool, so closing this handle closes it for every repository.
    admin::db::close_pool(state.db.as_ref().clone()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
