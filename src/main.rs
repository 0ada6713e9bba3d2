use mimalloc::MiMalloc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flightdesk::DeskError;
use flightdesk::config::Config;
use flightdesk::db::Database;
use flightdesk::db::models::invoice::Invoice;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const OVERDUE_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), DeskError> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        default_tax_rate = %cfg.billing.default_tax_rate,
        require_solo_authorization = cfg.bookings.require_solo_authorization
    );

    let db = Database::connect(&cfg.basic.database_url).await?;
    tokio::spawn(overdue_sweep(db.clone()));

    let addr = cfg.basic.listen_addr.clone();
    let state = flightdesk::router::DeskState::new(db, cfg);
    let app = flightdesk::router::desk_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Periodically moves pending invoices past their due date to overdue.
async fn overdue_sweep(db: Database) {
    let mut ticker = tokio::time::interval(OVERDUE_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let result = match db.pool().acquire().await {
            Ok(mut conn) => Invoice::mark_overdue(&mut conn, chrono::Utc::now()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(0) => {}
            Ok(n) => info!(count = n, "invoices marked overdue"),
            Err(e) => warn!(error = %e, "overdue sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
