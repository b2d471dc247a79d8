mod api;
mod auth;
mod config;
mod domain;
mod metrics;
mod repo;
mod scheduler;

use std::net::SocketAddr;
use rust_i18n::i18n;

i18n!(fallback = "ru");    // load localizations with default parameters

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv()?;

    pretty_env_logger::init();

    let app_config = config::AppConfig::from_env();
    let database_config = config::DatabaseConfig::from_env()?;
    let db_conn = repo::establish_database_connection(&database_config).await?;
    let repos = repo::Repositories::new(&db_conn);

    if app_config.scheduler.enabled {
        let scheduler = scheduler::Scheduler::from_config(repos.clone(), &app_config)?;
        tokio::spawn(scheduler.run());
    } else {
        log::info!("the scheduler is disabled");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let app = metrics::init(api::create_router(api::AppState::new(repos, app_config)));

    log::info!("Listening on {addr}...");
    let tcp_listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to install CTRL+C signal handler: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("Shutdown of the server")
        })
        .await?;

    db_conn.close().await;
    Ok(())
}
