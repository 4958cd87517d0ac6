use std::net::SocketAddr;

use anyhow::Result;
use fitdesk::api::create_routes;
use fitdesk::config::{init_tracing, run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format)?;

    let pool = DatabaseConfig::from_env()?.create_pool().await?;
    run_migrations(&pool).await?;

    if config.seed_demo_data {
        DatabaseSeeder::new(pool.clone()).seed_all().await?;
    }

    let app = create_routes(pool, &config);

    let address = config.server_address();
    let listener = TcpListener::bind(&address).await?;
    info!(environment = %config.environment, "FitDesk server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    // Peer addresses key the login rate limiter
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
