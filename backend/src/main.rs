use backend::{config::AppConfig, db::Database, routes::AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting spacing votes server");

    let rocket = rocket::build();
    let config = AppConfig::from_figment(rocket.figment())?;

    let db = Database::connect(&config).await?;
    if config.run_migrations {
        db.migrate().await?;
        info!("📋 Migrations complete");
    }

    let result = backend::attach(rocket, AppState::new(&db)).launch().await;
    db.close().await;

    if let Err(e) = result {
        error!("Server failed: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}
