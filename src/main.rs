use log::*;
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger, AppState};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::new();
    Logger::init_logger(&config)?;

    info!("Starting up Clinic Portal API ({})", config.runtime_env());

    let config = config.validated()?;

    let db = Arc::new(service::init_database(&config).await?);

    info!("Applying pending database migrations");
    Migrator::up(db.as_ref(), None).await?;

    let app_state = web::AppState::new(AppState::new(config, &db))?;

    web::init_server(app_state).await?;

    Ok(())
}
