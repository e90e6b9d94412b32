use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use nexus_clinicservice::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    build_router, config, db,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database_url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let db_pool = db::connect(&config).await?;
    let state = AppState::new(db_pool, config.clone());
    let app = build_router(state);

    tracing::info!("Bootstrapping...");
    bootstrap("ClinicService", app, &config).await?;
    Ok(())
}
