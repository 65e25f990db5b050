use sea_orm_migration::MigratorTrait;
use storefront_orders::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    migration::Migrator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url, 1).await?;

    let pending = Migrator::get_pending_migrations(&orm).await?.len();
    run_migrations(&orm).await?;
    tracing::info!(applied = pending, "migrations up to date");
    Ok(())
}
