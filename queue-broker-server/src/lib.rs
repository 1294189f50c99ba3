mod settings;

pub use settings::Settings;

use anyhow::Context;
use blockscout_service_launcher::database::{self, DatabaseConnectSettings};
use migration::{Migrator, MigratorTrait};
use queue_broker_logic::{backing, Broker};

const SERVICE_NAME: &str = "queue_broker";

pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    blockscout_service_launcher::tracing::init_logs(
        SERVICE_NAME,
        &settings.tracing,
        &settings.jaeger,
    )?;

    let db_connection = match &settings.database.connect {
        // the broker also runs over sqlite, which the postgres-flavoured
        // launcher initialisation cannot create for us
        DatabaseConnectSettings::Url(url) if url.starts_with("sqlite") => {
            let db = sea_orm::Database::connect(url.as_str())
                .await
                .context("connecting to sqlite database")?;
            if settings.database.run_migrations {
                Migrator::up(&db, None).await?;
            }
            db
        }
        _ => database::initialize_postgres::<Migrator>(&settings.database).await?,
    };

    let backing = backing::from_settings(&settings.backing)
        .await
        .context("backing store initialization failed")?;

    let broker = Broker::start(db_connection, backing, settings.broker.clone());
    tracing::info!("queue broker started");

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    tracing::info!("shutting down");
    broker.close().await?;
    Ok(())
}
