use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::application::Config;

pub use deadpool_postgres::PoolError;

pub mod budget;
pub mod campaign;
pub mod order;

pub use campaign::{fetch_campaign, insert_campaign};
pub use order::fetch_order;

pub type DbPool = deadpool_postgres::Pool;

pub async fn postgres_connection(max_size: usize, config: &Config) -> DbPool {
    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .user(&config.postgres_user)
        .password(&config.postgres_password)
        .host(&config.postgres_host)
        .port(config.postgres_port);
    if let Some(db) = &config.postgres_db {
        pg_config.dbname(db);
    }

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Verified,
    };
    let manager = Manager::from_config(pg_config, NoTls, mgr_config);

    deadpool_postgres::Pool::builder(manager)
        .max_size(max_size)
        .build()
        .expect("Should build the postgres pool")
}

pub async fn migrations(config: &Config) {
    use migrant_lib::{Config as MigrantConfig, Direction, Migrator, Settings};

    let settings = Settings::configure_postgres()
        .database_user(&config.postgres_user)
        .database_password(&config.postgres_password)
        .database_host(&config.postgres_host)
        .database_port(config.postgres_port)
        .database_name(config.postgres_db.as_deref().unwrap_or("postgres"))
        .build()
        .expect("Should build migration settings");

    let mut config = MigrantConfig::with_settings(&settings);
    config.use_cli_compatible_tags(true);

    macro_rules! make_migration {
        ($tag:expr) => {
            migrant_lib::EmbeddedMigration::with_tag($tag)
                .up(include_str!(concat!("../migrations/", $tag, "/up.sql")))
                .down(include_str!(concat!("../migrations/", $tag, "/down.sql")))
                .boxed()
        };
    }

    // Define Migrations
    config
        .use_migrations(&[make_migration!("20240318093000_initial_tables")])
        .expect("Loading migrations failed");

    Migrator::with_config(&config)
        .direction(Direction::Up)
        .all(true)
        // by default this will set the `swallow_completion` to `false`
        // so no error will be returned if all migrations have already been ran
        .apply()
        .expect("Applying migrations failed");

    let _config = config
        .reload()
        .expect("Reloading config for migration failed");
}
