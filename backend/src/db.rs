use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::AnyPool;
use tracing::info;
use crate::config::AppConfig;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQL flavour of the connected engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self, sqlx::Error> {
        if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(sqlx::Error::Configuration(
                format!("unsupported database url: {url}").into(),
            ))
        }
    }

    /// Aggregate projecting the grouped voter names as a JSON array.
    pub const fn collect_names(self) -> &'static str {
        match self {
            Dialect::Postgres => "json_agg(name)::text",
            Dialect::Sqlite => "json_group_array(name)",
        }
    }
}

/// Connection pool shared by every vote store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self, sqlx::Error> {
        install_default_drivers();
        let dialect = Dialect::from_url(&config.database_url)?;
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        info!(?dialect, max_connections = config.max_connections, "Connected to database");
        Ok(Self { pool, dialect })
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
