pub mod tokens;
pub mod users;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::utils::config::Config;
use crate::utils::error::{AppError, Result};

pub use tokens::PgTokenRepository;
pub use users::PgUserRepository;

/// Gestion de la connexion à la base de données
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Crée le pool de connexions PostgreSQL
    pub async fn connect(config: &Config) -> Result<Self> {
        let database_url = config.database_url.as_deref().ok_or_else(|| {
            AppError::Configuration("DATABASE_URL is not set".to_string())
        })?;

        info!("🔌 Connexion à la base de données PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .connect(database_url)
            .await?;

        info!("✅ Connexion établie avec succès");
        Ok(Self { pool })
    }

    /// Exécuter les migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("✅ Migrations appliquées");
        Ok(())
    }

    pub fn users(&self) -> PgUserRepository {
        PgUserRepository::new(self.pool.clone())
    }

    pub fn tokens(&self) -> PgTokenRepository {
        PgTokenRepository::new(self.pool.clone())
    }
}
