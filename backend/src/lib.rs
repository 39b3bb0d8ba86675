// backend/src/lib.rs
// Modules principaux
pub mod api;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{AuthenticationService, UserService};
use crate::domain::{TokenRepository, UserRepository};
use crate::infrastructure::{Database, InMemoryTokenRepository, InMemoryUserRepository};
use crate::services::Cache;

// Ré-exports pour faciliter l'utilisation
pub use utils::{AppError, Config, Result};

// Version de l'application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Pubfinder";

/// État partagé entre les workers HTTP
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub cache: Cache,
}

impl AppState {
    /// Construit l'état à partir de la configuration : stockage, migrations et cache
    pub async fn build(config: Config) -> Result<Self> {
        let (users, tokens): (Arc<dyn UserRepository>, Arc<dyn TokenRepository>) =
            match config.storage_backend {
                utils::StorageBackend::Postgres => {
                    let db = Database::connect(&config).await?;
                    if config.database_run_migrations {
                        db.run_migrations().await?;
                    }
                    (Arc::new(db.users()), Arc::new(db.tokens()))
                }
                utils::StorageBackend::Memory => {
                    warn!("⚠️ Stockage en mémoire : les données seront perdues à l'arrêt");
                    (
                        Arc::new(InMemoryUserRepository::new()),
                        Arc::new(InMemoryTokenRepository::new()),
                    )
                }
            };

        let cache = Cache::from_config(&config).await?;
        Ok(Self::with_repositories(config, users, tokens, cache))
    }

    pub fn with_repositories(
        config: Config,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        cache: Cache,
    ) -> Self {
        let auth = AuthenticationService::from_config(&config);
        let user_service = UserService::new(users, tokens, auth, cache.clone());

        Self {
            config: Arc::new(config),
            user_service: Arc::new(user_service),
            cache,
        }
    }

    /// Crée l'administrateur configuré par `ADMIN_*`, s'il manque
    pub async fn bootstrap_admin(&self) -> Result<()> {
        match self.config.admin_bootstrap() {
            Some(admin) => {
                self.user_service
                    .bootstrap_admin(&admin.username, &admin.email, &admin.password)
                    .await?;
            }
            None => info!("Aucun administrateur initial configuré"),
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;

    #[tokio::test]
    async fn test_bootstrap_admin_from_config() {
        let mut state = test_state();
        let mut config = (*state.config).clone();
        config.admin_username = Some("admin".to_string());
        config.admin_email = Some("admin@pubfinder.io".to_string());
        config.admin_password = Some("admin-password".to_string());
        state.config = Arc::new(config);

        state.bootstrap_admin().await.unwrap();
        state.bootstrap_admin().await.unwrap();

        let token = state
            .user_service
            .login(&crate::models::LoginRequest {
                username: "admin".to_string(),
                password: "admin-password".to_string(),
            })
            .await
            .unwrap();
        let principal = state
            .user_service
            .authenticate_access_token(&token.access_token)
            .await
            .unwrap();
        assert_eq!(principal.role, crate::domain::Role::Admin);
    }
}
