// utils/config.rs
use crate::utils::error::{AppError, Result};
use dotenv::dotenv;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;

/// Backend de persistance des utilisateurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::Configuration(format!(
                "STORAGE_BACKEND must be one of: postgres, memory (got {})",
                other
            ))),
        }
    }
}

/// Fournisseur du cache applicatif
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheType {
    Local,
    Redis,
    None,
}

impl FromStr for CacheType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "local" => Ok(CacheType::Local),
            "redis" => Ok(CacheType::Redis),
            "none" => Ok(CacheType::None),
            other => Err(AppError::Configuration(format!(
                "CACHE_TYPE must be one of: local, redis, none (got {})",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environnement et serveur
    pub run_mode: String,
    pub server_host: String,
    pub server_port: u16,
    pub workers: usize,
    pub log_level: String,
    pub logging_format: String,

    // Base de données
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connection_timeout: u64,
    pub database_run_migrations: bool,

    // Sécurité
    pub jwt_secret: String,
    pub jwt_expiration_ms: i64,
    pub jwt_refresh_expiration_ms: i64,
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    // Cache
    pub cache_type: CacheType,
    pub redis_url: Option<String>,
    pub cache_prefix: String,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,

    // Limites
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_seconds: u64,
    /// Proxys dont on accepte `X-Forwarded-For` / `Forwarded`
    pub rate_limit_trusted_proxies: Vec<IpAddr>,

    // URLs
    pub frontend_url: Option<String>,
}

/// Identifiants de l'administrateur créé au démarrage
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    /// Charger la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self> {
        // Charger le fichier .env si présent
        dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Construire la configuration depuis une source de variables arbitraire
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| {
            AppError::Configuration("Variable d'environnement requise manquante: JWT_SECRET".to_string())
        })?;

        let config = Config {
            // Environnement et serveur
            run_mode: var("RUN_MODE", "development"),
            server_host: var("SERVER_HOST", "0.0.0.0"),
            server_port: parse_value("SERVER_PORT", &var("SERVER_PORT", "8080"))?,
            workers: parse_value("WORKERS", &var("WORKERS", "4"))?,
            log_level: var("LOG_LEVEL", "info"),
            logging_format: var("LOG_FORMAT", "json"),

            // Base de données
            storage_backend: var("STORAGE_BACKEND", "postgres").parse()?,
            database_url: lookup("DATABASE_URL"),
            database_max_connections: parse_value(
                "DATABASE_MAX_CONNECTIONS",
                &var("DATABASE_MAX_CONNECTIONS", "20"),
            )?,
            database_min_connections: parse_value(
                "DATABASE_MIN_CONNECTIONS",
                &var("DATABASE_MIN_CONNECTIONS", "2"),
            )?,
            database_connection_timeout: parse_value(
                "DATABASE_CONNECTION_TIMEOUT",
                &var("DATABASE_CONNECTION_TIMEOUT", "30"),
            )?,
            database_run_migrations: parse_value(
                "DATABASE_RUN_MIGRATIONS",
                &var("DATABASE_RUN_MIGRATIONS", "true"),
            )?,

            // Sécurité
            jwt_secret,
            jwt_expiration_ms: parse_value("JWT_EXPIRATION_MS", &var("JWT_EXPIRATION_MS", "3600000"))?,
            jwt_refresh_expiration_ms: parse_value(
                "JWT_REFRESH_EXPIRATION_MS",
                &var("JWT_REFRESH_EXPIRATION_MS", "604800000"),
            )?,
            admin_username: lookup("ADMIN_USERNAME"),
            admin_email: lookup("ADMIN_EMAIL"),
            admin_password: lookup("ADMIN_PASSWORD"),

            // Cache
            cache_type: var("CACHE_TYPE", "local").parse()?,
            redis_url: lookup("REDIS_URL"),
            cache_prefix: var("CACHE_PREFIX", "pubfinder:"),
            cache_ttl_seconds: parse_value("CACHE_TTL_SECONDS", &var("CACHE_TTL_SECONDS", "600"))?,
            cache_max_entries: parse_value("CACHE_MAX_ENTRIES", &var("CACHE_MAX_ENTRIES", "10000"))?,

            // Limites
            rate_limit_enabled: parse_value("RATE_LIMIT_ENABLED", &var("RATE_LIMIT_ENABLED", "true"))?,
            rate_limit_requests: parse_value("RATE_LIMIT_REQUESTS", &var("RATE_LIMIT_REQUESTS", "100"))?,
            rate_limit_window_seconds: parse_value(
                "RATE_LIMIT_WINDOW_SECONDS",
                &var("RATE_LIMIT_WINDOW_SECONDS", "60"),
            )?,
            rate_limit_trusted_proxies: parse_list(
                "RATE_LIMIT_TRUSTED_PROXIES",
                &var("RATE_LIMIT_TRUSTED_PROXIES", ""),
            )?,

            // URLs
            frontend_url: lookup("FRONTEND_URL"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Vérifier la cohérence des paramètres
    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(AppError::Configuration("SERVER_PORT must be greater than 0".to_string()));
        }

        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(AppError::Configuration(
                "DATABASE_URL is required when STORAGE_BACKEND=postgres".to_string(),
            ));
        }

        if self.cache_type == CacheType::Redis && self.redis_url.is_none() {
            return Err(AppError::Configuration(
                "REDIS_URL is required when CACHE_TYPE=redis".to_string(),
            ));
        }

        if self.jwt_expiration_ms <= 0 || self.jwt_refresh_expiration_ms <= 0 {
            return Err(AppError::Configuration(
                "JWT expirations must be positive".to_string(),
            ));
        }

        if self.cache_max_entries == 0 {
            return Err(AppError::Configuration("CACHE_MAX_ENTRIES must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Administrateur à créer au démarrage, si les trois variables sont fournies
    pub fn admin_bootstrap(&self) -> Option<AdminBootstrap> {
        match (&self.admin_username, &self.admin_email, &self.admin_password) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Vérifier si on est en production
    pub fn is_production(&self) -> bool {
        self.run_mode == "production"
    }

    /// Vérifier si on est en développement
    pub fn is_development(&self) -> bool {
        self.run_mode == "development"
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("{} has an invalid value: {}", name, raw)))
}

/// Liste séparée par des virgules, entrées vides ignorées
fn parse_list<T: FromStr>(name: &str, raw: &str) -> Result<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(name, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "a-very-long-secret-used-only-for-testing"),
            ("STORAGE_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.cache_type, CacheType::Local);
        assert_eq!(config.jwt_expiration_ms, 3_600_000);
        assert!(config.rate_limit_enabled);
        assert!(config.rate_limit_trusted_proxies.is_empty());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.logging_format, "json");
        assert!(config.is_development());
        assert!(config.admin_bootstrap().is_none());
    }

    #[test]
    fn test_missing_jwt_secret() {
        let result = Config::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let result = Config::from_lookup(lookup_from(&[("JWT_SECRET", "secret")]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_redis_requires_url() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
            ("CACHE_TYPE", "redis"),
        ]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_invalid_number() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
            ("SERVER_PORT", "eighty"),
        ]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_admin_bootstrap() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_EMAIL", "admin@pubfinder.io"),
            ("ADMIN_PASSWORD", "changeme123"),
        ]))
        .unwrap();

        let admin = config.admin_bootstrap().unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.email, "admin@pubfinder.io");
    }

    #[test]
    fn test_trusted_proxies() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
            ("RATE_LIMIT_TRUSTED_PROXIES", "10.0.0.1, ::1,"),
        ]))
        .unwrap();

        assert_eq!(
            config.rate_limit_trusted_proxies,
            vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );

        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
            ("RATE_LIMIT_TRUSTED_PROXIES", "not-an-ip"),
        ]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
