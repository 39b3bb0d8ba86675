// services/cache.rs
use async_trait::async_trait;
use lru::LruCache;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::utils::config::{CacheType, Config};
use crate::utils::error::{AppError, Result};

/// Stockage brut des valeurs sérialisées en JSON
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;
}

struct LocalEntry {
    value: String,
    expires_at: Instant,
}

/// Cache en mémoire du processus, borné en nombre d'entrées (LRU)
pub struct LocalCache {
    entries: Mutex<LruCache<String, LocalEntry>>,
}

impl LocalCache {
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, LocalEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CacheStore for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.lock();

        // Libérer une place expirée avant de sacrifier l'entrée la moins récente
        if !entries.contains(key) && entries.len() == entries.cap().get() {
            let expired = entries
                .peek_lru()
                .filter(|(_, entry)| entry.expires_at <= now)
                .map(|(lru_key, _)| lru_key.clone());
            if let Some(expired) = expired {
                entries.pop(&expired);
            }
        }

        entries.put(
            key.to_string(),
            LocalEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.lock().pop(key).is_some())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Cache Redis partagé entre instances
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    /// Ouvre le client et vérifie la connexion
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let cache = Self { client };
        cache.health_check().await?;
        Ok(cache)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.client.get_async_connection().await?;
        let seconds = ttl.as_secs().max(1) as usize;
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.client.get_async_connection().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.client.get_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Cache désactivé (`CACHE_TYPE=none`)
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Façade typée au-dessus d'un `CacheStore`.
///
/// Une panne du cache ne doit jamais faire échouer une requête : les erreurs
/// sont journalisées puis traitées comme un défaut de cache.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    prefix: String,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, prefix: &str, default_ttl_seconds: u64) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopCache), "", 0)
    }

    /// Sélectionne le backend d'après `CACHE_TYPE`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn CacheStore> = match config.cache_type {
            CacheType::Local => {
                info!(
                    "🗃️ Cache local activé ({} entrées max, TTL {}s)",
                    config.cache_max_entries, config.cache_ttl_seconds
                );
                Arc::new(LocalCache::new(config.cache_max_entries))
            }
            CacheType::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    AppError::Configuration("REDIS_URL is required when CACHE_TYPE=redis".to_string())
                })?;
                let store = RedisCache::connect(url).await?;
                info!("🗃️ Cache Redis connecté");
                Arc::new(store)
            }
            CacheType::None => {
                info!("🗃️ Cache désactivé");
                Arc::new(NoopCache)
            }
        };

        Ok(Self::new(store, &config.cache_prefix, config.cache_ttl_seconds))
    }

    /// Clé du cache `getUser`
    pub fn user_key(id: Uuid) -> String {
        format!("getUser:{}", id)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.key(key);
        match self.store.get(&full_key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("⚠️ Entrée de cache illisible {}: {}", full_key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ Lecture du cache impossible {}: {}", full_key, e);
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        let full_key = self.key(key);
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("⚠️ Sérialisation pour le cache impossible {}: {}", full_key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(&full_key, json, self.default_ttl).await {
            warn!("⚠️ Écriture du cache impossible {}: {}", full_key, e);
        }
    }

    pub async fn evict(&self, key: &str) {
        let full_key = self.key(key);
        if let Err(e) = self.store.delete(&full_key).await {
            warn!("⚠️ Invalidation du cache impossible {}: {}", full_key, e);
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}
