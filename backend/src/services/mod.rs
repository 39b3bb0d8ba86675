// services/mod.rs
pub mod cache;

// Ré-exports pour faciliter l'import
pub use cache::{Cache, CacheStore, LocalCache, NoopCache, RedisCache};
