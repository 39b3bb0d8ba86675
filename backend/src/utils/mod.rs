// utils/mod.rs
pub mod error;
pub mod config;
pub mod security;
pub mod validation;

// Ré-exports pour faciliter l'import
pub use error::{AppError, Result};
pub use config::{CacheType, Config, StorageBackend};
pub use security::{hash_password, verify_password, sha256_hash};
pub use validation::validate_object;
