pub mod database;
pub mod memory;

pub use database::{Database, PgTokenRepository, PgUserRepository};
pub use memory::{InMemoryTokenRepository, InMemoryUserRepository};
