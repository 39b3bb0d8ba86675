// Modèle: user.rs
pub mod user;
pub use user::{AuthenticationResponse, FollowDto, LoginRequest, UserDto};

pub mod mapper;

use serde::{Deserialize, Serialize};

/// État du service renvoyé par `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub name: String,
    pub version: String,
    pub cache: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
