use uuid::Uuid;

use crate::utils::security::sha256_hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    #[default]
    Bearer,
}

impl TokenType {
    pub fn ordinal(self) -> i16 {
        match self {
            TokenType::Bearer => 0,
        }
    }

    pub fn from_ordinal(value: i16) -> Option<Self> {
        match value {
            0 => Some(TokenType::Bearer),
            _ => None,
        }
    }
}

/// Jeton d'accès émis pour un utilisateur.
///
/// Seul le SHA-256 du JWT est conservé.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: Uuid,
    pub token_hash: String,
    pub token_type: TokenType,
    pub revoked: bool,
    pub expired: bool,
    pub user_id: Uuid,
}

impl Token {
    pub fn bearer(user_id: Uuid, raw_token: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_hash: Self::digest(raw_token),
            token_type: TokenType::Bearer,
            revoked: false,
            expired: false,
            user_id,
        }
    }

    pub fn digest(raw_token: &str) -> String {
        sha256_hash(raw_token.as_bytes())
    }

    pub fn is_active(&self) -> bool {
        !self.revoked && !self.expired
    }
}
