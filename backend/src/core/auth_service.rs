// core/auth_service.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::config::Config;
use crate::utils::error::{AppError, Result};

/// Nature d'un JWT émis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims JWT communs aux tokens d'accès et de rafraîchissement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // User ID
    pub iat: i64,    // Issued at timestamp
    pub exp: i64,    // Expiration timestamp
    pub jti: Uuid,   // Token ID
    pub kind: TokenKind,
}

/// Émission et vérification des JWT (HS256)
#[derive(Clone)]
pub struct AuthenticationService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_expiration_ms: i64,
    refresh_expiration_ms: i64,
}

impl AuthenticationService {
    pub fn new(secret: &str, access_expiration_ms: i64, refresh_expiration_ms: i64) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_expiration_ms,
            refresh_expiration_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_expiration_ms,
            config.jwt_refresh_expiration_ms,
        )
    }

    /// Générer un token d'accès JWT
    pub fn generate_token(&self, user_id: Uuid) -> Result<String> {
        self.build_token(user_id, TokenKind::Access, self.access_expiration_ms)
    }

    /// Générer un refresh token JWT
    pub fn generate_refresher_token(&self, user_id: Uuid) -> Result<String> {
        self.build_token(user_id, TokenKind::Refresh, self.refresh_expiration_ms)
    }

    /// Durée de vie d'un token d'accès, en secondes
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_expiration_ms / 1000
    }

    /// Vérifier la signature et l'expiration d'un token
    pub fn decode(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }

    pub fn extract_user_id(&self, token: &str) -> Result<Uuid> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Le token appartient à `user_id` et n'a pas expiré
    pub fn is_token_valid(&self, token: &str, user_id: Uuid) -> bool {
        matches!(self.decode(token), Ok(claims) if claims.sub == user_id)
    }

    fn build_token(&self, user_id: Uuid, kind: TokenKind, expiration_ms: i64) -> Result<String> {
        let now = Utc::now();
        let expires_at = now + Duration::milliseconds(expiration_ms);

        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            kind,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::EncryptionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-entropy-for-hs256";

    fn service() -> AuthenticationService {
        AuthenticationService::new(SECRET, 60_000, 120_000)
    }

    #[test]
    fn test_access_token_roundtrip() {
        let auth = service();
        let user_id = Uuid::new_v4();

        let token = auth.generate_token(user_id).unwrap();
        let claims = auth.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(auth.extract_user_id(&token).unwrap(), user_id);
        assert!(auth.is_token_valid(&token, user_id));
        assert!(!auth.is_token_valid(&token, Uuid::new_v4()));
    }

    #[test]
    fn test_refresh_token_kind() {
        let auth = service();
        let token = auth.generate_refresher_token(Uuid::new_v4()).unwrap();

        let claims = auth.decode(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 120);
    }

    #[test]
    fn test_tokens_are_unique() {
        let auth = service();
        let user_id = Uuid::new_v4();

        assert_ne!(
            auth.generate_token(user_id).unwrap(),
            auth.generate_token(user_id).unwrap()
        );
    }

    #[test]
    fn test_expired_token() {
        let auth = AuthenticationService::new(SECRET, -5_000, -5_000);
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id).unwrap();

        assert!(matches!(auth.decode(&token), Err(AppError::TokenExpired)));
        assert!(!auth.is_token_valid(&token, user_id));
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let token = service().generate_token(Uuid::new_v4()).unwrap();
        let other = AuthenticationService::new("another-secret", 60_000, 60_000);

        assert!(matches!(other.decode(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service().decode("not-a-jwt"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_access_token_ttl_seconds() {
        assert_eq!(service().access_token_ttl_seconds(), 60);
    }
}
