use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Représentation d'un utilisateur échangée avec les clients.
///
/// Le mot de passe est accepté en entrée mais jamais renvoyé.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[validate(length(min = 3, max = 50, message = "username must be between 3 and 50 characters"))]
    pub username: String,

    pub firstname: Option<String>,

    pub lastname: Option<String>,

    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[serde(skip_serializing)]
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,

    pub following: Vec<UserDto>,

    pub followers: Vec<UserDto>,
}

/// Données pour la connexion d'un utilisateur
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Relation d'abonnement : `user_id` suit `follow_id`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowDto {
    pub user_id: Uuid,
    pub follow_id: Uuid,
}

/// Paire de tokens renvoyée après inscription, connexion ou rafraîchissement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthenticationResponse {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_dto_accepts_password_but_never_serializes_it() {
        let dto: UserDto = serde_json::from_value(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "supersecret"
        }))
        .unwrap();

        assert_eq!(dto.password.as_deref(), Some("supersecret"));
        assert!(dto.following.is_empty());

        let value = serde_json::to_value(&dto).unwrap();
        assert!(value.get("password").is_none());
        assert!(value.get("id").is_none());
        assert_eq!(value["username"], "alice");
    }

    #[test]
    fn test_user_dto_validation() {
        let valid = UserDto {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: Some("supersecret".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let short_name = UserDto {
            username: "al".to_string(),
            ..valid.clone()
        };
        assert!(short_name.validate().is_err());

        let bad_email = UserDto {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = UserDto {
            password: Some("short".to_string()),
            ..valid.clone()
        };
        assert!(short_password.validate().is_err());

        // Mot de passe absent : conservé lors d'une édition
        let no_password = UserDto {
            password: None,
            ..valid
        };
        assert!(no_password.validate().is_ok());
    }

    #[test]
    fn test_follow_dto_is_camel_case() {
        let user_id = Uuid::new_v4();
        let follow_id = Uuid::new_v4();
        let dto: FollowDto = serde_json::from_value(json!({
            "userId": user_id,
            "followId": follow_id
        }))
        .unwrap();

        assert_eq!(dto.user_id, user_id);
        assert_eq!(dto.follow_id, follow_id);
    }

    #[test]
    fn test_authentication_response_shape() {
        let response = AuthenticationResponse::bearer("a".to_string(), "r".to_string(), 3600);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "accessToken": "a",
                "refreshToken": "r",
                "tokenType": "Bearer",
                "expiresIn": 3600
            })
        );
    }
}
