use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Token, User};
use crate::utils::error::Result;

/// Persistance des utilisateurs et de leurs abonnements.
///
/// Les utilisateurs retournés portent leurs relations `following` et
/// `followers` chargées à un niveau.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insère ou met à jour les champs de l'utilisateur.
    /// Les abonnements ne sont jamais écrits ici : voir `add_follow` / `remove_follow`.
    async fn save(&self, user: &User) -> Result<User>;

    /// Ajoute l'arête `user_id` -> `follow_id`. `false` si elle existait déjà.
    async fn add_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool>;

    /// Retire l'arête `user_id` -> `follow_id`. `false` si elle n'existait pas.
    async fn remove_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool>;

    /// Supprime l'utilisateur et toutes les relations qui le concernent
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn save(&self, token: &Token) -> Result<Token>;

    /// Recherche par JWT brut (comparé via son empreinte)
    async fn find_by_token(&self, raw_token: &str) -> Result<Option<Token>>;

    async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<Token>>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64>;
}
