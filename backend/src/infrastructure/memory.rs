//! Repositories en mémoire.
//!
//! Utilisés avec `STORAGE_BACKEND=memory` pour le développement local et par
//! les tests des services. Ils appliquent les mêmes contraintes que le schéma
//! PostgreSQL : unicité de l'email et du username, arêtes vers des utilisateurs
//! existants et distincts, suppression en cascade.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Token, TokenRepository, User, UserRepository};
use crate::utils::error::{AppError, Result};

#[derive(Default)]
struct UserState {
    /// Utilisateurs sans relations
    users: HashMap<Uuid, User>,
    /// Arêtes (follower, suivi)
    edges: BTreeSet<(Uuid, Uuid)>,
}

impl UserState {
    fn hydrate(&self, id: Uuid) -> Option<User> {
        let mut user = self.users.get(&id)?.clone();

        user.following = self
            .edges
            .iter()
            .filter(|(from, _)| *from == id)
            .filter_map(|(_, to)| self.users.get(to).cloned())
            .collect();
        user.followers = self
            .edges
            .iter()
            .filter(|(_, to)| *to == id)
            .filter_map(|(from, _)| self.users.get(from).cloned())
            .collect();

        user.following.sort_by(|a, b| a.username.cmp(&b.username));
        user.followers.sort_by(|a, b| a.username.cmp(&b.username));
        Some(user)
    }

    fn find_id_by<F>(&self, predicate: F) -> Option<Uuid>
    where
        F: Fn(&User) -> bool,
    {
        self.users.values().find(|u| predicate(u)).map(|u| u.id)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<UserState>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.hydrate(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .find_id_by(|u| u.email == email)
            .and_then(|id| state.hydrate(id)))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .find_id_by(|u| u.username == username)
            .and_then(|id| state.hydrate(id)))
    }

    async fn save(&self, user: &User) -> Result<User> {
        let mut state = self.state.write().await;

        let conflict = state.users.values().any(|existing| {
            existing.id != user.id
                && (existing.email == user.email || existing.username == user.username)
        });
        if conflict {
            return Err(AppError::UserAlreadyExists);
        }

        state.users.insert(user.id, user.shallow());
        state.hydrate(user.id).ok_or(AppError::Internal)
    }

    async fn add_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        if user_id == follow_id {
            return Err(AppError::Database(format!("User {} cannot follow itself", user_id)));
        }
        if let Some(missing) = [user_id, follow_id]
            .into_iter()
            .find(|id| !state.users.contains_key(id))
        {
            return Err(AppError::Database(format!("User {} does not exist", missing)));
        }

        Ok(state.edges.insert((user_id, follow_id)))
    }

    async fn remove_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.edges.remove(&(user_id, follow_id)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.users.remove(&id).is_some();
        state.edges.retain(|(from, to)| *from != id && *to != id);
        Ok(removed)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTokenRepository {
    tokens: Arc<RwLock<HashMap<Uuid, Token>>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn save(&self, token: &Token) -> Result<Token> {
        let mut tokens = self.tokens.write().await;

        if tokens
            .values()
            .any(|t| t.id != token.id && t.token_hash == token.token_hash)
        {
            return Err(AppError::Database("Duplicate token hash".to_string()));
        }

        tokens.insert(token.id, token.clone());
        Ok(token.clone())
    }

    async fn find_by_token(&self, raw_token: &str) -> Result<Option<Token>> {
        let digest = Token::digest(raw_token);
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .find(|t| t.token_hash == digest)
            .cloned())
    }

    async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<Token>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tokens.write().await.remove(&id);
        Ok(())
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}
