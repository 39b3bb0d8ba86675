// core/user_service.rs
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::auth_service::{AuthenticationService, TokenKind};
use crate::domain::{Principal, Role, Token, TokenRepository, User, UserRepository};
use crate::models::mapper::{entity_to_dto, entity_to_dto_without_relationship};
use crate::models::{AuthenticationResponse, FollowDto, LoginRequest, UserDto};
use crate::services::cache::Cache;
use crate::utils::error::{AppError, Result};
use crate::utils::security::{hash_password, verify_password};

/// Comptes utilisateurs, sessions et abonnements
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    auth: AuthenticationService,
    cache: Cache,
    /// Incrémenté à chaque invalidation ; une lecture concurrente ne remet pas
    /// en cache un DTO chargé avant l'écriture
    cache_epoch: AtomicU64,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        auth: AuthenticationService,
        cache: Cache,
    ) -> Self {
        Self {
            users,
            tokens,
            auth,
            cache,
            cache_epoch: AtomicU64::new(0),
        }
    }

    /// Inscription d'un nouvel utilisateur.
    ///
    /// Retourne l'identifiant attribué et la paire de tokens.
    pub async fn register_user(&self, user: User) -> Result<(Uuid, AuthenticationResponse)> {
        if user.password.is_empty() {
            return Err(AppError::BadRequest("password is required".to_string()));
        }

        // Vérifier si l'utilisateur existe déjà
        if self.users.find_by_email(&user.email).await?.is_some()
            || self.users.find_by_username(&user.username).await?.is_some()
        {
            return Err(AppError::UserAlreadyExists);
        }

        let user = User {
            id: Uuid::new_v4(),
            password: hash_password(&user.password)?,
            role: Role::User,
            following: Vec::new(),
            followers: Vec::new(),
            ..user
        };

        let saved = self.users.save(&user).await?;
        let response = self.issue_tokens(saved.id).await?;

        info!("👤 Utilisateur inscrit: {} ({})", saved.username, saved.id);
        Ok((saved.id, response))
    }

    /// Authentification username/mot de passe
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthenticationResponse> {
        let user = self
            .users
            .find_by_username(&request.username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password)? {
            return Err(AppError::InvalidCredentials);
        }

        self.tokens.delete_all_by_user(user.id).await?;
        let response = self.issue_tokens(user.id).await?;

        info!("🔑 Connexion de {}", user.username);
        Ok(response)
    }

    /// Échanger un refresh token contre une nouvelle paire
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthenticationResponse> {
        let claims = self.auth.decode(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::InvalidToken);
        }

        let user = self.find_user(claims.sub).await?;

        self.tokens.delete_all_by_user(user.id).await?;
        self.issue_tokens(user.id).await
    }

    /// Supprimer un utilisateur, ses tokens et ses abonnements
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<()> {
        let user = self.find_user(id).await?;
        Self::ensure_can_manage(principal, id)?;

        self.tokens.delete_all_by_user(id).await?;
        self.users.delete(id).await?;
        self.evict_with_relations(&user).await;

        info!("🗑️ Utilisateur supprimé: {}", id);
        Ok(())
    }

    /// Modifier un utilisateur. Seuls un admin ou l'utilisateur lui-même peuvent le faire.
    ///
    /// Le rôle et les abonnements sont conservés (`save` n'écrit pas les arêtes) ;
    /// tous les tokens sont supprimés.
    pub async fn edit(&self, principal: &Principal, dto: &UserDto) -> Result<UserDto> {
        let id = dto
            .id
            .ok_or_else(|| AppError::BadRequest("id is required".to_string()))?;

        let existing = self.find_user(id).await?;
        Self::ensure_can_manage(principal, id)?;

        let email_taken = self
            .users
            .find_by_email(&dto.email)
            .await?
            .is_some_and(|other| other.id != id);
        let username_taken = self
            .users
            .find_by_username(&dto.username)
            .await?
            .is_some_and(|other| other.id != id);
        if email_taken || username_taken {
            return Err(AppError::UserAlreadyExists);
        }

        let password = match dto.password.as_deref() {
            Some(raw) if !raw.is_empty() => hash_password(raw)?,
            _ => existing.password.clone(),
        };

        let updated = User {
            username: dto.username.clone(),
            firstname: dto.firstname.clone(),
            lastname: dto.lastname.clone(),
            email: dto.email.clone(),
            password,
            ..existing
        };

        self.tokens.delete_all_by_user(id).await?;
        let saved = self.users.save(&updated).await?;
        self.evict_with_relations(&saved).await;

        info!("✏️ Utilisateur modifié: {}", id);
        Ok(entity_to_dto(&saved))
    }

    /// Révoquer toutes les sessions d'un utilisateur
    pub async fn revoke_user_access(&self, principal: &Principal, id: Uuid) -> Result<()> {
        self.find_user(id).await?;
        Self::ensure_can_manage(principal, id)?;

        let revoked = self.tokens.delete_all_by_user(id).await?;
        info!("🚫 {} token(s) révoqué(s) pour {}", revoked, id);
        Ok(())
    }

    /// Lecture d'un utilisateur, mise en cache sous `getUser`
    pub async fn get_user(&self, id: Uuid) -> Result<UserDto> {
        let key = Cache::user_key(id);
        if let Some(dto) = self.cache.get::<UserDto>(&key).await {
            debug!("Cache hit: {}", key);
            return Ok(dto);
        }

        let epoch = self.cache_epoch.load(Ordering::SeqCst);
        let dto = entity_to_dto(&self.find_user(id).await?);

        if self.cache_epoch.load(Ordering::SeqCst) == epoch {
            self.cache.put(&key, &dto).await;
            // Une écriture a pu invalider entre la vérification et le put
            if self.cache_epoch.load(Ordering::SeqCst) != epoch {
                self.cache.evict(&key).await;
            }
        }
        Ok(dto)
    }

    /// `user_id` commence à suivre `follow_id`
    pub async fn follow(&self, principal: &Principal, follow: &FollowDto) -> Result<UserDto> {
        let (user, target) = self.load_follow_pair(principal, follow).await?;

        if self.users.add_follow(user.id, target.id).await? {
            self.evict(&[user.id, target.id]).await;
            info!("➕ {} suit {}", user.id, target.id);
        }

        Ok(entity_to_dto(&self.find_user(user.id).await?))
    }

    pub async fn unfollow(&self, principal: &Principal, follow: &FollowDto) -> Result<()> {
        let (user, target) = self.load_follow_pair(principal, follow).await?;

        if self.users.remove_follow(user.id, target.id).await? {
            self.evict(&[user.id, target.id]).await;
            info!("➖ {} ne suit plus {}", user.id, target.id);
        }

        Ok(())
    }

    pub async fn get_followers(&self, id: Uuid) -> Result<Vec<UserDto>> {
        let user = self.find_user(id).await?;
        Ok(user
            .followers
            .iter()
            .map(entity_to_dto_without_relationship)
            .collect())
    }

    pub async fn get_following(&self, id: Uuid) -> Result<Vec<UserDto>> {
        let user = self.find_user(id).await?;
        Ok(user
            .following
            .iter()
            .map(entity_to_dto_without_relationship)
            .collect())
    }

    /// Créer l'administrateur initial s'il n'existe pas encore.
    ///
    /// Retourne `true` si un compte a été créé.
    pub async fn bootstrap_admin(&self, username: &str, email: &str, password: &str) -> Result<bool> {
        if self.users.find_by_username(username).await?.is_some() {
            debug!("Administrateur {} déjà présent", username);
            return Ok(false);
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Configuration(format!(
                "ADMIN_EMAIL {} is already used by another account",
                email
            )));
        }

        let mut admin = User::new(
            username.to_string(),
            email.to_string(),
            hash_password(password)?,
        );
        admin.role = Role::Admin;
        self.users.save(&admin).await?;

        info!("👑 Administrateur créé: {}", username);
        Ok(true)
    }

    /// Résoudre l'appelant d'une requête à partir de son token d'accès
    pub async fn authenticate_access_token(&self, raw_token: &str) -> Result<Principal> {
        let claims = self.auth.decode(raw_token)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::InvalidToken);
        }

        let stored = self
            .tokens
            .find_by_token(raw_token)
            .await?
            .filter(|t| t.is_active() && t.user_id == claims.sub)
            .ok_or(AppError::InvalidToken)?;

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Principal::from(&user))
    }

    async fn issue_tokens(&self, user_id: Uuid) -> Result<AuthenticationResponse> {
        let access_token = self.auth.generate_token(user_id)?;
        let refresh_token = self.auth.generate_refresher_token(user_id)?;

        self.tokens
            .save(&Token::bearer(user_id, &access_token))
            .await?;

        Ok(AuthenticationResponse::bearer(
            access_token,
            refresh_token,
            self.auth.access_token_ttl_seconds(),
        ))
    }

    async fn find_user(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id: {} was not found", id)))
    }

    async fn load_follow_pair(&self, principal: &Principal, follow: &FollowDto) -> Result<(User, User)> {
        if follow.user_id == follow.follow_id {
            return Err(AppError::BadRequest("A user cannot follow themselves".to_string()));
        }
        Self::ensure_can_manage(principal, follow.user_id)?;

        let user = self.find_user(follow.user_id).await?;
        let target = self.find_user(follow.follow_id).await?;
        Ok((user, target))
    }

    fn ensure_can_manage(principal: &Principal, target_id: Uuid) -> Result<()> {
        if principal.can_manage(target_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only admin or the user themselves can modify a user".to_string(),
            ))
        }
    }

    /// Invalide l'utilisateur et tous ceux dont le DTO le référence
    async fn evict_with_relations(&self, user: &User) {
        let ids: Vec<Uuid> = std::iter::once(user.id)
            .chain(user.following.iter().map(|u| u.id))
            .chain(user.followers.iter().map(|u| u.id))
            .collect();
        self.evict(&ids).await;
    }

    async fn evict(&self, ids: &[Uuid]) {
        self.cache_epoch.fetch_add(1, Ordering::SeqCst);
        let unique: HashSet<&Uuid> = ids.iter().collect();
        for id in unique {
            self.cache.evict(&Cache::user_key(*id)).await;
        }
    }
}
