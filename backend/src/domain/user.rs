use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rôle d'un utilisateur, persisté par son ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn ordinal(self) -> i16 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
        }
    }

    pub fn from_ordinal(value: i16) -> Option<Self> {
        match value {
            0 => Some(Role::User),
            1 => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Représente un utilisateur du système
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Identifiant unique de l'utilisateur (UUID)
    pub id: Uuid,
    /// Nom d'utilisateur (unique) - utilisé pour la connexion
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    /// Email de l'utilisateur (unique)
    pub email: String,
    /// Hash Argon2 du mot de passe
    pub password: String,
    pub role: Role,
    /// Utilisateurs suivis (côté propriétaire de la relation)
    pub following: Vec<User>,
    /// Utilisateurs qui suivent celui-ci
    pub followers: Vec<User>,
}

impl User {
    /// Crée un utilisateur sans relations
    pub fn new(username: String, email: String, password: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            firstname: None,
            lastname: None,
            email,
            password,
            role: Role::User,
            following: Vec::new(),
            followers: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_following(&self, user_id: Uuid) -> bool {
        self.following.iter().any(|u| u.id == user_id)
    }

    /// Copie de l'utilisateur sans ses relations
    pub fn shallow(&self) -> User {
        User {
            following: Vec::new(),
            followers: Vec::new(),
            ..self.clone()
        }
    }

    /// Suivre `other`. Retourne `false` si la relation existait déjà ou si
    /// `other` est l'utilisateur lui-même.
    pub fn add_following(&mut self, other: &mut User) -> bool {
        if other.id == self.id || self.is_following(other.id) {
            return false;
        }

        self.following.push(other.shallow());
        if !other.followers.iter().any(|u| u.id == self.id) {
            other.followers.push(self.shallow());
        }
        true
    }

    /// Ne plus suivre `other`. Retourne `false` si la relation n'existait pas.
    pub fn remove_following(&mut self, other: &mut User) -> bool {
        if !self.is_following(other.id) {
            return false;
        }

        self.following.retain(|u| u.id != other.id);
        other.followers.retain(|u| u.id != self.id);
        true
    }
}

/// Appelant authentifié d'une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    /// Seul un admin ou l'utilisateur lui-même peut modifier un compte
    pub fn can_manage(&self, target_id: Uuid) -> bool {
        self.id == target_id || self.role == Role::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}
