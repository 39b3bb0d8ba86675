//! Conversions entre les entités du domaine et les DTO exposés par l'API

use uuid::Uuid;

use crate::domain::{Role, User};
use crate::models::UserDto;

/// Entité vers DTO ; les relations sont converties sans leurs propres relations
pub fn entity_to_dto(user: &User) -> UserDto {
    UserDto {
        following: user
            .following
            .iter()
            .map(entity_to_dto_without_relationship)
            .collect(),
        followers: user
            .followers
            .iter()
            .map(entity_to_dto_without_relationship)
            .collect(),
        ..entity_to_dto_without_relationship(user)
    }
}

pub fn entity_to_dto_without_relationship(user: &User) -> UserDto {
    UserDto {
        id: Some(user.id),
        username: user.username.clone(),
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        email: user.email.clone(),
        password: None,
        following: Vec::new(),
        followers: Vec::new(),
    }
}

/// DTO vers entité. Le mot de passe est recopié tel quel (vide si absent).
pub fn dto_to_entity(dto: &UserDto) -> User {
    User {
        id: dto.id.unwrap_or_else(Uuid::new_v4),
        username: dto.username.clone(),
        firstname: dto.firstname.clone(),
        lastname: dto.lastname.clone(),
        email: dto.email.clone(),
        password: dto.password.clone().unwrap_or_default(),
        role: Role::User,
        following: Vec::new(),
        followers: Vec::new(),
    }
}
