//! # Domain Models Module
//!
//! Ce module contient les entités métier de Pubfinder et les contrats de
//! persistance qu'elles exigent.
//!
//! ## Structure
//! - `user.rs`: utilisateurs, rôles et relations d'abonnement (following/followers)
//! - `token.rs`: jetons d'accès émis et leur état de révocation
//! - `ports.rs`: traits des repositories, implémentés dans `infrastructure`
//!
//! ## Conventions
//! - Les identifiants utilisent `uuid::Uuid`
//! - Les relations d'un utilisateur chargé sont "plates" : leurs propres listes sont vides
//! - Les mots de passe ne quittent jamais le domaine autrement que hashés

pub mod ports;
pub mod token;
pub mod user;

// Ré-export des types principaux pour une utilisation facile
pub use ports::{TokenRepository, UserRepository};
pub use token::{Token, TokenType};
pub use user::{Principal, Role, User};
