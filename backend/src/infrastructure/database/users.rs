use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::{Role, User, UserRepository};
use crate::utils::error::{AppError, Result};

const USER_COLUMNS: &str = "u.id, u.username, u.firstname, u.lastname, u.email, u.password, u.role";

/// Ligne brute de la table `users`
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    firstname: Option<String>,
    lastname: Option<String>,
    email: String,
    password: String,
    role: i16,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::from_ordinal(row.role)
            .ok_or_else(|| AppError::Database(format!("Unknown role ordinal: {}", row.role)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            password: row.password,
            role,
            following: Vec::new(),
            followers: Vec::new(),
        })
    }
}

/// Repository PostgreSQL pour les utilisateurs
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.{} = $1", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_relations(User::try_from(row)?).await?)),
            None => Ok(None),
        }
    }

    /// Charge les utilisateurs suivis et les abonnés (un seul niveau)
    async fn with_relations(&self, mut user: User) -> Result<User> {
        let following_sql = format!(
            "SELECT {} FROM users u \
             JOIN user_following f ON f.following_id = u.id \
             WHERE f.user_id = $1 ORDER BY u.username",
            USER_COLUMNS
        );
        let followers_sql = format!(
            "SELECT {} FROM users u \
             JOIN user_following f ON f.user_id = u.id \
             WHERE f.following_id = $1 ORDER BY u.username",
            USER_COLUMNS
        );

        user.following = sqlx::query_as::<_, UserRow>(&following_sql)
            .bind(user.id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>>>()?;

        user.followers = sqlx::query_as::<_, UserRow>(&followers_sql)
            .bind(user.id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.with_relations(User::try_from(row)?).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn save(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, firstname, lastname, email, password, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                firstname = EXCLUDED.firstname,
                lastname = EXCLUDED.lastname,
                email = EXCLUDED.email,
                password = EXCLUDED.password,
                role = EXCLUDED.role,
                updated_at = NOW()
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.ordinal())
        .execute(&self.pool)
        .await?;

        self.find_by_id(user.id).await?.ok_or(AppError::Internal)
    }

    async fn add_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_following (user_id, following_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(follow_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_follow(&self, user_id: Uuid, follow_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_following WHERE user_id = $1 AND following_id = $2")
            .bind(user_id)
            .bind(follow_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Les relations user_following sont supprimées en cascade
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
