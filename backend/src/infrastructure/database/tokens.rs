use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::{Token, TokenRepository, TokenType};
use crate::utils::error::{AppError, Result};

#[derive(Debug, FromRow)]
struct TokenRow {
    id: Uuid,
    token_hash: String,
    token_type: i16,
    revoked: bool,
    expired: bool,
    user_id: Uuid,
}

impl TryFrom<TokenRow> for Token {
    type Error = AppError;

    fn try_from(row: TokenRow) -> Result<Self> {
        let token_type = TokenType::from_ordinal(row.token_type).ok_or_else(|| {
            AppError::Database(format!("Unknown token type ordinal: {}", row.token_type))
        })?;

        Ok(Token {
            id: row.id,
            token_hash: row.token_hash,
            token_type,
            revoked: row.revoked,
            expired: row.expired,
            user_id: row.user_id,
        })
    }
}

/// Repository PostgreSQL pour les jetons émis
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn save(&self, token: &Token) -> Result<Token> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO tokens (id, token_hash, token_type, revoked, expired, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                revoked = EXCLUDED.revoked,
                expired = EXCLUDED.expired
            RETURNING id, token_hash, token_type, revoked, expired, user_id
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.token_type.ordinal())
        .bind(token.revoked)
        .bind(token.expired)
        .bind(token.user_id)
        .fetch_one(&self.pool)
        .await?;

        Token::try_from(row)
    }

    async fn find_by_token(&self, raw_token: &str) -> Result<Option<Token>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT id, token_hash, token_type, revoked, expired, user_id FROM tokens WHERE token_hash = $1",
        )
        .bind(Token::digest(raw_token))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Token::try_from).transpose()
    }

    async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<Token>> {
        sqlx::query_as::<_, TokenRow>(
            "SELECT id, token_hash, token_type, revoked, expired, user_id FROM tokens \
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Token::try_from)
        .collect()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
