//! PostgreSQL-backed session store.

use async_trait::async_trait;
use authgate_core::SessionToken;
use authgate_platform_access::{ReturnTo, Session, SessionStore, SessionStoreError};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    token: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    profile: Option<String>,
    return_to: Option<String>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, SessionStoreError> {
        let token: SessionToken = self.token.parse().map_err(|e| SessionStoreError::Corrupt {
            token: self.token.clone(),
            details: format!("{}", e),
        })?;
        // A bad return-to is dropped rather than failing the whole session.
        let return_to = self.return_to.as_deref().and_then(ReturnTo::parse);

        Ok(Session::with_all_fields(
            token,
            self.created_at,
            self.expires_at,
            self.profile,
            return_to,
        ))
    }
}

fn unavailable(e: sqlx::Error) -> SessionStoreError {
    SessionStoreError::Unavailable {
        details: e.to_string(),
    }
}

/// Session store on a shared `sessions` table.
///
/// Each operation is a single statement, so concurrent writers from any
/// number of server processes resolve per key with last write wins.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, token: &SessionToken) -> Result<Option<Session>, SessionStoreError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT token, created_at, expires_at, profile, return_to
            FROM sessions
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(SessionRow::try_into_session).transpose()
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, created_at, expires_at, profile, return_to)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (token) DO UPDATE
            SET expires_at = EXCLUDED.expires_at,
                profile = EXCLUDED.profile,
                return_to = EXCLUDED.return_to
            "#,
        )
        .bind(session.token().as_str())
        .bind(session.created_at())
        .bind(session.expires_at())
        .bind(session.encoded_profile())
        .bind(session.return_to().map(ReturnTo::as_str))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn touch(
        &self,
        token: &SessionToken,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET expires_at = $2
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn destroy(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected())
    }
}
