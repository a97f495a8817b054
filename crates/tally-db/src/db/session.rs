use async_trait::async_trait;
use chrono::Duration;
use sqlx::PgPool;
use tally_core::models::SessionUser;
use tally_core::AppError;

use crate::store::SessionStore;

/// Repository for login sessions (created by the login flow, read here)
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn touch_active_session(
        &self,
        token: &str,
        window: Duration,
    ) -> Result<Option<SessionUser>, AppError> {
        let user = sqlx::query_as::<_, SessionUser>(
            r#"
            WITH touched AS (
                UPDATE sessions
                SET last_used_at = NOW()
                WHERE session_token = $1
                  AND last_used_at > NOW() - make_interval(secs => $2)
                RETURNING user_id
            )
            SELECT u.id, u.display_name, u.picture_url
            FROM users u
            JOIN touched t ON t.user_id = u.id
            "#,
        )
        .bind(token)
        .bind(window.num_seconds() as f64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
