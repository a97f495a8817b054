use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::models::{Group, NewGroup};
use tally_core::AppError;

use super::transaction::TransactionGuard;
use crate::store::GroupStore;

/// Repository for groups and their memberships
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupStore for GroupRepository {
    async fn get(&self, group_id: i64) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, name, menu, menu_image_url, created_by, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_with_owner(&self, group: NewGroup, owner_id: i64) -> Result<Group, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "create_group").await?;

        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, menu, menu_image_url, created_by, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, name, menu, menu_image_url, created_by, created_at
            "#,
        )
        .bind(&group.name)
        .bind(&group.menu)
        .bind(&group.menu_image_url)
        .bind(owner_id)
        .fetch_one(tx.connection()?)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, is_owner, joined_at)
            VALUES ($1, $2, TRUE, NOW())
            "#,
        )
        .bind(created.id)
        .bind(owner_id)
        .execute(tx.connection()?)
        .await?;

        tx.commit().await?;

        tracing::debug!(group_id = created.id, owner_id, "Group created");
        Ok(created)
    }

    async fn add_member(&self, group_id: i64, user_id: i64, is_owner: bool) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, is_owner, joined_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(is_owner)
        .execute(&self.pool)
        .await;

        match result.map_err(AppError::from) {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(AppError::Conflict(
                "You are already a member of this group".to_string(),
            )),
            Err(e) => Err(e),
        }
    }
}
