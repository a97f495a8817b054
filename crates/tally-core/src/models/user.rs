use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user resolved from a live session. Handlers receive this explicitly,
/// never through an ambient lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SessionUser {
    pub id: i64,
    pub display_name: String,
    pub picture_url: Option<String>,
}
