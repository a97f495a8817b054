use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub menu: String,
    pub menu_image_url: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub menu: String,
    pub menu_image_url: String,
}

/// Request to create a group; the caller becomes its owner
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGroupRequest {
    #[validate(custom(function = "not_blank", message = "Group name is required"))]
    #[serde(default)]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Menu is required"))]
    #[serde(default)]
    pub menu: String,
    /// Falls back to the configured placeholder image when omitted
    #[serde(default)]
    pub menu_image_url: Option<String>,
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateGroupResponse {
    pub id: i64,
    pub name: String,
    pub menu: String,
    pub menu_image_url: String,
}

impl From<Group> for CreateGroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            menu: group.menu,
            menu_image_url: group.menu_image_url,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinGroupRequest {
    pub group_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinGroupResponse {
    pub group_id: i64,
    pub group_name: String,
    pub user_id: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_and_menu_are_rejected() {
        let req = CreateGroupRequest {
            name: "   ".to_string(),
            menu: String::new(),
            menu_image_url: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("menu"));
    }

    #[test]
    fn test_valid_request_passes() {
        let req: CreateGroupRequest =
            serde_json::from_str(r#"{"name":"Lunch","menu":"Ramen"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.menu_image_url.is_none());
    }
}
