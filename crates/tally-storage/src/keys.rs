use uuid::Uuid;

/// Fresh object key for a receipt photo in `group_id`.
pub fn receipt_object_key(group_id: i64) -> String {
    format!("{}/{}.png", group_id, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_scoped_under_group() {
        let key = receipt_object_key(42);
        assert!(key.starts_with("42/"));
        assert!(key.ends_with(".png"));
        let uuid_part = key.trim_start_matches("42/").trim_end_matches(".png");
        assert!(Uuid::parse_str(uuid_part).is_ok());
    }

    #[test]
    fn test_keys_are_distinct() {
        assert_ne!(receipt_object_key(42), receipt_object_key(42));
    }
}
