use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "postCount")]
    pub post_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Tag name is required."))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameTagForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields."))]
    pub name: String,
}

/// Splits comma-separated tag text, trimming names and dropping empties.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(split_tags(" rust, axum ,, , web "), vec!["rust", "axum", "web"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }
}
