use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::tags::{split_tags, Tag};

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "metaDescription")]
    pub meta_description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PostWithTags {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<Tag>,
}

/// Public listing entry: the post with a plain-text excerpt of its body.
#[derive(Debug, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: PostWithTags,
    pub excerpt: String,
}

/// Fields of a new post, already validated.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub image_url: Option<String>,
    pub meta_description: Option<String>,
}

/// Full replacement of a post's editable state. The slug is not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub published: bool,
    pub image_url: Option<String>,
    pub meta_description: Option<String>,
    pub tags: Vec<String>,
}

/// Body of `POST /api/posts`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostDto {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub content: String,
}

/// Admin "new post" form.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required."))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required."))]
    pub content: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub published: bool,
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<CreatePostForm> for NewPost {
    fn from(form: CreatePostForm) -> Self {
        Self {
            title: form.title,
            content: form.content,
            published: form.published,
            image_url: non_empty(form.image_url),
            meta_description: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SaveIntent {
    #[default]
    Autosave,
    SaveAndClose,
}

/// Admin edit form, also what the autosave endpoint receives.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostForm {
    #[serde(default)]
    pub intent: SaveIntent,
    #[serde(default)]
    #[validate(length(min = 1, message = "Post ID, title, and content are required."))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Post ID, title, and content are required."))]
    pub content: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub published: bool,
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, rename = "metaDescription")]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub tags: String,
}

impl From<UpdatePostForm> for PostChanges {
    fn from(form: UpdatePostForm) -> Self {
        Self {
            tags: split_tags(&form.tags),
            title: form.title,
            content: form.content,
            published: form.published,
            image_url: non_empty(form.image_url),
            meta_description: non_empty(form.meta_description),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    #[serde(rename = "totalPosts")]
    pub total_posts: i64,
    #[serde(rename = "publishedPosts")]
    pub published_posts: i64,
    #[serde(rename = "draftPosts")]
    pub draft_posts: i64,
}

/// A form checkbox: present as `on` (or `true`) when ticked, absent or
/// `off` otherwise.
fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(value.as_deref(), Some("on" | "true" | "1")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
