use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    models::tags::{Tag, TagWithCount},
    repositories::{tags_repo::duplicate, TagsRepository},
    Error, Result,
};

#[derive(Clone)]
pub struct TagsService {
    repo: Arc<dyn TagsRepository>,
}

impl TagsService {
    pub fn new(repo: Arc<dyn TagsRepository>) -> Self {
        Self { repo }
    }

    /// Admin listing: every tag with the number of posts using it.
    pub async fn get_tags(&self) -> Result<Vec<TagWithCount>> {
        self.repo.get_tags_with_counts(false).await
    }

    /// Tags with at least one published post, by name.
    pub async fn get_public_tags(&self) -> Result<Vec<TagWithCount>> {
        let tags = self.repo.get_tags_with_counts(true).await?;
        Ok(tags.into_iter().filter(|t| t.post_count > 0).collect())
    }

    pub async fn get_tag_cloud(&self) -> Result<Vec<Tag>> {
        self.repo.get_tags().await
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Tag name is required.".to_string()));
        }

        if self.repo.find_tag_by_name(name).await?.is_some() {
            return Err(duplicate(name));
        }

        let tag = self.repo.create_tag(name).await?;
        info!(tag_id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub async fn rename_tag(&self, tag_id: Uuid, name: &str) -> Result<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Missing required fields.".to_string()));
        }

        if let Some(existing) = self.repo.find_tag_by_name(name).await? {
            if existing.id != tag_id {
                return Err(duplicate(name));
            }
        }

        let tag = self.repo.rename_tag(tag_id, name).await?;
        info!(tag_id = %tag.id, name = %tag.name, "tag renamed");
        Ok(tag)
    }

    /// Deletes the tag and returns what it was. Posts keep existing.
    pub async fn delete_tag(&self, tag_id: Uuid) -> Result<Tag> {
        let tag = self.repo.find_tag(tag_id).await?.ok_or(Error::NotFound)?;
        self.repo.delete_tag(tag_id).await?;

        info!(tag_id = %tag.id, name = %tag.name, "tag deleted");
        Ok(tag)
    }
}
