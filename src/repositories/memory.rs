//! In-memory store used when no `DATABASE_URL` is configured, and by tests.
//! Data is lost on restart.

use std::{cmp::Reverse, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        posts::{NewPost, Post, PostChanges, PostWithTags},
        tags::{Tag, TagWithCount},
    },
    Error, Result,
};

use super::{tags_repo::duplicate, PostFilter, PostsRepository, TagsRepository};

#[derive(Default)]
struct Store {
    // Insertion order; listings reverse it.
    posts: Vec<Post>,
    tags: Vec<Tag>,
    post_tags: Vec<(Uuid, Uuid)>,
}

impl Store {
    fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn with_tags(&self, post: &Post) -> PostWithTags {
        PostWithTags {
            post: post.clone(),
            tags: self.tags_of(post.id),
        }
    }

    fn has_tag(&self, post_id: Uuid, name: &str) -> bool {
        self.tags_of(post_id).iter().any(|t| t.name == name)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRepo {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostsRepository for InMemoryRepo {
    async fn create_post(&self, post: &NewPost, slug: &str) -> Result<Post> {
        let mut store = self.store.write().await;

        if store.posts.iter().any(|p| p.slug == slug) {
            return Err(Error::Conflict(format!(
                "A post with slug \"{slug}\" already exists."
            )));
        }

        let now = Utc::now();
        let created = Post {
            id: Uuid::now_v7(),
            title: post.title.clone(),
            slug: slug.to_string(),
            content: post.content.clone(),
            published: post.published,
            image_url: post.image_url.clone(),
            meta_description: post.meta_description.clone(),
            created_at: now,
            updated_at: now,
        };
        store.posts.push(created.clone());

        Ok(created)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostWithTags>> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| store.with_tags(p)))
    }

    async fn get_post_by_slug(
        &self,
        slug: &str,
        published_only: bool,
    ) -> Result<Option<PostWithTags>> {
        let store = self.store.read().await;
        Ok(store
            .posts
            .iter()
            .find(|p| p.slug == slug && (!published_only || p.published))
            .map(|p| store.with_tags(p)))
    }

    async fn get_posts(&self, filter: &PostFilter) -> Result<Vec<PostWithTags>> {
        let store = self.store.read().await;

        let mut posts: Vec<&Post> = store
            .posts
            .iter()
            .rev()
            .filter(|p| filter.published.map_or(true, |published| p.published == published))
            .filter(|p| filter.tag.as_deref().map_or(true, |tag| store.has_tag(p.id, tag)))
            .collect();
        posts.sort_by_key(|p| Reverse(p.created_at));

        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = filter
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        Ok(posts
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|p| store.with_tags(p))
            .collect())
    }

    async fn count_posts(&self, published: Option<bool>) -> Result<i64> {
        let store = self.store.read().await;
        let count = store
            .posts
            .iter()
            .filter(|p| published.map_or(true, |published| p.published == published))
            .count();

        Ok(count as i64)
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<PostWithTags> {
        let mut store = self.store.write().await;

        let index = store
            .posts
            .iter()
            .position(|p| p.id == post_id)
            .ok_or(Error::NotFound)?;

        {
            let post = &mut store.posts[index];
            post.title = changes.title.clone();
            post.content = changes.content.clone();
            post.published = changes.published;
            post.image_url = changes.image_url.clone();
            post.meta_description = changes.meta_description.clone();
            post.updated_at = Utc::now();
        }

        store.post_tags.retain(|(p, _)| *p != post_id);
        for name in &changes.tags {
            let existing = store.tags.iter().find(|t| &t.name == name).map(|t| t.id);
            let tag_id = match existing {
                Some(id) => id,
                None => {
                    let tag = Tag {
                        id: Uuid::now_v7(),
                        name: name.clone(),
                    };
                    let id = tag.id;
                    store.tags.push(tag);
                    id
                }
            };
            if !store.post_tags.contains(&(post_id, tag_id)) {
                store.post_tags.push((post_id, tag_id));
            }
        }

        let post = &store.posts[index];
        Ok(store.with_tags(post))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;

        let before = store.posts.len();
        store.posts.retain(|p| p.id != post_id);
        if store.posts.len() == before {
            return Err(Error::NotFound);
        }
        store.post_tags.retain(|(p, _)| *p != post_id);

        Ok(())
    }
}

#[async_trait]
impl TagsRepository for InMemoryRepo {
    async fn get_tags(&self) -> Result<Vec<Tag>> {
        let store = self.store.read().await;
        let mut tags = store.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tags_with_counts(&self, published_only: bool) -> Result<Vec<TagWithCount>> {
        let store = self.store.read().await;

        let mut tags: Vec<TagWithCount> = store
            .tags
            .iter()
            .map(|tag| {
                let post_count = store
                    .post_tags
                    .iter()
                    .filter(|(_, t)| *t == tag.id)
                    .filter(|(p, _)| {
                        store
                            .posts
                            .iter()
                            .any(|post| post.id == *p && (!published_only || post.published))
                    })
                    .count();
                TagWithCount {
                    id: tag.id,
                    name: tag.name.clone(),
                    post_count: post_count as i64,
                }
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags)
    }

    async fn find_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        let store = self.store.read().await;
        Ok(store.tags.iter().find(|t| t.id == tag_id).cloned())
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let store = self.store.read().await;
        Ok(store.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        let mut store = self.store.write().await;

        if store.tags.iter().any(|t| t.name == name) {
            return Err(duplicate(name));
        }

        let tag = Tag {
            id: Uuid::now_v7(),
            name: name.to_string(),
        };
        store.tags.push(tag.clone());

        Ok(tag)
    }

    async fn rename_tag(&self, tag_id: Uuid, name: &str) -> Result<Tag> {
        let mut store = self.store.write().await;

        if store.tags.iter().any(|t| t.name == name && t.id != tag_id) {
            return Err(duplicate(name));
        }

        let tag = store
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or(Error::NotFound)?;
        tag.name = name.to_string();

        Ok(tag.clone())
    }

    async fn delete_tag(&self, tag_id: Uuid) -> Result<()> {
        let mut store = self.store.write().await;

        let before = store.tags.len();
        store.tags.retain(|t| t.id != tag_id);
        if store.tags.len() == before {
            return Err(Error::NotFound);
        }
        store.post_tags.retain(|(_, t)| *t != tag_id);

        Ok(())
    }
}
