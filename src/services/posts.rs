use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    markdown,
    models::{
        posts::{DashboardStats, NewPost, Post, PostCard, PostChanges, PostWithTags},
        query::{Page, POSTS_PER_PAGE},
    },
    repositories::{PostFilter, PostsRepository},
    slug::unique_slug,
    Error, Result,
};

const EXCERPT_CHARS: usize = 150;

#[derive(Clone)]
pub struct PostsService {
    repo: Arc<dyn PostsRepository>,
}

impl PostsService {
    pub fn new(repo: Arc<dyn PostsRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_post(&self, post: NewPost) -> Result<Post> {
        let slug = unique_slug(&post.title);
        let created = self.repo.create_post(&post, &slug).await?;

        info!(post_id = %created.id, slug = %created.slug, "post created");
        Ok(created)
    }

    /// Every post, newest first.
    pub async fn get_posts(&self) -> Result<Vec<PostWithTags>> {
        self.repo.get_posts(&PostFilter::default()).await
    }

    /// Every post (drafts included) carrying `tag_name`.
    pub async fn get_posts_by_tag(&self, tag_name: &str) -> Result<Vec<PostWithTags>> {
        self.repo
            .get_posts(&PostFilter::default().with_tag(tag_name))
            .await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostWithTags> {
        self.repo.get_post(post_id).await?.ok_or(Error::NotFound)
    }

    pub async fn get_published_post(&self, slug: &str) -> Result<PostWithTags> {
        self.repo
            .get_post_by_slug(slug, true)
            .await?
            .ok_or(Error::NotFound)
    }

    /// One page of the public listing.
    pub async fn get_published_page(&self, page: i64) -> Result<Page<PostCard>> {
        let offset = Page::<()>::offset(page, POSTS_PER_PAGE);
        let filter = PostFilter::published().paginate(offset, POSTS_PER_PAGE);

        let (posts, total) = tokio::try_join!(
            self.repo.get_posts(&filter),
            self.repo.count_posts(Some(true)),
        )?;

        Ok(Page::new(posts, page, POSTS_PER_PAGE, total).map(to_card))
    }

    pub async fn get_published_by_tag(&self, tag_name: &str) -> Result<Vec<PostCard>> {
        let posts = self
            .repo
            .get_posts(&PostFilter::published().with_tag(tag_name))
            .await?;

        Ok(posts.into_iter().map(to_card).collect())
    }

    pub async fn get_all_published(&self) -> Result<Vec<PostWithTags>> {
        self.repo.get_posts(&PostFilter::published()).await
    }

    pub async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<PostWithTags> {
        let updated = self.repo.update_post(post_id, changes).await?;

        info!(post_id = %post_id, tags = updated.tags.len(), "post updated");
        Ok(updated)
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        self.repo.delete_post(post_id).await?;

        info!(post_id = %post_id, "post deleted");
        Ok(())
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (total_posts, published_posts, draft_posts) = tokio::try_join!(
            self.repo.count_posts(None),
            self.repo.count_posts(Some(true)),
            self.repo.count_posts(Some(false)),
        )?;

        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts,
        })
    }
}

fn to_card(post: PostWithTags) -> PostCard {
    let excerpt = markdown::excerpt(&post.post.content, EXCERPT_CHARS);
    PostCard { post, excerpt }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryRepo;

    fn service() -> PostsService {
        PostsService::new(Arc::new(InMemoryRepo::new()))
    }

    fn new_post(title: &str, published: bool) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: format!("<p>{title} body</p>"),
            published,
            image_url: None,
            meta_description: None,
        }
    }

    #[tokio::test]
    async fn created_posts_get_a_slug_from_the_title() {
        let posts = service();
        let post = posts.create_post(new_post("Hello World", false)).await.unwrap();

        assert!(post.slug.starts_with("hello-world-"));
        assert_eq!(post.slug.len(), "hello-world-".len() + 6);
        assert!(!post.published);
    }

    #[tokio::test]
    async fn public_page_only_lists_published_posts() {
        let posts = service();
        for i in 0..8 {
            posts
                .create_post(new_post(&format!("Post {i}"), i % 4 != 0))
                .await
                .unwrap();
        }

        let first = posts.get_published_page(1).await.unwrap();
        assert_eq!(first.total_count, 6);
        assert_eq!(first.items.len(), 6);
        assert!(!first.has_next_page);
        assert!(!first.has_prev_page);
        assert!(first.items.iter().all(|c| c.post.post.published));
        assert_eq!(first.items[0].excerpt, "Post 7 body...");

        let second = posts.get_published_page(2).await.unwrap();
        assert!(second.items.is_empty());
        assert!(second.has_prev_page);
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_slug_lookup() {
        let posts = service();
        let draft = posts.create_post(new_post("Draft", false)).await.unwrap();

        assert!(matches!(
            posts.get_published_post(&draft.slug).await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn dashboard_counts_split_by_state() {
        let posts = service();
        posts.create_post(new_post("a", true)).await.unwrap();
        posts.create_post(new_post("b", false)).await.unwrap();
        posts.create_post(new_post("c", false)).await.unwrap();

        let stats = posts.dashboard_stats().await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_posts: 3,
                published_posts: 1,
                draft_posts: 2,
            }
        );
    }

    #[tokio::test]
    async fn update_replaces_tags() {
        let posts = service();
        let post = posts.create_post(new_post("Tagged", true)).await.unwrap();

        let mut changes = PostChanges {
            title: "Tagged".into(),
            content: post.content.clone(),
            published: true,
            image_url: None,
            meta_description: Some("desc".into()),
            tags: vec!["rust".into(), "axum".into()],
        };
        let updated = posts.update_post(post.id, &changes).await.unwrap();
        let names: Vec<_> = updated.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["axum", "rust"]);
        assert_eq!(updated.post.slug, post.slug);

        changes.tags = vec!["web".into()];
        posts.update_post(post.id, &changes).await.unwrap();

        assert_eq!(posts.get_posts_by_tag("rust").await.unwrap().len(), 0);
        assert_eq!(posts.get_published_by_tag("web").await.unwrap().len(), 1);
    }
}
