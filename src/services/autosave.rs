//! Debounced background saving of in-progress post edits.
//!
//! Each submitted draft replaces the pending one for its post. A single
//! worker per post waits until no new draft has arrived for the quiet
//! period and then writes only the newest one.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::posts::PostChanges;

use super::posts::PostsService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutosaveStatus {
    Unsaved,
    Saving,
    Saved,
    Failed,
}

impl AutosaveStatus {
    pub fn message(self) -> &'static str {
        match self {
            Self::Unsaved => "Unsaved changes...",
            Self::Saving => "Saving...",
            Self::Saved => "All changes saved",
            Self::Failed => "Error saving!",
        }
    }
}

struct Draft {
    pending: Option<PostChanges>,
    // Bumped on every submission; a worker only saves once it stops moving.
    generation: u64,
    status: AutosaveStatus,
    worker: Option<u64>,
}

#[derive(Default)]
struct Drafts {
    by_post: HashMap<Uuid, Draft>,
    next_worker: u64,
}

#[derive(Clone)]
pub struct Autosaver {
    posts: PostsService,
    debounce: Duration,
    drafts: Arc<Mutex<Drafts>>,
}

impl Autosaver {
    pub fn new(posts: PostsService, debounce: Duration) -> Self {
        Self {
            posts,
            debounce,
            drafts: Arc::new(Mutex::new(Drafts::default())),
        }
    }

    /// Queues `changes` as the latest state of the post.
    pub async fn submit(&self, post_id: Uuid, changes: PostChanges) -> AutosaveStatus {
        let mut drafts = self.drafts.lock().await;
        let drafts = &mut *drafts;

        let draft = drafts.by_post.entry(post_id).or_insert_with(|| Draft {
            pending: None,
            generation: 0,
            status: AutosaveStatus::Saved,
            worker: None,
        });
        draft.pending = Some(changes);
        draft.generation += 1;
        draft.status = AutosaveStatus::Unsaved;

        if draft.worker.is_none() {
            let worker = drafts.next_worker;
            drafts.next_worker += 1;
            draft.worker = Some(worker);

            debug!(post_id = %post_id, worker, "autosave worker started");
            tokio::spawn(self.clone().run(post_id, worker));
        }

        draft.status
    }

    /// Status of the post's last edit. A post without pending edits counts
    /// as saved.
    pub async fn status(&self, post_id: Uuid) -> AutosaveStatus {
        self.drafts
            .lock()
            .await
            .by_post
            .get(&post_id)
            .map(|d| d.status)
            .unwrap_or(AutosaveStatus::Saved)
    }

    /// Drops any pending draft, e.g. once the post was saved explicitly or
    /// deleted. A save already in flight still completes.
    pub async fn discard(&self, post_id: Uuid) {
        self.drafts.lock().await.by_post.remove(&post_id);
    }

    async fn run(self, post_id: Uuid, worker: u64) {
        loop {
            let seen = {
                let drafts = self.drafts.lock().await;
                match drafts.by_post.get(&post_id) {
                    Some(draft) if draft.worker == Some(worker) => draft.generation,
                    _ => return,
                }
            };

            tokio::time::sleep(self.debounce).await;

            let changes = {
                let mut drafts = self.drafts.lock().await;
                let Some(draft) = drafts.by_post.get_mut(&post_id) else {
                    return;
                };
                if draft.worker != Some(worker) {
                    return;
                }
                if draft.generation != seen {
                    continue;
                }
                match draft.pending.take() {
                    Some(changes) => {
                        draft.status = AutosaveStatus::Saving;
                        changes
                    }
                    None => {
                        draft.worker = None;
                        return;
                    }
                }
            };

            let result = self.posts.update_post(post_id, &changes).await;

            let mut drafts = self.drafts.lock().await;
            let Some(draft) = drafts.by_post.get_mut(&post_id) else {
                return;
            };
            if draft.worker != Some(worker) {
                return;
            }

            // Newer edits arrived while saving; go around again for them.
            if draft.pending.is_some() {
                if let Err(err) = result {
                    warn!(post_id = %post_id, "autosave failed: {}", err.message());
                }
                continue;
            }

            match result {
                Ok(_) => {
                    debug!(post_id = %post_id, "autosaved");
                    // A missing entry reads as saved.
                    drafts.by_post.remove(&post_id);
                }
                Err(err) => {
                    warn!(post_id = %post_id, "autosave failed: {}", err.message());
                    draft.status = AutosaveStatus::Failed;
                    draft.worker = None;
                }
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        models::posts::{NewPost, Post, PostWithTags},
        repositories::{InMemoryRepo, PostFilter, PostsRepository},
        Result,
    };

    const DEBOUNCE: Duration = Duration::from_millis(2500);

    /// Counts writes on top of the in-memory store.
    #[derive(Default)]
    struct CountingRepo {
        inner: InMemoryRepo,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl PostsRepository for CountingRepo {
        async fn create_post(&self, post: &NewPost, slug: &str) -> Result<Post> {
            self.inner.create_post(post, slug).await
        }
        async fn get_post(&self, post_id: Uuid) -> Result<Option<PostWithTags>> {
            self.inner.get_post(post_id).await
        }
        async fn get_post_by_slug(
            &self,
            slug: &str,
            published_only: bool,
        ) -> Result<Option<PostWithTags>> {
            self.inner.get_post_by_slug(slug, published_only).await
        }
        async fn get_posts(&self, filter: &PostFilter) -> Result<Vec<PostWithTags>> {
            self.inner.get_posts(filter).await
        }
        async fn count_posts(&self, published: Option<bool>) -> Result<i64> {
            self.inner.count_posts(published).await
        }
        async fn update_post(
            &self,
            post_id: Uuid,
            changes: &PostChanges,
        ) -> Result<PostWithTags> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update_post(post_id, changes).await
        }
        async fn delete_post(&self, post_id: Uuid) -> Result<()> {
            self.inner.delete_post(post_id).await
        }
    }

    async fn setup() -> (Arc<CountingRepo>, Autosaver, Uuid) {
        let repo = Arc::new(CountingRepo::default());
        let posts = PostsService::new(repo.clone());
        let post = posts
            .create_post(NewPost {
                title: "Draft".into(),
                content: "<p>v0</p>".into(),
                published: false,
                image_url: None,
                meta_description: None,
            })
            .await
            .unwrap();

        (repo, Autosaver::new(posts, DEBOUNCE), post.id)
    }

    fn edit(content: &str) -> PostChanges {
        PostChanges {
            title: "Draft".into(),
            content: content.into(),
            published: false,
            image_url: None,
            meta_description: None,
            tags: Vec::new(),
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_is_saved_once_with_the_latest_state() {
        let (repo, autosaver, post_id) = setup().await;

        for i in 1..=5 {
            let status = autosaver.submit(post_id, edit(&format!("<p>v{i}</p>"))).await;
            assert_eq!(status, AutosaveStatus::Unsaved);
            tokio::time::sleep(Duration::from_millis(1000)).await;
        }
        assert_eq!(repo.updates.load(Ordering::SeqCst), 0);
        assert_eq!(autosaver.status(post_id).await, AutosaveStatus::Unsaved);

        tokio::time::sleep(DEBOUNCE * 2).await;
        settle().await;

        assert_eq!(repo.updates.load(Ordering::SeqCst), 1);
        assert_eq!(autosaver.status(post_id).await, AutosaveStatus::Saved);
        let saved = repo.inner.get_post(post_id).await.unwrap().unwrap();
        assert_eq!(saved.post.content, "<p>v5</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn edits_separated_by_quiet_periods_are_saved_separately() {
        let (repo, autosaver, post_id) = setup().await;

        autosaver.submit(post_id, edit("<p>a</p>")).await;
        tokio::time::sleep(DEBOUNCE * 2).await;
        settle().await;
        autosaver.submit(post_id, edit("<p>b</p>")).await;
        tokio::time::sleep(DEBOUNCE * 2).await;
        settle().await;

        assert_eq!(repo.updates.load(Ordering::SeqCst), 2);
        let saved = repo.inner.get_post(post_id).await.unwrap().unwrap();
        assert_eq!(saved.post.content, "<p>b</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn saved_posts_stop_being_tracked() {
        let (_, autosaver, post_id) = setup().await;

        autosaver.submit(post_id, edit("<p>a</p>")).await;
        assert_eq!(autosaver.drafts.lock().await.by_post.len(), 1);

        tokio::time::sleep(DEBOUNCE * 2).await;
        settle().await;

        assert!(autosaver.drafts.lock().await.by_post.is_empty());
        assert_eq!(autosaver.status(post_id).await, AutosaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_reported_without_retry() {
        let (repo, autosaver, _) = setup().await;
        let missing = Uuid::now_v7();

        autosaver.submit(missing, edit("<p>x</p>")).await;
        tokio::time::sleep(DEBOUNCE * 4).await;
        settle().await;

        assert_eq!(repo.updates.load(Ordering::SeqCst), 1);
        assert_eq!(autosaver.status(missing).await, AutosaveStatus::Failed);
        assert_eq!(AutosaveStatus::Failed.message(), "Error saving!");
    }

    #[tokio::test(start_paused = true)]
    async fn discarded_drafts_are_never_written() {
        let (repo, autosaver, post_id) = setup().await;

        autosaver.submit(post_id, edit("<p>stale</p>")).await;
        autosaver.discard(post_id).await;
        tokio::time::sleep(DEBOUNCE * 2).await;
        settle().await;

        assert_eq!(repo.updates.load(Ordering::SeqCst), 0);
        assert_eq!(autosaver.status(post_id).await, AutosaveStatus::Saved);
    }
}
