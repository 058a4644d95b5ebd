use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    models::{
        posts::{NewPost, Post, PostChanges, PostWithTags},
        tags::Tag,
    },
    Error, Result,
};

use super::{is_unique_violation, PostFilter, PostgresRepo};

const POST_COLUMNS: &str =
    "p.id, p.title, p.slug, p.content, p.published, p.image_url, p.meta_description, p.created_at, p.updated_at";

#[async_trait]
pub trait PostsRepository: Sync + Send {
    async fn create_post(&self, post: &NewPost, slug: &str) -> Result<Post>;
    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostWithTags>>;
    async fn get_post_by_slug(
        &self,
        slug: &str,
        published_only: bool,
    ) -> Result<Option<PostWithTags>>;
    async fn get_posts(&self, filter: &PostFilter) -> Result<Vec<PostWithTags>>;
    async fn count_posts(&self, published: Option<bool>) -> Result<i64>;
    /// Replaces the post's editable fields and its whole tag set; tags that
    /// do not exist yet are created.
    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<PostWithTags>;
    async fn delete_post(&self, post_id: Uuid) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
}

impl PostgresRepo {
    async fn attach_tags(&self, posts: Vec<Post>) -> Result<Vec<PostWithTags>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_post.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let tags = by_post.remove(&post.id).unwrap_or_default();
                PostWithTags { post, tags }
            })
            .collect())
    }

    async fn with_tags(&self, post: Option<Post>) -> Result<Option<PostWithTags>> {
        match post {
            Some(post) => Ok(self.attach_tags(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PostsRepository for PostgresRepo {
    async fn create_post(&self, post: &NewPost, slug: &str) -> Result<Post> {
        let now = Utc::now();

        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, slug, content, published, image_url, meta_description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, title, slug, content, published, image_url, meta_description, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&post.title)
        .bind(slug)
        .bind(&post.content)
        .bind(post.published)
        .bind(&post.image_url)
        .bind(&post.meta_description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                Error::Conflict(format!("A post with slug \"{slug}\" already exists."))
            } else {
                err.into()
            }
        })
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<PostWithTags>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_tags(post).await
    }

    async fn get_post_by_slug(
        &self,
        slug: &str,
        published_only: bool,
    ) -> Result<Option<PostWithTags>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.slug = $1 AND ($2 = FALSE OR p.published)"
        ))
        .bind(slug)
        .bind(published_only)
        .fetch_optional(&self.pool)
        .await?;

        self.with_tags(post).await
    }

    async fn get_posts(&self, filter: &PostFilter) -> Result<Vec<PostWithTags>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE TRUE"
        ));

        if let Some(published) = filter.published {
            qb.push(" AND p.published = ").push_bind(published);
        }
        if let Some(tag) = &filter.tag {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND t.name = ",
            )
            .push_bind(tag.clone())
            .push(")");
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if filter.offset > 0 {
            qb.push(" OFFSET ").push_bind(filter.offset);
        }

        let posts = qb.build_query_as::<Post>().fetch_all(&self.pool).await?;

        self.attach_tags(posts).await
    }

    async fn count_posts(&self, published: Option<bool>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE ($1::BOOLEAN IS NULL OR published = $1)",
        )
        .bind(published)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<PostWithTags> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $2,
                content = $3,
                published = $4,
                image_url = $5,
                meta_description = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, slug, content, published, image_url, meta_description, created_at, updated_at
            "#,
        )
        .bind(post_id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(changes.published)
        .bind(&changes.image_url)
        .bind(&changes.meta_description)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound)?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let mut tags = Vec::with_capacity(changes.tags.len());
        for name in &changes.tags {
            let tag = sqlx::query_as::<_, Tag>(
                r#"
                INSERT INTO tags (id, name)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;

            if !tags.iter().any(|t: &Tag| t.id == tag.id) {
                tags.push(tag);
            }
        }

        tx.commit().await?;

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(PostWithTags { post, tags })
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
