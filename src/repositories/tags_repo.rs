use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::tags::{Tag, TagWithCount},
    Error, Result,
};

use super::{is_unique_violation, PostgresRepo};

#[async_trait]
pub trait TagsRepository: Send + Sync {
    async fn get_tags(&self) -> Result<Vec<Tag>>;
    /// Tags ordered by name with the number of posts carrying them. With
    /// `published_only` only published posts are counted.
    async fn get_tags_with_counts(&self, published_only: bool) -> Result<Vec<TagWithCount>>;
    async fn find_tag(&self, tag_id: Uuid) -> Result<Option<Tag>>;
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    async fn create_tag(&self, name: &str) -> Result<Tag>;
    async fn rename_tag(&self, tag_id: Uuid, name: &str) -> Result<Tag>;
    /// Removes the tag and its post associations; the posts stay.
    async fn delete_tag(&self, tag_id: Uuid) -> Result<()>;
}

pub(crate) fn duplicate(name: &str) -> Error {
    Error::Conflict(format!("A tag named \"{name}\" already exists."))
}

#[async_trait]
impl TagsRepository for PostgresRepo {
    async fn get_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }

    async fn get_tags_with_counts(&self, published_only: bool) -> Result<Vec<TagWithCount>> {
        let tags = sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, COUNT(p.id) AS post_count
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN posts p ON p.id = pt.post_id AND ($1 = FALSE OR p.published)
            GROUP BY t.id, t.name
            ORDER BY t.name ASC
            "#,
        )
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    async fn find_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(tag_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(Uuid::now_v7())
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    duplicate(name)
                } else {
                    err.into()
                }
            })
    }

    async fn rename_tag(&self, tag_id: Uuid, name: &str) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(tag_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    duplicate(name)
                } else {
                    Error::from(err)
                }
            })?
            .ok_or(Error::NotFound)
    }

    async fn delete_tag(&self, tag_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
