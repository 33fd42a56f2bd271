use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::application::ports::{RecordRepository, RecordUpdate, RepositoryError};
use crate::domain::entities::{BlogRecord, CurrentItem, CurrentSection, GalleryRecord};

pub struct PostgresRecordRepository {
    pool: PgPool,
}

impl PostgresRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepository for PostgresRecordRepository {
    async fn list_gallery(&self) -> Result<Vec<GalleryRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, GalleryRow>(
            r#"
            SELECT id, img, name, storage_name, "order"
            FROM gallery
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GalleryRow::into_domain).collect())
    }

    async fn list_blog(&self) -> Result<Vec<BlogRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, BlogRow>(
            r#"
            SELECT id, title, thumbnail, category, draft, created_at, albums
            FROM blog
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BlogRow::into_domain).collect())
    }

    async fn list_current_sections(&self) -> Result<Vec<CurrentSection>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT id, title FROM current_sections ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title)| CurrentSection { id, title })
            .collect())
    }

    async fn list_current_items(&self) -> Result<Vec<CurrentItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CurrentItemRow>(
            r#"
            SELECT id, section_id, title, "order"
            FROM current_items
            ORDER BY "order", id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CurrentItemRow::into_domain).collect())
    }

    async fn apply_updates(&self, updates: &[RecordUpdate]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for update in updates {
            let query = match update {
                RecordUpdate::GalleryImage { record_id, url } => {
                    sqlx::query("UPDATE gallery SET img = $2 WHERE id = $1")
                        .bind(record_id)
                        .bind(url)
                }
                RecordUpdate::GalleryOrder { record_id, order } => {
                    sqlx::query(r#"UPDATE gallery SET "order" = $2 WHERE id = $1"#)
                        .bind(record_id)
                        .bind(*order)
                }
                RecordUpdate::BlogThumbnail { record_id, url } => {
                    sqlx::query("UPDATE blog SET thumbnail = $2 WHERE id = $1")
                        .bind(record_id)
                        .bind(url)
                }
                RecordUpdate::BlogAlbums { record_id, albums } => {
                    sqlx::query("UPDATE blog SET albums = $2 WHERE id = $1")
                        .bind(record_id)
                        .bind(albums)
                }
            };

            let result = query.execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back the earlier updates
                return Err(RepositoryError::NotFound(update.record_id().to_string()));
            }
        }

        tx.commit().await?;
        debug!(updates = updates.len(), "Committed record updates");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct GalleryRow {
    id: String,
    img: Option<String>,
    name: Option<String>,
    storage_name: Option<String>,
    order: Option<i64>,
}

impl GalleryRow {
    fn into_domain(self) -> GalleryRecord {
        GalleryRecord {
            id: self.id,
            img: self.img,
            name: self.name,
            storage_name: self.storage_name,
            order: self.order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BlogRow {
    id: String,
    title: String,
    thumbnail: Option<String>,
    category: String,
    draft: bool,
    created_at: Option<DateTime<Utc>>,
    albums: Option<Value>,
}

impl BlogRow {
    fn into_domain(self) -> BlogRecord {
        BlogRecord {
            id: self.id,
            title: self.title,
            thumbnail: self.thumbnail,
            category: self.category,
            draft: self.draft,
            created_at: self.created_at,
            albums: self.albums,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CurrentItemRow {
    id: String,
    section_id: Option<String>,
    title: Option<String>,
    order: i64,
}

impl CurrentItemRow {
    fn into_domain(self) -> CurrentItem {
        CurrentItem {
            id: self.id,
            section_id: self.section_id,
            title: self.title,
            order: self.order,
        }
    }
}
