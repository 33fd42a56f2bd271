//! Postgres record repository tests against a real database container.
//!
//! These need a Docker daemon: `cargo test -- --ignored`.

use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use testcontainers_modules::{postgres::Postgres, testcontainers::runners::AsyncRunner};

use folio_reconcile::application::ports::{RecordRepository, RecordUpdate, RepositoryError};
use folio_reconcile::application::reconcile::{ExecutionMode, ReconcileConfig};
use folio_reconcile::application::use_cases::{
    AuditCurrentUseCase, DeduplicateStorageUseCase, FixGalleryOrderUseCase,
};
use folio_reconcile::infrastructure::persistence::PostgresRecordRepository;
use folio_reconcile::infrastructure::storage::LocalFilesystemStore;

pub struct TestEnvironment {
    pub pool: PgPool,
    pub records: Arc<dyn RecordRepository>,
    _container: testcontainers::ContainerAsync<Postgres>,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let container = Postgres::default()
            .start()
            .await
            .expect("Failed to start PostgreSQL container");

        let host = container.get_host().await.expect("Failed to get container host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get container port");
        let database_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let records: Arc<dyn RecordRepository> =
            Arc::new(PostgresRecordRepository::new(pool.clone()));

        Self {
            pool,
            records,
            _container: container,
        }
    }

    pub async fn seed(&self) {
        let statements = [
            r#"INSERT INTO gallery (id, img, name, "order") VALUES
                ('g1', 'https://h/v0/b/x/o/images%2Fheron.jpg?alt=media', 'Heron', 4),
                ('g2', 'https://h/v0/b/x/o/images%2Ffox.jpg?alt=media', 'Fox', NULL),
                ('g3', NULL, 'Empty', NULL)"#,
            r#"INSERT INTO blog (id, title, thumbnail, albums) VALUES
                ('b1', 'Coast', 'https://h/v0/b/x/o/images%2Fcoast.jpg?alt=media',
                 '[{"photos": ["https://h/v0/b/x/o/images%2Fdunes.jpg?alt=media"]}]')"#,
            "INSERT INTO current_sections (id, title) VALUES ('s1', 'Reading')",
            r#"INSERT INTO current_items (id, section_id, title, "order") VALUES
                ('i2', 's1', 'Second', 2),
                ('i1', 's1', 'First', 1),
                ('i3', 'gone', 'Orphan', 0)"#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .unwrap_or_else(|e| panic!("Failed to seed: {e}\nStatement: {statement}"));
        }
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_lists_every_collection() {
    let env = TestEnvironment::new().await;
    env.seed().await;

    let gallery = env.records.list_gallery().await.unwrap();
    assert_eq!(gallery.len(), 3);
    assert_eq!(gallery[0].order, Some(4));
    assert_eq!(gallery[1].order, None);

    let blog = env.records.list_blog().await.unwrap();
    assert_eq!(blog.len(), 1);
    assert_eq!(blog[0].references().len(), 2);

    let items = env.records.list_current_items().await.unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["i3", "i1", "i2"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_apply_updates_writes_every_field() {
    let env = TestEnvironment::new().await;
    env.seed().await;

    let albums = json!([["https://h/v0/b/x/o/old%2Fdunes.jpg?alt=media"]]);
    env.records
        .apply_updates(&[
            RecordUpdate::GalleryImage {
                record_id: "g2".to_string(),
                url: "new-url".to_string(),
            },
            RecordUpdate::GalleryOrder {
                record_id: "g2".to_string(),
                order: 5,
            },
            RecordUpdate::BlogThumbnail {
                record_id: "b1".to_string(),
                url: "thumb-url".to_string(),
            },
            RecordUpdate::BlogAlbums {
                record_id: "b1".to_string(),
                albums: albums.clone(),
            },
        ])
        .await
        .unwrap();

    let gallery = env.records.list_gallery().await.unwrap();
    assert_eq!(gallery[1].img.as_deref(), Some("new-url"));
    assert_eq!(gallery[1].order, Some(5));

    let blog = env.records.list_blog().await.unwrap();
    assert_eq!(blog[0].thumbnail.as_deref(), Some("thumb-url"));
    assert_eq!(blog[0].albums, Some(albums));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_apply_updates_rolls_back_on_unknown_record() {
    let env = TestEnvironment::new().await;
    env.seed().await;

    let result = env
        .records
        .apply_updates(&[
            RecordUpdate::GalleryImage {
                record_id: "g1".to_string(),
                url: "changed".to_string(),
            },
            RecordUpdate::BlogThumbnail {
                record_id: "missing".to_string(),
                url: "x".to_string(),
            },
        ])
        .await;

    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    let gallery = env.records.list_gallery().await.unwrap();
    assert_eq!(
        gallery[0].img.as_deref(),
        Some("https://h/v0/b/x/o/images%2Fheron.jpg?alt=media")
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_use_cases_over_postgres() {
    let env = TestEnvironment::new().await;
    env.seed().await;

    let orders = FixGalleryOrderUseCase::new(env.records.clone())
        .execute(ExecutionMode::Live)
        .await
        .unwrap();
    let assigned: Vec<(&str, i64)> = orders
        .assignments
        .iter()
        .map(|a| (a.record_id.as_str(), a.order))
        .collect();
    assert_eq!(assigned, vec![("g2", 5), ("g3", 6)]);

    let current = AuditCurrentUseCase::new(env.records.clone())
        .execute()
        .await
        .unwrap();
    assert_eq!(current.orphans.len(), 1);

    let bucket = tempfile::TempDir::new().unwrap();
    tokio::fs::create_dir_all(bucket.path().join("images"))
        .await
        .unwrap();
    tokio::fs::write(bucket.path().join("images/heron.jpg"), b"same")
        .await
        .unwrap();
    tokio::fs::write(bucket.path().join("images/heron-2.jpg"), b"same")
        .await
        .unwrap();
    let store = Arc::new(LocalFilesystemStore::with_durability(
        bucket.path().to_path_buf(),
        false,
    ));

    let report = DeduplicateStorageUseCase::new(env.records.clone(), store)
        .execute(&ReconcileConfig::new("images/", ExecutionMode::Live))
        .await
        .unwrap();
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.deleted[0].path.as_str(), "images/heron-2.jpg");
    assert!(bucket.path().join("images/heron.jpg").exists());
}
