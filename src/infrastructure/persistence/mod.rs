mod json_snapshot_repository;
mod postgres_record_repository;

pub use json_snapshot_repository::JsonSnapshotRepository;
pub use postgres_record_repository::PostgresRecordRepository;
