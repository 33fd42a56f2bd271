mod object_store;
mod record_repository;

pub use object_store::{ObjectStore, StorageError};
pub use record_repository::{RecordRepository, RecordUpdate, RejectedRecord, RepositoryError};

#[cfg(test)]
pub use object_store::MockObjectStore;
#[cfg(test)]
pub use record_repository::MockRecordRepository;
