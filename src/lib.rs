pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use domain::model::{Resource, ResourceModel};
pub use infra::config::{Config, StorageBackend};
pub use storage::{MemoryStorage, PgStorage, Storage, StoreError};
