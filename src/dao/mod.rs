/// Persisted snapshot models.
pub mod models;
/// Session snapshot persistence backends.
pub mod snapshot_store;
/// Storage error types shared by the backends.
pub mod storage;
