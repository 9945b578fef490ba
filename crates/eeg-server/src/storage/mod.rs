//! Record storage: MySQL for deployments, memory for simulation and tests

pub mod memory;
pub mod mysql;
pub mod traits;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use traits::{HistoryStore, PersistenceSink, SessionStore, StorageError, StorageResult};
