//! Document persistence

pub mod document;
#[cfg(feature = "sqlx")]
pub mod init;
pub mod memory;
#[cfg(feature = "sqlx")]
pub mod sqlite;

pub use document::*;
#[cfg(feature = "sqlx")]
pub use init::*;
pub use memory::MemoryDocumentStore;
#[cfg(feature = "sqlx")]
pub use sqlite::SqliteDocumentStore;
