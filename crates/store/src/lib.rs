//! Storage collaborators for the movie document store.
//!
//! - **traits**: `DocumentStore` (bulk insert, delete-all, index creation,
//!   aggregation) and `IndexSpec`
//! - **memory**: `MemoryStore`, an in-process implementation
//! - **mongo**: `MongoStore`, backed by the blocking MongoDB driver
//! - **error**: `StoreError`

pub mod error;
pub mod traits;
pub mod memory;
pub mod mongo;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use traits::{DocumentStore, IndexSpec};
