//! # Data Loader Crate
//!
//! Reads the MovieLens CSV exports and turns each row into the typed
//! document that gets written to the store.
//!
//! ## Main Components
//!
//! - **types**: Entity kinds, raw rows and the Movie/Rating/User documents
//! - **parser**: The record transformer (raw row -> typed document)
//! - **source**: Lazy CSV record source
//! - **error**: Error types for reading and transforming rows
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{CsvRecordSource, EntityKind, transform};
//! use std::path::Path;
//!
//! for row in CsvRecordSource::open(Path::new("data/movies.csv"))? {
//!     let record = transform(EntityKind::Movie, &row?)?;
//!     let document = record.to_document()?;
//! }
//! ```

pub mod error;
pub mod types;
pub mod parser;
pub mod source;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use parser::{transform, NO_GENRES_SENTINEL};
pub use source::CsvRecordSource;
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    // Core types
    EntityKind,
    RawRow,
    Record,
    Movie,
    Rating,
    User,
    Preferences,
};
