//! Core domain types for the MovieLens document store.
//!
//! This module defines the three document shapes written to the store
//! (movies, ratings, users), the entity kinds that tie a shape to its
//! collection and source file, and the raw row handed over by a record source.

use bson::{DateTime, Document};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{DataLoadError, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = i32;

/// Unique identifier for a movie
pub type MovieId = i32;

// =============================================================================
// Entity Kinds
// =============================================================================

/// One category of document, with its own collection and load routine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Movie,
    Rating,
    User,
}

impl EntityKind {
    /// Load order used by the orchestrator
    pub const ALL: [EntityKind; 3] = [EntityKind::Movie, EntityKind::Rating, EntityKind::User];

    /// Name of the store collection holding this kind
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Movie => "movies",
            EntityKind::Rating => "ratings",
            EntityKind::User => "users",
        }
    }

    /// Default CSV file name inside the data directory
    pub fn file_name(self) -> &'static str {
        match self {
            EntityKind::Movie => "movies.csv",
            EntityKind::Rating => "ratings.csv",
            EntityKind::User => "users.csv",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Movie => "movie",
            EntityKind::Rating => "rating",
            EntityKind::User => "user",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Raw Rows
// =============================================================================

/// One row from a delimited-text source: field name to raw string value.
///
/// `line` is the 1-based line number in the source, used in error reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub line: usize,
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new<K, V>(line: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a field, `None` when the column is absent
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Raw value of a field, `None` when absent or blank
    pub fn non_blank(&self, field: &str) -> Option<&str> {
        self.get(field).filter(|value| !value.trim().is_empty())
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A movie document. `movieId` is unique within the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub movie_id: MovieId,
    pub title: String,
    /// `None` when the source field is blank; stored as null
    pub year: Option<i32>,
    pub genres: Vec<String>,
}

/// A rating fact. No identity of its own and no uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
    /// Epoch seconds from the source, interpreted as UTC
    pub ts: DateTime,
}

/// A user document. `userId` is unique within the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    /// Midnight UTC of the source `YYYY-MM-DD` date
    pub join_date: Option<DateTime>,
    pub country: Option<String>,
    pub age: Option<i32>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub genres: Vec<String>,
}

/// The output of the transformer: exactly one typed document per row
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Movie(Movie),
    Rating(Rating),
    User(User),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Movie(_) => EntityKind::Movie,
            Record::Rating(_) => EntityKind::Rating,
            Record::User(_) => EntityKind::User,
        }
    }

    /// Encode as the BSON document submitted to the store
    pub fn to_document(&self) -> Result<Document> {
        let encoded = match self {
            Record::Movie(movie) => bson::to_document(movie),
            Record::Rating(rating) => bson::to_document(rating),
            Record::User(user) => bson::to_document(user),
        };
        encoded.map_err(|source| DataLoadError::Encode {
            kind: self.kind(),
            source,
        })
    }
}
