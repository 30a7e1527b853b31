//! Read-only analytical queries over the loaded movie data.
//!
//! The only query today is `top_movies`: per-movie rating statistics,
//! filtered by a minimum vote count, ranked, and joined back to the movie
//! titles. The whole computation is an aggregation pipeline run by the store.

pub mod error;
pub mod top_movies;

pub use error::{RankingError, Result};
pub use top_movies::{ranking_pipeline, top_movies, RankedMovie, TopMoviesQuery};
