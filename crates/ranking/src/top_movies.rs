//! Top-rated movies with a minimum number of votes.
//!
//! ## Algorithm
//! 1. Group ratings by movieId: mean rating (`avgRating`) and count (`n`)
//! 2. Keep groups with `n >= min_votes`
//! 3. Sort by `avgRating` desc, then `n` desc
//! 4. Take the first `top_n`
//! 5. Join each group to its movie document for the title (inner join:
//!    groups with no matching movie are dropped)

use bson::Bson;
use data_loader::{EntityKind, MovieId};
use pipeline::{Accumulator, AggregationPipeline, Direction, Projection};
use serde::{Deserialize, Serialize};
use store::DocumentStore;
use tracing::info;

use crate::error::Result;

/// Parameters of the ranking query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopMoviesQuery {
    /// Minimum number of ratings a movie needs to be ranked
    pub min_votes: u64,
    /// Maximum number of results
    pub top_n: u64,
}

impl Default for TopMoviesQuery {
    fn default() -> Self {
        Self {
            min_votes: 1000,
            top_n: 10,
        }
    }
}

/// One entry of the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub avg_rating: f64,
    /// Number of ratings
    pub n: u64,
}

/// The aggregation pipeline run against the ratings collection
pub fn ranking_pipeline(query: &TopMoviesQuery) -> AggregationPipeline {
    let min_votes = Bson::Int64(i64::try_from(query.min_votes).unwrap_or(i64::MAX));

    AggregationPipeline::new()
        .group(
            "movieId",
            [
                ("avgRating", Accumulator::Avg("rating".to_string())),
                ("n", Accumulator::Count),
            ],
        )
        .match_gte("n", min_votes)
        .sort([("avgRating", Direction::Descending), ("n", Direction::Descending)])
        .limit(query.top_n)
        .lookup(EntityKind::Movie.collection(), "_id", "movieId", "movie")
        .unwind("movie")
        .project([
            ("_id", Projection::Exclude),
            ("movieId", Projection::Path("_id".to_string())),
            ("title", Projection::Path("movie.title".to_string())),
            ("avgRating", Projection::Include),
            ("n", Projection::Include),
        ])
}

/// Run the ranking query.
///
/// Returns at most `query.top_n` movies, best first. Nothing is returned
/// unless the whole aggregation succeeds.
pub fn top_movies(store: &dyn DocumentStore, query: &TopMoviesQuery) -> Result<Vec<RankedMovie>> {
    // a zero limit is rejected by document stores; the answer is known anyway
    if query.top_n == 0 {
        return Ok(Vec::new());
    }

    let documents = store.aggregate(EntityKind::Rating.collection(), &ranking_pipeline(query))?;
    let ranked = documents
        .into_iter()
        .map(bson::from_document::<RankedMovie>)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        "Ranked {} movies (min_votes: {}, top_n: {})",
        ranked.len(),
        query.min_votes,
        query.top_n
    );
    Ok(ranked)
}
