//! Record transformer: one raw CSV row in, one typed document out.
//!
//! Source formats (header row first, comma-delimited):
//! - movies.csv: movieId,title,year,genres
//! - ratings.csv: userId,movieId,rating,timestamp
//! - users.csv: userId,name,joinDate,country,age,genres
//!
//! All functions here are pure. A required field that is missing or fails
//! numeric/date parsing yields `DataLoadError::MalformedRecord`; what to do
//! with that is the loader's decision.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use bson::DateTime;
use chrono::NaiveDate;
use std::str::FromStr;

/// Genre label MovieLens uses for "no genre"; dropped from movie documents only
pub const NO_GENRES_SENTINEL: &str = "(no genres listed)";

/// Date pattern for `joinDate`
pub const JOIN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Transform a raw row into the document for the given entity kind
pub fn transform(kind: EntityKind, row: &RawRow) -> Result<Record> {
    match kind {
        EntityKind::Movie => parse_movie(row).map(Record::Movie),
        EntityKind::Rating => parse_rating(row).map(Record::Rating),
        EntityKind::User => parse_user(row).map(Record::User),
    }
}

/// Parse a movies.csv row
pub fn parse_movie(row: &RawRow) -> Result<Movie> {
    let kind = EntityKind::Movie;
    let title = row
        .get("title")
        .ok_or_else(|| DataLoadError::malformed(kind, row.line, "title", ""))?;

    Ok(Movie {
        movie_id: required_number(kind, row, "movieId")?,
        title: title.to_string(),
        year: optional_number(kind, row, "year")?,
        genres: parse_movie_genres(row.get("genres").unwrap_or_default()),
    })
}

/// Parse a ratings.csv row
pub fn parse_rating(row: &RawRow) -> Result<Rating> {
    let kind = EntityKind::Rating;
    let rating: f64 = required_number(kind, row, "rating")?;
    if !rating.is_finite() {
        return Err(DataLoadError::malformed(
            kind,
            row.line,
            "rating",
            rating.to_string(),
        ));
    }

    let seconds: i64 = required_number(kind, row, "timestamp")?;
    let ts = chrono::DateTime::from_timestamp(seconds, 0)
        .map(DateTime::from_chrono)
        .ok_or_else(|| DataLoadError::malformed(kind, row.line, "timestamp", seconds.to_string()))?;

    Ok(Rating {
        user_id: required_number(kind, row, "userId")?,
        movie_id: required_number(kind, row, "movieId")?,
        rating,
        ts,
    })
}

/// Parse a users.csv row
pub fn parse_user(row: &RawRow) -> Result<User> {
    let kind = EntityKind::User;
    let user_id: UserId = required_number(kind, row, "userId")?;

    let name = match row.non_blank("name") {
        Some(name) => name.to_string(),
        None => default_user_name(user_id),
    };

    let join_date = match row.non_blank("joinDate") {
        Some(raw) => Some(parse_join_date(raw).ok_or_else(|| {
            DataLoadError::malformed(kind, row.line, "joinDate", raw)
        })?),
        None => None,
    };

    Ok(User {
        user_id,
        name,
        join_date,
        country: row.non_blank("country").map(str::to_string),
        age: optional_number(kind, row, "age")?,
        preferences: Preferences {
            genres: parse_preference_genres(row.get("genres").unwrap_or_default()),
        },
    })
}

/// Name given to users whose source row has no name
pub fn default_user_name(user_id: UserId) -> String {
    format!("user_{}", user_id)
}

/// Split pipe-separated movie genres, dropping empty tokens and the sentinel
///
/// Example: "Comedy||Drama" -> ["Comedy", "Drama"]
///          "(no genres listed)" -> []
pub fn parse_movie_genres(s: &str) -> Vec<String> {
    s.split('|')
        .filter(|genre| !genre.is_empty() && *genre != NO_GENRES_SENTINEL)
        .map(str::to_string)
        .collect()
}

/// Split pipe-separated preference genres, trimming each token.
///
/// Unlike `parse_movie_genres` the sentinel is kept.
pub fn parse_preference_genres(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_join_date(raw: &str) -> Option<DateTime> {
    let date = NaiveDate::parse_from_str(raw, JOIN_DATE_FORMAT).ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(DateTime::from_chrono(midnight))
}

fn required_number<T: FromStr>(kind: EntityKind, row: &RawRow, field: &str) -> Result<T> {
    let raw = row.get(field).unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| DataLoadError::malformed(kind, row.line, field, raw))
}

fn optional_number<T: FromStr>(kind: EntityKind, row: &RawRow, field: &str) -> Result<Option<T>> {
    match row.non_blank(field) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DataLoadError::malformed(kind, row.line, field, raw)),
        None => Ok(None),
    }
}
