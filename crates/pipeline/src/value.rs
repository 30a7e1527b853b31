//! BSON value helpers shared by the evaluator and the in-memory store.
//!
//! Comparison follows the document store's cross-type order closely enough
//! for grouping, sorting and equality joins: null/missing sort first, all
//! numeric types compare by value, then strings, then everything else.

use bson::{Bson, Document};
use std::cmp::Ordering;

/// Resolve a dotted path (`"movie.title"`) inside a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Numeric value of an Int32/Int64/Double
pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        _ => 11,
    }
}

/// Total order over BSON values
pub fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Null | Bson::Undefined, Bson::Null | Bson::Undefined) => Ordering::Equal,
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

/// Same-bracket comparison used by `$gte`-style predicates.
///
/// Returns `None` across type brackets (a string never satisfies `n >= 5`).
pub fn compare_in_bracket(a: &Bson, b: &Bson) -> Option<Ordering> {
    (type_rank(a) == type_rank(b)).then(|| compare_values(a, b))
}

pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    compare_in_bracket(a, b) == Some(Ordering::Equal)
}

/// Hashable key for grouping and unique-index checks.
///
/// Numerically equal values of different integer/float types share a key.
pub fn value_key(value: &Bson) -> String {
    match value {
        Bson::Null | Bson::Undefined => "null".to_string(),
        Bson::String(s) => format!("s:{}", s),
        other => match as_f64(other) {
            Some(n) => format!("n:{}", n),
            None => format!("o:{}", other),
        },
    }
}
