//! Declarative aggregation stages.
//!
//! A `Stage` is one step of an aggregation pipeline. Field names are plain
//! paths (`"movie.title"`), never `$`-prefixed; the `$` only appears when a
//! stage is rendered to the BSON wire form with `to_document`.

use bson::{doc, Bson, Document};

/// Sort / index key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// The `1` / `-1` used in sort and index key documents
    pub fn as_i32(self) -> i32 {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

/// Per-group accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Arithmetic mean of the numeric values of a field
    Avg(String),
    /// Number of documents in the group
    Count,
}

/// Condition tested by a `Match` stage
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Gte(Bson),
}

/// How a `Project` stage fills one output field
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep the field under the same name
    Include,
    /// Drop the field (only meaningful for `_id`)
    Exclude,
    /// Copy the value found at another path
    Path(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Group {
        key: String,
        accumulators: Vec<(String, Accumulator)>,
    },
    Match {
        field: String,
        predicate: Predicate,
    },
    Sort(Vec<(String, Direction)>),
    Limit(u64),
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// Inner unwind: documents whose array is empty or missing are dropped
    Unwind(String),
    Project(Vec<(String, Projection)>),
}

impl Stage {
    /// Stage operator name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Group { .. } => "$group",
            Stage::Match { .. } => "$match",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Lookup { .. } => "$lookup",
            Stage::Unwind(_) => "$unwind",
            Stage::Project(_) => "$project",
        }
    }

    /// Render the stage in the document store's wire form
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Group { key, accumulators } => {
                let mut group = doc! { "_id": field_ref(key) };
                for (name, accumulator) in accumulators {
                    let value = match accumulator {
                        Accumulator::Avg(field) => doc! { "$avg": field_ref(field) },
                        Accumulator::Count => doc! { "$sum": 1 },
                    };
                    group.insert(name.clone(), value);
                }
                doc! { "$group": group }
            }
            Stage::Match { field, predicate } => {
                let condition = match predicate {
                    Predicate::Gte(value) => doc! { "$gte": value.clone() },
                };
                let mut filter = Document::new();
                filter.insert(field.clone(), condition);
                doc! { "$match": filter }
            }
            Stage::Sort(keys) => {
                let mut sort = Document::new();
                for (field, direction) in keys {
                    sort.insert(field.clone(), direction.as_i32());
                }
                doc! { "$sort": sort }
            }
            Stage::Limit(n) => {
                // counts beyond i64::MAX are clamped
                let limit = i64::try_from(*n).unwrap_or(i64::MAX);
                doc! { "$limit": limit }
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => doc! {
                "$lookup": {
                    "from": from.clone(),
                    "localField": local_field.clone(),
                    "foreignField": foreign_field.clone(),
                    "as": as_field.clone(),
                }
            },
            Stage::Unwind(field) => doc! { "$unwind": field_ref(field) },
            Stage::Project(fields) => {
                let mut project = Document::new();
                for (name, projection) in fields {
                    let value = match projection {
                        Projection::Include => Bson::Int32(1),
                        Projection::Exclude => Bson::Int32(0),
                        Projection::Path(path) => Bson::String(field_ref(path)),
                    };
                    project.insert(name.clone(), value);
                }
                doc! { "$project": project }
            }
        }
    }
}

fn field_ref(path: &str) -> String {
    format!("${}", path)
}
