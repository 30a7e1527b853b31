//! In-process evaluation of aggregation stages.
//!
//! Used by stores that have no aggregation engine of their own. Each stage
//! takes ownership of its input documents and returns the transformed set,
//! so stages chain without extra cloning.

use crate::error::{PipelineError, Result};
use crate::stage::{Accumulator, Direction, Predicate, Projection, Stage};
use crate::value::{as_f64, compare_in_bracket, compare_values, get_path, value_key, values_equal};
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Read access to the other collections a `$lookup` may join against
pub trait CollectionSource {
    /// All documents of a collection; empty for unknown collections
    fn documents(&self, collection: &str) -> &[Document];
}

impl CollectionSource for HashMap<String, Vec<Document>> {
    fn documents(&self, collection: &str) -> &[Document] {
        self.get(collection).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

impl Stage {
    /// Apply this stage to a set of documents
    pub fn apply(&self, docs: Vec<Document>, source: &dyn CollectionSource) -> Result<Vec<Document>> {
        match self {
            Stage::Group { key, accumulators } => Ok(group(docs, key, accumulators)),
            Stage::Match { field, predicate } => Ok(docs
                .into_iter()
                .filter(|doc| matches(doc, field, predicate))
                .collect()),
            Stage::Sort(keys) => Ok(sort(docs, keys)),
            Stage::Limit(0) => Err(PipelineError::InvalidStage {
                stage: self.name(),
                reason: "limit must be positive".to_string(),
            }),
            Stage::Limit(n) => Ok(docs
                .into_iter()
                .take(usize::try_from(*n).unwrap_or(usize::MAX))
                .collect()),
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => Ok(lookup(docs, source.documents(from), local_field, foreign_field, as_field)),
            Stage::Unwind(field) => unwind(docs, field),
            Stage::Project(fields) => project(docs, fields),
        }
    }
}

struct GroupState {
    id: Bson,
    count: i64,
    sums: Vec<(f64, u64)>,
}

fn group(docs: Vec<Document>, key: &str, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    let mut groups: Vec<GroupState> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for doc in &docs {
        let id = get_path(doc, key).cloned().unwrap_or(Bson::Null);
        let position = *positions.entry(value_key(&id)).or_insert_with(|| {
            groups.push(GroupState {
                id,
                count: 0,
                sums: vec![(0.0, 0); accumulators.len()],
            });
            groups.len() - 1
        });

        let state = &mut groups[position];
        state.count += 1;
        for ((_, accumulator), (sum, seen)) in accumulators.iter().zip(state.sums.iter_mut()) {
            if let Accumulator::Avg(field) = accumulator {
                if let Some(value) = get_path(doc, field).and_then(as_f64) {
                    *sum += value;
                    *seen += 1;
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|state| {
            let mut out = Document::new();
            out.insert("_id", state.id);
            for ((name, accumulator), (sum, seen)) in accumulators.iter().zip(state.sums) {
                let value = match accumulator {
                    Accumulator::Avg(_) if seen == 0 => Bson::Null,
                    Accumulator::Avg(_) => Bson::Double(sum / seen as f64),
                    Accumulator::Count => match i32::try_from(state.count) {
                        Ok(n) => Bson::Int32(n),
                        Err(_) => Bson::Int64(state.count),
                    },
                };
                out.insert(name.clone(), value);
            }
            out
        })
        .collect()
}

fn matches(doc: &Document, field: &str, predicate: &Predicate) -> bool {
    let value = get_path(doc, field).unwrap_or(&Bson::Null);
    match predicate {
        Predicate::Gte(bound) => matches!(
            compare_in_bracket(value, bound),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn sort(mut docs: Vec<Document>, keys: &[(String, Direction)]) -> Vec<Document> {
    // stable: documents equal on every key keep their input order
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|(field, direction)| {
                let left = get_path(a, field).unwrap_or(&Bson::Null);
                let right = get_path(b, field).unwrap_or(&Bson::Null);
                let ordering = compare_values(left, right);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    docs
}

fn lookup(
    docs: Vec<Document>,
    foreign: &[Document],
    local_field: &str,
    foreign_field: &str,
    as_field: &str,
) -> Vec<Document> {
    docs.into_iter()
        .map(|mut doc| {
            let local = get_path(&doc, local_field).cloned().unwrap_or(Bson::Null);
            let joined: Vec<Bson> = foreign
                .iter()
                .filter(|candidate| {
                    let value = get_path(candidate, foreign_field).unwrap_or(&Bson::Null);
                    values_equal(value, &local)
                })
                .map(|candidate| Bson::Document(candidate.clone()))
                .collect();
            doc.insert(as_field, joined);
            doc
        })
        .collect()
}

fn unwind(docs: Vec<Document>, field: &str) -> Result<Vec<Document>> {
    if field.contains('.') {
        return Err(PipelineError::InvalidStage {
            stage: "$unwind",
            reason: format!("nested path {} is not supported", field),
        });
    }

    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match doc.get(field) {
            Some(Bson::Array(items)) => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    copy.insert(field, item);
                    out.push(copy);
                }
            }
            None | Some(Bson::Null) => {}
            Some(_) => out.push(doc),
        }
    }
    Ok(out)
}

fn project(docs: Vec<Document>, fields: &[(String, Projection)]) -> Result<Vec<Document>> {
    if let Some((name, _)) = fields
        .iter()
        .find(|(name, projection)| *projection == Projection::Exclude && name != "_id")
    {
        return Err(PipelineError::InvalidStage {
            stage: "$project",
            reason: format!("cannot exclude {} in an inclusion projection", name),
        });
    }
    let id_mentioned = fields.iter().any(|(name, _)| name == "_id");

    Ok(docs
        .into_iter()
        .map(|doc| {
            let mut out = Document::new();
            if !id_mentioned {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id", id.clone());
                }
            }
            for (name, projection) in fields {
                let value = match projection {
                    Projection::Exclude => None,
                    Projection::Include => get_path(&doc, name),
                    Projection::Path(path) => get_path(&doc, path),
                };
                if let Some(value) = value {
                    out.insert(name.clone(), value.clone());
                }
            }
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn no_collections() -> HashMap<String, Vec<Document>> {
        HashMap::new()
    }

    #[test]
    fn test_group_computes_average_and_count() {
        let docs = vec![
            doc! { "movieId": 1, "rating": 5.0 },
            doc! { "movieId": 2, "rating": 3.0 },
            doc! { "movieId": 2, "rating": 4.0 },
        ];
        let stage = Stage::Group {
            key: "movieId".to_string(),
            accumulators: vec![
                ("avgRating".to_string(), Accumulator::Avg("rating".to_string())),
                ("n".to_string(), Accumulator::Count),
            ],
        };

        let out = stage.apply(docs, &no_collections()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], doc! { "_id": 1, "avgRating": 5.0, "n": 1 });
        assert_eq!(out[1], doc! { "_id": 2, "avgRating": 3.5, "n": 2 });
    }

    #[test]
    fn test_match_gte_ignores_other_types() {
        let docs = vec![doc! { "n": 3 }, doc! { "n": 1 }, doc! { "n": "9" }, doc! {}];
        let stage = Stage::Match {
            field: "n".to_string(),
            predicate: Predicate::Gte(Bson::Int64(2)),
        };

        let out = stage.apply(docs, &no_collections()).unwrap();
        assert_eq!(out, vec![doc! { "n": 3 }]);
    }

    #[test]
    fn test_sort_uses_secondary_key_for_ties() {
        let docs = vec![
            doc! { "id": "a", "avg": 4.0, "n": 3 },
            doc! { "id": "b", "avg": 4.0, "n": 10 },
            doc! { "id": "c", "avg": 4.5, "n": 1 },
        ];
        let stage = Stage::Sort(vec![
            ("avg".to_string(), Direction::Descending),
            ("n".to_string(), Direction::Descending),
        ]);

        let out = stage.apply(docs, &no_collections()).unwrap();
        let ids: Vec<&str> = out.iter().map(|d| d.get_str("id").unwrap()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_lookup_then_unwind_is_an_inner_join() {
        let mut collections = HashMap::new();
        collections.insert(
            "movies".to_string(),
            vec![doc! { "movieId": 2, "title": "B" }],
        );
        let docs = vec![doc! { "_id": 1 }, doc! { "_id": 2 }];

        let joined = Stage::Lookup {
            from: "movies".to_string(),
            local_field: "_id".to_string(),
            foreign_field: "movieId".to_string(),
            as_field: "movie".to_string(),
        }
        .apply(docs, &collections)
        .unwrap();
        assert_eq!(joined[0].get_array("movie").unwrap().len(), 0);

        let unwound = Stage::Unwind("movie".to_string()).apply(joined, &collections).unwrap();
        assert_eq!(unwound.len(), 1);
        assert_eq!(unwound[0].get_document("movie").unwrap().get_str("title").unwrap(), "B");
    }

    #[test]
    fn test_project_renames_and_drops_id() {
        let docs = vec![doc! { "_id": 2, "n": 2, "movie": { "title": "B" } }];
        let stage = Stage::Project(vec![
            ("_id".to_string(), Projection::Exclude),
            ("movieId".to_string(), Projection::Path("_id".to_string())),
            ("title".to_string(), Projection::Path("movie.title".to_string())),
            ("n".to_string(), Projection::Include),
        ]);

        let out = stage.apply(docs, &no_collections()).unwrap();
        assert_eq!(out, vec![doc! { "movieId": 2, "title": "B", "n": 2 }]);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = Stage::Limit(0).apply(vec![], &no_collections()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStage { stage: "$limit", .. }));
    }
}
