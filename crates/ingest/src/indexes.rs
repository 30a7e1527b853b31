//! Index provisioning for the three collections.

use crate::error::Result;
use data_loader::EntityKind;
use pipeline::Direction::{Ascending, Descending};
use store::{DocumentStore, IndexSpec};
use tracing::{debug, info};

/// Every index the loaded data needs, per entity kind
pub fn required_indexes() -> Vec<(EntityKind, IndexSpec)> {
    vec![
        (EntityKind::Rating, IndexSpec::new([("movieId", Ascending), ("ts", Descending)])),
        (EntityKind::Rating, IndexSpec::new([("userId", Ascending), ("ts", Descending)])),
        (EntityKind::Rating, IndexSpec::new([("movieId", Ascending), ("userId", Ascending)])),
        (EntityKind::Movie, IndexSpec::new([("movieId", Ascending)]).unique()),
        (EntityKind::Movie, IndexSpec::new([("genres", Ascending)])),
        (EntityKind::User, IndexSpec::new([("userId", Ascending)]).unique()),
        (EntityKind::User, IndexSpec::new([("country", Ascending)])),
    ]
}

/// Declares `required_indexes()` on a store. Safe to run repeatedly.
pub struct IndexProvisioner<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> IndexProvisioner<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Ensure every index exists. Returns how many were newly created.
    pub fn provision(&self) -> Result<usize> {
        let mut created = 0;
        for (kind, index) in required_indexes() {
            let collection = kind.collection();
            if self.store.create_index(collection, &index)? {
                debug!("Created index {} on {}", index.name(), collection);
                created += 1;
            }
        }
        info!("Indexes ready ({} newly created)", created);
        Ok(created)
    }
}
