//! Spatial index for hierarchical census lookups.
//!
//! Tracts are grouped under their county and blocks under their
//! (county, tract) pair, so that resolving a finer unit only scans the
//! children of the unit resolved one level up.

use hashbrown::{Equivalent, HashMap};
use tracing::{debug, info};

use crate::models::Boundaries;

/// Key of a block bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TractKey {
    pub county_id: String,
    pub tract_id: String,
}

impl TractKey {
    pub fn new(county_id: impl Into<String>, tract_id: impl Into<String>) -> Self {
        Self {
            county_id: county_id.into(),
            tract_id: tract_id.into(),
        }
    }
}

/// Borrowed form of [`TractKey`]. Field order and types hash identically.
#[derive(Hash)]
struct TractKeyRef<'a> {
    county_id: &'a str,
    tract_id: &'a str,
}

impl Equivalent<TractKey> for TractKeyRef<'_> {
    fn equivalent(&self, key: &TractKey) -> bool {
        self.county_id == key.county_id && self.tract_id == key.tract_id
    }
}

/// Index from parent identifiers to positions in the boundary collections.
///
/// Buckets hold indices in input order and never change after `build`.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tracts_by_county: HashMap<String, Vec<usize>>,
    blocks_by_tract: HashMap<TractKey, Vec<usize>>,
}

impl SpatialIndex {
    /// Group tracts by county and blocks by (county, tract)
    pub fn build(boundaries: &Boundaries) -> Self {
        info!(
            "Building spatial index for {} tracts and {} blocks...",
            boundaries.tracts.len(),
            boundaries.blocks.len()
        );

        let mut tracts_by_county: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, tract) in boundaries.tracts.iter().enumerate() {
            tracts_by_county
                .entry(tract.county_id.clone())
                .or_default()
                .push(i);
        }

        let mut blocks_by_tract: HashMap<TractKey, Vec<usize>> = HashMap::new();
        for (i, block) in boundaries.blocks.iter().enumerate() {
            blocks_by_tract
                .entry(TractKey::new(&block.county_id, &block.tract_id))
                .or_default()
                .push(i);
        }

        debug!(
            "Spatial index built: {} counties with tracts, {} tracts with blocks",
            tracts_by_county.len(),
            blocks_by_tract.len()
        );

        Self {
            tracts_by_county,
            blocks_by_tract,
        }
    }

    /// Tract indices for a county, empty if the county has none
    pub fn tracts_in(&self, county_id: &str) -> &[usize] {
        self.tracts_by_county
            .get(county_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Block indices for a tract, empty if the tract has none
    pub fn blocks_in(&self, county_id: &str, tract_id: &str) -> &[usize] {
        self.blocks_by_tract
            .get(&TractKeyRef {
                county_id,
                tract_id,
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of counties that have at least one tract
    pub fn county_buckets(&self) -> usize {
        self.tracts_by_county.len()
    }

    /// Number of tracts that have at least one block
    pub fn tract_buckets(&self) -> usize {
        self.blocks_by_tract.len()
    }
}
