//! Geocoder resolving a point to county, tract and block.
//!
//! Each level is a linear scan over its candidates that returns the first
//! unit containing the point. Overlapping polygons are not tie-broken: the
//! result depends on the order the boundaries were loaded in.

use std::fmt;

use geo::Coord;
use thiserror::Error;
use tracing::trace;

use super::SpatialIndex;
use crate::models::{Boundaries, Geography, Ring};

/// Resolution level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    County,
    Tract,
    Block,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::County => write!(f, "county"),
            Stage::Tract => write!(f, "tract"),
            Stage::Block => write!(f, "block"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("no {stage} contains the point")]
    NotFound { stage: Stage },
}

impl GeocodeError {
    pub fn stage(&self) -> Stage {
        match self {
            GeocodeError::NotFound { stage } => *stage,
        }
    }
}

/// Census geocoder over immutable boundary data
pub struct Geocoder {
    boundaries: Boundaries,
    index: SpatialIndex,
}

impl Geocoder {
    /// Take ownership of the boundaries and index them
    pub fn new(boundaries: Boundaries) -> Self {
        let index = SpatialIndex::build(&boundaries);
        Self { boundaries, index }
    }

    /// First county containing the point, scanning all counties
    pub fn find_county(&self, point: Coord<f64>) -> Result<&str, GeocodeError> {
        self.boundaries
            .counties
            .iter()
            .find(|county| county.ring.contains(point))
            .map(|county| county.county_id.as_str())
            .ok_or(GeocodeError::NotFound {
                stage: Stage::County,
            })
    }

    /// First tract of `county_id` containing the point
    pub fn find_tract(&self, point: Coord<f64>, county_id: &str) -> Result<&str, GeocodeError> {
        let candidates = self.index.tracts_in(county_id);
        trace!(county_id, candidates = candidates.len(), "Scanning tracts");

        first_match(candidates, point, |i| &self.boundaries.tracts[i].ring)
            .map(|i| self.boundaries.tracts[i].tract_id.as_str())
            .ok_or(GeocodeError::NotFound {
                stage: Stage::Tract,
            })
    }

    /// First block of the (`county_id`, `tract_id`) tract containing the point
    pub fn find_block(
        &self,
        point: Coord<f64>,
        county_id: &str,
        tract_id: &str,
    ) -> Result<&str, GeocodeError> {
        let candidates = self.index.blocks_in(county_id, tract_id);
        trace!(county_id, tract_id, candidates = candidates.len(), "Scanning blocks");

        first_match(candidates, point, |i| &self.boundaries.blocks[i].ring)
            .map(|i| self.boundaries.blocks[i].block_id.as_str())
            .ok_or(GeocodeError::NotFound {
                stage: Stage::Block,
            })
    }

    /// Resolve county, then tract within it, then block within that
    pub fn locate(&self, point: Coord<f64>) -> Result<Geography, GeocodeError> {
        let county = self.find_county(point)?;
        let tract = self.find_tract(point, county)?;
        let block = self.find_block(point, county, tract)?;

        Ok(Geography {
            county: county.to_string(),
            tract: tract.to_string(),
            block: block.to_string(),
        })
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }
}

fn first_match<'a>(
    candidates: &[usize],
    point: Coord<f64>,
    ring: impl Fn(usize) -> &'a Ring,
) -> Option<usize> {
    candidates.iter().copied().find(|&i| ring(i).contains(point))
}
