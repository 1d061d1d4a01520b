//! Point-in-polygon census geocoding.
//!
//! Loads county, tract and block boundaries, buckets the finer levels by
//! their parent so each lookup only scans the polygons of one county or
//! tract, and resolves a point top-down with ray casting.

mod index;
mod loader;
mod ring;
mod service;

pub use index::{SpatialIndex, TractKey};
pub use loader::{LoadError, BLOCK_FILE, COUNTY_FILE, TRACT_FILE};
pub use ring::ray_cast;
pub use service::{GeocodeError, Geocoder, Stage};
