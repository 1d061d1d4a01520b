//! Core data models for census labeling.

pub mod boundary;

pub use boundary::{Block, Boundaries, County, Geography, Ring, Tract};
