//! Censustag - labels CSV trip records with census geography
//!
//! Each record carries a start and an end coordinate. Both are resolved to a
//! county, tract and block by point-in-polygon lookup, and the record is
//! routed to a saved, failed or dropped output.

pub mod config;
pub mod models;
pub mod pip;
pub mod pipeline;
pub mod source;

pub use models::{Boundaries, Geography};
pub use pip::Geocoder;
pub use pipeline::{Pipeline, PipelineSummary};
