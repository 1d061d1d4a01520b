//! Census boundary types used for point lookups.

use geo::{BoundingRect, LineString, Rect};
use serde::Deserialize;

/// A single closed boundary ring.
///
/// Vertices are stored as given and the ring is closed on construction, so the
/// edge from the last vertex back to the first is always present. Holes and
/// multi-ring shapes are not represented.
///
/// Deserialized vertices may carry extra ordinates such as elevation; only
/// the first two are used.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>")]
pub struct Ring {
    exterior: LineString<f64>,
    bbox: Option<Rect<f64>>,
}

impl Ring {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        let mut exterior = LineString::from(points);
        exterior.close();
        let bbox = exterior.bounding_rect();
        Self { exterior, bbox }
    }

    /// The closed exterior ring
    pub fn exterior(&self) -> &LineString<f64> {
        &self.exterior
    }

    /// Bounding rectangle, `None` for an empty ring
    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.0.is_empty()
    }
}

impl From<Vec<[f64; 2]>> for Ring {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self::new(points)
    }
}

impl TryFrom<Vec<Vec<f64>>> for Ring {
    type Error = String;

    fn try_from(points: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        let points = points
            .into_iter()
            .enumerate()
            .map(|(i, p)| match p.as_slice() {
                [x, y, ..] => Ok([*x, *y]),
                _ => Err(format!("vertex {} has {} ordinates, expected at least 2", i, p.len())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(points))
    }
}

/// County boundary (2010 census county shapefile)
#[derive(Debug, Clone, Deserialize)]
pub struct County {
    #[serde(rename = "COUNTYFP10")]
    pub county_id: String,

    #[serde(rename = "points")]
    pub ring: Ring,
}

impl County {
    pub fn new(county_id: impl Into<String>, points: Vec<[f64; 2]>) -> Self {
        Self {
            county_id: county_id.into(),
            ring: Ring::new(points),
        }
    }
}

/// Census tract boundary, keyed under its county
#[derive(Debug, Clone, Deserialize)]
pub struct Tract {
    #[serde(rename = "COUNTYFP10")]
    pub county_id: String,

    #[serde(rename = "TRACTCE10")]
    pub tract_id: String,

    #[serde(rename = "points")]
    pub ring: Ring,
}

impl Tract {
    pub fn new(
        county_id: impl Into<String>,
        tract_id: impl Into<String>,
        points: Vec<[f64; 2]>,
    ) -> Self {
        Self {
            county_id: county_id.into(),
            tract_id: tract_id.into(),
            ring: Ring::new(points),
        }
    }
}

/// Census block boundary, keyed under its county and tract
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    #[serde(rename = "COUNTYFP10")]
    pub county_id: String,

    #[serde(rename = "TRACTCE10")]
    pub tract_id: String,

    #[serde(rename = "BLOCKCE10")]
    pub block_id: String,

    #[serde(rename = "points")]
    pub ring: Ring,
}

impl Block {
    pub fn new(
        county_id: impl Into<String>,
        tract_id: impl Into<String>,
        block_id: impl Into<String>,
        points: Vec<[f64; 2]>,
    ) -> Self {
        Self {
            county_id: county_id.into(),
            tract_id: tract_id.into(),
            block_id: block_id.into(),
            ring: Ring::new(points),
        }
    }
}

/// The three boundary collections, in load order.
///
/// Parent references (a tract's county, a block's tract) are not checked;
/// a dangling reference just means lookups through it find nothing.
#[derive(Debug, Clone, Default)]
pub struct Boundaries {
    pub counties: Vec<County>,
    pub tracts: Vec<Tract>,
    pub blocks: Vec<Block>,
}

/// Resolved identifiers for a single point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geography {
    pub county: String,
    pub tract: String,
    pub block: String,
}
