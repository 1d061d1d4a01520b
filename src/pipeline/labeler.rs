//! Row labeler: appends start and end geography to a record.

use std::fmt;

use csv::StringRecord;
use geo::Coord;
use thiserror::Error;

use super::layout::{CoordColumns, FieldLayout};
use crate::models::Geography;
use crate::pip::{Geocoder, Stage};

/// Number of values appended to a labeled record
pub const GEOGRAPHY_FIELDS: usize = 6;

/// Header names used when no feature names are configured
pub const DEFAULT_FEATURES: [&str; GEOGRAPHY_FIELDS] = [
    "start_county",
    "start_tract",
    "start_block",
    "end_county",
    "end_tract",
    "end_block",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::End => write!(f, "end"),
        }
    }
}

/// A coordinate column role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordField {
    StartX,
    StartY,
    EndX,
    EndY,
}

impl fmt::Display for CoordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordField::StartX => write!(f, "start-x"),
            CoordField::StartY => write!(f, "start-y"),
            CoordField::EndX => write!(f, "end-x"),
            CoordField::EndY => write!(f, "end-y"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("unable to parse {field} from '{value}'")]
    Parse { field: CoordField, value: String },

    #[error("unable to find {endpoint} {stage}")]
    Geocode { endpoint: Endpoint, stage: Stage },
}

/// Labels records against a shared geocoder.
///
/// Both endpoints must resolve at every level; any failure rejects the whole
/// row and nothing is appended.
pub struct RowLabeler<'a> {
    geocoder: &'a Geocoder,
    layout: &'a FieldLayout,
}

impl<'a> RowLabeler<'a> {
    pub fn new(geocoder: &'a Geocoder, layout: &'a FieldLayout) -> Self {
        Self { geocoder, layout }
    }

    pub fn layout(&self) -> &FieldLayout {
        self.layout
    }

    /// Original fields followed by start county, tract, block and end county, tract, block
    pub fn label(&self, record: &StringRecord) -> Result<StringRecord, LabelError> {
        let start = self.resolve(record, Endpoint::Start)?;
        let end = self.resolve(record, Endpoint::End)?;

        let mut labeled = record.clone();
        for geo in [&start, &end] {
            labeled.push_field(&geo.county);
            labeled.push_field(&geo.tract);
            labeled.push_field(&geo.block);
        }
        Ok(labeled)
    }

    fn resolve(&self, record: &StringRecord, endpoint: Endpoint) -> Result<Geography, LabelError> {
        let (columns, fields): (CoordColumns, _) = match endpoint {
            Endpoint::Start => (self.layout.start, (CoordField::StartX, CoordField::StartY)),
            Endpoint::End => (self.layout.end, (CoordField::EndX, CoordField::EndY)),
        };

        let point = Coord {
            x: parse_coord(record, columns.x, fields.0)?,
            y: parse_coord(record, columns.y, fields.1)?,
        };

        self.geocoder
            .locate(point)
            .map_err(|e| LabelError::Geocode {
                endpoint,
                stage: e.stage(),
            })
    }
}

fn parse_coord(record: &StringRecord, index: usize, field: CoordField) -> Result<f64, LabelError> {
    let raw = record.get(index).unwrap_or("");
    raw.trim().parse::<f64>().map_err(|_| LabelError::Parse {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, Boundaries, County, Tract};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<[f64; 2]> {
        vec![[x0, y0], [x0, y1], [x1, y1], [x1, y0]]
    }

    fn geocoder() -> Geocoder {
        Geocoder::new(Boundaries {
            counties: vec![County::new("061", rect(0.0, 0.0, 10.0, 10.0))],
            tracts: vec![
                Tract::new("061", "000100", rect(0.0, 0.0, 5.0, 10.0)),
                Tract::new("061", "000200", rect(5.0, 0.0, 10.0, 10.0)),
            ],
            blocks: vec![
                Block::new("061", "000100", "1000", rect(0.0, 0.0, 5.0, 10.0)),
                Block::new("061", "000200", "2000", rect(5.0, 0.0, 10.0, 5.0)),
            ],
        })
    }

    fn layout() -> FieldLayout {
        FieldLayout::new(
            CoordColumns { x: 1, y: 2 },
            CoordColumns { x: 3, y: 4 },
            vec![0],
        )
    }

    #[test]
    fn test_label_appends_six_fields() {
        let geocoder = geocoder();
        let layout = layout();
        let labeler = RowLabeler::new(&geocoder, &layout);

        let record = StringRecord::from(vec!["trip-1", "2.5", "3.0", " 7.5 ", "1.0"]);
        let labeled = labeler.label(&record).unwrap();

        assert_eq!(labeled.len(), record.len() + GEOGRAPHY_FIELDS);
        assert_eq!(&labeled[0], "trip-1");
        let appended: Vec<&str> = labeled.iter().skip(record.len()).collect();
        assert_eq!(
            appended,
            vec!["061", "000100", "1000", "061", "000200", "2000"]
        );
    }

    #[test]
    fn test_parse_error_names_field() {
        let geocoder = geocoder();
        let layout = layout();
        let labeler = RowLabeler::new(&geocoder, &layout);

        let record = StringRecord::from(vec!["trip-2", "2.5", "3.0", "abc", "1.0"]);
        let err = labeler.label(&record).unwrap_err();
        assert_eq!(
            err,
            LabelError::Parse {
                field: CoordField::EndX,
                value: "abc".to_string()
            }
        );
        assert_eq!(err.to_string(), "unable to parse end-x from 'abc'");
    }

    #[test]
    fn test_geocode_error_names_endpoint_and_stage() {
        let geocoder = geocoder();
        let layout = layout();
        let labeler = RowLabeler::new(&geocoder, &layout);

        // Start outside every county
        let record = StringRecord::from(vec!["t", "50", "50", "2.5", "3.0"]);
        assert_eq!(
            labeler.label(&record).unwrap_err().to_string(),
            "unable to find start county"
        );

        // End inside tract 000200 but outside its only block
        let record = StringRecord::from(vec!["t", "2.5", "3.0", "7.5", "8.0"]);
        assert_eq!(
            labeler.label(&record).unwrap_err(),
            LabelError::Geocode {
                endpoint: Endpoint::End,
                stage: Stage::Block
            }
        );
    }

    #[test]
    fn test_start_parsed_before_end() {
        let geocoder = geocoder();
        let layout = layout();
        let labeler = RowLabeler::new(&geocoder, &layout);

        let record = StringRecord::from(vec!["t", "", "x", "y", "z"]);
        assert!(matches!(
            labeler.label(&record),
            Err(LabelError::Parse {
                field: CoordField::StartX,
                ..
            })
        ));
    }
}
