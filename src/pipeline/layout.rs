//! Column roles within an input record.

use csv::StringRecord;
use thiserror::Error;

use super::labeler::{DEFAULT_FEATURES, GEOGRAPHY_FIELDS};

/// Column positions of one coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordColumns {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{role} column {index} is outside the {width}-column header")]
    ColumnOutOfRange {
        role: &'static str,
        index: usize,
        width: usize,
    },

    #[error("configured original column count {configured} does not match the {width}-column header")]
    WidthMismatch { configured: usize, width: usize },

    #[error("{count} feature names configured, only {max} geography fields are appended")]
    TooManyFeatures { count: usize, max: usize },
}

/// Maps semantic roles to fixed column positions.
///
/// `features` names the appended geography columns written to the saved
/// output, taken in order from the six appended values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub start: CoordColumns,
    pub end: CoordColumns,
    pub required: Vec<usize>,
    pub retained: Vec<usize>,
    pub features: Vec<String>,
    pub original_columns: Option<usize>,
}

impl FieldLayout {
    /// Layout where the retained columns are also the required ones and all
    /// six geography fields are written under their default names.
    pub fn new(start: CoordColumns, end: CoordColumns, retained: Vec<usize>) -> Self {
        Self {
            start,
            end,
            required: retained.clone(),
            features: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
            retained,
            original_columns: None,
        }
    }

    pub fn with_required(mut self, required: Vec<usize>) -> Self {
        self.required = required;
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    pub fn with_original_columns(mut self, columns: usize) -> Self {
        self.original_columns = Some(columns);
        self
    }

    /// Checks that do not depend on the input
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.features.len() > GEOGRAPHY_FIELDS {
            return Err(LayoutError::TooManyFeatures {
                count: self.features.len(),
                max: GEOGRAPHY_FIELDS,
            });
        }
        Ok(())
    }

    /// Check the layout against the input header.
    ///
    /// Returns the original column count, which is where the appended
    /// geography values start in a labeled record.
    pub fn check_header(&self, width: usize) -> Result<usize, LayoutError> {
        self.validate()?;

        if let Some(configured) = self.original_columns {
            if configured != width {
                return Err(LayoutError::WidthMismatch { configured, width });
            }
        }

        let singles = [
            ("start-x", self.start.x),
            ("start-y", self.start.y),
            ("end-x", self.end.x),
            ("end-y", self.end.y),
        ];
        let lists = self
            .required
            .iter()
            .map(|&i| ("required", i))
            .chain(self.retained.iter().map(|&i| ("retained", i)));

        for (role, index) in singles.into_iter().chain(lists) {
            if index >= width {
                return Err(LayoutError::ColumnOutOfRange { role, index, width });
            }
        }

        Ok(width)
    }

    /// Whether any required column is empty or absent
    pub fn has_empty_required(&self, record: &StringRecord) -> bool {
        self.required
            .iter()
            .any(|&i| record.get(i).map_or(true, str::is_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FieldLayout {
        FieldLayout::new(
            CoordColumns { x: 1, y: 2 },
            CoordColumns { x: 3, y: 4 },
            vec![0, 1, 2, 3, 4],
        )
    }

    #[test]
    fn test_defaults() {
        let layout = layout();
        assert_eq!(layout.required, layout.retained);
        assert_eq!(layout.features.len(), GEOGRAPHY_FIELDS);
        assert_eq!(layout.features[0], "start_county");
        assert_eq!(layout.features[5], "end_block");
    }

    #[test]
    fn test_check_header() {
        assert_eq!(layout().check_header(6), Ok(6));
        assert_eq!(
            layout().check_header(4),
            Err(LayoutError::ColumnOutOfRange {
                role: "end-y",
                index: 4,
                width: 4
            })
        );
        assert_eq!(
            layout().with_original_columns(7).check_header(6),
            Err(LayoutError::WidthMismatch {
                configured: 7,
                width: 6
            })
        );
        assert!(matches!(
            layout().with_required(vec![9]).check_header(6),
            Err(LayoutError::ColumnOutOfRange {
                role: "required",
                ..
            })
        ));
    }

    #[test]
    fn test_too_many_features() {
        let features = (0..7).map(|i| format!("f{}", i)).collect();
        assert_eq!(
            layout().with_features(features).validate(),
            Err(LayoutError::TooManyFeatures { count: 7, max: 6 })
        );
    }

    #[test]
    fn test_empty_required() {
        let layout = layout().with_required(vec![0, 2]);
        assert!(!layout.has_empty_required(&StringRecord::from(vec!["a", "", "1", "", ""])));
        assert!(layout.has_empty_required(&StringRecord::from(vec!["a", "x", "", "y", "z"])));
        assert!(layout.has_empty_required(&StringRecord::from(vec!["a"])));
    }
}
