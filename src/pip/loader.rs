//! Boundary loading from census JSON exports.
//!
//! A boundary directory holds one JSON array per level. Each element carries
//! the census identifier columns and a `points` ring; other columns are
//! ignored. A `.gz` copy is used when the plain file is absent.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::models::Boundaries;
use crate::source::open_source;

pub const COUNTY_FILE: &str = "countyData.json";
pub const TRACT_FILE: &str = "tractData.json";
pub const BLOCK_FILE: &str = "blockData.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Boundaries {
    /// Load counties, tracts and blocks from `dir`
    pub fn load_dir(dir: &Path) -> Result<Self, LoadError> {
        let counties = load_collection(dir, COUNTY_FILE)?;
        let tracts = load_collection(dir, TRACT_FILE)?;
        let blocks = load_collection(dir, BLOCK_FILE)?;

        let boundaries = Self {
            counties,
            tracts,
            blocks,
        };
        info!(
            "Found {} counties, {} tracts, {} blocks",
            boundaries.counties.len(),
            boundaries.tracts.len(),
            boundaries.blocks.len()
        );
        Ok(boundaries)
    }
}

fn load_collection<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, LoadError> {
    let path = resolve(dir, name);
    info!("Loading boundaries from {}", path.display());

    let reader = match open_source(&path) {
        Ok(r) => r,
        Err(source) => return Err(LoadError::Io { path, source }),
    };

    serde_json::from_reader(BufReader::new(reader))
        .map_err(|source| LoadError::Parse { path, source })
}

fn resolve(dir: &Path, name: &str) -> PathBuf {
    let plain = dir.join(name);
    if plain.exists() {
        return plain;
    }
    let gz = dir.join(format!("{}.gz", name));
    if gz.exists() {
        gz
    } else {
        plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::Write;

    const COUNTIES: &str = r#"[
        {"STATEFP10": "36", "COUNTYFP10": "061", "NAME10": "New York", "ALAND10": 1, "points": [[0,0],[0,10],[10,10],[10,0]]}
    ]"#;
    const TRACTS: &str = r#"[
        {"COUNTYFP10": "061", "TRACTCE10": "000100", "points": [[0,0],[0,10],[10,10],[10,0]]}
    ]"#;
    const BLOCKS: &str = r#"[
        {"COUNTYFP10": "061", "TRACTCE10": "000100", "BLOCKCE10": "1000", "points": [[0,0],[0,5],[5,5],[5,0]]},
        {"COUNTYFP10": "061", "TRACTCE10": "000100", "BLOCKCE10": "1001", "points": [[5,0],[5,10],[10,10],[10,0]]}
    ]"#;

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COUNTY_FILE), COUNTIES).unwrap();
        std::fs::write(dir.path().join(TRACT_FILE), TRACTS).unwrap();

        // Blocks only as a gzip copy
        let gz = dir.path().join(format!("{}.gz", BLOCK_FILE));
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(BLOCKS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let boundaries = Boundaries::load_dir(dir.path()).unwrap();
        assert_eq!(boundaries.counties.len(), 1);
        assert_eq!(boundaries.counties[0].county_id, "061");
        assert_eq!(boundaries.tracts[0].tract_id, "000100");
        assert_eq!(boundaries.blocks.len(), 2);
        assert_eq!(boundaries.blocks[1].block_id, "1001");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COUNTY_FILE), COUNTIES).unwrap();

        match Boundaries::load_dir(dir.path()) {
            Err(LoadError::Io { path, .. }) => assert!(path.ends_with(TRACT_FILE)),
            other => panic!("expected Io error, got {:?}", other.map(|b| b.counties.len())),
        }
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COUNTY_FILE), "[{\"COUNTYFP10\": 5}]").unwrap();

        assert!(matches!(
            Boundaries::load_dir(dir.path()),
            Err(LoadError::Parse { .. })
        ));
    }
}
