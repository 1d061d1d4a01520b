//! Run configuration.
//!
//! Read from TOML, or from the JSON layout used by older deployments when the
//! file ends in `.json`. Keys are kebab-case either way.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::pipeline::{
    CoordColumns, FieldLayout, PipelinePaths, PipelineSettings, DEFAULT_FEATURES,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SIDE_QUEUE_CAPACITY,
};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory holding countyData.json, tractData.json and blockData.json
    #[serde(alias = "json-file-location", alias = "JsonFileLocation")]
    pub boundary_dir: PathBuf,

    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub failed_output_file: PathBuf,
    pub dropped_output_file: PathBuf,

    pub start_x: usize,
    pub start_y: usize,
    pub end_x: usize,
    pub end_y: usize,

    #[serde(alias = "indicies-to-keep")]
    pub indices_to_keep: Vec<usize>,

    /// Defaults to `indices-to-keep`
    #[serde(default)]
    pub required_fields: Option<Vec<usize>>,

    #[serde(alias = "features-added", default = "default_features")]
    pub added_features: Vec<String>,

    /// Expected header width; zero or absent skips the check
    #[serde(alias = "original-featureset-size", default)]
    pub original_columns: Option<usize>,

    #[serde(alias = "labeling-routines", default = "crate::pipeline::default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_side_queue_capacity")]
    pub side_queue_capacity: usize,
}

fn default_features() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect()
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_side_queue_capacity() -> usize {
    DEFAULT_SIDE_QUEUE_CAPACITY
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).context("Failed to parse JSON config file")?
        } else {
            toml::from_str(&content).context("Failed to parse config file")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that do not need the input header
    pub fn validate(&self) -> Result<()> {
        self.layout().validate().context("Invalid field layout")?;

        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.queue_capacity == 0 || self.side_queue_capacity == 0 {
            bail!("queue capacities must be at least 1");
        }

        let paths = [
            ("input-file", &self.input_file),
            ("output-file", &self.output_file),
            ("failed-output-file", &self.failed_output_file),
            ("dropped-output-file", &self.dropped_output_file),
        ];
        for (i, (name, path)) in paths.iter().enumerate() {
            for (other_name, other) in &paths[i + 1..] {
                if path == other {
                    bail!(
                        "{} and {} both point at {}",
                        name,
                        other_name,
                        path.display()
                    );
                }
            }
        }

        Ok(())
    }

    pub fn layout(&self) -> FieldLayout {
        let layout = FieldLayout::new(
            CoordColumns {
                x: self.start_x,
                y: self.start_y,
            },
            CoordColumns {
                x: self.end_x,
                y: self.end_y,
            },
            self.indices_to_keep.clone(),
        )
        .with_features(self.added_features.clone());

        let layout = match &self.required_fields {
            Some(required) => layout.with_required(required.clone()),
            None => layout,
        };

        match self.original_columns {
            Some(columns) if columns > 0 => layout.with_original_columns(columns),
            _ => layout,
        }
    }

    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            side_queue_capacity: self.side_queue_capacity,
        }
    }

    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths {
            input: self.input_file.clone(),
            saved: self.output_file.clone(),
            failed: self.failed_output_file.clone(),
            dropped: self.dropped_output_file.clone(),
        }
    }
}
