//! # distance-consensus - Core Library
//!
//! Builds one representative group network from a stack of per-subject
//! weighted networks whose nodes live in physical space (brain connectomes,
//! typically).
//!
//! Thresholding the group average keeps whatever edges are most consistent
//! across subjects, and short edges are far more consistent than long ones,
//! so the averaged graph ends up with a distorted edge-length distribution.
//! This crate implements distance-dependent consensus thresholding instead:
//!
//! 1. Aggregate consistency (how many subjects have the edge) and average
//!    weight per node pair.
//! 2. Split the distance range into equal-width bins.
//! 3. Split node pairs into intra- and inter-hemispheric categories.
//! 4. Per category and per bin, keep as many edges as the average subject
//!    has in that bin, ranked by consistency.
//! 5. Build a classic weight-ranked consensus graph with the same edge
//!    count per category, for comparison.
//!
//! ## Design Philosophy
//! - **Pure.** Inputs are in-memory arrays, outputs are in-memory arrays.
//! - **Deterministic.** Ranking ties break by ascending row-major index.
//! - **Validated at the boundary.** Shapes, bin count and hemisphere labels
//!   are checked once, before any work is done.

pub mod network;
pub mod threshold;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use network::hemisphere::{Category, CategoryMask, Hemisphere, HemisphereLabels};
pub use network::{SquareMatrix, SubjectStack};
pub use threshold::{distance_threshold, CategoryReport, GroupNetworks, GroupThresholder};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for distance-consensus.
#[derive(Error, Debug)]
pub enum ThresholdError {
    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Bin count must be at least 1, got {0}")]
    InvalidBinCount(usize),

    #[error("Subject stack is empty: at least one subject is required")]
    NoSubjects,

    #[error("Distance matrix has no positive entries; distance bins are undefined")]
    NoPositiveDistance,

    #[error("Invalid hemisphere label {label} at node {node}: labels must be 0 or 1")]
    InvalidHemisphereLabel { node: usize, label: i64 },

    #[error("Non-finite value in {what} at ({i}, {j})")]
    NonFinite { what: &'static str, i: usize, j: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type ThresholdResult<T> = Result<T, ThresholdError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Loaded from `distance-consensus.toml` in the working directory or a path
/// supplied via CLI flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Distance binning settings.
    pub binning: BinningConfig,

    /// Result serialization settings (used by the CLI).
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Number of equal-width distance bins.
    pub nbins: usize,

    /// Added to the last bin edge so the longest edge falls inside the
    /// last half-open bin. In distance units.
    pub upper_edge_padding: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print the result JSON.
    pub pretty: bool,

    /// Write the per-category, per-bin report alongside the matrices.
    pub include_report: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            binning: BinningConfig {
                nbins: 10,
                upper_edge_padding: 1.0,
            },
            output: OutputConfig {
                pretty: true,
                include_report: true,
            },
        }
    }
}

impl ThresholdConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ThresholdResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ThresholdConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to a TOML file.
    pub fn write_default(path: &Path) -> ThresholdResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ThresholdError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the procedure cannot run with.
    pub fn validate(&self) -> ThresholdResult<()> {
        if self.binning.nbins == 0 {
            return Err(ThresholdError::InvalidBinCount(0));
        }
        if !self.binning.upper_edge_padding.is_finite() || self.binning.upper_edge_padding <= 0.0 {
            return Err(ThresholdError::Config(format!(
                "upper_edge_padding must be a positive finite number, got {}",
                self.binning.upper_edge_padding
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Core Types
// ---------------------------------------------------------------------------

/// The four inputs of the procedure, as materialized by a loader.
///
/// `subjects` is laid out subject-major (`subjects[k][i][j]`), which is how
/// per-subject matrices are usually exported one file at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdInputs {
    /// One n×n weighted adjacency matrix per subject.
    pub subjects: Vec<Vec<Vec<f64>>>,

    /// n×n node-to-node distance matrix.
    pub dist: Vec<Vec<f64>>,

    /// Hemisphere label (0 or 1) per node.
    pub hemiid: Vec<i64>,

    /// Optional bin count; falls back to the configured value.
    #[serde(default)]
    pub nbins: Option<usize>,
}

impl ThresholdInputs {
    /// Load inputs from a JSON file.
    pub fn from_file(path: &Path) -> ThresholdResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let inputs: ThresholdInputs = serde_json::from_str(&content)?;
        Ok(inputs)
    }

    /// Convert the nested arrays into typed matrices.
    pub fn into_parts(self) -> ThresholdResult<(SubjectStack, SquareMatrix<f64>, Vec<i64>)> {
        let slices = self
            .subjects
            .into_iter()
            .map(SquareMatrix::from_rows)
            .collect::<ThresholdResult<Vec<_>>>()?;
        let stack = SubjectStack::from_slices(slices)?;
        let dist = SquareMatrix::from_rows(self.dist)?;
        Ok((stack, dist, self.hemiid))
    }
}

/// A saved run: both group networks plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    /// When the networks were computed.
    pub computed_at: DateTime<Utc>,

    /// Input file the networks were computed from, if any.
    pub input: Option<PathBuf>,

    /// Number of distance bins used.
    pub nbins: usize,

    /// Number of subjects aggregated.
    pub subjects: usize,

    pub networks: GroupNetworks,
}

impl ResultFile {
    /// Save to a JSON file.
    pub fn save(&self, path: &Path, pretty: bool) -> ThresholdResult<()> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file, checking matrix sizes.
    pub fn load(path: &Path) -> ThresholdResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let result: ResultFile = serde_json::from_str(&json)?;
        result.networks.distance.check_shape()?;
        result.networks.consensus.check_shape()?;
        if result.networks.distance.n() != result.networks.consensus.n() {
            return Err(ThresholdError::Shape(format!(
                "result holds a {}-node distance network and a {}-node consensus network",
                result.networks.distance.n(),
                result.networks.consensus.n()
            )));
        }
        Ok(result)
    }
}
