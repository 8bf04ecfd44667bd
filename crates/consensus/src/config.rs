use std::collections::BTreeSet;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::MaskCatalog,
    error::{ConsensusError, Result},
    mode::CombinationMode,
    naming::OutputNaming,
    types::AlgorithmName,
};

pub const DEFAULT_ALGORITHMS: [&str; 3] = ["Schroeder", "Murphy", "Kumar-Roy"];
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Grid a scene's masks are expected to cover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridExtent {
    /// Whole scenes; the grid is probed from the first available mask
    #[default]
    Scene,
    /// Fixed-size tiles; every mask must have exactly this size
    Tile { width: u32, height: u32 },
}

impl GridExtent {
    pub fn default_tile() -> Self {
        Self::Tile {
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
        }
    }

    /// Fixed `(rows, cols)` for tiles, `None` when the grid must be probed.
    pub fn fixed_shape(&self) -> Option<(usize, usize)> {
        match *self {
            Self::Scene => None,
            Self::Tile { width, height } => Some((height as usize, width as usize)),
        }
    }
}

/// Everything a batch run needs, passed explicitly to the driver.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory holding the per-algorithm mask rasters
    pub masks_dir: PathBuf,
    /// Directory receiving the combined masks; may equal `masks_dir`
    pub output_dir: PathBuf,
    /// Detection algorithms, in the order masks are combined
    pub algorithms: Vec<String>,
    /// Separator preceding the algorithm name in mask filenames
    pub separator: String,
    /// Minimum number of agreeing algorithms in voting mode
    #[schemars(range(min = 1))]
    pub quorum: u32,
    /// Modes to run, in order
    pub modes: Vec<CombinationMode>,
    /// Ground-truth token in scene ids that outputs tag with the mode
    pub raw_token: String,
    /// Mask file extensions to discover (case-sensitive)
    pub extensions: Vec<String>,
    /// Require every mask of a scene to share the first mask's georeferencing
    pub verify_profiles: bool,
    pub extent: GridExtent,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            masks_dir: PathBuf::from("masks"),
            output_dir: PathBuf::from("masks"),
            algorithms: DEFAULT_ALGORITHMS.iter().map(|name| name.to_string()).collect(),
            separator: "_".to_string(),
            quorum: 2,
            modes: vec![CombinationMode::Intersection, CombinationMode::Voting],
            raw_token: "_RT".to_string(),
            extensions: vec!["tif".to_string(), "TIF".to_string()],
            verify_profiles: true,
            extent: GridExtent::Scene,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        let algorithms = self.algorithm_names()?;
        if algorithms.is_empty() {
            return invalid("at least one algorithm is required");
        }
        let unique: BTreeSet<&AlgorithmName> = algorithms.iter().collect();
        if unique.len() != algorithms.len() {
            return invalid("algorithm names must be unique");
        }
        if self.quorum == 0 || self.quorum as usize > algorithms.len() {
            return invalid(&format!(
                "quorum must be between 1 and {} (the number of algorithms), got {}",
                algorithms.len(),
                self.quorum
            ));
        }
        if self.raw_token.is_empty() {
            return invalid("raw_token must not be empty");
        }
        if self.modes.is_empty() {
            return invalid("at least one mode is required");
        }
        if self.extensions.is_empty() {
            return invalid("at least one file extension is required");
        }
        if let GridExtent::Tile { width, height } = self.extent {
            if width == 0 || height == 0 {
                return invalid("tile size must be positive");
            }
        }
        Ok(())
    }

    pub fn algorithm_names(&self) -> Result<Vec<AlgorithmName>> {
        self.algorithms.iter().map(AlgorithmName::new).collect()
    }

    pub fn catalog(&self) -> Result<MaskCatalog> {
        Ok(MaskCatalog::new(self.algorithm_names()?, self.separator.clone()))
    }

    pub fn naming(&self) -> OutputNaming {
        OutputNaming::new(self.raw_token.clone(), self.separator.clone())
    }
}

fn invalid(message: &str) -> Result<()> {
    Err(ConsensusError::InvalidConfig(message.to_string()))
}
