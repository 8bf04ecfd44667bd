use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Cannot classify mask '{file}': expected exactly one algorithm name, found {matches:?}")]
    Classification { file: String, matches: Vec<String> },

    #[error("Algorithm '{algorithm}' has two masks for scene '{scene}': {first:?} and {second:?}")]
    DuplicateScene {
        algorithm: String,
        scene: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Failed to decode mask {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<ConsensusError>,
    },

    #[error("Unsupported raster layout: {0}")]
    UnsupportedRaster(String),

    #[error("Mask {path:?} is {actual:?} (rows, cols), scene grid is {expected:?}")]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Mask {path:?} is not georeferenced like the first mask of its scene")]
    ProfileMismatch { path: PathBuf },

    #[error("Scene '{scene}' has no mask for '{algorithm}', which the rule requires")]
    MissingOperand { scene: String, algorithm: String },

    #[error("Scene '{0}' has no mask to take a grid or profile from")]
    NoConstituents(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid discovery pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl ConsensusError {
    /// Errors that only invalidate the scene being combined, not the run.
    pub fn is_scene_local(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::ShapeMismatch { .. }
                | Self::ProfileMismatch { .. }
                | Self::MissingOperand { .. }
                | Self::NoConstituents(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_local_classification() {
        let decode = ConsensusError::Decode {
            path: PathBuf::from("a_Murphy.tif"),
            source: Box::new(ConsensusError::UnsupportedRaster("empty".into())),
        };
        assert!(decode.is_scene_local());
        assert!(decode.to_string().contains("a_Murphy.tif"));

        let classification = ConsensusError::Classification {
            file: "a.tif".into(),
            matches: vec![],
        };
        assert!(!classification.is_scene_local());
        assert!(!ConsensusError::InvalidConfig("quorum".into()).is_scene_local());
    }
}
