use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::Result, mode::CombinationMode, types::SceneId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmCount {
    pub algorithm: String,
    pub masks: usize,
}

/// A scene that could not be combined, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneFailure {
    pub scene: SceneId,
    pub reason: String,
}

/// Outcome of one mode over all of its scenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeReport {
    pub mode: CombinationMode,
    /// Scenes selected by the mode's join
    pub considered: usize,
    /// Output filenames written
    pub written: Vec<String>,
    /// Scenes whose combination had no fire pixel
    pub skipped_empty: Vec<SceneId>,
    /// Scenes that failed to load or combine
    pub failed: Vec<SceneFailure>,
}

impl ModeReport {
    pub fn new(mode: CombinationMode, considered: usize) -> Self {
        Self {
            mode,
            considered,
            written: Vec::new(),
            skipped_empty: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_empty.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Mask files found before classification
    pub discovered: usize,
    /// Previously written outputs left out of the catalog
    pub excluded_outputs: usize,
    pub algorithms: Vec<AlgorithmCount>,
    pub modes: Vec<ModeReport>,
}

impl BatchReport {
    pub fn mode(&self, mode: CombinationMode) -> Option<&ModeReport> {
        self.modes.iter().find(|report| report.mode == mode)
    }

    pub fn has_failures(&self) -> bool {
        self.modes.iter().any(|report| !report.failed.is_empty())
    }

    pub fn log_summary(&self) {
        info!(
            discovered = self.discovered,
            excluded_outputs = self.excluded_outputs,
            "Masks found: {}",
            self.discovered
        );
        for count in &self.algorithms {
            info!("{} - Images: {}", count.algorithm, count.masks);
        }
        for report in &self.modes {
            info!(
                mode = %report.mode,
                considered = report.considered,
                written = report.written.len(),
                skipped_empty = report.skipped_empty.len(),
                failed = report.failed.len(),
                "{} masks: {} written of {} scenes",
                report.mode,
                report.written.len(),
                report.considered
            );
            for failure in &report.failed {
                warn!(mode = %report.mode, scene = %failure.scene, reason = %failure.reason, "scene failed");
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
