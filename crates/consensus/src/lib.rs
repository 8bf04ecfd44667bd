//! # Fire Mask Consensus Library
//!
//! Combines the binary fire masks produced by several independent active-fire
//! detection algorithms into consensus masks, one per scene.
//!
//! ## Core Features
//!
//! - **Mask Catalog**: classifies mask files by algorithm and joins them per scene
//! - **Combination Rules**: intersection, quorum voting and union, behind one trait
//! - **Don't-care Handling**: missing algorithm outputs never add or remove fire
//! - **GeoTIFF I/O**: outputs keep the georeferencing of their input masks
//! - **Batch Driver**: staged, per-mode output with a JSON-serializable report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use consensus::{BatchConfig, BatchDriver};
//!
//! let config = BatchConfig {
//!     masks_dir: "dataset/masks".into(),
//!     output_dir: "dataset/masks".into(),
//!     ..Default::default()
//! };
//!
//! let report = BatchDriver::new(config)?.run()?;
//! report.save_json("report.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Single Scene
//!
//! ```rust,no_run
//! use consensus::{CombinationEngine, MaskCatalog, AlgorithmName, rules::VotingRule, catalog};
//!
//! let algorithms = ["Schroeder", "Murphy", "Kumar-Roy"]
//!     .into_iter()
//!     .map(AlgorithmName::new)
//!     .collect::<Result<Vec<_>, _>>()?;
//! let grouping = MaskCatalog::new(algorithms, "_")
//!     .classify(["LC08_RT_Schroeder.TIF", "LC08_RT_Murphy.TIF"])?;
//!
//! let engine = CombinationEngine::builder().build();
//! for scene in catalog::build_outer(&grouping) {
//!     let outcome = engine.combine(&scene, &VotingRule { quorum: 2 })?;
//!     println!("{}: {:?}", scene.scene, matches!(outcome, consensus::SceneOutcome::Empty));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod mode;
pub mod traits;
pub mod catalog;
pub mod naming;
pub mod rules;
pub mod engine;
pub mod io;
pub mod config;
pub mod report;
pub mod batch;

// Re-exports for convenience
pub use error::{ConsensusError, Result};
pub use types::{
    AlgorithmName, AlgorithmSlot, CombinedMask, GeoProfile, GeoReference, MaskArray, MaskEntry,
    RasterBand, SampleType, SceneId, SceneRecord,
};
pub use mode::{CombinationMode, JoinKind};
pub use traits::*;
pub use catalog::{Grouping, MaskCatalog};
pub use naming::OutputNaming;
pub use engine::{CombinationEngine, SceneOutcome, builder::EngineBuilder};
pub use io::*;
pub use config::{BatchConfig, GridExtent};
pub use report::{BatchReport, ModeReport, SceneFailure};
pub use batch::{BatchDriver, CatalogScan};
