//! Batch driver: discovers masks, builds the catalog, combines every scene
//! for every configured mode and moves the results into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::{
    catalog::{self, Grouping, MaskCatalog},
    config::BatchConfig,
    engine::{CombinationEngine, SceneOutcome},
    error::Result,
    io::{discover_masks, GeoTiffIo},
    mode::CombinationMode,
    report::{AlgorithmCount, BatchReport, ModeReport, SceneFailure},
    rules,
    traits::{RasterReader, RasterWriter},
};

/// Classified masks plus what discovery saw.
#[derive(Debug, Clone)]
pub struct CatalogScan {
    pub grouping: Grouping,
    pub discovered: usize,
    pub excluded_outputs: usize,
}

pub struct BatchDriver {
    config: BatchConfig,
    catalog: MaskCatalog,
    engine: CombinationEngine,
    writer: Box<dyn RasterWriter>,
}

impl BatchDriver {
    /// Driver reading and writing GeoTIFFs.
    pub fn new(config: BatchConfig) -> Result<Self> {
        Self::with_io(config, GeoTiffIo, GeoTiffIo)
    }

    pub fn with_io<R, W>(config: BatchConfig, reader: R, writer: W) -> Result<Self>
    where
        R: RasterReader + 'static,
        W: RasterWriter + 'static,
    {
        config.validate()?;
        let engine = CombinationEngine::builder()
            .reader(reader)
            .extent(config.extent)
            .verify_profiles(config.verify_profiles)
            .naming(config.naming())
            .build();

        Ok(Self {
            catalog: config.catalog()?,
            engine,
            writer: Box::new(writer),
            config,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Discover and classify the mask files. Outputs of earlier runs are
    /// recognised by their mode token and left out.
    pub fn scan(&self) -> Result<CatalogScan> {
        let naming = self.engine.naming();
        let (outputs, masks): (Vec<PathBuf>, Vec<PathBuf>) =
            discover_masks(&self.config.masks_dir, &self.config.extensions)?
                .into_iter()
                .partition(|path| naming.is_derived(path));

        if !outputs.is_empty() {
            debug!(count = outputs.len(), "ignoring previously combined masks");
        }
        if masks.is_empty() {
            warn!(dir = ?self.config.masks_dir, "No mask files found; nothing to combine");
        }

        Ok(CatalogScan {
            discovered: masks.len(),
            excluded_outputs: outputs.len(),
            grouping: self.catalog.classify(&masks)?,
        })
    }

    /// Run every configured mode. Classification problems and output write
    /// failures abort the run; scenes that fail to load are reported and
    /// skipped.
    pub fn run(&self) -> Result<BatchReport> {
        let scan = self.scan()?;
        let mut report = BatchReport {
            discovered: scan.discovered,
            excluded_outputs: scan.excluded_outputs,
            algorithms: scan
                .grouping
                .counts()
                .into_iter()
                .map(|(algorithm, masks)| AlgorithmCount {
                    algorithm: algorithm.to_string(),
                    masks,
                })
                .collect(),
            modes: Vec::with_capacity(self.config.modes.len()),
        };

        fs::create_dir_all(&self.config.output_dir)?;
        for &mode in &self.config.modes {
            report.modes.push(self.run_mode(&scan.grouping, mode)?);
        }

        report.log_summary();
        Ok(report)
    }

    /// Combine all scenes of one mode into a staging directory, then move
    /// the outputs into the output directory.
    pub fn run_mode(&self, grouping: &Grouping, mode: CombinationMode) -> Result<ModeReport> {
        let records = catalog::build(grouping, mode.join());
        let rule = rules::rule_for(mode, self.config.quorum);
        info!("Generating {} masks", mode);
        info!("Images to process: {}", records.len());

        let staging = self.staging_dir(mode);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let progress = mode_progress(records.len(), mode);
        let mut report = ModeReport::new(mode, records.len());
        for record in &records {
            let outcome = self.engine.combine(record, rule.as_ref());
            progress.inc(1);
            match outcome {
                Ok(SceneOutcome::Combined(mask)) => {
                    let path = staging.join(&mask.output_name);
                    if let Err(err) = self.writer.write_band(&path, &mask.data, &mask.profile) {
                        error!(?path, error = %err, "failed to write combined mask");
                        progress.abandon();
                        discard(&staging);
                        return Err(err);
                    }
                    debug!(scene = %record.scene, output = %mask.output_name, fire_pixels = mask.fire_pixels(), "written");
                    report.written.push(mask.output_name);
                }
                Ok(SceneOutcome::Empty) => {
                    debug!(scene = %record.scene, %mode, "skipped: empty result");
                    report.skipped_empty.push(record.scene.clone());
                }
                Err(err) if err.is_scene_local() => {
                    warn!(scene = %record.scene, %mode, error = %err, "skipped: scene failed");
                    report.failed.push(SceneFailure {
                        scene: record.scene.clone(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    progress.abandon();
                    discard(&staging);
                    return Err(err);
                }
            }
        }
        progress.finish_with_message(format!("{} written", report.written.len()));

        let moved = self.relocate(&staging)?;
        info!("{} masks created: {}", mode, moved);
        Ok(report)
    }

    fn staging_dir(&self, mode: CombinationMode) -> PathBuf {
        self.config.output_dir.join(format!(".staging-{mode}"))
    }

    /// Move every staged file into the output directory. If any move fails,
    /// files already moved go back, displaced outputs are restored and the
    /// staging directory is removed.
    fn relocate(&self, staging: &Path) -> Result<usize> {
        let mut files = fs::read_dir(staging)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<PathBuf>>>()?;
        files.retain(|path| path.is_file());
        files.sort();

        let backup = staging.join(".previous");
        let mut placed = Vec::with_capacity(files.len());
        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = self.config.output_dir.join(name);
            if let Err(err) = place(file, &target, &backup.join(name), &mut placed) {
                error!(?target, error = %err, "failed to move combined mask into place");
                roll_back(&placed);
                discard(staging);
                return Err(err.into());
            }
        }
        fs::remove_dir_all(staging)?;
        Ok(placed.len())
    }
}

/// A staged file moved to `target`, and the earlier output it replaced.
#[derive(Debug)]
struct Placed {
    staged: PathBuf,
    target: PathBuf,
    displaced: Option<PathBuf>,
}

fn place(file: &Path, target: &Path, backup: &Path, placed: &mut Vec<Placed>) -> io::Result<()> {
    let displaced = if target.is_file() {
        if let Some(dir) = backup.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::rename(target, backup)?;
        Some(backup.to_path_buf())
    } else {
        None
    };

    if let Err(err) = fs::rename(file, target) {
        if let Some(saved) = &displaced {
            restore(saved, target);
        }
        return Err(err);
    }
    placed.push(Placed {
        staged: file.to_path_buf(),
        target: target.to_path_buf(),
        displaced,
    });
    Ok(())
}

fn roll_back(placed: &[Placed]) {
    for entry in placed.iter().rev() {
        restore(&entry.target, &entry.staged);
        if let Some(saved) = &entry.displaced {
            restore(saved, &entry.target);
        }
    }
}

fn restore(from: &Path, to: &Path) {
    if let Err(err) = fs::rename(from, to) {
        warn!(?from, ?to, error = %err, "could not restore file");
    }
}

/// One bar per mode, advanced once per scene.
fn mode_progress(scenes: usize, mode: CombinationMode) -> ProgressBar {
    let progress = ProgressBar::new(scenes as u64);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress.set_message(mode.to_string());
    progress
}

fn discard(staging: &Path) {
    if let Err(err) = fs::remove_dir_all(staging) {
        warn!(?staging, error = %err, "could not remove staging directory");
    }
}
