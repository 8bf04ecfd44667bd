pub mod builder;

use std::path::Path;

use ndarray::Array2;
use tracing::debug;

use crate::{
    config::GridExtent,
    error::{ConsensusError, Result},
    mode::JoinKind,
    naming::OutputNaming,
    traits::{CombinationRule, RasterReader},
    types::{count_true, CombinedMask, GeoProfile, MaskArray, SceneRecord},
};

/// What combining one scene produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOutcome {
    /// At least one fire pixel; ready to be written
    Combined(CombinedMask),
    /// No fire pixel anywhere; nothing is written
    Empty,
}

/// Turns one [`SceneRecord`] into zero or one [`CombinedMask`]
pub struct CombinationEngine {
    reader: Box<dyn RasterReader>,
    extent: GridExtent,
    verify_profiles: bool,
    naming: OutputNaming,
}

impl CombinationEngine {
    /// Create a new engine builder
    pub fn builder() -> builder::EngineBuilder {
        builder::EngineBuilder::new()
    }

    pub fn new(
        reader: Box<dyn RasterReader>,
        extent: GridExtent,
        verify_profiles: bool,
        naming: OutputNaming,
    ) -> Self {
        Self {
            reader,
            extent,
            verify_profiles,
            naming,
        }
    }

    pub fn naming(&self) -> &OutputNaming {
        &self.naming
    }

    /// Load and binarize one mask. Any reader failure becomes a
    /// [`ConsensusError::Decode`] naming the file.
    pub fn load_mask(&self, path: &Path) -> Result<MaskArray> {
        self.reader
            .read_band(path)
            .map(MaskArray::from_band)
            .map_err(|err| ConsensusError::Decode {
                path: path.to_path_buf(),
                source: Box::new(err),
            })
    }

    /// Combine the masks of `record` with `rule`.
    ///
    /// Masks are loaded in slot order. With an inner join every slot must be
    /// present; with an outer join absent slots become all-false grids.
    pub fn combine(&self, record: &SceneRecord, rule: &dyn CombinationRule) -> Result<SceneOutcome> {
        let mode = rule.mode();
        if mode.join() == JoinKind::Inner {
            if let Some(slot) = record.slots.iter().find(|slot| slot.path.is_none()) {
                return Err(ConsensusError::MissingOperand {
                    scene: record.scene.to_string(),
                    algorithm: slot.algorithm.to_string(),
                });
            }
        }

        let loaded = record
            .slots
            .iter()
            .map(|slot| slot.path.as_deref().map(|path| self.load_mask(path)).transpose())
            .collect::<Result<Vec<Option<MaskArray>>>>()?;

        let shape = self.resolve_shape(record, &loaded)?;
        let profile = self.check_constituents(record, &loaded, shape)?;

        let masks: Vec<Array2<bool>> = loaded
            .into_iter()
            .map(|mask| match mask {
                Some(mask) => mask.data,
                None => Array2::from_elem(shape, false),
            })
            .collect();

        let combined = rule.combine(shape, &masks);
        let fire_pixels = count_true(&combined);
        debug!(scene = %record.scene, %mode, fire_pixels, "combined scene");
        if fire_pixels == 0 {
            return Ok(SceneOutcome::Empty);
        }

        let profile = profile.ok_or_else(|| ConsensusError::NoConstituents(record.scene.to_string()))?;
        Ok(SceneOutcome::Combined(CombinedMask {
            scene: record.scene.clone(),
            mode,
            output_name: self.naming.output_name(&record.scene, mode),
            data: combined,
            profile: profile.to_mask_profile(),
        }))
    }

    /// Tiles have a fixed grid; scenes take the grid of the first loaded mask.
    fn resolve_shape(&self, record: &SceneRecord, loaded: &[Option<MaskArray>]) -> Result<(usize, usize)> {
        if let Some(shape) = self.extent.fixed_shape() {
            return Ok(shape);
        }
        loaded
            .iter()
            .flatten()
            .next()
            .map(MaskArray::shape)
            .ok_or_else(|| ConsensusError::NoConstituents(record.scene.to_string()))
    }

    /// Every loaded mask must cover `shape` and, when verification is on,
    /// share the first mask's georeferencing. Returns the first profile.
    fn check_constituents(
        &self,
        record: &SceneRecord,
        loaded: &[Option<MaskArray>],
        shape: (usize, usize),
    ) -> Result<Option<GeoProfile>> {
        let mut first: Option<&GeoProfile> = None;
        for (slot, mask) in record.slots.iter().zip(loaded) {
            let (Some(path), Some(mask)) = (&slot.path, mask) else {
                continue;
            };
            if mask.shape() != shape {
                return Err(ConsensusError::ShapeMismatch {
                    path: path.clone(),
                    expected: shape,
                    actual: mask.shape(),
                });
            }
            match first {
                None => first = Some(&mask.profile),
                Some(reference) => {
                    if self.verify_profiles && !mask.profile.is_aligned_with(reference) {
                        return Err(ConsensusError::ProfileMismatch { path: path.clone() });
                    }
                }
            }
        }
        Ok(first.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{build_inner, build_outer, MaskCatalog},
        io::MemoryRasterStore,
        mode::CombinationMode,
        rules::{IntersectionRule, VotingRule},
        types::{AlgorithmName, AlgorithmSlot, GeoReference, SampleType, SceneId},
    };
    use proptest::prelude::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn profile(rows: usize, cols: usize) -> GeoProfile {
        GeoProfile {
            width: cols as u32,
            height: rows as u32,
            band_count: 1,
            sample_type: SampleType::Uint8,
            georef: GeoReference {
                pixel_scale: Some(vec![375.0, 375.0, 0.0]),
                tiepoints: Some(vec![0.0, 0.0, 0.0, 300_000.0, 5_000_000.0, 0.0]),
                ..Default::default()
            },
            nodata: None,
        }
    }

    fn mask(rows: usize, cols: usize, fire: &[(usize, usize)]) -> Array2<bool> {
        let mut data = Array2::from_elem((rows, cols), false);
        for &cell in fire {
            data[cell] = true;
        }
        data
    }

    fn algorithms() -> Vec<AlgorithmName> {
        ["Schroeder", "Murphy", "Kumar-Roy"]
            .into_iter()
            .map(|name| AlgorithmName::new(name).unwrap())
            .collect()
    }

    fn engine(store: &Arc<MemoryRasterStore>) -> CombinationEngine {
        CombinationEngine::builder()
            .reader(Arc::clone(store))
            .build()
    }

    fn record(scene: &str, paths: [Option<&str>; 3]) -> SceneRecord {
        SceneRecord {
            scene: SceneId::new(scene),
            slots: algorithms()
                .into_iter()
                .zip(paths)
                .map(|(algorithm, path)| AlgorithmSlot {
                    algorithm,
                    path: path.map(PathBuf::from),
                })
                .collect(),
        }
    }

    #[test]
    fn test_partial_scene_votes_but_has_no_intersection() {
        let store = Arc::new(MemoryRasterStore::new());
        store.insert_mask("s_RT_Schroeder.tif", &mask(4, 4, &[(0, 0), (1, 1)]), profile(4, 4));
        store.insert_mask("s_RT_Murphy.tif", &mask(4, 4, &[(0, 0)]), profile(4, 4));

        let grouping = MaskCatalog::new(algorithms(), "_")
            .classify(store.paths())
            .unwrap();
        assert!(build_inner(&grouping).is_empty());

        let outer = build_outer(&grouping);
        assert_eq!(outer.len(), 1);

        let outcome = engine(&store)
            .combine(&outer[0], &VotingRule { quorum: 2 })
            .unwrap();
        let SceneOutcome::Combined(combined) = outcome else {
            panic!("expected a combined mask");
        };
        assert_eq!(combined.data, mask(4, 4, &[(0, 0)]));
        assert_eq!(combined.fire_pixels(), 1);
        assert_eq!(combined.output_name, "s_RT_Voting.tif");
        assert_eq!(combined.mode, CombinationMode::Voting);
    }

    #[test]
    fn test_all_true_scene_in_both_modes() {
        let store = Arc::new(MemoryRasterStore::new());
        let all = Array2::from_elem((2, 2), true);
        for path in ["a_RT_Schroeder.tif", "a_RT_Murphy.tif", "a_RT_Kumar-Roy.tif"] {
            store.insert_mask(path, &all, profile(2, 2));
        }
        let scene = record(
            "a_RT.tif",
            [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), Some("a_RT_Kumar-Roy.tif")],
        );
        let engine = engine(&store);
        let voting = VotingRule { quorum: 2 };
        let rules: [&dyn CombinationRule; 2] = [&IntersectionRule, &voting];

        for rule in rules {
            match engine.combine(&scene, rule).unwrap() {
                SceneOutcome::Combined(combined) => assert_eq!(combined.data, all),
                SceneOutcome::Empty => panic!("expected output for {}", rule.mode()),
            }
        }
    }

    #[test]
    fn test_all_false_scene_is_empty_in_both_modes() {
        let store = Arc::new(MemoryRasterStore::new());
        let none = Array2::from_elem((2, 2), false);
        for path in ["a_RT_Schroeder.tif", "a_RT_Murphy.tif", "a_RT_Kumar-Roy.tif"] {
            store.insert_mask(path, &none, profile(2, 2));
        }
        let scene = record(
            "a_RT.tif",
            [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), Some("a_RT_Kumar-Roy.tif")],
        );
        let engine = engine(&store);

        assert_eq!(engine.combine(&scene, &IntersectionRule).unwrap(), SceneOutcome::Empty);
        assert_eq!(engine.combine(&scene, &VotingRule { quorum: 2 }).unwrap(), SceneOutcome::Empty);
    }

    #[test]
    fn test_intersection_rejects_absent_operand() {
        let store = Arc::new(MemoryRasterStore::new());
        let scene = record("a_RT.tif", [Some("a_RT_Schroeder.tif"), None, None]);
        let err = engine(&store).combine(&scene, &IntersectionRule).unwrap_err();
        assert!(matches!(err, ConsensusError::MissingOperand { ref algorithm, .. } if algorithm == "Murphy"));
    }

    #[test]
    fn test_unreadable_mask_is_decode_error() {
        let store = Arc::new(MemoryRasterStore::new());
        store.insert_mask("a_RT_Schroeder.tif", &mask(2, 2, &[(0, 0)]), profile(2, 2));
        let scene = record("a_RT.tif", [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), None]);

        let err = engine(&store)
            .combine(&scene, &VotingRule { quorum: 1 })
            .unwrap_err();
        assert!(err.is_scene_local());
        match err {
            ConsensusError::Decode { path, .. } => assert_eq!(path, PathBuf::from("a_RT_Murphy.tif")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_profile_taken_from_first_loaded_mask() {
        let store = Arc::new(MemoryRasterStore::new());
        let mut wide = profile(2, 2);
        wide.band_count = 4;
        wide.sample_type = SampleType::Int16;
        store.insert_mask("a_RT_Murphy.tif", &mask(2, 2, &[(1, 0)]), wide.clone());
        store.insert_mask("a_RT_Kumar-Roy.tif", &mask(2, 2, &[(1, 0)]), profile(2, 2));
        let scene = record("a_RT.tif", [None, Some("a_RT_Murphy.tif"), Some("a_RT_Kumar-Roy.tif")]);

        let SceneOutcome::Combined(combined) = engine(&store)
            .combine(&scene, &VotingRule { quorum: 2 })
            .unwrap()
        else {
            panic!("expected a combined mask");
        };
        assert_eq!(combined.profile.georef, wide.georef);
        assert_eq!(combined.profile.band_count, 1);
        assert_eq!(combined.profile.sample_type, SampleType::Uint8);
    }

    #[test]
    fn test_misaligned_profiles_fail_the_scene() {
        let store = Arc::new(MemoryRasterStore::new());
        let mut shifted = profile(2, 2);
        shifted.georef.tiepoints = Some(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store.insert_mask("a_RT_Schroeder.tif", &mask(2, 2, &[(0, 0)]), profile(2, 2));
        store.insert_mask("a_RT_Murphy.tif", &mask(2, 2, &[(0, 0)]), shifted);
        let scene = record("a_RT.tif", [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), None]);

        let err = engine(&store)
            .combine(&scene, &VotingRule { quorum: 2 })
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ProfileMismatch { .. }));

        let lenient = CombinationEngine::builder()
            .reader(Arc::clone(&store))
            .verify_profiles(false)
            .build();
        assert!(matches!(
            lenient.combine(&scene, &VotingRule { quorum: 2 }).unwrap(),
            SceneOutcome::Combined(_)
        ));
    }

    #[test]
    fn test_mismatched_grid_fails_the_scene() {
        let store = Arc::new(MemoryRasterStore::new());
        store.insert_mask("a_RT_Schroeder.tif", &mask(2, 2, &[(0, 0)]), profile(2, 2));
        store.insert_mask("a_RT_Murphy.tif", &mask(3, 3, &[(0, 0)]), profile(3, 3));
        let scene = record("a_RT.tif", [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), None]);

        let err = engine(&store)
            .combine(&scene, &VotingRule { quorum: 1 })
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ShapeMismatch { expected: (2, 2), actual: (3, 3), .. }));
    }

    #[test]
    fn test_tile_extent_requires_tile_sized_masks() {
        let store = Arc::new(MemoryRasterStore::new());
        store.insert_mask("a_RT_Schroeder.tif", &mask(4, 4, &[(0, 0)]), profile(4, 4));
        let scene = record("a_RT.tif", [Some("a_RT_Schroeder.tif"), None, None]);

        let tiles = |width, height| {
            CombinationEngine::builder()
                .reader(Arc::clone(&store))
                .extent(GridExtent::Tile { width, height })
                .build()
        };

        let err = tiles(2, 2).combine(&scene, &VotingRule { quorum: 1 }).unwrap_err();
        assert!(matches!(err, ConsensusError::ShapeMismatch { .. }));
        assert!(matches!(
            tiles(4, 4).combine(&scene, &VotingRule { quorum: 1 }).unwrap(),
            SceneOutcome::Combined(_)
        ));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let store = Arc::new(MemoryRasterStore::new());
        store.insert_mask("a_RT_Schroeder.tif", &mask(3, 3, &[(0, 0), (2, 2)]), profile(3, 3));
        store.insert_mask("a_RT_Murphy.tif", &mask(3, 3, &[(2, 2), (1, 1)]), profile(3, 3));
        store.insert_mask("a_RT_Kumar-Roy.tif", &mask(3, 3, &[(1, 1)]), profile(3, 3));
        let scene = record(
            "a_RT.tif",
            [Some("a_RT_Schroeder.tif"), Some("a_RT_Murphy.tif"), Some("a_RT_Kumar-Roy.tif")],
        );
        let engine = engine(&store);

        let first = engine.combine(&scene, &VotingRule { quorum: 2 }).unwrap();
        let second = engine.combine(&scene, &VotingRule { quorum: 2 }).unwrap();
        assert_eq!(first, second);
    }

    /// A random grid with three algorithm slots, at least one of them present.
    fn partial_scenes() -> impl Strategy<Value = ((usize, usize), Vec<Option<Array2<bool>>>)> {
        (1usize..5, 1usize..5).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(
                prop::option::of(prop::collection::vec(any::<bool>(), rows * cols)),
                3,
            )
            .prop_filter("at least one algorithm present", |slots| slots.iter().any(Option::is_some))
            .prop_map(move |slots| {
                let masks = slots
                    .into_iter()
                    .map(|cells| cells.map(|data| Array2::from_shape_vec((rows, cols), data).unwrap()))
                    .collect();
                ((rows, cols), masks)
            })
        })
    }

    fn expect_outcome(
        outcome: SceneOutcome,
        expected: &Array2<bool>,
    ) -> std::result::Result<(), TestCaseError> {
        match outcome {
            SceneOutcome::Empty => {
                prop_assert!(expected.iter().all(|&fire| !fire));
            }
            SceneOutcome::Combined(combined) => {
                prop_assert_eq!(&combined.data, expected);
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn test_combine_treats_absent_masks_as_no_vote(
            (shape, masks) in partial_scenes(),
            quorum in 1u32..4,
        ) {
            let store = Arc::new(MemoryRasterStore::new());
            let files = ["s_RT_Schroeder.tif", "s_RT_Murphy.tif", "s_RT_Kumar-Roy.tif"];
            let mut paths = [None; 3];
            for (index, mask) in masks.iter().enumerate() {
                if let Some(mask) = mask {
                    store.insert_mask(files[index], mask, profile(shape.0, shape.1));
                    paths[index] = Some(files[index]);
                }
            }
            let scene = record("s_RT.tif", paths);
            let engine = engine(&store);
            let votes = |row: usize, col: usize| {
                masks.iter().flatten().filter(|mask| mask[[row, col]]).count()
            };

            let voted = Array2::from_shape_fn(shape, |(row, col)| votes(row, col) as u32 >= quorum);
            expect_outcome(engine.combine(&scene, &VotingRule { quorum }).unwrap(), &voted)?;

            let intersection = engine.combine(&scene, &IntersectionRule);
            if masks.iter().all(Option::is_some) {
                let all = Array2::from_shape_fn(shape, |(row, col)| votes(row, col) == 3);
                expect_outcome(intersection.unwrap(), &all)?;
            } else {
                let is_missing_operand = matches!(intersection, Err(ConsensusError::MissingOperand { .. }));
                prop_assert!(is_missing_operand);
            }
        }
    }
}
