//! Classification of mask files by producing algorithm, and the inner/outer
//! joins that turn per-algorithm groups into [`SceneRecord`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    error::{ConsensusError, Result},
    mode::JoinKind,
    types::{AlgorithmName, AlgorithmSlot, MaskEntry, SceneId, SceneRecord},
};

/// Masks grouped by algorithm, in configured algorithm order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    groups: Vec<(AlgorithmName, BTreeMap<SceneId, PathBuf>)>,
}

impl Grouping {
    pub fn algorithms(&self) -> impl Iterator<Item = &AlgorithmName> {
        self.groups.iter().map(|(algorithm, _)| algorithm)
    }

    /// Number of masks found per algorithm.
    pub fn counts(&self) -> Vec<(AlgorithmName, usize)> {
        self.groups
            .iter()
            .map(|(algorithm, scenes)| (algorithm.clone(), scenes.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|(_, scenes)| scenes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = MaskEntry> + '_ {
        self.groups.iter().flat_map(|(algorithm, scenes)| {
            scenes.iter().map(move |(scene, path)| MaskEntry {
                scene: scene.clone(),
                algorithm: algorithm.clone(),
                path: path.clone(),
            })
        })
    }

    fn record(&self, scene: &SceneId) -> SceneRecord {
        SceneRecord {
            scene: scene.clone(),
            slots: self
                .groups
                .iter()
                .map(|(algorithm, scenes)| AlgorithmSlot {
                    algorithm: algorithm.clone(),
                    path: scenes.get(scene).cloned(),
                })
                .collect(),
        }
    }
}

/// Classifies mask filenames against a fixed, ordered algorithm list.
#[derive(Debug, Clone)]
pub struct MaskCatalog {
    algorithms: Vec<AlgorithmName>,
    separator: String,
}

impl MaskCatalog {
    pub fn new(algorithms: Vec<AlgorithmName>, separator: impl Into<String>) -> Self {
        Self {
            algorithms,
            separator: separator.into(),
        }
    }

    pub fn algorithms(&self) -> &[AlgorithmName] {
        &self.algorithms
    }

    /// Strip every `<separator><algorithm>` token from `filename`.
    pub fn scene_id(&self, filename: &str) -> SceneId {
        scene_id(filename, &self.algorithms, &self.separator)
    }

    /// Group `paths` by the single algorithm name each filename contains.
    pub fn classify<I, P>(&self, paths: I) -> Result<Grouping>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        classify(paths, &self.algorithms, &self.separator)
    }
}

/// Strip every `<separator><algorithm>` token from `filename`, whichever
/// algorithm produced it.
pub fn scene_id(filename: &str, algorithms: &[AlgorithmName], separator: &str) -> SceneId {
    let mut id = filename.to_string();
    for algorithm in algorithms {
        id = id.replace(&format!("{separator}{algorithm}"), "");
    }
    SceneId::new(id)
}

/// Group `paths` by the single algorithm name each filename contains.
///
/// A filename naming no algorithm, or more than one, fails the whole
/// classification, as do two files of one algorithm mapping to the same scene.
pub fn classify<I, P>(paths: I, algorithms: &[AlgorithmName], separator: &str) -> Result<Grouping>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut groups: Vec<(AlgorithmName, BTreeMap<SceneId, PathBuf>)> = algorithms
        .iter()
        .map(|algorithm| (algorithm.clone(), BTreeMap::new()))
        .collect();

    for path in paths {
        let path = path.as_ref();
        let file = file_name(path);

        let matches: Vec<usize> = algorithms
            .iter()
            .enumerate()
            .filter(|(_, algorithm)| file.contains(algorithm.as_str()))
            .map(|(index, _)| index)
            .collect();

        let [index] = matches[..] else {
            return Err(ConsensusError::Classification {
                file,
                matches: matches
                    .iter()
                    .map(|&index| algorithms[index].to_string())
                    .collect(),
            });
        };

        let scene = scene_id(&file, algorithms, separator);
        let (algorithm, scenes) = &mut groups[index];
        if let Some(first) = scenes.get(&scene) {
            return Err(ConsensusError::DuplicateScene {
                algorithm: algorithm.to_string(),
                scene: scene.to_string(),
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        debug!(%algorithm, %scene, ?path, "classified mask");
        scenes.insert(scene, path.to_path_buf());
    }

    Ok(Grouping { groups })
}

/// Scenes every algorithm produced a mask for.
pub fn build_inner(grouping: &Grouping) -> Vec<SceneRecord> {
    let Some(((_, first), rest)) = grouping.groups.split_first() else {
        return Vec::new();
    };
    first
        .keys()
        .filter(|scene| rest.iter().all(|(_, scenes)| scenes.contains_key(*scene)))
        .map(|scene| grouping.record(scene))
        .collect()
}

/// Scenes at least one algorithm produced a mask for; the others are absent.
pub fn build_outer(grouping: &Grouping) -> Vec<SceneRecord> {
    let scenes: BTreeSet<&SceneId> = grouping
        .groups
        .iter()
        .flat_map(|(_, scenes)| scenes.keys())
        .collect();
    scenes.into_iter().map(|scene| grouping.record(scene)).collect()
}

pub fn build(grouping: &Grouping, join: JoinKind) -> Vec<SceneRecord> {
    match join {
        JoinKind::Inner => build_inner(grouping),
        JoinKind::Outer => build_outer(grouping),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
