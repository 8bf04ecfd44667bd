use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{ConsensusError, Result};
use crate::mode::CombinationMode;

/// Scene identity: a mask filename with every algorithm token stripped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a configured detection algorithm (e.g. `Schroeder`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmName(String);

impl AlgorithmName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConsensusError::InvalidConfig(
                "algorithm names must not be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One classified mask file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskEntry {
    pub scene: SceneId,
    pub algorithm: AlgorithmName,
    pub path: PathBuf,
}

/// An algorithm's slot in a scene; `path` is `None` when that algorithm
/// produced no mask for the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSlot {
    pub algorithm: AlgorithmName,
    pub path: Option<PathBuf>,
}

/// All masks known for one scene, one slot per configured algorithm in
/// configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRecord {
    pub scene: SceneId,
    pub slots: Vec<AlgorithmSlot>,
}

impl SceneRecord {
    /// Paths of the algorithms that did produce a mask, in slot order.
    pub fn present(&self) -> impl Iterator<Item = (&AlgorithmName, &Path)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.path.as_deref().map(|path| (&slot.algorithm, path)))
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.path.is_some())
    }

    pub fn path_for(&self, algorithm: &AlgorithmName) -> Option<&Path> {
        self.slots
            .iter()
            .find(|slot| &slot.algorithm == algorithm)
            .and_then(|slot| slot.path.as_deref())
    }
}

/// Storage type of raster samples.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SampleType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

/// GeoTIFF georeferencing tags: CRS keys and the raster-to-model transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoints: Option<Vec<f64>>,
    pub transformation: Option<Vec<f64>>,
    pub key_directory: Option<Vec<u16>>,
    pub double_params: Option<Vec<f64>>,
    pub ascii_params: Option<String>,
}

impl GeoReference {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Georeferencing plus raster-format metadata of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoProfile {
    pub width: u32,
    pub height: u32,
    pub band_count: u16,
    pub sample_type: SampleType,
    pub georef: GeoReference,
    /// GDAL nodata value as written in the GDAL_NODATA tag
    #[serde(default)]
    pub nodata: Option<String>,
}

impl GeoProfile {
    /// Grid shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    /// Profile for a derived 0/1 mask: single band, 8-bit unsigned, same grid.
    pub fn to_mask_profile(&self) -> GeoProfile {
        GeoProfile {
            band_count: 1,
            sample_type: SampleType::Uint8,
            ..self.clone()
        }
    }

    /// Same pixel grid and coordinate reference; sample type, band count
    /// and nodata are allowed to differ.
    pub fn is_aligned_with(&self, other: &GeoProfile) -> bool {
        self.width == other.width && self.height == other.height && self.georef == other.georef
    }
}

/// First band of a raster, as decoded integers.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub data: Array2<i64>,
    pub profile: GeoProfile,
}

/// A binarized mask (non-zero is fire) with the profile it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskArray {
    pub data: Array2<bool>,
    pub profile: GeoProfile,
}

impl MaskArray {
    pub fn from_band(band: RasterBand) -> Self {
        Self {
            data: band.data.mapv(|value| value != 0),
            profile: band.profile,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Non-empty result of combining one scene's masks.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedMask {
    pub scene: SceneId,
    pub mode: CombinationMode,
    pub output_name: String,
    pub data: Array2<bool>,
    pub profile: GeoProfile,
}

impl CombinedMask {
    pub fn fire_pixels(&self) -> usize {
        count_true(&self.data)
    }
}

pub(crate) fn count_true(data: &Array2<bool>) -> usize {
    data.iter().filter(|&&fire| fire).count()
}
