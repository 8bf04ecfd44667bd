use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ndarray::Array2;

use crate::{
    error::{ConsensusError, Result},
    traits::{RasterReader, RasterWriter},
    types::{GeoProfile, RasterBand},
};

/// Raster store held in memory, keyed by path
#[derive(Debug, Default)]
pub struct MemoryRasterStore {
    bands: Mutex<BTreeMap<PathBuf, RasterBand>>,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, band: RasterBand) {
        self.lock().insert(path.into(), band);
    }

    /// Store a boolean mask as a 0/1 band.
    pub fn insert_mask(&self, path: impl Into<PathBuf>, mask: &Array2<bool>, profile: GeoProfile) {
        let data = mask.mapv(i64::from);
        self.insert(path, RasterBand { data, profile });
    }

    pub fn get(&self, path: &Path) -> Option<RasterBand> {
        self.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, RasterBand>> {
        self.bands.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RasterReader for MemoryRasterStore {
    fn read_band(&self, path: &Path) -> Result<RasterBand> {
        self.get(path).ok_or_else(|| {
            ConsensusError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no raster stored at {}", path.display()),
            ))
        })
    }
}

impl RasterWriter for MemoryRasterStore {
    fn write_band(&self, path: &Path, mask: &Array2<bool>, profile: &GeoProfile) -> Result<()> {
        self.insert_mask(path, mask, profile.to_mask_profile());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoReference, SampleType};
    use ndarray::array;

    fn profile() -> GeoProfile {
        GeoProfile {
            width: 2,
            height: 1,
            band_count: 1,
            sample_type: SampleType::Uint16,
            georef: GeoReference::default(),
            nodata: None,
        }
    }

    #[test]
    fn test_write_then_read() {
        let store = MemoryRasterStore::new();
        store
            .write_band(Path::new("out.tif"), &array![[true, false]], &profile())
            .unwrap();

        let band = store.read_band(Path::new("out.tif")).unwrap();
        assert_eq!(band.data, array![[1, 0]]);
        assert_eq!(band.profile.sample_type, SampleType::Uint8);
    }

    #[test]
    fn test_missing_path_is_error() {
        let store = MemoryRasterStore::new();
        assert!(store.read_band(Path::new("nowhere.tif")).is_err());
    }
}
