use std::path::Path;
use std::sync::Arc;

use ndarray::Array2;

use crate::{
    error::Result,
    mode::CombinationMode,
    types::{GeoProfile, RasterBand},
};

/// Trait for raster decoders
pub trait RasterReader: Send + Sync {
    /// Read the first band of the raster at `path` with its profile
    fn read_band(&self, path: &Path) -> Result<RasterBand>;
}

/// Trait for raster encoders
pub trait RasterWriter: Send + Sync {
    /// Write a 0/1 mask to `path` using the given profile
    fn write_band(&self, path: &Path, mask: &Array2<bool>, profile: &GeoProfile) -> Result<()>;
}

/// Trait for pixel-wise combination rules
pub trait CombinationRule: Send + Sync {
    /// Mode this rule implements
    fn mode(&self) -> CombinationMode;

    /// Combine the effective masks of one scene.
    ///
    /// `masks` is in configured algorithm order; absent algorithms have
    /// already been replaced by all-false grids of `shape`.
    fn combine(&self, shape: (usize, usize), masks: &[Array2<bool>]) -> Array2<bool>;
}

impl<T: RasterReader + ?Sized> RasterReader for Arc<T> {
    fn read_band(&self, path: &Path) -> Result<RasterBand> {
        (**self).read_band(path)
    }
}

impl<T: RasterWriter + ?Sized> RasterWriter for Arc<T> {
    fn write_band(&self, path: &Path, mask: &Array2<bool>, profile: &GeoProfile) -> Result<()> {
        (**self).write_band(path, mask, profile)
    }
}
