use crate::{
    config::GridExtent,
    engine::CombinationEngine,
    io::GeoTiffIo,
    naming::OutputNaming,
    traits::RasterReader,
};

/// Builder for creating combination engines with a fluent API
pub struct EngineBuilder {
    reader: Option<Box<dyn RasterReader>>,
    extent: GridExtent,
    verify_profiles: bool,
    naming: OutputNaming,
}

impl EngineBuilder {
    /// Create a new engine builder
    pub fn new() -> Self {
        Self {
            reader: None,
            extent: GridExtent::Scene,
            verify_profiles: true,
            naming: OutputNaming::default(),
        }
    }

    /// Set the raster reader (replaces any existing one)
    pub fn reader<R>(mut self, reader: R) -> Self
    where
        R: RasterReader + 'static,
    {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Set a boxed raster reader (replaces any existing one)
    pub fn boxed_reader(mut self, reader: Box<dyn RasterReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn extent(mut self, extent: GridExtent) -> Self {
        self.extent = extent;
        self
    }

    /// Check that all masks of a scene share one georeferencing
    pub fn verify_profiles(mut self, verify: bool) -> Self {
        self.verify_profiles = verify;
        self
    }

    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Build the engine, reading GeoTIFFs unless another reader was set
    pub fn build(self) -> CombinationEngine {
        let reader = self.reader.unwrap_or_else(|| Box::new(GeoTiffIo));

        CombinationEngine::new(reader, self.extent, self.verify_profiles, self.naming)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
