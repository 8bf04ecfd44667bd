pub mod discovery;
pub mod geotiff;
pub mod memory;

pub use discovery::*;
pub use geotiff::*;
pub use memory::*;
