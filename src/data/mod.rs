pub mod loader;
pub mod patch_extractor;
pub mod synthetic;
pub mod transformer;

pub use loader::*;
pub use patch_extractor::*;
pub use synthetic::*;
pub use transformer::*;
