pub mod builder;
pub mod traits;
pub mod types;

pub use builder::*;
pub use traits::*;
pub use types::*;
