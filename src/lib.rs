//! Lucas-Kanade template alignment on image pyramids.
//!
//! Estimates the warp that maps a template into a target image with the
//! forward additive, forward compositional or inverse compositional
//! formulation, coarse to fine.

pub mod algorithms;
pub mod analysis;
pub mod config;
pub mod data;
pub mod imgproc;
pub mod logging;
pub mod pipeline;
pub mod utils;
pub mod visualization;
pub mod warp;

pub use algorithms::*;
pub use analysis::*;
pub use data::*;
pub use imgproc::{ImagePyramid, Sampler};
pub use pipeline::*;
pub use warp::{
    AffineWarp, DynWarp, EuclideanWarp, PerspectiveWarp, SimilarityWarp, Transform2D,
    TranslationWarp, Warp, WarpMode,
};

pub type Result<T> = anyhow::Result<T>;
