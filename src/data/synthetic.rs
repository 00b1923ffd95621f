//! Synthetic alignment problems with known ground truth.

use super::transformer::ImageTransformer;
use crate::warp::{
    AffineWarp, DynWarp, EuclideanWarp, Params, PerspectiveWarp, SimilarityWarp, TranslationWarp,
    Warp, WarpMode,
};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub mode: WarpMode,
    pub width: usize,
    pub height: usize,
    pub template_size: usize,
    pub blur: usize,
    pub noise_sigma: f32,
    pub seed: u64,
    /// Ground truth parameters; per-mode default when `None`
    pub ground_truth: Option<Vec<f64>>,
    /// Added to the ground truth to obtain the initial guess
    pub perturbation: Option<Vec<f64>>,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            mode: WarpMode::Translation,
            width: 100,
            height: 100,
            template_size: 20,
            blur: 5,
            noise_sigma: 0.0,
            seed: 0,
            ground_truth: None,
            perturbation: None,
        }
    }
}

/// A target, a template cut out of it through a known warp and a
/// perturbed starting point.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub target: Array2<f32>,
    pub template: Array2<f32>,
    pub ground_truth: DynWarp,
    pub initial: DynWarp,
}

/// Uniformly distributed 8-bit noise
pub fn random_texture(width: usize, height: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((height, width), || f32::from(rng.gen::<u8>()))
}

/// Ground truth used when none is given, keeps a 20x20 template inside a
/// 100x100 target.
pub fn default_ground_truth(mode: WarpMode) -> DynWarp {
    match mode {
        WarpMode::Translation => TranslationWarp::new(20.0, 20.0).to_dynamic(),
        WarpMode::Euclidean => EuclideanWarp::new(10.0, 15.0, 0.18).to_dynamic(),
        WarpMode::Similarity => SimilarityWarp::from_canonical(10.0, 15.0, 0.18, 1.0).to_dynamic(),
        WarpMode::Affine => {
            AffineWarp::from_parameters(&Params::<6>::new(10.0, 15.0, 0.05, 0.03, -0.04, 0.02))
                .to_dynamic()
        }
        WarpMode::Perspective => PerspectiveWarp::from_parameters(&Params::<8>::from_column_slice(
            &[10.0, 15.0, 0.05, 0.03, -0.04, 0.02, 1e-4, -1e-4],
        ))
        .to_dynamic(),
    }
}

/// Offset of the initial guess from the ground truth when none is given
pub fn default_perturbation(mode: WarpMode) -> Vec<f64> {
    match mode {
        WarpMode::Translation => vec![-2.0, -2.0],
        WarpMode::Euclidean => vec![1.5, -1.2, 0.02],
        WarpMode::Similarity => vec![0.8, -0.7, 0.02, 0.01],
        WarpMode::Affine => vec![1.0, -1.0, 0.01, -0.01, 0.01, 0.01],
        WarpMode::Perspective => vec![1.0, -1.0, 0.01, -0.01, 0.01, 0.01, 0.0, 0.0],
    }
}

impl SyntheticScene {
    pub fn generate(params: &SyntheticParams) -> crate::Result<Self> {
        let mode = params.mode;
        if params.template_size == 0 || params.width == 0 || params.height == 0 {
            return Err(anyhow::anyhow!("Synthetic images must not be empty"));
        }

        let ground_truth = match &params.ground_truth {
            Some(p) => DynWarp::from_parameters(mode, p)?,
            None => default_ground_truth(mode),
        };
        let perturbation = params
            .perturbation
            .clone()
            .unwrap_or_else(|| default_perturbation(mode));
        let initial_params: Vec<f64> = ground_truth
            .parameters()
            .iter()
            .zip(perturbation.iter().chain(std::iter::repeat(&0.0)))
            .map(|(p, d)| p + d)
            .collect();
        let initial = DynWarp::from_parameters(mode, &initial_params)?;

        let texture = random_texture(params.width, params.height, params.seed);
        let target = ImageTransformer::box_blur(&texture, params.blur);
        let template = ImageTransformer::warp(
            &target,
            &ground_truth,
            params.template_size,
            params.template_size,
        );
        let target = ImageTransformer::add_gaussian_noise(
            &target,
            params.noise_sigma,
            params.seed.wrapping_add(1),
        )?;

        debug!(
            mode = %mode,
            ground_truth = %ground_truth,
            initial = %initial,
            "Synthetic scene generated"
        );

        Ok(Self {
            target,
            template,
            ground_truth,
            initial,
        })
    }
}
