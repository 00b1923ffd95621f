//! Warp whose motion model is only known at runtime.

use super::{
    AffineWarp, EuclideanWarp, Params, PerspectiveWarp, Point, SimilarityWarp, Transform2D,
    TranslationWarp, Warp, WarpMode,
};
use anyhow::{bail, Result};
use nalgebra::{DVector, Matrix3};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DynWarpRepr", into = "DynWarpRepr")]
pub enum DynWarp {
    Translation(TranslationWarp),
    Euclidean(EuclideanWarp),
    Similarity(SimilarityWarp),
    Affine(AffineWarp),
    Perspective(PerspectiveWarp),
}

/// Serialized form: the motion model plus its parameter vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DynWarpRepr {
    mode: WarpMode,
    parameters: Vec<f64>,
}

impl From<DynWarp> for DynWarpRepr {
    fn from(w: DynWarp) -> Self {
        Self {
            mode: w.mode(),
            parameters: w.parameters().iter().copied().collect(),
        }
    }
}

impl TryFrom<DynWarpRepr> for DynWarp {
    type Error = anyhow::Error;

    fn try_from(r: DynWarpRepr) -> Result<Self> {
        let mut w = DynWarp::identity(r.mode);
        w.set_parameters(&DVector::from_vec(r.parameters))?;
        Ok(w)
    }
}

macro_rules! dispatch {
    ($self:expr, $w:ident => $body:expr) => {
        match $self {
            DynWarp::Translation($w) => $body,
            DynWarp::Euclidean($w) => $body,
            DynWarp::Similarity($w) => $body,
            DynWarp::Affine($w) => $body,
            DynWarp::Perspective($w) => $body,
        }
    };
}

fn set_fixed<W: Warp<N>, const N: usize>(w: &mut W, p: &DVector<f64>) {
    w.set_parameters(&Params::<N>::from_column_slice(p.as_slice()));
}

impl DynWarp {
    pub fn identity(mode: WarpMode) -> Self {
        match mode {
            WarpMode::Translation => DynWarp::Translation(TranslationWarp::identity()),
            WarpMode::Euclidean => DynWarp::Euclidean(EuclideanWarp::identity()),
            WarpMode::Similarity => DynWarp::Similarity(SimilarityWarp::identity()),
            WarpMode::Affine => DynWarp::Affine(AffineWarp::identity()),
            WarpMode::Perspective => DynWarp::Perspective(PerspectiveWarp::identity()),
        }
    }

    /// Build a warp of the given model from a parameter slice.
    pub fn from_parameters(mode: WarpMode, p: &[f64]) -> Result<Self> {
        let mut w = Self::identity(mode);
        w.set_parameters(&DVector::from_column_slice(p))?;
        Ok(w)
    }

    pub fn mode(&self) -> WarpMode {
        match self {
            DynWarp::Translation(_) => WarpMode::Translation,
            DynWarp::Euclidean(_) => WarpMode::Euclidean,
            DynWarp::Similarity(_) => WarpMode::Similarity,
            DynWarp::Affine(_) => WarpMode::Affine,
            DynWarp::Perspective(_) => WarpMode::Perspective,
        }
    }

    pub fn num_parameters(&self) -> usize {
        self.mode().num_parameters()
    }

    pub fn parameters(&self) -> DVector<f64> {
        dispatch!(self, w => DVector::from_column_slice(w.parameters().as_slice()))
    }

    /// Fails if the length of `p` does not match the motion model.
    pub fn set_parameters(&mut self, p: &DVector<f64>) -> Result<()> {
        if p.len() != self.num_parameters() {
            bail!(
                "{} warp expects {} parameters, got {}",
                self.mode(),
                self.num_parameters(),
                p.len()
            );
        }
        match self {
            DynWarp::Translation(w) => set_fixed::<_, 2>(w, p),
            DynWarp::Euclidean(w) => set_fixed::<_, 3>(w, p),
            DynWarp::Similarity(w) => set_fixed::<_, 4>(w, p),
            DynWarp::Affine(w) => set_fixed::<_, 6>(w, p),
            DynWarp::Perspective(w) => set_fixed::<_, 8>(w, p),
        }
        Ok(())
    }

    pub fn set_identity(&mut self) {
        dispatch!(self, w => w.set_identity())
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        dispatch!(self, w => w.matrix())
    }

    pub fn set_matrix(&mut self, m: Matrix3<f64>) {
        dispatch!(self, w => w.set_matrix(m))
    }

    pub fn scaled(&self, num_levels: i32) -> Self {
        dispatch!(self, w => w.scaled(num_levels).to_dynamic())
    }

    pub fn inverse(&self) -> Option<Self> {
        dispatch!(self, w => w.inverse().map(|i| i.to_dynamic()))
    }
}

impl Transform2D for DynWarp {
    fn apply(&self, p: &Point) -> Point {
        dispatch!(self, w => w.apply(p))
    }
}

impl fmt::Display for DynWarp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters().iter().map(|v| format!("{:.6}", v)).collect();
        write!(f, "{}[{}]", self.mode(), params.join(", "))
    }
}
