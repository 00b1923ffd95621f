use crate::algorithms::AlgorithmKind;
use crate::warp::{DynWarp, WarpMode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one pyramid level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub level: usize,
    pub width: usize,
    pub height: usize,
    pub iterations: usize,
    /// Error of the last iteration, `None` when no iteration produced one
    pub final_error: Option<f64>,
    pub increment_norm: f64,
    /// Increment norm dropped below epsilon before the budget ran out
    pub converged: bool,
    /// Left because a step had no usable increment
    pub degenerate: bool,
    /// Left early because the error grew
    pub stopped_on_error_increase: bool,
    pub execution_time_ms: f64,
}

/// Result of a full coarse-to-fine alignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub algorithm: AlgorithmKind,
    pub mode: WarpMode,
    pub initial: DynWarp,
    pub warp: DynWarp,
    pub pyramid_levels: usize,
    pub total_iterations: usize,
    /// Error on the finest level, `None` when no iteration ran there
    pub final_error: Option<f64>,
    pub converged: bool,
    pub levels: Vec<LevelReport>,
    pub execution_time_ms: f64,
    pub correlation_id: Option<Uuid>,
    /// Parameter error against a known ground truth, if one was supplied
    pub ground_truth_error: Option<GroundTruthError>,
}

/// Distance of the estimate from the true warp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthError {
    pub ground_truth: DynWarp,
    /// Sum of absolute parameter differences
    pub l1: f64,
    /// Largest relative parameter difference
    pub max_relative: f64,
    /// Mean distance of the template corners mapped by both warps
    pub corner_error_px: f64,
}

impl AlignmentReport {
    pub fn new(algorithm: AlgorithmKind, initial: DynWarp) -> Self {
        Self {
            algorithm,
            mode: initial.mode(),
            initial,
            warp: initial,
            pyramid_levels: 0,
            total_iterations: 0,
            final_error: None,
            converged: false,
            levels: Vec::new(),
            execution_time_ms: 0.0,
            correlation_id: None,
            ground_truth_error: None,
        }
    }

    pub fn with_ground_truth_error(mut self, error: GroundTruthError) -> Self {
        self.ground_truth_error = Some(error);
        self
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Final parameters as a plain vector
    pub fn parameters(&self) -> Vec<f64> {
        self.warp.parameters().iter().copied().collect()
    }
}
