use crate::algorithms::{
    AlgorithmKind, AlignForwardAdditive, AlignForwardCompositional, AlignInverseCompositional,
};
use crate::analysis::ground_truth_error;
use crate::config::{AlignmentConfig, Config, PyramidConfig};
use crate::data::validate_image_size;
use crate::imgproc::ImagePyramid;
use crate::logging::{get_correlation_id, new_correlation_id, AlignmentSpan, MetricsCollector, PipelineSpan};
use crate::pipeline::{Aligner, AlignmentReport, LevelReport};
use crate::warp::{
    AffineWarp, DynWarp, EuclideanWarp, PerspectiveWarp, SimilarityWarp, TranslationWarp, WarpMode,
};
use crate::Result;
use instant::Instant;
use ndarray::Array2;
use tracing::{debug, info};
use uuid::Uuid;

/// Picks the monomorphized driver for a motion model and algorithm
#[derive(Debug, Clone, Copy)]
pub struct AlignerBuilder {
    mode: WarpMode,
    algorithm: AlgorithmKind,
}

impl Default for AlignerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! boxed_aligner {
    ($driver:ident, $mode:expr) => {
        match $mode {
            WarpMode::Translation => Box::new($driver::<TranslationWarp, 2>::new()) as Box<dyn Aligner>,
            WarpMode::Euclidean => Box::new($driver::<EuclideanWarp, 3>::new()) as Box<dyn Aligner>,
            WarpMode::Similarity => Box::new($driver::<SimilarityWarp, 4>::new()) as Box<dyn Aligner>,
            WarpMode::Affine => Box::new($driver::<AffineWarp, 6>::new()) as Box<dyn Aligner>,
            WarpMode::Perspective => Box::new($driver::<PerspectiveWarp, 8>::new()) as Box<dyn Aligner>,
        }
    };
}

impl AlignerBuilder {
    pub fn new() -> Self {
        Self {
            mode: WarpMode::Translation,
            algorithm: AlgorithmKind::InverseCompositional,
        }
    }

    pub fn mode(mut self, mode: WarpMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn build(self) -> Box<dyn Aligner> {
        debug!(mode = %self.mode, algorithm = %self.algorithm, "Building aligner");
        match self.algorithm {
            AlgorithmKind::ForwardAdditive => boxed_aligner!(AlignForwardAdditive, self.mode),
            AlgorithmKind::ForwardCompositional => boxed_aligner!(AlignForwardCompositional, self.mode),
            AlgorithmKind::InverseCompositional => boxed_aligner!(AlignInverseCompositional, self.mode),
        }
    }
}

/// Coarse-to-fine alignment driven by an [`AlignmentConfig`]
pub struct AlignmentPipeline {
    alignment: AlignmentConfig,
    pyramid: PyramidConfig,
    metrics: MetricsCollector,
}

impl AlignmentPipeline {
    pub fn new(alignment: AlignmentConfig, pyramid: PyramidConfig) -> Self {
        let metrics = MetricsCollector::new(alignment.collect_metrics);
        Self {
            alignment,
            pyramid,
            metrics,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.alignment.clone(), config.pyramid.clone())
    }

    pub fn alignment_config(&self) -> &AlignmentConfig {
        &self.alignment
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Pyramid depth for a template/target pair
    pub fn resolve_levels(&self, template: &Array2<f32>, target: &Array2<f32>) -> usize {
        if self.pyramid.levels > 0 {
            return self.pyramid.levels;
        }
        let (t_rows, t_cols) = template.dim();
        let (i_rows, i_cols) = target.dim();
        ImagePyramid::max_levels_for_image_size(t_cols.min(i_cols), t_rows.min(i_rows))
    }

    /// Align `template` against `target` starting from `initial`.
    ///
    /// The motion model is taken from `initial`, the algorithm from the
    /// configuration.
    pub fn run(
        &self,
        template: &Array2<f32>,
        target: &Array2<f32>,
        initial: &DynWarp,
    ) -> Result<AlignmentReport> {
        self.run_with(self.alignment.algorithm, template, target, initial)
    }

    /// Like [`AlignmentPipeline::run`] with an explicit algorithm.
    pub fn run_with(
        &self,
        algorithm: AlgorithmKind,
        template: &Array2<f32>,
        target: &Array2<f32>,
        initial: &DynWarp,
    ) -> Result<AlignmentReport> {
        self.alignment.validate().map_err(|e| anyhow::anyhow!(e.join("; ")))?;
        validate_image_size(template, self.pyramid.min_image_size)?;
        validate_image_size(target, self.pyramid.min_image_size)?;

        let correlation_id = get_correlation_id().unwrap_or_else(new_correlation_id);
        let levels = self.resolve_levels(template, target);
        let pipeline_span = PipelineSpan::new(
            algorithm.name(),
            initial.mode().name(),
            levels,
            Some(correlation_id),
        );
        let _guard = pipeline_span.span().enter();

        info!(
            algorithm = %algorithm,
            mode = %initial.mode(),
            levels,
            template = ?template.dim(),
            target = ?target.dim(),
            "Starting alignment"
        );

        let start = Instant::now();
        let mut aligner = AlignerBuilder::new()
            .mode(initial.mode())
            .algorithm(algorithm)
            .build();
        aligner.prepare(template, target, initial, levels)?;

        let mut warp = *initial;
        let mut report = AlignmentReport::new(algorithm, *initial).with_correlation_id(correlation_id);
        report.pyramid_levels = aligner.num_levels();

        let budgets = &self.alignment.iterations_per_level;
        let fallback = budgets.last().copied().unwrap_or(0);
        for level in 0..aligner.num_levels() {
            let budget = budgets.get(level).copied().unwrap_or(fallback);
            report.levels.push(self.run_level(
                aligner.as_mut(),
                &mut warp,
                level,
                budget,
                template.dim(),
                correlation_id,
            )?);
        }

        report.warp = warp;
        report.total_iterations = aligner.iteration();
        report.final_error = report.levels.last().and_then(|l| l.final_error);
        report.converged = report.levels.last().is_some_and(|l| l.converged);
        report.execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        pipeline_span.record_result(report.total_iterations, report.final_error.unwrap_or(f64::NAN));

        Ok(report)
    }

    fn run_level(
        &self,
        aligner: &mut dyn Aligner,
        warp: &mut DynWarp,
        level: usize,
        budget: usize,
        finest_template: (usize, usize),
        correlation_id: Uuid,
    ) -> Result<LevelReport> {
        aligner.set_level(level);
        let shift = aligner.num_levels() - 1 - aligner.level();
        let (height, width) = (finest_template.0 >> shift, finest_template.1 >> shift);
        let span = AlignmentSpan::new(level, width, height, Some(correlation_id));
        let _guard = span.span().enter();

        let mut iterations = 0;
        let mut converged = false;
        let mut degenerate = false;
        let mut stopped_on_error_increase = false;
        for _ in 0..budget {
            let step_start = Instant::now();
            aligner.align(warp)?;
            iterations += 1;

            let increment_norm = aligner.last_increment().norm();
            self.metrics.record(
                aligner.kind(),
                level,
                aligner.iteration(),
                aligner.last_error(),
                increment_norm,
                step_start.elapsed(),
                Some(correlation_id),
            );

            // A zero increment from a singular system is not convergence
            if aligner.last_step_degenerate() {
                span.record_degenerate(aligner.iteration());
                degenerate = true;
                break;
            }
            if increment_norm < self.alignment.epsilon {
                converged = true;
                break;
            }
            if self.alignment.stop_on_error_increase && aligner.error_change() > 0.0 {
                span.record_error_increase(aligner.iteration(), aligner.error_change());
                stopped_on_error_increase = true;
                break;
            }
        }

        let report = LevelReport {
            level,
            width,
            height,
            iterations,
            final_error: Some(aligner.last_error())
                .filter(|e| iterations > 0 && !degenerate && e.is_finite()),
            increment_norm: aligner.last_increment().norm(),
            converged,
            degenerate,
            stopped_on_error_increase,
            execution_time_ms: span.elapsed_ms(),
        };
        span.record_level_result(iterations, report.final_error.unwrap_or(f64::NAN), converged);
        Ok(report)
    }

    /// Run and score the result against a known warp
    pub fn run_against_ground_truth(
        &self,
        template: &Array2<f32>,
        target: &Array2<f32>,
        initial: &DynWarp,
        ground_truth: &DynWarp,
    ) -> Result<AlignmentReport> {
        let report = self.run(template, target, initial)?;
        let (rows, cols) = template.dim();
        let error = ground_truth_error(&report.warp, ground_truth, cols, rows)?;
        Ok(report.with_ground_truth_error(error))
    }

    /// Run every algorithm on the same problem
    pub fn compare(
        &self,
        template: &Array2<f32>,
        target: &Array2<f32>,
        initial: &DynWarp,
        ground_truth: Option<&DynWarp>,
    ) -> Result<Vec<AlignmentReport>> {
        let (rows, cols) = template.dim();
        AlgorithmKind::ALL
            .iter()
            .map(|kind| {
                let report = self.run_with(*kind, template, target, initial)?;
                match ground_truth {
                    Some(gt) => {
                        let error = ground_truth_error(&report.warp, gt, cols, rows)?;
                        Ok(report.with_ground_truth_error(error))
                    }
                    None => Ok(report),
                }
            })
            .collect()
    }
}
