use crate::algorithms::AlgorithmKind;
use crate::data::{SyntheticParams, SyntheticScene};
use crate::pipeline::{AlignmentPipeline, AlignmentReport};
use crate::Result;
use tracing::{error, info};

/// Runs a set of algorithms over synthetic scenes with known ground truth
pub struct BenchmarkRunner {
    pub pipeline: AlignmentPipeline,
    pub algorithms: Vec<AlgorithmKind>,
    pub scenes: Vec<SyntheticParams>,
}

impl BenchmarkRunner {
    pub fn new(pipeline: AlignmentPipeline) -> Self {
        Self {
            pipeline,
            algorithms: AlgorithmKind::ALL.to_vec(),
            scenes: Vec::new(),
        }
    }

    pub fn with_algorithms(mut self, algorithms: &[AlgorithmKind]) -> Self {
        self.algorithms = algorithms.to_vec();
        self
    }

    pub fn add_scene(&mut self, params: SyntheticParams) {
        self.scenes.push(params);
    }

    /// One report per scene and algorithm; failed runs are logged and skipped
    pub fn run_benchmark(&self) -> Result<Vec<AlignmentReport>> {
        let mut results = Vec::new();

        for params in &self.scenes {
            let scene = SyntheticScene::generate(params)?;
            let (rows, cols) = scene.template.dim();
            for kind in &self.algorithms {
                match self
                    .pipeline
                    .run_with(*kind, &scene.template, &scene.target, &scene.initial)
                {
                    Ok(report) => {
                        let error = crate::analysis::ground_truth_error(
                            &report.warp,
                            &scene.ground_truth,
                            cols,
                            rows,
                        )?;
                        results.push(report.with_ground_truth_error(error));
                    }
                    Err(e) => {
                        error!(algorithm = %kind, mode = %params.mode, "Benchmark run failed: {}", e);
                    }
                }
            }
        }

        info!(runs = results.len(), "Benchmark finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlignmentConfig, PyramidConfig};

    #[test]
    fn test_one_report_per_scene_and_algorithm() {
        let pipeline = AlignmentPipeline::new(
            AlignmentConfig::default(),
            PyramidConfig {
                levels: 1,
                ..PyramidConfig::default()
            },
        );
        let mut runner = BenchmarkRunner::new(pipeline);
        runner.add_scene(SyntheticParams::default());
        let reports = runner.run_benchmark().unwrap();
        assert_eq!(reports.len(), AlgorithmKind::ALL.len());
        assert!(reports.iter().all(|r| r.ground_truth_error.is_some()));
    }
}
