//! Structured spans for hierarchical logging
//!
//! A pipeline run opens a [`PipelineSpan`], every pyramid level inside it
//! an [`AlignmentSpan`]. Both carry the correlation id of the run.

use instant::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

/// Span covering one full coarse-to-fine alignment
pub struct PipelineSpan {
    span: Span,
    start_time: Instant,
}

impl PipelineSpan {
    pub fn new(algorithm: &str, mode: &str, levels: usize, correlation_id: Option<Uuid>) -> Self {
        let span = span!(
            Level::INFO,
            "alignment_pipeline",
            algorithm = algorithm,
            mode = mode,
            levels = levels,
            correlation_id = field::Empty,
            total_iterations = field::Empty,
            final_error = field::Empty,
            execution_time_ms = field::Empty
        );
        if let Some(id) = correlation_id {
            span.record("correlation_id", field::display(id));
        }
        Self {
            span,
            start_time: Instant::now(),
        }
    }

    /// Record the end result of the run
    pub fn record_result(&self, total_iterations: usize, final_error: f64) {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        self.span.record("total_iterations", total_iterations);
        self.span.record("final_error", final_error);
        self.span.record("execution_time_ms", elapsed_ms);
        tracing::info!(
            parent: &self.span,
            total_iterations,
            final_error,
            execution_time_ms = elapsed_ms,
            "Alignment finished"
        );
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Span covering the iterations of one pyramid level
pub struct AlignmentSpan {
    span: Span,
    start_time: Instant,
    level: usize,
}

impl AlignmentSpan {
    pub fn new(level: usize, width: usize, height: usize, correlation_id: Option<Uuid>) -> Self {
        let span = span!(
            Level::DEBUG,
            "alignment_level",
            level = level,
            width = width,
            height = height,
            correlation_id = field::Empty,
            iterations = field::Empty,
            final_error = field::Empty,
            converged = field::Empty
        );
        if let Some(id) = correlation_id {
            span.record("correlation_id", field::display(id));
        }
        Self {
            span,
            start_time: Instant::now(),
            level,
        }
    }

    /// Record that iterating stopped early because the error increased
    pub fn record_error_increase(&self, iteration: usize, error_change: f64) {
        tracing::debug!(
            parent: &self.span,
            level = self.level,
            iteration,
            error_change,
            "Error increased, leaving level"
        );
    }

    /// Record that a step had no usable increment
    pub fn record_degenerate(&self, iteration: usize) {
        tracing::warn!(
            parent: &self.span,
            level = self.level,
            iteration,
            "Degenerate step, leaving level unconverged"
        );
    }

    /// Record the outcome of the level
    pub fn record_level_result(&self, iterations: usize, final_error: f64, converged: bool) {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        self.span.record("iterations", iterations);
        self.span.record("final_error", final_error);
        self.span.record("converged", converged);
        tracing::debug!(
            parent: &self.span,
            level = self.level,
            iterations,
            final_error,
            converged,
            execution_time_ms = elapsed_ms,
            "Level completed"
        );
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_record_without_subscriber() {
        let pipeline = PipelineSpan::new("inverse-compositional", "affine", 3, Some(Uuid::new_v4()));
        let _enter = pipeline.span().enter();
        let level = AlignmentSpan::new(0, 25, 25, None);
        level.record_error_increase(4, 0.3);
        level.record_level_result(4, 12.5, false);
        pipeline.record_result(4, 12.5);
        assert!(pipeline.elapsed_ms() >= 0.0);
        assert!(level.elapsed_ms() >= 0.0);
    }
}
