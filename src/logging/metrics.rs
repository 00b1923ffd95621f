//! Per-iteration metrics collection
//!
//! Lightweight, thread-safe recording of every Gauss-Newton iteration so
//! convergence can be inspected after a run.

use crate::algorithms::AlgorithmKind;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const MAX_RECORDS: usize = 100_000;

/// One alignment iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub algorithm: AlgorithmKind,
    pub level: usize,
    pub iteration: usize,
    pub error: f64,
    pub increment_norm: f64,
    pub duration_ms: f64,
    pub correlation_id: Option<Uuid>,
}

/// Summary of the iterations spent on one pyramid level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: usize,
    pub iterations: usize,
    pub first_error: f64,
    pub final_error: f64,
    pub min_error: f64,
    pub total_duration_ms: f64,
    pub mean_duration_ms: f64,
}

/// Thread-safe metrics collector
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    records: Arc<Mutex<Vec<IterationRecord>>>,
    enabled: bool,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one iteration
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        algorithm: AlgorithmKind,
        level: usize,
        iteration: usize,
        error: f64,
        increment_norm: f64,
        duration: Duration,
        correlation_id: Option<Uuid>,
    ) {
        if !self.enabled {
            return;
        }

        let record = IterationRecord {
            algorithm,
            level,
            iteration,
            error,
            increment_norm,
            duration_ms: duration.as_secs_f64() * 1000.0,
            correlation_id,
        };

        if let Ok(mut records) = self.records.lock() {
            records.push(record);

            // Prevent unbounded growth
            if records.len() > MAX_RECORDS {
                records.drain(0..MAX_RECORDS / 2);
            }
        }
    }

    pub fn records(&self) -> Vec<IterationRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn records_for_level(&self, level: usize) -> Vec<IterationRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn records_for_algorithm(&self, algorithm: AlgorithmKind) -> Vec<IterationRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.algorithm == algorithm)
            .collect()
    }

    pub fn records_by_correlation(&self, correlation_id: Uuid) -> Vec<IterationRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.correlation_id == Some(correlation_id))
            .collect()
    }

    /// Summary for one level over every algorithm, `None` if no iteration
    /// ran there
    pub fn level_stats(&self, level: usize) -> Option<LevelStats> {
        Self::summarize(level, &self.records_for_level(level))
    }

    /// Summary for one level of one algorithm
    pub fn algorithm_level_stats(&self, algorithm: AlgorithmKind, level: usize) -> Option<LevelStats> {
        let records: Vec<_> = self
            .records_for_algorithm(algorithm)
            .into_iter()
            .filter(|r| r.level == level)
            .collect();
        Self::summarize(level, &records)
    }

    fn summarize(level: usize, records: &[IterationRecord]) -> Option<LevelStats> {
        let first = records.first()?;
        let last = records.last()?;
        let total: f64 = records.iter().map(|r| r.duration_ms).sum();
        Some(LevelStats {
            level,
            iterations: records.len(),
            first_error: first.error,
            final_error: last.error,
            min_error: records.iter().map(|r| r.error).fold(f64::INFINITY, f64::min),
            total_duration_ms: total,
            mean_duration_ms: total / records.len() as f64,
        })
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    /// All records as pretty JSON
    pub fn export_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_stats() {
        let metrics = MetricsCollector::new(true);
        let id = Uuid::new_v4();
        let fa = AlgorithmKind::ForwardAdditive;
        metrics.record(fa, 0, 1, 10.0, 2.0, Duration::from_millis(2), Some(id));
        metrics.record(fa, 0, 2, 4.0, 0.5, Duration::from_millis(4), Some(id));
        metrics.record(fa, 1, 3, 1.0, 0.1, Duration::from_millis(1), None);

        let stats = metrics.level_stats(0).unwrap();
        assert_eq!(stats.iterations, 2);
        assert_eq!(stats.first_error, 10.0);
        assert_eq!(stats.final_error, 4.0);
        assert_eq!(stats.min_error, 4.0);
        assert!((stats.mean_duration_ms - 3.0).abs() < 1e-9);

        assert_eq!(metrics.records_by_correlation(id).len(), 2);
        assert!(metrics.level_stats(5).is_none());
    }

    #[test]
    fn test_disabled_collector() {
        let metrics = MetricsCollector::new(false);
        metrics.record(AlgorithmKind::ForwardAdditive, 0, 1, 1.0, 1.0, Duration::ZERO, None);
        assert!(metrics.records().is_empty());
    }

    #[test]
    fn test_clones_share_records() {
        let metrics = MetricsCollector::default();
        let other = metrics.clone();
        other.record(AlgorithmKind::InverseCompositional, 2, 1, 0.5, 0.0, Duration::ZERO, None);
        assert_eq!(metrics.records().len(), 1);
        let json = metrics.export_json().unwrap();
        assert!(json.contains("increment_norm"));
        assert!(json.contains("inverse-compositional"));
        metrics.clear();
        assert!(other.records().is_empty());
    }

    #[test]
    fn test_stats_split_by_algorithm() {
        let metrics = MetricsCollector::new(true);
        let id = Uuid::new_v4();
        let (fa, ic) = (AlgorithmKind::ForwardAdditive, AlgorithmKind::InverseCompositional);
        metrics.record(fa, 0, 1, 9.0, 1.0, Duration::from_millis(1), Some(id));
        metrics.record(fa, 0, 2, 8.0, 0.5, Duration::from_millis(1), Some(id));
        metrics.record(ic, 0, 1, 3.0, 1.0, Duration::from_millis(1), Some(id));

        assert_eq!(metrics.level_stats(0).unwrap().iterations, 3);
        let fa_stats = metrics.algorithm_level_stats(fa, 0).unwrap();
        assert_eq!(fa_stats.iterations, 2);
        assert_eq!(fa_stats.final_error, 8.0);
        let ic_stats = metrics.algorithm_level_stats(ic, 0).unwrap();
        assert_eq!((ic_stats.iterations, ic_stats.first_error), (1, 3.0));
        assert!(metrics
            .algorithm_level_stats(AlgorithmKind::ForwardCompositional, 0)
            .is_none());
    }
}
