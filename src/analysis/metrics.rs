use crate::pipeline::GroundTruthError;
use crate::warp::{DynWarp, Point, Transform2D};
use crate::Result;

/// Parameters below this magnitude are skipped by the relative error
const RELATIVE_FLOOR: f64 = 1e-6;

fn check_modes(estimate: &DynWarp, ground_truth: &DynWarp) -> Result<()> {
    if estimate.mode() != ground_truth.mode() {
        return Err(anyhow::anyhow!(
            "Cannot compare a {} warp with a {} ground truth",
            estimate.mode(),
            ground_truth.mode()
        ));
    }
    Ok(())
}

/// Sum of absolute parameter differences
pub fn calculate_l1_error(estimate: &DynWarp, ground_truth: &DynWarp) -> Result<f64> {
    check_modes(estimate, ground_truth)?;
    Ok((estimate.parameters() - ground_truth.parameters()).lp_norm(1))
}

/// Largest `|estimate - truth| / |truth|` over the non-zero true parameters
pub fn calculate_relative_error(estimate: &DynWarp, ground_truth: &DynWarp) -> Result<f64> {
    check_modes(estimate, ground_truth)?;
    Ok(estimate
        .parameters()
        .iter()
        .zip(ground_truth.parameters().iter())
        .filter(|(_, g)| g.abs() > RELATIVE_FLOOR)
        .map(|(e, g)| ((e - g) / g).abs())
        .fold(0.0, f64::max))
}

/// Euclidean distance between the translation components
pub fn calculate_translation_error(estimate: &DynWarp, ground_truth: &DynWarp) -> f64 {
    let (e, g) = (estimate.matrix(), ground_truth.matrix());
    let (dx, dy) = (e[(0, 2)] - g[(0, 2)], e[(1, 2)] - g[(1, 2)]);
    (dx * dx + dy * dy).sqrt()
}

/// Mean distance between the template corners mapped by both warps
pub fn calculate_corner_error(
    estimate: &DynWarp,
    ground_truth: &DynWarp,
    width: usize,
    height: usize,
) -> f64 {
    let (w, h) = (width.saturating_sub(1) as f64, height.saturating_sub(1) as f64);
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(0.0, h),
        Point::new(w, h),
    ];
    corners
        .iter()
        .map(|c| (estimate.apply(c) - ground_truth.apply(c)).norm())
        .sum::<f64>()
        / corners.len() as f64
}

/// All error measures for a `width` x `height` template
pub fn ground_truth_error(
    estimate: &DynWarp,
    ground_truth: &DynWarp,
    width: usize,
    height: usize,
) -> Result<GroundTruthError> {
    Ok(GroundTruthError {
        ground_truth: *ground_truth,
        l1: calculate_l1_error(estimate, ground_truth)?,
        max_relative: calculate_relative_error(estimate, ground_truth)?,
        corner_error_px: calculate_corner_error(estimate, ground_truth, width, height),
    })
}
