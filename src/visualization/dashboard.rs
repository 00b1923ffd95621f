use crate::pipeline::AlignmentReport;
use std::fmt::Write;

fn format_error(error: Option<f64>) -> String {
    error.map_or_else(|| "-".to_string(), |e| format!("{:.4}", e))
}

/// Human readable summary of one run
pub fn format_report(report: &AlignmentReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Algorithm: {} ({})", report.algorithm, report.mode);
    let _ = writeln!(out, "  Initial: {}", report.initial);
    let _ = writeln!(out, "  Estimate: {}", report.warp);
    let _ = writeln!(
        out,
        "  Iterations: {} over {} level(s)",
        report.total_iterations, report.pyramid_levels
    );
    for level in &report.levels {
        let _ = writeln!(
            out,
            "    level {} ({}x{}): {} it, error {}, |dp| {:.2e}{}",
            level.level,
            level.width,
            level.height,
            level.iterations,
            format_error(level.final_error),
            level.increment_norm,
            if level.converged {
                ", converged"
            } else if level.degenerate {
                ", degenerate"
            } else {
                ""
            }
        );
    }
    let _ = writeln!(out, "  Final error: {}", format_error(report.final_error));
    if let Some(gt) = &report.ground_truth_error {
        let _ = writeln!(out, "  Ground truth: {}", gt.ground_truth);
        let _ = writeln!(
            out,
            "  Error: L1 {:.4}, max relative {:.4}, corners {:.3}px",
            gt.l1, gt.max_relative, gt.corner_error_px
        );
    }
    let _ = writeln!(out, "  Processing Time: {:.2}ms", report.execution_time_ms);
    out
}

pub fn print_results(reports: &[AlignmentReport]) {
    println!("=== Alignment Results ===");
    for report in reports {
        println!("{}", format_report(report));
    }
}

/// Markdown table, one row per report
pub fn comparison_table(reports: &[AlignmentReport]) -> String {
    let mut out = String::new();
    out.push_str("| Algorithm | Mode | Iterations | Final error | Corner error (px) | Time (ms) |\n");
    out.push_str("|-----------|------|------------|-------------|-------------------|-----------|\n");
    for r in reports {
        let corner = r
            .ground_truth_error
            .as_ref()
            .map_or_else(|| "-".to_string(), |e| format!("{:.3}", e.corner_error_px));
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {:.2} |",
            r.algorithm,
            r.mode,
            r.total_iterations,
            format_error(r.final_error),
            corner,
            r.execution_time_ms
        );
    }
    out
}

pub fn print_comparison_table(reports: &[AlignmentReport]) {
    print!("{}", comparison_table(reports));
}
