/*!
 * Text Report
 * Human-readable rendering of reports and comparisons
 */

use crate::orchestrator::{BatchSummary, Comparison, ExecutionReport};
use std::fmt::Write;

/// Render the full parallel-versus-sequential report
pub fn render_comparison(comparison: &Comparison) -> String {
    let mut out = String::new();
    header(&mut out);

    let _ = writeln!(out, "---- TIMING ----");
    let _ = writeln!(
        out,
        "Parallel total wall time  : {:.6} sec",
        comparison.speedup.parallel.as_secs_f64()
    );
    let _ = writeln!(
        out,
        "Sequential total wall time: {:.6} sec",
        comparison.speedup.sequential.as_secs_f64()
    );
    let _ = writeln!(out, "Speedup (seq/par)         : {:.4}x", comparison.speedup.ratio);
    let _ = writeln!(out);

    summary_section(&mut out, "PARALLEL", &comparison.parallel.summary);
    summary_section(&mut out, "SEQUENTIAL", &comparison.sequential.summary);
    notes(&mut out);
    out
}

/// Render a single-mode report
pub fn render_report(report: &ExecutionReport) -> String {
    let mut out = String::new();
    header(&mut out);

    let _ = writeln!(out, "---- TIMING ----");
    let _ = writeln!(
        out,
        "{} total wall time: {:.6} sec",
        capitalize(report.mode.as_str()),
        report.total_duration.as_secs_f64()
    );
    let _ = writeln!(out);

    summary_section(&mut out, &report.mode.as_str().to_uppercase(), &report.summary);

    let _ = writeln!(out, "---- WORKERS ----");
    for entry in &report.entries {
        let _ = writeln!(
            out,
            "{}: {} wall={:.3}s rss_peak={:.4}MiB cpu_avg={:.2}% samples={}",
            entry.config.id,
            entry.result.status_label(),
            entry.wall_time.as_secs_f64(),
            entry.metrics.peak_rss_mib(),
            entry.metrics.avg_cpu_percent,
            entry.metrics.sample_count,
        );
    }
    let _ = writeln!(out);

    notes(&mut out);
    out
}

fn header(out: &mut String) {
    let _ = writeln!(out, "=== ORCHESTRATION REPORT ===");
    let _ = writeln!(out, "Host Parent PID: {}", std::process::id());
    let _ = writeln!(out);
}

fn summary_section(out: &mut String, title: &str, summary: &BatchSummary) {
    let _ = writeln!(out, "---- {} METRICS (across workers) ----", title);
    let _ = writeln!(out, "workers: {}", summary.workers);
    let _ = writeln!(out, "succeeded: {}", summary.succeeded);
    let _ = writeln!(out, "failed: {}", summary.failed);
    let _ = writeln!(out, "sampled: {}", summary.sampled);
    let _ = writeln!(out, "wall_time_avg_sec: {:.6}", summary.wall_time_avg.as_secs_f64());
    let _ = writeln!(out, "wall_time_sum_sec: {:.6}", summary.wall_time_sum.as_secs_f64());
    let _ = writeln!(out, "wall_time_max_sec: {:.6}", summary.wall_time_max.as_secs_f64());
    let _ = writeln!(
        out,
        "compute_time_avg_sec: {:.6} ({} reported)",
        summary.compute_time_avg_sec, summary.compute_time_reported
    );
    let _ = writeln!(out, "rss_peak_max_mb: {:.4}", summary.rss_peak_max_mib);
    let _ = writeln!(out, "rss_peak_avg_mb: {:.4}", summary.rss_peak_avg_mib);
    let _ = writeln!(out, "cpu_avg_avg: {:.4}", summary.cpu_avg_avg);
    let _ = writeln!(out, "cpu_peak_max: {:.4}", summary.cpu_peak_max);
    let _ = writeln!(out);
}

fn notes(out: &mut String) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let _ = writeln!(out, "Notes:");
    let _ = writeln!(out, "- Available parallelism on this host: {} cores.", cores);
    let _ = writeln!(out, "- CPU% is per core: a worker saturating two cores reads 200%.");
    let _ = writeln!(out, "- Peak RSS is per process; parallel runs add up total RAM usage.");
    let _ = write!(out, "- Sample interval bounds metric precision.");
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
