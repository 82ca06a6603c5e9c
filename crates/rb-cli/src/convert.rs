use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use rb_converter::list::LineFailure;
use rb_converter::{ConvertStats, Converter, ListOptions};
use rb_core::Dialect;

/// Per-input and total results of a `convert` run.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub from: Dialect,
    pub to: Dialect,
    pub inputs: Vec<InputReport>,
    pub total: ConvertStats,
    pub total_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub path: String,
    pub stats: ConvertStats,
    pub failures: Vec<LineFailure>,
}

/// Read a list from a path, or from stdin for `-`.
pub fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

/// Convert every input list, concatenating the output.
pub fn convert_inputs(
    converter: &Converter<'_>,
    inputs: &[String],
    from: Dialect,
    to: Dialect,
    options: &ListOptions,
    verbose: bool,
) -> Result<(String, ConvertReport), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let mut output = String::new();
    let mut reports = Vec::with_capacity(inputs.len());
    let mut total = ConvertStats::default();

    for (idx, path) in inputs.iter().enumerate() {
        let content = read_input(path)?;
        let result = converter.convert_list(&content, from, to, options);

        if verbose {
            eprintln!(
                "  [{}] {} - {} lines, {} converted, {} failed",
                idx,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                result.stats.lines,
                result.stats.converted,
                result.stats.failed
            );
        }

        output.push_str(&result.to_text());
        add_stats(&mut total, &result.stats);
        reports.push(InputReport {
            path: path.clone(),
            stats: result.stats,
            failures: result.failures,
        });
    }

    let report = ConvertReport {
        from,
        to,
        inputs: reports,
        total,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    Ok((output, report))
}

fn add_stats(total: &mut ConvertStats, stats: &ConvertStats) {
    total.lines += stats.lines;
    total.converted += stats.converted;
    total.emitted += stats.emitted;
    total.passed_through += stats.passed_through;
    total.failed += stats.failed;
    total.deduped += stats.deduped;
}
