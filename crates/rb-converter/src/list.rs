//! Whole filter list conversion.

use std::collections::HashSet;

use serde::Serialize;

use rb_core::error::Error;
use rb_core::types::Dialect;

use crate::converter::Converter;
use crate::detector::is_comment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Write comments, blank lines and rules this crate does not convert.
    pub keep_unrecognized: bool,
    /// Drop converted rules that were already emitted.
    pub dedupe: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            keep_unrecognized: true,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub lines: usize,
    /// Source rules converted successfully.
    pub converted: usize,
    /// Output rules written for converted sources.
    pub emitted: usize,
    /// Lines that are not rules of the source dialect.
    pub passed_through: usize,
    pub failed: usize,
    pub deduped: usize,
}

/// A rule that was recognized but could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    /// 1-based.
    pub line: usize,
    pub text: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListConversion {
    pub output: Vec<String>,
    pub failures: Vec<LineFailure>,
    pub stats: ConvertStats,
}

impl ListConversion {
    pub fn to_text(&self) -> String {
        let mut text = self.output.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

impl Converter<'_> {
    /// Convert every line of a filter list.
    ///
    /// Failed rules are logged and recorded, never fatal.
    pub fn convert_list(&self, text: &str, from: Dialect, to: Dialect, options: &ListOptions) -> ListConversion {
        let mut result = ListConversion::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, raw_line) in text.lines().enumerate() {
            result.stats.lines += 1;
            let line = raw_line.trim();

            if line.is_empty() || is_comment(line) {
                pass_through(&mut result, raw_line, options);
                continue;
            }

            match self.convert_rule(line, from, to) {
                Ok(rules) => {
                    result.stats.converted += 1;
                    for rule in rules {
                        if options.dedupe && !seen.insert(rule.clone()) {
                            result.stats.deduped += 1;
                            continue;
                        }
                        result.stats.emitted += 1;
                        result.output.push(rule);
                    }
                }
                Err(Error::NotARule) => pass_through(&mut result, raw_line, options),
                Err(e) => {
                    log::warn!("Line {}: {}", idx + 1, e);
                    result.stats.failed += 1;
                    result.failures.push(LineFailure {
                        line: idx + 1,
                        text: line.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Converted {} of {} lines ({} failed, {} duplicates dropped)",
            result.stats.converted,
            result.stats.lines,
            result.stats.failed,
            result.stats.deduped
        );
        result
    }
}

fn pass_through(result: &mut ListConversion, line: &str, options: &ListOptions) {
    result.stats.passed_through += 1;
    if options.keep_unrecognized {
        result.output.push(line.to_string());
    }
}

/// Convert a filter list with the embedded table.
pub fn convert_filter_list(text: &str, from: Dialect, to: Dialect, options: &ListOptions) -> ListConversion {
    Converter::global().convert_list(text, from, to, options)
}
