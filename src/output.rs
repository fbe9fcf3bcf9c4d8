//! Simple Output and Reporting
//!
//! This module renders validation results for humans, scripts and summaries.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::validator::{TextValidationResult, ValidationResults, ValidationStatus};

/// Output formatter for validation results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: format == OutputFormat::Human && atty::is(atty::Stream::Stdout),
        }
    }

    /// Disable ANSI colours regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, results: &ValidationResults) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results),
            OutputFormat::Summary => Ok(self.format_summary(results)),
            OutputFormat::Human => Ok(self.format_results(results)),
        }
    }

    pub fn format_results(&self, results: &ValidationResults) -> String {
        let mut output = String::new();

        for text_result in &results.text_results {
            let show = match self.verbosity {
                VerbosityLevel::Quiet => !text_result.status.is_passed(),
                VerbosityLevel::Normal | VerbosityLevel::Verbose => true,
            };
            if show {
                output.push_str(&self.format_text_result(text_result));
                output.push('\n');
            }
        }

        if self.verbosity != VerbosityLevel::Quiet {
            if !results.text_results.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.format_summary(results));
        }

        output
    }

    pub fn format_text_result(&self, result: &TextValidationResult) -> String {
        let duration_str = format_duration(result.duration);

        let mut output = match &result.status {
            ValidationStatus::Passed => format!(
                "{}  {} {} ({})",
                self.colorize("✓ PASSED", "32"),
                result.text_id,
                result.path,
                duration_str
            ),
            ValidationStatus::Failed {
                failed_levels,
                warning_count,
            } => {
                let mut line = format!(
                    "{}  {} {} ({})",
                    self.colorize("✗ FAILED", "31"),
                    result.text_id,
                    result.path,
                    duration_str
                );
                if !failed_levels.is_empty() {
                    let levels: Vec<String> = failed_levels.iter().map(usize::to_string).collect();
                    line.push_str(&format!(" - unresolved level(s) {}", levels.join(", ")));
                }
                if *warning_count > 0 {
                    line.push_str(&format!(
                        " - {} warning{}",
                        warning_count,
                        if *warning_count == 1 { "" } else { "s" }
                    ));
                }
                line
            }
            ValidationStatus::Error { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("⚠ ERROR", "33"),
                result.text_id,
                duration_str,
                message
            ),
        };

        if self.verbosity >= VerbosityLevel::Verbose && !result.results.is_empty() {
            let levels: Vec<&str> = result
                .results
                .iter()
                .map(|resolved| if *resolved { "ok" } else { "unresolved" })
                .collect();
            output.push_str(&format!("\n    levels: [{}]", levels.join(", ")));
        }

        if self.verbosity >= VerbosityLevel::Normal {
            for warning in &result.warnings {
                output.push_str(&format!("\n    {}", warning));
            }
        }

        output
    }

    pub fn format_summary(&self, results: &ValidationResults) -> String {
        let mut output = String::new();
        output.push_str("Validation Summary:\n");
        output.push_str(&format!("  Total texts: {}\n", results.total_texts));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Passed:", "32"),
            results.passed_texts
        ));

        if results.failed_texts > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Failed:", "31"),
                results.failed_texts
            ));
        }
        if results.error_texts > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_texts
            ));
        }
        if results.skipped_entries > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped catalog entries:", "36"),
                results.skipped_entries
            ));
        }

        output.push_str(&format!("  Warnings: {}\n", results.warning_count()));
        output.push_str(&format!("  Success rate: {:.1}%\n", results.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.total_duration)
        ));

        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
