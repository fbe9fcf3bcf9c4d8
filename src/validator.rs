//! Inventory-wide validation engine
//!
//! Every text of an inventory owns an independent Document, so their citation
//! schemes are tested in parallel on a rayon thread pool. Results come back in
//! catalog order and are aggregated into [`ValidationResults`].

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::document::CitationReport;
use crate::error::{CtsError, Result};
use crate::inventory::{Inventory, Text, TextKind};
use crate::warning::Warning;

/// Validation configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Number of worker threads (all available cores when unset)
    pub threads: Option<usize>,
    /// Stop reporting after the first text that does not pass
    pub fail_fast: bool,
}

/// Status of a single text's citation test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Every level resolved and no warning was raised
    Passed,
    /// Some levels did not resolve or warnings were raised
    Failed {
        failed_levels: Vec<usize>,
        warning_count: usize,
    },
    /// The document could not be read or parsed
    Error { message: String },
}

impl ValidationStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, ValidationStatus::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ValidationStatus::Failed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationStatus::Error { .. })
    }
}

/// Result of testing one edition or translation
#[derive(Debug, Clone, Serialize)]
pub struct TextValidationResult {
    pub text_id: String,
    pub kind: TextKind,
    /// Document path after rewriting
    pub path: String,
    pub status: ValidationStatus,
    /// One entry per citation level
    pub results: Vec<bool>,
    pub warnings: Vec<Warning>,
    pub duration: Duration,
}

impl TextValidationResult {
    fn from_report(text: Text, report: CitationReport, duration: Duration) -> Self {
        let status = if report.is_clean() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed {
                failed_levels: report.failed_levels(),
                warning_count: report.warnings.len(),
            }
        };
        Self {
            text_id: text.id().to_string(),
            kind: text.kind(),
            path: text.document().path().to_string(),
            status,
            results: report.results,
            warnings: report.warnings,
            duration,
        }
    }

    fn error(text: Text, error: CtsError, duration: Duration) -> Self {
        Self {
            text_id: text.id().to_string(),
            kind: text.kind(),
            path: text.document().path().to_string(),
            status: ValidationStatus::Error {
                message: error.to_string(),
            },
            results: Vec::new(),
            warnings: Vec::new(),
            duration,
        }
    }
}

/// Aggregated results of validating an inventory
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResults {
    pub total_texts: usize,
    pub passed_texts: usize,
    pub failed_texts: usize,
    pub error_texts: usize,
    /// Catalog entries left out while loading the inventory
    pub skipped_entries: usize,
    pub total_duration: Duration,
    pub text_results: Vec<TextValidationResult>,
}

impl ValidationResults {
    /// Aggregate individual text results into a summary
    pub fn aggregate(text_results: Vec<TextValidationResult>, total_duration: Duration) -> Self {
        let mut passed_texts = 0;
        let mut failed_texts = 0;
        let mut error_texts = 0;

        for result in &text_results {
            match result.status {
                ValidationStatus::Passed => passed_texts += 1,
                ValidationStatus::Failed { .. } => failed_texts += 1,
                ValidationStatus::Error { .. } => error_texts += 1,
            }
        }

        Self {
            total_texts: text_results.len(),
            passed_texts,
            failed_texts,
            error_texts,
            skipped_entries: 0,
            total_duration,
            text_results,
        }
    }

    pub fn with_skipped_entries(mut self, skipped: usize) -> Self {
        self.skipped_entries = skipped;
        self
    }

    /// Percentage of texts that passed
    pub fn success_rate(&self) -> f64 {
        if self.total_texts == 0 {
            100.0
        } else {
            self.passed_texts as f64 / self.total_texts as f64 * 100.0
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed_texts > 0 || self.error_texts > 0
    }

    pub fn warning_count(&self) -> usize {
        self.text_results.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Validation engine testing every text of an inventory
pub struct ValidationEngine {
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Test one text's citation scheme against its document
    pub fn validate_text(text: Text) -> TextValidationResult {
        let start = Instant::now();
        match text.document().test_citation() {
            Ok(report) => TextValidationResult::from_report(text, report, start.elapsed()),
            Err(e) => {
                tracing::warn!(text = text.id(), "could not test document: {}", e);
                TextValidationResult::error(text, e, start.elapsed())
            }
        }
    }

    /// Test every text of `inventory`, in parallel, reporting in catalog order
    pub fn validate_inventory(&self, inventory: &Inventory) -> Result<ValidationResults> {
        let start = Instant::now();
        let texts = inventory.get_texts();
        tracing::info!(texts = texts.len(), "validating inventory");

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| CtsError::Config(format!("Failed to build thread pool: {}", e)))?;

        let mut text_results: Vec<TextValidationResult> = pool.install(|| {
            texts
                .par_iter()
                .map(|text| Self::validate_text(*text))
                .collect()
        });

        if self.config.fail_fast
            && let Some(first) = text_results.iter().position(|r| !r.status.is_passed())
        {
            text_results.truncate(first + 1);
        }

        Ok(ValidationResults::aggregate(text_results, start.elapsed())
            .with_skipped_entries(inventory.skipped_entries()))
    }
}
