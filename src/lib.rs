//! # cts-validate Library
//!
//! Validates CTS text inventories: loads the catalog of text groups, works,
//! editions and translations, and checks that each document's citation mapping
//! uses declared namespace shortcuts, targets the document's namespace and
//! resolves against the document's actual structure.

pub mod citation;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod inventory;
pub mod namespace;
pub mod output;
pub mod validator;
pub mod warning;
pub mod xpath;

pub use citation::Citation;
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use document::{CitationReport, Document, RewritingRules};
pub use error::{CtsError, Result};
pub use inventory::{
    DEFAULT_LANG, Edition, Inventory, InventoryOptions, Text, TextGroup, TextKind, Titles,
    Translation, Work,
};
pub use namespace::NamespaceResolver;
pub use output::Output;
pub use validator::{
    TextValidationResult, ValidationConfig, ValidationEngine, ValidationResults, ValidationStatus,
};
pub use warning::{Severity, Warning, WarningKind};
pub use xpath::{PathExpr, XPathError};
