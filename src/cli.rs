use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show every warning and per-level result
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Most detailed tracing level shown at this verbosity
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            VerbosityLevel::Quiet => tracing::Level::ERROR,
            VerbosityLevel::Normal => tracing::Level::WARN,
            VerbosityLevel::Verbose => tracing::Level::DEBUG,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Human,
    /// Machine-readable JSON
    Json,
    /// Counts only
    Summary,
}

/// Citation-scheme validator for CTS text inventories
#[derive(Parser, Debug, Clone)]
#[command(name = "cts-validate")]
#[command(
    about = "Check that the citation mappings of a CTS text inventory resolve against their documents"
)]
#[command(version)]
pub struct Cli {
    /// Inventory catalog (TextInventory XML)
    #[arg(help = "Inventory catalog to validate")]
    pub inventory: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path rewriting rule, may be repeated
    #[arg(
        short = 'r',
        long = "rewrite",
        value_name = "PREFIX=REPLACEMENT",
        action = clap::ArgAction::Append,
        help = "Replace a declared document path prefix (e.g. '/db/repository/=./texts/')"
    )]
    pub rewrite: Vec<String>,

    /// Abort on malformed catalog entries instead of skipping them
    #[arg(long = "strict")]
    pub strict: bool,

    /// Number of concurrent validation threads
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of concurrent validation threads"
    )]
    pub threads: Option<usize>,

    /// Stop reporting after the first text that does not pass
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.inventory.is_file() {
            return Err(format!(
                "Inventory file does not exist: {}",
                self.inventory.display()
            ));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["cts-validate", "inventory.xml"]).unwrap();
        assert_eq!(cli.inventory, PathBuf::from("inventory.xml"));
        assert!(cli.rewrite.is_empty());
        assert!(!cli.strict);
        assert_eq!(cli.format, None);
    }

    #[test]
    fn test_repeated_rewrite_rules() {
        let cli = Cli::try_parse_from([
            "cts-validate",
            "inventory.xml",
            "-r",
            "/a/=/x/",
            "--rewrite",
            "/b/=/y/",
        ])
        .unwrap();
        assert_eq!(cli.rewrite, vec!["/a/=/x/", "/b/=/y/"]);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["cts-validate", "inventory.xml", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_format_values() {
        let cli = Cli::try_parse_from(["cts-validate", "inventory.xml", "--format", "json"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(Cli::try_parse_from(["cts-validate", "inventory.xml", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_inventory() {
        let cli = Cli::try_parse_from(["cts-validate", "/nonexistent/inventory.xml"]).unwrap();
        assert!(cli.validate().unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(VerbosityLevel::from_flags(false, true), VerbosityLevel::Quiet);
        assert_eq!(VerbosityLevel::from_flags(true, false), VerbosityLevel::Verbose);
        assert_eq!(VerbosityLevel::from_flags(false, false), VerbosityLevel::Normal);
    }
}
