use crate::cli::{Cli, OutputFormat};
use crate::document::RewritingRules;
use crate::inventory::InventoryOptions;
use crate::validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub inventory: InventoryConfig,
    pub validation: ValidationSettings,
    pub output: OutputConfig,
}

/// Catalog loading configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InventoryConfig {
    /// Abort on malformed catalog entries instead of skipping them
    pub strict: bool,
    /// Declared document path prefix -> replacement prefix
    pub rewriting_rules: RewritingRules,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationSettings {
    /// Number of concurrent validation threads
    pub threads: Option<usize>,
    /// Stop reporting after the first text that does not pass
    pub fail_fast: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Config {
    pub fn inventory_options(&self) -> InventoryOptions {
        InventoryOptions {
            rewriting_rules: self.inventory.rewriting_rules.clone(),
            strict: self.inventory.strict,
        }
    }

    pub fn validation_config(&self) -> ValidationConfig {
        ValidationConfig {
            threads: self.validation.threads,
            fail_fast: self.validation.fail_fast,
        }
    }
}

/// Parse `prefix=replacement` into its two halves
pub fn parse_rewrite_rule(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((prefix, replacement)) if !prefix.trim().is_empty() => {
            Ok((prefix.trim().to_string(), replacement.trim().to_string()))
        }
        _ => Err(format!(
            "Invalid rewrite rule '{}': expected PREFIX=REPLACEMENT",
            raw
        )),
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path)?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file()? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli)?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "cts-validate.toml",
            "cts-validate.json",
            ".cts-validate.toml",
            ".cts-validate.json",
        ];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path)?));
            }
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("cts-validate");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Inventory settings
        if let Some(strict) = env.get("CTS_VALIDATE_STRICT") {
            config.inventory.strict = strict.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid CTS_VALIDATE_STRICT value: {}", strict))
            })?;
        }

        if let Some(rules) = env.get("CTS_VALIDATE_REWRITE") {
            for rule in rules.split(';').map(str::trim).filter(|r| !r.is_empty()) {
                let (prefix, replacement) = parse_rewrite_rule(rule).map_err(|e| {
                    ConfigError::Environment(format!("Invalid CTS_VALIDATE_REWRITE value: {}", e))
                })?;
                config.inventory.rewriting_rules.insert(prefix, replacement);
            }
        }

        // Validation settings
        if let Some(threads) = env.get("CTS_VALIDATE_THREADS") {
            config.validation.threads = Some(threads.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid CTS_VALIDATE_THREADS value: {}", threads))
            })?);
        }

        if let Some(fail_fast) = env.get("CTS_VALIDATE_FAIL_FAST") {
            config.validation.fail_fast = fail_fast.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid CTS_VALIDATE_FAIL_FAST value: {}",
                    fail_fast
                ))
            })?;
        }

        // Output settings
        if let Some(verbose) = env.get("CTS_VALIDATE_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid CTS_VALIDATE_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("CTS_VALIDATE_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid CTS_VALIDATE_QUIET value: {}", quiet))
            })?;
        }

        if let Some(format) = env.get("CTS_VALIDATE_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid CTS_VALIDATE_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Result<Config> {
        // Flags only ever switch behaviour on
        if cli.strict {
            config.inventory.strict = true;
        }
        for rule in &cli.rewrite {
            let (prefix, replacement) = parse_rewrite_rule(rule).map_err(ConfigError::Validation)?;
            config.inventory.rewriting_rules.insert(prefix, replacement);
        }

        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        if cli.fail_fast {
            config.validation.fail_fast = true;
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        Ok(config)
    }

    /// Merge two configurations (second takes precedence for non-default values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // Inventory settings
        base.inventory.strict = override_config.inventory.strict;
        for (prefix, replacement) in override_config.inventory.rewriting_rules.iter() {
            base.inventory.rewriting_rules.insert(prefix, replacement);
        }

        // Validation settings
        if override_config.validation.threads.is_some() {
            base.validation.threads = override_config.validation.threads;
        }
        base.validation.fail_fast = override_config.validation.fail_fast;

        // Output settings
        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config
            .inventory
            .rewriting_rules
            .iter()
            .any(|(prefix, _)| prefix.is_empty())
        {
            return Err(ConfigError::Validation(
                "Rewriting rule prefixes cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.inventory.strict);
        assert!(config.inventory.rewriting_rules.is_empty());
        assert_eq!(config.validation.threads, None);
        assert!(!config.validation.fail_fast);
        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[inventory]
strict = true

[inventory.rewriting_rules]
"/db/repository/greekLit/" = "/data/greekLit/"

[validation]
threads = 8
fail_fast = true

[output]
format = "json"
verbose = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert!(config.inventory.strict);
        assert_eq!(
            config.inventory.rewriting_rules.rewrite("/db/repository/greekLit/a.xml"),
            "/data/greekLit/a.xml"
        );
        assert_eq!(config.validation.threads, Some(8));
        assert!(config.validation.fail_fast);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json_content = r#"{
  "inventory": { "strict": false, "rewriting_rules": { "/db/": "/data/" } },
  "output": { "format": "summary" }
}"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();
        assert_eq!(config.inventory.rewriting_rules.len(), 1);
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        assert_eq!(config.validation.threads, None);
    }

    #[test]
    fn test_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "inventory: {}").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::new();
        env.set("CTS_VALIDATE_STRICT", "true");
        env.set("CTS_VALIDATE_THREADS", "4");
        env.set("CTS_VALIDATE_FORMAT", "JSON");
        env.set(
            "CTS_VALIDATE_REWRITE",
            "/db/repository/=/data/; /db/other/ = /other/",
        );

        let config = ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();

        assert!(config.inventory.strict);
        assert_eq!(config.validation.threads, Some(4));
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert_eq!(config.inventory.rewriting_rules.rewrite("/db/other/a.xml"), "/other/a.xml");
        assert_eq!(config.inventory.rewriting_rules.len(), 2);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut env = MockEnvProvider::new();
        env.set("CTS_VALIDATE_THREADS", "many");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));

        let mut env = MockEnvProvider::new();
        env.set("CTS_VALIDATE_REWRITE", "no-equals-sign");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));
    }

    #[test]
    fn test_merge_with_cli() {
        let cli = Cli::try_parse_from([
            "cts-validate",
            "inventory.xml",
            "--strict",
            "--rewrite",
            "/db/=/data/",
            "--threads",
            "2",
            "--format",
            "summary",
            "-q",
        ])
        .unwrap();

        let config = ConfigManager::merge_with_cli(Config::default(), &cli).unwrap();

        assert!(config.inventory.strict);
        assert_eq!(config.inventory.rewriting_rules.rewrite("/db/a.xml"), "/data/a.xml");
        assert_eq!(config.validation.threads, Some(2));
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        assert!(config.output.quiet);
    }

    #[test]
    fn test_merge_configs_keeps_rules_from_both() {
        let mut base = Config::default();
        base.inventory.rewriting_rules.insert("/a/", "/x/");
        let mut other = Config::default();
        other.inventory.rewriting_rules.insert("/b/", "/y/");
        other.validation.threads = Some(3);

        let merged = ConfigManager::merge_configs(base, other);
        assert_eq!(merged.inventory.rewriting_rules.len(), 2);
        assert_eq!(merged.validation.threads, Some(3));
    }

    #[test]
    fn test_validate_config() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.validation.threads = Some(0);
        assert!(ConfigManager::validate_config(&config).is_err());

        config.validation.threads = Some(4);
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());

        config.output.quiet = false;
        config.inventory.rewriting_rules.insert("", "/data/");
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_rewrite_rule() {
        assert_eq!(
            parse_rewrite_rule("/db/=/data/"),
            Ok(("/db/".to_string(), "/data/".to_string()))
        );
        assert!(parse_rewrite_rule("=/data/").is_err());
        assert!(parse_rewrite_rule("/db/").is_err());
    }

    #[test]
    fn test_inventory_options_from_config() {
        let mut config = Config::default();
        config.inventory.strict = true;
        config.inventory.rewriting_rules.insert("/db/", "/data/");

        let options = config.inventory_options();
        assert!(options.strict);
        assert_eq!(options.rewriting_rules.len(), 1);
    }
}
