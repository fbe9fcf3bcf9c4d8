use std::process::ExitCode;

use anyhow::Context;
use cts_validate::{
    Cli, ConfigManager, Inventory, Output, ValidationEngine, VerbosityLevel,
};

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = ConfigManager::load_config(cli).context("Failed to load configuration")?;
    let verbosity = VerbosityLevel::from_flags(config.output.verbose, config.output.quiet);

    tracing_subscriber::fmt()
        .with_max_level(verbosity.tracing_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let inventory = Inventory::from_path(&cli.inventory, &config.inventory_options())
        .with_context(|| format!("Failed to load inventory {}", cli.inventory.display()))?;

    let engine = ValidationEngine::new(config.validation_config());
    let results = engine.validate_inventory(&inventory)?;

    let output = Output::new(config.output.format.into(), verbosity);
    let rendered = output.render(&results).context("Failed to render results")?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }

    Ok(!results.has_failures())
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
