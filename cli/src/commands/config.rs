// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use overwatch_core::domain::fleet_config::{FleetConfigManifest, OperatorCommand};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./overwatch-config.yaml)
        #[arg(short, long, default_value = "./overwatch-config.yaml")]
        output: PathBuf,

        /// Include a sample operator scenario
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = FleetConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. OVERWATCH_CONFIG_PATH: {}",
            std::env::var("OVERWATCH_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./overwatch-config.yaml");
        println!("  4. ~/.overwatch/config.yaml");
        println!("  5. /etc/overwatch/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Decision Engine:".bold());
    println!("  Sensor radius: {} cells", spec.engine.sensor_radius);
    println!("  Threat threshold: {}", spec.engine.threat_threshold);
    println!("  Warn discount: {}", spec.engine.warn_discount);
    println!();

    println!("{}", "Target Registry:".bold());
    println!("  Entry TTL: {} ticks", spec.registry.entry_ttl);
    println!();

    println!("{}", "World:".bold());
    println!("  Grid: {}x{}", spec.grid.width, spec.grid.height);
    let zone = &spec.protected_zone;
    println!(
        "  Protected zone: ({},{})..({},{})",
        zone.x1, zone.y1, zone.x2, zone.y2
    );
    println!(
        "  Fleet: {} drones, {} persons",
        spec.simulation.drones, spec.simulation.persons
    );
    println!("  Ticks: {}", spec.simulation.ticks);
    match spec.simulation.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: {}", "(random)".dimmed()),
    }
    println!();

    if !spec.scenario.is_empty() {
        println!("{}", "Scenario:".bold());
        for step in &spec.scenario {
            match &step.command {
                OperatorCommand::RaiseThreat { target, amount } => {
                    println!("  t={:<4} raise_threat {} +{}", step.at_tick, target, amount)
                }
                OperatorCommand::Spawn { id, x, y, threat } => {
                    println!("  t={:<4} spawn {} at ({},{}) threat {}", step.at_tick, id, x, y, threat)
                }
            }
        }
        println!();
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = FleetConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    std::fs::write(output, sample_config(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid_manifests() {
        for with_examples in [false, true] {
            let manifest = FleetConfigManifest::from_yaml_str(sample_config(with_examples)).unwrap();
            manifest.validate().unwrap();
        }
    }

    #[test]
    fn test_example_template_has_scenario() {
        let manifest = FleetConfigManifest::from_yaml_str(sample_config(true)).unwrap();
        assert!(!manifest.spec.scenario.is_empty());
    }

    #[tokio::test]
    async fn test_generate_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.yaml");

        generate(&path, false).await.unwrap();
        validate(Some(path)).await.unwrap();
    }
}
