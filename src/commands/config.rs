use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

fn target_path(matches: &clap::ArgMatches) -> Result<PathBuf> {
    match matches.get_one::<String>("config") {
        Some(path) => Ok(PathBuf::from(path)),
        None => Config::get_config_path(),
    }
}

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", sub_matches)) => show(sub_matches),
        Some(("init", sub_matches)) => init(sub_matches),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        _ => {
            println!("Use 'ecofloc config --help' for more information.");
            Ok(())
        }
    }
}

/// Print the effective configuration as JSON
fn show(matches: &clap::ArgMatches) -> Result<()> {
    let path = target_path(matches)?;
    let config = Config::load_from(&path)?;

    println!("{} {}", "Configuration:".bold(), path.display().to_string().dimmed());
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize config")?
    );

    if config.usable_cpu_profile().is_none() {
        println!(
            "{}",
            "No usable CPU profile: processor energy needs a direct power sensor".yellow()
        );
    }
    Ok(())
}

/// Write a default configuration file
fn init(matches: &clap::ArgMatches) -> Result<()> {
    let path = target_path(matches)?;
    if path.exists() && !matches.get_flag("force") {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(&path)?;
    println!("{} {}", "✓ Config written to".green(), path.display());
    Ok(())
}
