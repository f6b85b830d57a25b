//! Monitoring command handler.
//!
//! Builds the shared context, starts one thread per available monitor and
//! hands the terminal to the console until shutdown.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::commands::console::Console;
use crate::core::config::Config;
use crate::core::energy::{Component, MonitorRuntime, MonitoringContext, RunMode, TargetRegistry};
use crate::platform::{self, ProcessLookup, SysinfoProcessLookup};
use crate::ui::render_energy_table;

/// Load the configuration and apply command-line overrides
pub fn resolve_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.interval_ms = *interval;
    }
    if matches.get_flag("no-shm") {
        config.shared_memory.enabled = false;
    }

    Ok(config)
}

/// `--once` wins over `--timeout`; a zero timeout runs until shutdown
pub fn run_mode(matches: &ArgMatches) -> RunMode {
    if matches.get_flag("once") {
        return RunMode::Once;
    }
    match matches.get_one::<u64>("timeout").copied() {
        Some(secs) if secs > 0 => RunMode::Timeout(Duration::from_secs(secs)),
        _ => RunMode::Forever,
    }
}

/// Register the targets given on the command line.
///
/// The first component creates the target; the others are enabled on the
/// line it landed on.
pub fn register_initial_targets(
    registry: &TargetRegistry,
    lookup: &mut dyn ProcessLookup,
    pids: &[u32],
    names: &[String],
    components: &[Component],
) -> Result<()> {
    let Some((first, rest)) = components.split_first() else {
        return Ok(());
    };

    let mut lines = Vec::new();
    for pid in pids {
        let name = lookup
            .name_of(*pid)
            .with_context(|| format!("No process with pid {}", pid))?;
        lines.push(registry.add_target(&name, vec![*pid], *first)?);
    }
    for name in names {
        let found = lookup.pids_named(name);
        if found.is_empty() {
            anyhow::bail!("No process named '{}'", name);
        }
        lines.push(registry.add_untracked(name, found, *first)?);
    }

    for line in lines {
        for component in rest {
            registry.enable_component(line, *component)?;
        }
    }
    Ok(())
}

/// Execute the monitoring command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    let mode = run_mode(matches);

    let publisher = platform::host_publisher(&config);
    let ctx = Arc::new(
        MonitoringContext::new(publisher, config.interval_ms)
            .context("Failed to build monitoring context")?,
    );

    let pids: Vec<u32> = matches
        .get_many::<u32>("pid")
        .map(|v| v.copied().collect())
        .unwrap_or_default();
    let names: Vec<String> = matches
        .get_many::<String>("name")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let components: Vec<Component> = matches
        .get_many::<Component>("component")
        .map(|v| v.copied().collect())
        .unwrap_or_else(|| vec![Component::Processor]);

    let mut lookup = SysinfoProcessLookup::new();
    register_initial_targets(ctx.registry(), &mut lookup, &pids, &names, &components)
        .context("Failed to register initial targets")?;

    let shutdown_ctx = Arc::clone(&ctx);
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Stopping monitors...".yellow().bold());
        shutdown_ctx.shutdown().trigger();
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let host = platform::host_monitors(&config);
    for (component, err) in &host.unavailable {
        log::warn!("{} monitor unavailable: {}", component, err);
    }

    let mut runtime = MonitorRuntime::new(Arc::clone(&ctx));
    for monitor in host.monitors {
        runtime.spawn(monitor, mode)?;
    }

    println!(
        "{} {} ms, monitors: {}",
        "Monitoring every".bold(),
        ctx.interval_ms(),
        runtime
            .components()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if mode == RunMode::Forever {
        spawn_console(Arc::clone(&ctx), lookup)?;
        ctx.shutdown().wait();
        runtime.shutdown();
    } else {
        runtime.join();
    }

    print!("{}", render_energy_table(&ctx.registry().snapshot()));
    let totals = ctx.registry().totals();
    log::info!("Total energy: {:.3} J", totals.total());
    Ok(())
}

/// Console on its own thread, reading stdin until `quit` or end of input
fn spawn_console(ctx: Arc<MonitoringContext>, lookup: SysinfoProcessLookup) -> Result<()> {
    println!("{}", "Type 'help' for commands".dimmed());

    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let mut console = Console::new(ctx, lookup);
            if let Err(e) = console.run(io::stdin().lock(), io::stdout()) {
                log::error!("Console stopped: {}", e);
            }
        })
        .context("Failed to start console thread")?;
    Ok(())
}
