use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};

use ecofloc::commands;
use ecofloc::core::energy::Component;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("PATH")
        .help("Configuration file (defaults to the user config directory)")
}

fn build_cli() -> Command {
    Command::new("ecofloc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Per-process energy accounting for CPU, GPU, storage and network")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about("Monitor processes and accumulate their energy")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Polling interval in milliseconds")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("SECONDS")
                        .help("Stop after this many seconds (0 runs until quit)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("pid")
                        .short('p')
                        .long("pid")
                        .value_name("PID")
                        .help("Monitor a process by pid (repeatable)")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .value_name("NAME")
                        .help("Monitor every process with this name (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("component")
                        .long("component")
                        .value_name("CPU|GPU|SD|NIC")
                        .help("Components to enable for --pid/--name targets (default CPU)")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(Component)),
                )
                .arg(
                    Arg::new("no-shm")
                        .long("no-shm")
                        .help("Do not publish totals to shared memory")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("once")
                        .long("once")
                        .help("Run a single measurement cycle and exit")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or create the configuration file")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Print the effective configuration")
                        .arg(config_arg()),
                )
                .subcommand(
                    Command::new("init")
                        .about("Write a default configuration file")
                        .arg(config_arg())
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite an existing file")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(Command::new("path").about("Print the default configuration path")),
        )
}

fn main() -> Result<()> {
    ecofloc::init_logging();

    let matches = build_cli().get_matches();

    if matches.get_flag("version") {
        println!("ecofloc version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::execute(sub_matches)?,
        _ => {
            println!("Use 'ecofloc --help' for more information.");
        }
    }

    Ok(())
}
