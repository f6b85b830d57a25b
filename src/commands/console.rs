//! Interactive console: one line, one verb, one registry operation.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;

use crate::core::energy::{Component, MonitoringContext, Pid};
use crate::error::{EcoflocError, Result};
use crate::platform::ProcessLookup;
use crate::ui::render_energy_table;

pub const HELP: &str = "\
Commands:
  add -p <pid> <CPU|GPU|SD|NIC>     monitor one process
  add -n <name> <CPU|GPU|SD|NIC>    monitor every process with that name
  remove <line>                     stop monitoring a line
  enable <line> <CPU|GPU|SD|NIC>    turn a component on for a line
  disable <line> <CPU|GPU|SD|NIC>   turn a component off for a line
  interval <ms>                     change the polling interval
  list                              show monitored processes and energy
  help                              show this help
  quit                              stop monitoring and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    Pid(Pid),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add {
        selector: TargetSelector,
        component: Component,
    },
    Remove(i64),
    Enable(i64, Component),
    Disable(i64, Component),
    Interval(u64),
    List,
    Help,
    Quit,
}

fn parse_line(word: &str) -> Result<i64> {
    word.parse()
        .map_err(|_| EcoflocError::other(format!("line number must be an integer, got '{}'", word)))
}

fn usage(verb: &str, shape: &str) -> EcoflocError {
    EcoflocError::other(format!("usage: {} {}", verb, shape))
}

impl FromStr for ConsoleCommand {
    type Err = EcoflocError;

    fn from_str(s: &str) -> Result<Self> {
        let words: Vec<&str> = s.split_whitespace().collect();

        match words.as_slice() {
            ["add", flag, value, component] => {
                let component = component.parse()?;
                let selector = match *flag {
                    "-p" => TargetSelector::Pid(value.parse().map_err(|_| {
                        EcoflocError::other(format!("pid must be an integer, got '{}'", value))
                    })?),
                    "-n" => TargetSelector::Name(value.to_string()),
                    _ => return Err(usage("add", "{-p pid|-n name} component")),
                };
                Ok(ConsoleCommand::Add {
                    selector,
                    component,
                })
            }
            ["add", ..] => Err(usage("add", "{-p pid|-n name} component")),
            ["remove", line] => Ok(ConsoleCommand::Remove(parse_line(line)?)),
            ["remove", ..] => Err(usage("remove", "line")),
            ["enable", line, component] => {
                Ok(ConsoleCommand::Enable(parse_line(line)?, component.parse()?))
            }
            ["enable", ..] => Err(usage("enable", "line component")),
            ["disable", line, component] => {
                Ok(ConsoleCommand::Disable(parse_line(line)?, component.parse()?))
            }
            ["disable", ..] => Err(usage("disable", "line component")),
            ["interval", ms] => ms
                .parse()
                .map(ConsoleCommand::Interval)
                .map_err(|_| EcoflocError::other(format!("interval must be an integer, got '{}'", ms))),
            ["interval", ..] => Err(usage("interval", "ms")),
            ["list"] => Ok(ConsoleCommand::List),
            ["help"] => Ok(ConsoleCommand::Help),
            ["quit"] => Ok(ConsoleCommand::Quit),
            [] => Err(EcoflocError::other("empty command")),
            [verb, ..] => Err(EcoflocError::other(format!(
                "unknown command '{}' (add/remove/enable/disable/interval/list/help/quit)",
                verb
            ))),
        }
    }
}

/// What the console loop does after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

/// Maps console verbs onto the shared monitoring context
pub struct Console<L: ProcessLookup> {
    ctx: Arc<MonitoringContext>,
    lookup: L,
}

impl<L: ProcessLookup> Console<L> {
    pub fn new(ctx: Arc<MonitoringContext>, lookup: L) -> Self {
        Self { ctx, lookup }
    }

    /// Resolve a signed console line against the current registry length
    fn line_index(&self, line: i64) -> Result<usize> {
        let len = self.ctx.registry().len();
        if line < 0 || line as usize >= len {
            return Err(EcoflocError::InvalidIndex { index: line, len });
        }
        Ok(line as usize)
    }

    fn add(&mut self, selector: TargetSelector, component: Component) -> Result<String> {
        let registry = self.ctx.registry();

        match selector {
            TargetSelector::Pid(pid) => {
                let name = self.lookup.name_of(pid).ok_or_else(|| {
                    EcoflocError::invalid_target(format!("no process with pid {}", pid))
                })?;
                let line = registry.add_target(&name, vec![pid], component)?;
                Ok(format!("Added {} ({}) on line {} for {}", name, pid, line, component))
            }
            TargetSelector::Name(name) => {
                let pids = self.lookup.pids_named(&name);
                if pids.is_empty() {
                    return Err(EcoflocError::invalid_target(format!(
                        "no process named '{}'",
                        name
                    )));
                }
                let line = registry.add_untracked(&name, pids, component)?;
                Ok(format!("Added {} on line {} for {}", name, line, component))
            }
        }
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Outcome> {
        let registry = self.ctx.registry();

        let reply = match command {
            ConsoleCommand::Add {
                selector,
                component,
            } => self.add(selector, component)?,
            ConsoleCommand::Remove(line) => {
                let removed = registry.remove_target(self.line_index(line)?)?;
                format!("Removed {} from line {}", removed.name(), line)
            }
            ConsoleCommand::Enable(line, component) => {
                registry.enable_component(self.line_index(line)?, component)?;
                format!("{} enabled on line {}", component, line)
            }
            ConsoleCommand::Disable(line, component) => {
                registry.disable_component(self.line_index(line)?, component)?;
                format!("{} disabled on line {}", component, line)
            }
            ConsoleCommand::Interval(ms) => {
                self.ctx.set_interval_ms(ms)?;
                "Interval has been changed".to_string()
            }
            ConsoleCommand::List => render_energy_table(&registry.snapshot()),
            ConsoleCommand::Help => HELP.to_string(),
            ConsoleCommand::Quit => {
                self.ctx.shutdown().trigger();
                return Ok(Outcome::Quit);
            }
        };

        Ok(Outcome::Reply(reply))
    }

    /// Parse and run one input line
    pub fn handle_line(&mut self, line: &str) -> Result<Outcome> {
        let command: ConsoleCommand = line.parse()?;
        log::debug!("Console command: {:?}", command);
        self.execute(command)
    }

    /// Read commands until `quit`, end of input or shutdown.
    ///
    /// End of input does not stop the monitors.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_line(&line) {
                Ok(Outcome::Reply(reply)) => writeln!(output, "{}", reply)?,
                Ok(Outcome::Quit) => break,
                Err(e) => writeln!(output, "{} {}", "error:".red().bold(), e)?,
            }
            output.flush()?;

            if self.ctx.shutdown().is_triggered() {
                break;
            }
        }
        Ok(())
    }
}
