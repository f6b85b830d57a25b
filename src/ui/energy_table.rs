use colored::*;

use crate::core::energy::{Component, EnergyTotals, MonitoringTarget};

/// Format joules with a unit that keeps the figure short (J, kJ, MJ)
pub fn format_energy(joules: f64) -> String {
    if joules < 1_000.0 {
        format!("{:.2}J", joules)
    } else if joules < 1_000_000.0 {
        format!("{:.2}kJ", joules / 1_000.0)
    } else {
        format!("{:.2}MJ", joules / 1_000_000.0)
    }
}

fn energy_cell(target: &MonitoringTarget, component: Component) -> String {
    let cell = format!("{:>10}", format_energy(target.energy(component)));
    if target.is_enabled(component) {
        cell.bright_green().to_string()
    } else {
        cell.dimmed().to_string()
    }
}

fn pid_list(pids: &[u32]) -> String {
    pids.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Registry listing: one line per target, indexed by console line number
pub fn render_energy_table(targets: &[MonitoringTarget]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n",
        format!(
            "{:>4}  {:<20} {:<16} {:>10} {:>10} {:>10} {:>10}",
            "LINE", "NAME", "PIDS", "CPU", "GPU", "SD", "NIC"
        )
        .bold()
        .bright_cyan()
    ));
    out.push_str(&format!("{}\n", "=".repeat(88)));

    if targets.is_empty() {
        out.push_str(&format!("{}\n", "  No monitored processes".dimmed()));
        return out;
    }

    for (line, target) in targets.iter().enumerate() {
        let cells: Vec<String> = Component::ALL
            .iter()
            .map(|c| energy_cell(target, *c))
            .collect();
        out.push_str(&format!(
            "{:>4}  {:<20} {:<16} {}\n",
            line,
            target.name(),
            pid_list(target.pids()),
            cells.join(" ")
        ));
    }

    let totals = EnergyTotals::from_targets(targets);
    out.push_str(&format!("{}\n", "-".repeat(88)));
    out.push_str(&format!(
        "{}\n",
        format!(
            "{:>4}  {:<37} {:>10} {:>10} {:>10} {:>10}",
            "",
            "TOTAL",
            format_energy(totals.cpu),
            format_energy(totals.gpu),
            format_energy(totals.sd),
            format_energy(totals.nic)
        )
        .bold()
    ));

    out
}
