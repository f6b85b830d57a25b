//! Network energy monitor.
//!
//! Walks the TCP table once per cycle and converts the byte counts of each
//! established, non-loopback connection owned by a monitored pid into energy.

use crate::core::energy::component::Component;
use crate::core::energy::monitor::{EnergyDelta, Monitor, PollContext};
use crate::core::energy::sensors::{TcpByteCounts, TcpConnection, TcpStatsProvider};
use crate::core::energy::target::MonitoringTarget;
use crate::error::Result;

/// Watts drawn at the reference rate
pub const NIC_POWER_COEFFICIENT: f64 = 1.138;
/// Reference transfer rate in bytes per second
pub const NIC_REFERENCE_RATE: f64 = 300_000.0;

/// Power of one connection: each direction scales the coefficient by its
/// rate over the reference rate.
pub fn connection_power(counts: &TcpByteCounts, interval_secs: f64) -> f64 {
    if interval_secs <= 0.0 {
        return 0.0;
    }
    let download_rate = counts.bytes_in as f64 / interval_secs;
    let upload_rate = counts.bytes_out as f64 / interval_secs;

    NIC_POWER_COEFFICIENT * (download_rate / NIC_REFERENCE_RATE)
        + NIC_POWER_COEFFICIENT * (upload_rate / NIC_REFERENCE_RATE)
}

/// Joules of one connection over one interval
pub fn network_energy(counts: &TcpByteCounts, interval_secs: f64) -> f64 {
    connection_power(counts, interval_secs) * interval_secs
}

pub struct NetworkMonitor {
    tcp: Box<dyn TcpStatsProvider>,
}

impl NetworkMonitor {
    pub fn new(tcp: Box<dyn TcpStatsProvider>) -> Self {
        Self { tcp }
    }

    fn read_connection(&mut self, conn: &TcpConnection) -> Result<TcpByteCounts> {
        self.tcp.enable_extended_stats(conn)?;
        self.tcp.byte_counts(conn)
    }
}

impl Monitor for NetworkMonitor {
    fn component(&self) -> Component {
        Component::Network
    }

    fn poll_once(
        &mut self,
        snapshot: &[MonitoringTarget],
        poll: &PollContext<'_>,
    ) -> Vec<EnergyDelta> {
        let table = match self.tcp.connections() {
            Ok(table) => table,
            Err(e) => {
                log::warn!("TCP table unavailable: {}", e);
                return Vec::new();
            }
        };

        let interval_secs = poll.interval_secs();
        let mut deltas = Vec::new();

        for target in snapshot.iter().filter(|t| t.is_enabled(Component::Network)) {
            for pid in target.pids() {
                for conn in table.iter().filter(|c| c.owning_pid == *pid) {
                    if !conn.is_established() || conn.is_loopback() {
                        continue;
                    }

                    match self.read_connection(conn) {
                        Ok(counts) => deltas.push(EnergyDelta::first_tracked(
                            Component::Network,
                            network_energy(&counts, interval_secs),
                        )),
                        Err(e) => log::debug!(
                            "Skipping connection {} -> {}: {}",
                            conn.local,
                            conn.remote,
                            e
                        ),
                    }
                }
            }
        }

        deltas
    }
}
