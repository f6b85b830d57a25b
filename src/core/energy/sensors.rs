//! Capability interfaces the monitors measure through.
//!
//! Platform implementations live in `crate::platform`; tests substitute
//! scripted fakes.

use std::net::SocketAddrV4;

use super::target::Pid;
use crate::error::Result;

/// Processor and graphics sensor readings
pub trait SensorProvider: Send {
    /// True when per-core power sensors can be read directly
    fn is_direct_power_available(&self) -> bool;

    /// Per-core power in watts
    fn cores_power(&mut self) -> Result<Vec<f32>>;

    /// Per-core clock, in the unit of the configured rated clock
    fn cores_clocks(&mut self) -> Result<Vec<f32>>;

    /// Per-core voltage in volts
    fn cores_voltages(&mut self) -> Result<Vec<f32>>;

    /// Graphics energy used by `pids` over the next `interval_ms`.
    ///
    /// Blocks for the interval.
    fn gpu_joules(&mut self, pids: &[Pid], interval_ms: u64) -> Result<i32>;
}

/// Processor time counters. Both readings share one unit.
pub trait ProcessTimes: Send {
    /// Total processor time of the system, idle included
    fn system_time(&mut self) -> Result<u64>;

    /// Processor time consumed by `pid`, kernel and user
    fn process_time(&mut self, pid: Pid) -> Result<u64>;
}

/// Registered read/write byte-rate counters for one instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterHandle {
    pub instance: String,
    pub pid: Pid,
}

/// Byte rates for one counter instance
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IoRates {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
}

/// Performance-counter access for disk I/O
pub trait CounterProvider: Send {
    /// Counter instance name currently bound to `pid`.
    ///
    /// Scans every process, so the cost is linear in the process count.
    fn resolve_instance_for_pid(&mut self, pid: Pid) -> Result<Option<String>>;

    fn register_counters(&mut self, instance: &str) -> Result<CounterHandle>;

    /// One query pass. The outer error means the whole pass failed; inner
    /// results line up with `handles`.
    fn collect(&mut self, handles: &[CounterHandle]) -> Result<Vec<Result<IoRates>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Established,
    Other(u32),
}

/// One row of the system TCP table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConnection {
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub state: TcpState,
    pub owning_pid: Pid,
}

impl TcpConnection {
    pub fn is_established(&self) -> bool {
        self.state == TcpState::Established
    }

    pub fn is_loopback(&self) -> bool {
        self.remote.ip().is_loopback()
    }
}

/// Cumulative bytes carried by one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpByteCounts {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// TCP table and extended per-connection statistics
pub trait TcpStatsProvider: Send {
    fn connections(&mut self) -> Result<Vec<TcpConnection>>;

    /// Turn on extended statistics for a connection. Idempotent.
    fn enable_extended_stats(&mut self, conn: &TcpConnection) -> Result<()>;

    fn byte_counts(&mut self, conn: &TcpConnection) -> Result<TcpByteCounts>;
}
