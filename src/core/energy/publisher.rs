//! Publication of aggregate energy totals.
//!
//! The registry is the only writer. Readers in other processes map the same
//! segment and read it without synchronization: every field only grows, so a
//! torn read is momentarily stale but never invalid.

use parking_lot::Mutex;

use super::target::EnergyTotals;

/// Fixed-layout record mirrored into the shared segment (40 bytes, no padding)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SharedEnergyRecord {
    pub cpu_energy: f64,
    pub gpu_energy: f64,
    pub sd_energy: f64,
    pub nic_energy: f64,
    pub timestamp_ms: i64,
}

const _: () = assert!(std::mem::size_of::<SharedEnergyRecord>() == 40);

impl SharedEnergyRecord {
    pub const SIZE: usize = std::mem::size_of::<SharedEnergyRecord>();

    pub fn new(totals: &EnergyTotals, timestamp_ms: i64) -> Self {
        Self {
            cpu_energy: totals.cpu,
            gpu_energy: totals.gpu,
            sd_energy: totals.sd,
            nic_energy: totals.nic,
            timestamp_ms,
        }
    }

    /// Record stamped with the current wall-clock time
    pub fn now(totals: &EnergyTotals) -> Self {
        Self::new(totals, chrono::Utc::now().timestamp_millis())
    }

    /// Little-endian wire image, field order as declared
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.cpu_energy.to_le_bytes());
        out[8..16].copy_from_slice(&self.gpu_energy.to_le_bytes());
        out[16..24].copy_from_slice(&self.sd_energy.to_le_bytes());
        out[24..32].copy_from_slice(&self.nic_energy.to_le_bytes());
        out[32..40].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        out
    }
}

/// Sink for aggregate totals, called after every committed delta
pub trait EnergyPublisher: Send + Sync {
    fn publish(&self, record: &SharedEnergyRecord);
}

/// Keeps the latest record in memory
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    latest: Mutex<Option<SharedEnergyRecord>>,
    writes: Mutex<u64>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<SharedEnergyRecord> {
        *self.latest.lock()
    }

    /// Number of records published so far
    pub fn writes(&self) -> u64 {
        *self.writes.lock()
    }
}

impl EnergyPublisher for MemoryPublisher {
    fn publish(&self, record: &SharedEnergyRecord) {
        *self.latest.lock() = Some(*record);
        *self.writes.lock() += 1;
    }
}
