use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::publisher::{EnergyPublisher, MemoryPublisher};
use super::registry::TargetRegistry;
use super::shutdown::ShutdownSignal;
use crate::error::{EcoflocError, Result};

/// State shared by the monitors and the console.
///
/// Built once by the driver and handed out behind an `Arc`.
pub struct MonitoringContext {
    registry: TargetRegistry,
    interval_ms: AtomicU64,
    shutdown: ShutdownSignal,
}

impl MonitoringContext {
    pub fn new(publisher: Arc<dyn EnergyPublisher>, interval_ms: u64) -> Result<Self> {
        validate_interval(interval_ms)?;
        Ok(Self {
            registry: TargetRegistry::new(publisher),
            interval_ms: AtomicU64::new(interval_ms),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Context that publishes into memory only
    pub fn in_memory(interval_ms: u64) -> Result<Self> {
        Self::new(Arc::new(MemoryPublisher::new()), interval_ms)
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    /// Change the polling interval. Takes effect at the next cycle.
    pub fn set_interval_ms(&self, interval_ms: u64) -> Result<()> {
        validate_interval(interval_ms)?;
        self.interval_ms.store(interval_ms, Ordering::Relaxed);
        Ok(())
    }
}

fn validate_interval(interval_ms: u64) -> Result<()> {
    if interval_ms == 0 {
        return Err(EcoflocError::config("interval must be greater than zero"));
    }
    Ok(())
}
