//! Intel RAPL package power through the Linux powercap interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{EcoflocError, Result};

const RAPL_PACKAGE: &str = "/sys/class/powercap/intel-rapl:0";

/// Package power derived from the cumulative energy counter
pub struct RaplPackage {
    energy_path: PathBuf,
    max_energy_uj: u64,
    last: (u64, Instant),
}

impl RaplPackage {
    pub fn open() -> Result<Self> {
        Self::open_at(Path::new(RAPL_PACKAGE))
    }

    /// Open a powercap package directory (`energy_uj`, `max_energy_range_uj`)
    pub fn open_at(package: &Path) -> Result<Self> {
        let energy_path = package.join("energy_uj");
        if !energy_path.exists() {
            return Err(EcoflocError::sensor_unavailable(format!(
                "RAPL counter not found at {}",
                energy_path.display()
            )));
        }

        let max_energy_uj = fs::read_to_string(package.join("max_energy_range_uj"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(u64::MAX);

        let initial = read_counter(&energy_path)?;
        Ok(Self {
            energy_path,
            max_energy_uj,
            last: (initial, Instant::now()),
        })
    }

    /// Average watts since the previous call, handling counter wraparound
    pub fn power(&mut self) -> Result<f32> {
        let energy = read_counter(&self.energy_path)?;
        let now = Instant::now();
        let (last_energy, last_time) = self.last;
        self.last = (energy, now);

        let consumed = if energy >= last_energy {
            energy - last_energy
        } else {
            (self.max_energy_uj - last_energy) + energy
        };

        let secs = now.duration_since(last_time).as_secs_f64();
        if secs <= 0.0 {
            return Ok(0.0);
        }
        Ok((consumed as f64 / secs / 1_000_000.0) as f32)
    }
}

fn read_counter(path: &Path) -> Result<u64> {
    fs::read_to_string(path)?
        .trim()
        .parse()
        .map_err(|_| EcoflocError::sensor_unavailable(format!("unreadable {}", path.display())))
}
