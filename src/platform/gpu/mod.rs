//! Graphics energy sources.

mod nvidia;

pub use nvidia::NvidiaEnergy;

/// Share of graphics activity owned by `pids`, from per-process SM samples
pub fn pid_share(samples: &[(u32, u32)], pids: &[u32]) -> f64 {
    let total: u64 = samples.iter().map(|(_, sm)| *sm as u64).sum();
    if total == 0 {
        return 0.0;
    }
    let owned: u64 = samples
        .iter()
        .filter(|(pid, _)| pids.contains(pid))
        .map(|(_, sm)| *sm as u64)
        .sum();
    owned as f64 / total as f64
}
