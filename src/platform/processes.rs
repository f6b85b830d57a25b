use sysinfo::{Pid as SysPid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::core::energy::target::Pid;

/// Process name and pid queries used when adding targets
pub trait ProcessLookup: Send {
    fn name_of(&mut self, pid: Pid) -> Option<String>;

    /// Pids whose process name matches `name`, case-insensitively, ascending
    fn pids_named(&mut self, name: &str) -> Vec<Pid>;
}

pub struct SysinfoProcessLookup {
    system: System,
}

impl SysinfoProcessLookup {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
    }
}

impl Default for SysinfoProcessLookup {
    fn default() -> Self {
        Self::new()
    }
}

/// Process names compare with and without a trailing `.exe`
fn same_process_name(actual: &str, wanted: &str) -> bool {
    let strip = |s: &str| {
        let lower = s.to_lowercase();
        lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
    };
    strip(actual) == strip(wanted)
}

impl ProcessLookup for SysinfoProcessLookup {
    fn name_of(&mut self, pid: Pid) -> Option<String> {
        let sys_pid = SysPid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system
            .process(sys_pid)
            .map(|p| p.name().to_string_lossy().into_owned())
    }

    fn pids_named(&mut self, name: &str) -> Vec<Pid> {
        self.refresh();
        let mut pids: Vec<Pid> = self
            .system
            .processes()
            .iter()
            .filter(|(_, p)| same_process_name(&p.name().to_string_lossy(), name))
            .map(|(pid, _)| pid.as_u32())
            .collect();
        pids.sort_unstable();
        pids
    }
}
