// Scripted providers standing in for host sensors

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use ecofloc::core::energy::sensors::{
    CounterHandle, CounterProvider, IoRates, ProcessTimes, SensorProvider, TcpByteCounts,
    TcpConnection, TcpStatsProvider,
};
use ecofloc::core::energy::Pid;
use ecofloc::platform::ProcessLookup;
use ecofloc::{EcoflocError, Result};

/// Processor sensors with fixed readings
pub struct FixedSensors {
    pub direct: bool,
    pub core_power: Vec<f32>,
    pub clocks: Vec<f32>,
    pub voltages: Vec<f32>,
    pub gpu: VecDeque<Result<i32>>,
}

impl FixedSensors {
    pub fn direct(core_power: Vec<f32>) -> Self {
        Self {
            direct: true,
            core_power,
            clocks: Vec::new(),
            voltages: Vec::new(),
            gpu: VecDeque::new(),
        }
    }

    pub fn derived(clocks: Vec<f32>, voltages: Vec<f32>) -> Self {
        Self {
            direct: false,
            core_power: Vec::new(),
            clocks,
            voltages,
            gpu: VecDeque::new(),
        }
    }

    pub fn graphics(readings: Vec<Result<i32>>) -> Self {
        Self {
            direct: false,
            core_power: Vec::new(),
            clocks: Vec::new(),
            voltages: Vec::new(),
            gpu: readings.into(),
        }
    }
}

impl SensorProvider for FixedSensors {
    fn is_direct_power_available(&self) -> bool {
        self.direct
    }

    fn cores_power(&mut self) -> Result<Vec<f32>> {
        Ok(self.core_power.clone())
    }

    fn cores_clocks(&mut self) -> Result<Vec<f32>> {
        Ok(self.clocks.clone())
    }

    fn cores_voltages(&mut self) -> Result<Vec<f32>> {
        Ok(self.voltages.clone())
    }

    fn gpu_joules(&mut self, _pids: &[Pid], _interval_ms: u64) -> Result<i32> {
        self.gpu
            .pop_front()
            .unwrap_or_else(|| Err(EcoflocError::sensor_unavailable("script exhausted")))
    }
}

/// Processor times replayed from two queues
pub struct ScriptedTimes {
    pub system: VecDeque<u64>,
    pub process: VecDeque<u64>,
}

impl ScriptedTimes {
    pub fn new(system: &[u64], process: &[u64]) -> Self {
        Self {
            system: system.iter().copied().collect(),
            process: process.iter().copied().collect(),
        }
    }
}

impl ProcessTimes for ScriptedTimes {
    fn system_time(&mut self) -> Result<u64> {
        self.system
            .pop_front()
            .ok_or_else(|| EcoflocError::sensor_unavailable("no system time"))
    }

    fn process_time(&mut self, pid: Pid) -> Result<u64> {
        self.process
            .pop_front()
            .ok_or_else(|| EcoflocError::sensor_unavailable(format!("no time for {}", pid)))
    }
}

/// Disk counters keyed by pid; instance names are `proc#<pid>`
#[derive(Clone, Default)]
pub struct FakeCounters {
    pub rates: Arc<Mutex<HashMap<Pid, Result<IoRates>>>>,
    pub registrations: Arc<Mutex<Vec<String>>>,
}

impl FakeCounters {
    pub fn set_rate(&self, pid: Pid, read: f64, write: f64) {
        self.rates.lock().insert(
            pid,
            Ok(IoRates {
                read_bytes_per_sec: read,
                write_bytes_per_sec: write,
            }),
        );
    }

    pub fn set_failure(&self, pid: Pid) {
        self.rates
            .lock()
            .insert(pid, Err(EcoflocError::sensor_unavailable("counter gone")));
    }
}

impl CounterProvider for FakeCounters {
    fn resolve_instance_for_pid(&mut self, pid: Pid) -> Result<Option<String>> {
        Ok(self
            .rates
            .lock()
            .contains_key(&pid)
            .then(|| format!("proc#{}", pid)))
    }

    fn register_counters(&mut self, instance: &str) -> Result<CounterHandle> {
        self.registrations.lock().push(instance.to_string());
        let pid = instance
            .rsplit_once('#')
            .and_then(|(_, pid)| pid.parse().ok())
            .ok_or_else(|| EcoflocError::resource_acquisition("bad instance"))?;
        Ok(CounterHandle {
            instance: instance.to_string(),
            pid,
        })
    }

    fn collect(&mut self, handles: &[CounterHandle]) -> Result<Vec<Result<IoRates>>> {
        let rates = self.rates.lock();
        Ok(handles
            .iter()
            .map(|h| match rates.get(&h.pid) {
                Some(Ok(r)) => Ok(*r),
                _ => Err(EcoflocError::sensor_unavailable("no sample")),
            })
            .collect())
    }
}

/// Fixed TCP table; byte counts per remote port, missing ports fail
pub struct FakeTcp {
    pub table: Vec<TcpConnection>,
    pub counts: HashMap<u16, TcpByteCounts>,
    pub enabled: Arc<Mutex<Vec<u16>>>,
}

impl TcpStatsProvider for FakeTcp {
    fn connections(&mut self) -> Result<Vec<TcpConnection>> {
        Ok(self.table.clone())
    }

    fn enable_extended_stats(&mut self, conn: &TcpConnection) -> Result<()> {
        self.enabled.lock().push(conn.remote.port());
        Ok(())
    }

    fn byte_counts(&mut self, conn: &TcpConnection) -> Result<TcpByteCounts> {
        self.counts
            .get(&conn.remote.port())
            .copied()
            .ok_or_else(|| EcoflocError::sensor_unavailable("no estats"))
    }
}

/// Process table for console tests
#[derive(Default)]
pub struct FakeProcesses {
    pub processes: Vec<(Pid, String)>,
}

impl FakeProcesses {
    pub fn new(processes: &[(Pid, &str)]) -> Self {
        Self {
            processes: processes
                .iter()
                .map(|(pid, name)| (*pid, name.to_string()))
                .collect(),
        }
    }
}

impl ProcessLookup for FakeProcesses {
    fn name_of(&mut self, pid: Pid) -> Option<String> {
        self.processes
            .iter()
            .find(|(p, _)| *p == pid)
            .map(|(_, name)| name.clone())
    }

    fn pids_named(&mut self, name: &str) -> Vec<Pid> {
        self.processes
            .iter()
            .filter(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(pid, _)| *pid)
            .collect()
    }
}
