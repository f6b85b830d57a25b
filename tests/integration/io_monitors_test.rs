// GRAPHICS, STORAGE AND NETWORK MONITOR TESTS
// ===========================================
// Attribution rules and per-item error isolation for the monitors that do
// not sample processor time.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::fakes::{FakeCounters, FakeTcp, FixedSensors};
use ecofloc::core::energy::monitors::{GpuMonitor, NetworkMonitor, StorageMonitor};
use ecofloc::core::energy::sensors::{TcpByteCounts, TcpConnection, TcpState};
use ecofloc::core::energy::{Monitor, MonitorDriver, PollContext, ShutdownSignal};
use ecofloc::{Component, EcoflocError, MonitoringContext};

fn tcp_row(pid: u32, remote: Ipv4Addr, port: u16, state: TcpState) -> TcpConnection {
    TcpConnection {
        local: SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 10), 50_000 + port % 1000),
        remote: SocketAddrV4::new(remote, port),
        state,
        owning_pid: pid,
    }
}

// ============================================================================
// Graphics
// ============================================================================

#[test]
fn test_gpu_negative_reading_is_skipped() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("game", vec![10], Component::Graphics).unwrap();
    registry.add_target("render", vec![20], Component::Graphics).unwrap();

    let sensors = FixedSensors::graphics(vec![
        Ok(3),
        Ok(-1),
        Ok(4),
        Err(EcoflocError::sensor_unavailable("device lost")),
    ]);
    let mut driver = MonitorDriver::new(GpuMonitor::new(Box::new(sensors)), Arc::clone(&ctx));

    assert_eq!(driver.cycle().committed, 1);
    assert_eq!(driver.cycle().committed, 1);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot[0].energy(Component::Graphics), 7.0);
    assert_eq!(snapshot[1].energy(Component::Graphics), 0.0);
}

#[test]
fn test_gpu_ignores_targets_without_graphics() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    ctx.registry()
        .add_target("idle", vec![10], Component::Processor)
        .unwrap();

    let sensors = FixedSensors::graphics(vec![Ok(5)]);
    let mut driver = MonitorDriver::new(GpuMonitor::new(Box::new(sensors)), Arc::clone(&ctx));
    assert_eq!(driver.cycle().produced, 0);
    assert_eq!(ctx.registry().totals().gpu, 0.0);
}

// ============================================================================
// Storage
// ============================================================================

#[test]
fn test_storage_energy_goes_to_first_tracked_target() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("shell", vec![1], Component::Processor).unwrap();
    registry.add_target("backup", vec![2], Component::Storage).unwrap();

    let counters = FakeCounters::default();
    counters.set_rate(2, 5.6e9, 0.0);

    let signal = ShutdownSignal::new();
    let poll = PollContext {
        interval: Duration::from_secs(1),
        shutdown: &signal,
    };

    let mut monitor = StorageMonitor::new(Box::new(counters.clone()));
    let deltas = monitor.poll_once(&registry.snapshot(), &poll);
    assert_eq!(deltas.len(), 1);
    for delta in &deltas {
        assert!(registry.commit(delta));
    }

    let snapshot = registry.snapshot();
    assert!((snapshot[0].energy(Component::Storage) - 2.2).abs() < 1e-9);
    assert_eq!(snapshot[1].energy(Component::Storage), 0.0);
}

#[test]
fn test_storage_failing_instance_does_not_block_others() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("db", vec![1], Component::Storage).unwrap();
    registry.add_target("crashed", vec![2], Component::Storage).unwrap();

    let counters = FakeCounters::default();
    counters.set_rate(1, 0.0, 5.3e9);
    counters.set_failure(2);

    let signal = ShutdownSignal::new();
    let poll = PollContext {
        interval: Duration::from_millis(500),
        shutdown: &signal,
    };

    let mut monitor = StorageMonitor::new(Box::new(counters.clone()));
    let deltas = monitor.poll_once(&registry.snapshot(), &poll);

    // The whole cache is collected once per target; the failing instance
    // never yields a delta
    assert_eq!(deltas.len(), 2);
    assert!(deltas.iter().all(|d| (d.joules - 1.1).abs() < 1e-9));
    assert_eq!(monitor.cached_instances(), 2);
    assert_eq!(counters.registrations.lock().len(), 2);
}

#[test]
fn test_storage_cache_grows_without_eviction() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("a", vec![1], Component::Storage).unwrap();
    registry.add_target("b", vec![2], Component::Storage).unwrap();

    let counters = FakeCounters::default();
    counters.set_rate(1, 1.0, 1.0);
    counters.set_rate(2, 1.0, 1.0);

    let mut driver = MonitorDriver::new(
        StorageMonitor::new(Box::new(counters.clone())),
        Arc::clone(&ctx),
    );
    driver.cycle();
    assert_eq!(driver.monitor().cached_instances(), 2);

    registry.remove_target(1).unwrap();
    driver.cycle();
    assert_eq!(driver.monitor().cached_instances(), 2);
}

#[test]
fn test_storage_eviction_drops_removed_pids() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("a", vec![1], Component::Storage).unwrap();
    registry.add_target("b", vec![2], Component::Storage).unwrap();

    let counters = FakeCounters::default();
    counters.set_rate(1, 1.0, 1.0);
    counters.set_rate(2, 1.0, 1.0);

    let mut driver = MonitorDriver::new(
        StorageMonitor::new(Box::new(counters.clone())).with_eviction(true),
        Arc::clone(&ctx),
    );
    driver.cycle();
    assert_eq!(driver.monitor().cached_instances(), 2);

    registry.remove_target(1).unwrap();
    driver.cycle();
    assert_eq!(driver.monitor().cached_instances(), 1);
}

// ============================================================================
// Network
// ============================================================================

#[test]
fn test_network_filters_rows_and_isolates_failures() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    let registry = ctx.registry();
    registry.add_target("browser", vec![7], Component::Network).unwrap();

    let remote = Ipv4Addr::new(93, 184, 216, 34);
    let table = vec![
        tcp_row(7, remote, 443, TcpState::Established),
        tcp_row(7, remote, 80, TcpState::Other(2)),
        tcp_row(7, Ipv4Addr::LOCALHOST, 8080, TcpState::Established),
        tcp_row(7, remote, 9999, TcpState::Established),
        tcp_row(99, remote, 22, TcpState::Established),
    ];

    let mut counts = HashMap::new();
    for port in [443, 80, 8080, 22] {
        counts.insert(
            port,
            TcpByteCounts {
                bytes_in: 300_000,
                bytes_out: 0,
            },
        );
    }

    let enabled = Arc::new(Mutex::new(Vec::new()));
    let mut monitor = NetworkMonitor::new(Box::new(FakeTcp {
        table,
        counts,
        enabled: Arc::clone(&enabled),
    }));

    let signal = ShutdownSignal::new();
    let poll = PollContext {
        interval: Duration::from_secs(1),
        shutdown: &signal,
    };
    let deltas = monitor.poll_once(&registry.snapshot(), &poll);

    // Only the established remote row with readable stats counts
    assert_eq!(deltas.len(), 1);
    assert_eq!(*enabled.lock(), vec![443, 9999]);

    assert!(registry.commit(&deltas[0]));
    assert!((registry.totals().nic - 1.138).abs() < 1e-9);
}

#[test]
fn test_network_without_targets_reads_nothing() {
    let ctx = Arc::new(MonitoringContext::in_memory(1).unwrap());
    ctx.registry()
        .add_target("editor", vec![7], Component::Processor)
        .unwrap();

    let enabled = Arc::new(Mutex::new(Vec::new()));
    let tcp = FakeTcp {
        table: vec![tcp_row(7, Ipv4Addr::new(1, 1, 1, 1), 443, TcpState::Established)],
        counts: HashMap::new(),
        enabled: Arc::clone(&enabled),
    };

    let mut driver = MonitorDriver::new(NetworkMonitor::new(Box::new(tcp)), Arc::clone(&ctx));
    assert_eq!(driver.cycle().produced, 0);
    assert!(enabled.lock().is_empty());
}
