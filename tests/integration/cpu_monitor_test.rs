// PROCESSOR MONITOR TESTS
// =======================
// Drives the processor monitor through the shared driver with scripted
// sensors and processor times.

use std::sync::Arc;

use super::fakes::{FixedSensors, ScriptedTimes};
use ecofloc::core::config::CpuProfile;
use ecofloc::core::energy::monitors::cpu::PowerStrategy;
use ecofloc::core::energy::monitors::CpuMonitor;
use ecofloc::core::energy::MonitorDriver;
use ecofloc::{Component, MonitoringContext};

fn context_with_target(interval_ms: u64) -> Arc<MonitoringContext> {
    let ctx = Arc::new(MonitoringContext::in_memory(interval_ms).unwrap());
    ctx.registry()
        .add_target("worker", vec![4242], Component::Processor)
        .unwrap();
    ctx
}

#[test]
fn test_direct_power_cycle_commits_energy() {
    let ctx = context_with_target(20);
    let monitor = CpuMonitor::new(
        Box::new(FixedSensors::direct(vec![7.5, 7.5])),
        Box::new(ScriptedTimes::new(&[0, 200], &[0, 100])),
        None,
    )
    .unwrap();
    assert_eq!(monitor.strategy(), PowerStrategy::Direct);

    let mut driver = MonitorDriver::new(monitor, Arc::clone(&ctx));
    let report = driver.cycle();
    assert_eq!(report.committed, 1);

    // 15 W at 50% usage over 20 ms
    let cpu = ctx.registry().snapshot()[0].energy(Component::Processor);
    assert!((cpu - 0.15).abs() < 1e-9, "got {}", cpu);
}

#[test]
fn test_inconsistent_times_commit_nothing() {
    let ctx = context_with_target(5);
    let monitor = CpuMonitor::new(
        Box::new(FixedSensors::direct(vec![10.0])),
        Box::new(ScriptedTimes::new(&[0, 100], &[0, 120])),
        None,
    )
    .unwrap();

    let mut driver = MonitorDriver::new(monitor, Arc::clone(&ctx));
    let report = driver.cycle();
    assert_eq!(report.produced, 0);
    assert_eq!(ctx.registry().totals().cpu, 0.0);
}

#[test]
fn test_missing_times_skip_the_target() {
    let ctx = context_with_target(5);
    let monitor = CpuMonitor::new(
        Box::new(FixedSensors::direct(vec![10.0])),
        Box::new(ScriptedTimes::new(&[], &[])),
        None,
    )
    .unwrap();

    let mut driver = MonitorDriver::new(monitor, Arc::clone(&ctx));
    assert_eq!(driver.cycle().produced, 0);
}

#[test]
fn test_derived_mode_requires_profile() {
    let result = CpuMonitor::new(
        Box::new(FixedSensors::derived(vec![3.5e9], vec![1.2])),
        Box::new(ScriptedTimes::new(&[], &[])),
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_derived_mode_with_profile() {
    let profile = CpuProfile {
        tdp: 65.0,
        clock_speed: 3.5e9,
        voltage: 1.2,
    };
    let monitor = CpuMonitor::new(
        Box::new(FixedSensors::derived(vec![3.5e9, 3.5e9], vec![1.2, 1.2])),
        Box::new(ScriptedTimes::new(&[0, 100], &[0, 100])),
        Some(profile),
    )
    .unwrap();
    assert!(matches!(monitor.strategy(), PowerStrategy::Derived { .. }));

    let ctx = context_with_target(10);
    let mut driver = MonitorDriver::new(monitor, Arc::clone(&ctx));
    assert_eq!(driver.cycle().committed, 1);
    assert!(ctx.registry().totals().cpu > 0.0);
}

#[test]
fn test_shutdown_interrupts_measurement() {
    let ctx = context_with_target(60_000);
    let monitor = CpuMonitor::new(
        Box::new(FixedSensors::direct(vec![10.0])),
        Box::new(ScriptedTimes::new(&[0, 100], &[0, 50])),
        None,
    )
    .unwrap();

    ctx.shutdown().trigger();
    let mut driver = MonitorDriver::new(monitor, Arc::clone(&ctx));
    assert_eq!(driver.cycle().produced, 0);
    assert_eq!(ctx.registry().totals().cpu, 0.0);
}
