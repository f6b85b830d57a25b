// SNAPSHOT ISOLATION TESTS
// ========================
// Monitors work on private copies; commits resolve targets by pid.

use std::sync::Arc;
use std::thread;

use ecofloc::core::energy::EnergyDelta;
use ecofloc::{Component, MonitoringContext};

#[test]
fn test_snapshot_is_unaffected_by_later_changes() {
    let ctx = MonitoringContext::in_memory(100).unwrap();
    let registry = ctx.registry();
    registry.add_target("a", vec![1], Component::Processor).unwrap();

    let snapshot = registry.snapshot();
    registry.commit(&EnergyDelta::owner(&[1], Component::Processor, 2.0));
    registry.enable_component(0, Component::Network).unwrap();
    registry.add_target("b", vec![2], Component::Processor).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].energy(Component::Processor), 0.0);
    assert!(!snapshot[0].is_enabled(Component::Network));
}

#[test]
fn test_delta_from_stale_snapshot_follows_pid() {
    let ctx = MonitoringContext::in_memory(100).unwrap();
    let registry = ctx.registry();
    registry.add_target("a", vec![1], Component::Processor).unwrap();
    registry.add_target("b", vec![2, 3], Component::Processor).unwrap();

    let stale = registry.snapshot();
    registry.remove_target(0).unwrap();

    // Computed against line 1 of the stale view, which is now line 0
    let delta = EnergyDelta::owner(stale[1].pids(), Component::Processor, 1.0);
    assert!(registry.commit(&delta));
    assert_eq!(registry.snapshot()[0].energy(Component::Processor), 1.0);

    // The removed target is gone; its delta lands nowhere
    let orphan = EnergyDelta::owner(stale[0].pids(), Component::Processor, 1.0);
    assert!(!registry.commit(&orphan));
    assert_eq!(registry.totals().cpu, 1.0);
}

#[test]
fn test_concurrent_commits_keep_totals_monotonic() {
    let ctx = Arc::new(MonitoringContext::in_memory(100).unwrap());
    ctx.registry()
        .add_target("a", vec![1], Component::Processor)
        .unwrap();

    let writers: Vec<_> = Component::ALL
        .into_iter()
        .map(|component| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..200 {
                    ctx.registry()
                        .commit(&EnergyDelta::first_tracked(component, 0.5));
                }
            })
        })
        .collect();

    let mut last = 0.0;
    for _ in 0..200 {
        let total = ctx.registry().totals().total();
        assert!(total >= last);
        last = total;
    }

    for writer in writers {
        writer.join().unwrap();
    }

    let totals = ctx.registry().totals();
    assert_eq!(totals.cpu, 100.0);
    assert_eq!(totals.gpu, 100.0);
    assert_eq!(totals.sd, 100.0);
    assert_eq!(totals.nic, 100.0);
}
