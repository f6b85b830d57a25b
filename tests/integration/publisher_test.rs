// PUBLISHER TESTS
// ===============
// Every committed delta republishes the aggregate record.

use std::sync::Arc;

use ecofloc::core::energy::{EnergyDelta, MemoryPublisher, SharedEnergyRecord};
use ecofloc::{Component, TargetRegistry};

#[test]
fn test_publisher_sees_sums_after_each_commit() {
    let publisher = Arc::new(MemoryPublisher::new());
    let registry = TargetRegistry::new(publisher.clone());
    registry.add_target("a", vec![1], Component::Processor).unwrap();
    registry.add_target("b", vec![2], Component::Graphics).unwrap();

    assert!(publisher.latest().is_none());

    registry.commit(&EnergyDelta::owner(&[1], Component::Processor, 1.5));
    registry.commit(&EnergyDelta::owner(&[2], Component::Graphics, 4.0));
    registry.commit(&EnergyDelta::first_tracked(Component::Network, 0.5));

    let latest = publisher.latest().unwrap();
    assert_eq!(latest.cpu_energy, 1.5);
    assert_eq!(latest.gpu_energy, 4.0);
    assert_eq!(latest.sd_energy, 0.0);
    assert_eq!(latest.nic_energy, 0.5);
    assert!(latest.timestamp_ms > 0);
    assert_eq!(publisher.writes(), 3);
}

#[test]
fn test_rejected_delta_is_not_published() {
    let publisher = Arc::new(MemoryPublisher::new());
    let registry = TargetRegistry::new(publisher.clone());
    registry.add_target("a", vec![1], Component::Processor).unwrap();

    assert!(!registry.commit(&EnergyDelta::owner(&[1], Component::Processor, f64::NAN)));
    assert!(!registry.commit(&EnergyDelta::owner(&[9], Component::Processor, 1.0)));
    assert_eq!(publisher.writes(), 0);
}

#[test]
fn test_published_timestamps_do_not_go_backwards() {
    let publisher = Arc::new(MemoryPublisher::new());
    let registry = TargetRegistry::new(publisher.clone());
    registry.add_target("a", vec![1], Component::Storage).unwrap();

    let mut last = 0;
    for _ in 0..5 {
        registry.commit(&EnergyDelta::first_tracked(Component::Storage, 0.1));
        let record = publisher.latest().unwrap();
        assert!(record.timestamp_ms >= last);
        last = record.timestamp_ms;
    }
}

#[test]
fn test_record_wire_image() {
    let record = SharedEnergyRecord {
        cpu_energy: 1.25,
        gpu_energy: 2.5,
        sd_energy: 0.0,
        nic_energy: 8.0,
        timestamp_ms: 1_700_000_000_000,
    };
    let bytes = record.to_bytes();

    assert_eq!(bytes.len(), SharedEnergyRecord::SIZE);
    assert_eq!(SharedEnergyRecord::SIZE, 40);
    assert_eq!(&bytes[8..16], &2.5f64.to_le_bytes());
    assert_eq!(&bytes[16..24], &0.0f64.to_le_bytes());
    assert_eq!(&bytes[32..40], &1_700_000_000_000i64.to_le_bytes());
}

#[cfg(unix)]
#[test]
fn test_registry_writes_through_shared_segment() {
    use ecofloc::platform::SharedMemoryPublisher;

    let name = format!("/ecofloc_it_{}", std::process::id());
    let publisher = Arc::new(SharedMemoryPublisher::create(&name).unwrap());
    assert_eq!(publisher.read(), SharedEnergyRecord::default());

    let registry = TargetRegistry::new(publisher.clone());
    registry.add_target("a", vec![1], Component::Processor).unwrap();
    registry.commit(&EnergyDelta::owner(&[1], Component::Processor, 3.0));
    registry.commit(&EnergyDelta::first_tracked(Component::Storage, 0.75));

    let record = publisher.read();
    assert_eq!(record.cpu_energy, 3.0);
    assert_eq!(record.sd_energy, 0.75);
    assert!(record.timestamp_ms > 0);
}
