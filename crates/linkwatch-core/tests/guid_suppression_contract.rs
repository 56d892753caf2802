//! Contract Test: GUID Name Suppression
//!
//! Constraints verified:
//! - With suppression on, GUID-named adapters reach no listener
//! - Retained state is updated for GUID-named adapters either way
//! - Suppression can be toggled at runtime
//! - Only the adapter name is inspected
//!
//! If this test fails, consumers see events for the virtual adapters that
//! hypervisors and VPN clients register under GUID names.

mod common;

use common::*;
use linkwatch_core::{
    InterfaceEventKind, InterfaceSnapshot, ManualChangeSignal, MemoryInterfaceSource, OperStatus,
};

#[tokio::test]
async fn guid_named_adapter_is_withheld_but_tracked() {
    let source = MemoryInterfaceSource::new();
    let reconciler = reconciler(&source).await;
    let recorder = EventRecorder::attach(&reconciler);

    source.upsert(nic("10", GUID_NAME, OperStatus::Up));
    let report = reconciler.reconcile().await.unwrap();

    assert_eq!(recorder.len(), 0);
    assert_eq!(report.suppressed, 2);
    assert!(report.events.is_empty());
    assert!(!report.is_quiet());
    assert_eq!(
        reconciler.interface("10").unwrap().status(),
        OperStatus::Up
    );

    source.remove("10");
    let report = reconciler.reconcile().await.unwrap();
    assert_eq!(report.suppressed, 1);
    assert_eq!(
        reconciler.interface("10").unwrap().status(),
        OperStatus::Down
    );
}

#[tokio::test]
async fn guid_embedded_in_a_longer_name_is_withheld() {
    let source = MemoryInterfaceSource::new();
    let reconciler = reconciler(&source).await;
    let recorder = EventRecorder::attach(&reconciler);

    let name = "vEthernet 3f2504e0-4f89-11d3-9a0c-0305e82c3301 #2";
    source.upsert(nic("11", name, OperStatus::Up));
    reconciler.reconcile().await.unwrap();

    assert_eq!(recorder.len(), 0);
}

#[tokio::test]
async fn suppression_off_delivers_everything() {
    let source = MemoryInterfaceSource::new();
    let signal = ManualChangeSignal::new();
    let reconciler = reconciler_with(&source, &signal, false).await;
    let recorder = EventRecorder::attach(&reconciler);
    assert!(!reconciler.suppress_guid_named_adapters());

    source.upsert(nic("10", GUID_NAME, OperStatus::Down));
    let report = reconciler.reconcile().await.unwrap();

    assert_eq!(report.suppressed, 0);
    assert_eq!(
        recorder.kinds(),
        vec![
            (InterfaceEventKind::Discovered, "10".to_string()),
            (InterfaceEventKind::Disconnected, "10".to_string()),
        ]
    );
}

#[tokio::test]
async fn toggle_takes_effect_on_the_next_pass() {
    let source = MemoryInterfaceSource::with_interfaces([nic("10", GUID_NAME, OperStatus::Up)]);
    let reconciler = reconciler(&source).await;
    let recorder = EventRecorder::attach(&reconciler);

    source.set_status("10", OperStatus::Down);
    reconciler.reconcile().await.unwrap();
    assert_eq!(recorder.len(), 0);

    reconciler.set_suppress_guid_named_adapters(false);
    source.set_status("10", OperStatus::Up);
    reconciler.reconcile().await.unwrap();
    assert_eq!(
        recorder.kinds(),
        vec![(InterfaceEventKind::Connected, "10".to_string())]
    );

    reconciler.set_suppress_guid_named_adapters(true);
    source.set_status("10", OperStatus::Down);
    reconciler.reconcile().await.unwrap();
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn only_the_name_is_inspected() {
    let source = MemoryInterfaceSource::new();
    let reconciler = reconciler(&source).await;
    let recorder = EventRecorder::attach(&reconciler);

    source.upsert(InterfaceSnapshot::new(
        GUID_NAME,
        "eth0",
        GUID_NAME,
        OperStatus::Up,
    ));
    source.upsert(nic("12", GUID_NAME, OperStatus::Up));
    let report = reconciler.reconcile().await.unwrap();

    assert_eq!(report.events.len(), 2);
    assert_eq!(report.suppressed, 2);
    assert!(recorder.events().iter().all(|(_, nic)| nic.name() == "eth0"));
}
