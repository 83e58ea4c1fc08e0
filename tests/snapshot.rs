//! Snapshot round trips through JSON.
//!
//! Tests are run with `cargo test --features serde`.

#![cfg(feature = "serde")]

use pnm_core::snapshot::{DrainageSnapshot, SNAPSHOT_VERSION};
use pnm_core::{
    BoundaryRole, CapillaryCurve, Drainage, ElementVolumes, Network, RunConfig, ThresholdTable,
    Topology,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn ladder() -> (Network, ThresholdTable) {
    // 0 1 2
    // | | |
    // 3 4 5   inlets on the left, outlets on the right
    let topo = Topology::new(6)
        .throat(0, 1)
        .throat(1, 2)
        .throat(3, 4)
        .throat(4, 5)
        .throat(0, 3)
        .throat(1, 4)
        .throat(2, 5)
        .inlet(0)
        .inlet(3)
        .outlet(2)
        .outlet(5);
    let net = Network::from_topology(&topo).unwrap();
    let table =
        ThresholdTable::from_values(vec![4.0, 9.0, 6.0, 2.0, 1.0, 3.0, f64::INFINITY]);
    (net, table)
}

// ─── tests ───────────────────────────────────────────────────────────────────

#[test]
fn test_snapshot_json_restores_record() {
    let (net, table) = ladder();
    let record = Drainage::new(&net, &table, RunConfig::default()).run().unwrap();
    let curve = CapillaryCurve::assemble(&record, &ElementVolumes::pores_only(vec![1.0; 6]));
    let outlets = net.boundary_pores(BoundaryRole::Outlet);

    let snapshot = DrainageSnapshot::from_run(&record, Some(&curve), outlets);
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: DrainageSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.version, SNAPSHOT_VERSION);
    assert_eq!(restored, snapshot);
    assert_eq!(restored.to_record(), record);
    assert_eq!(
        restored.to_record().breakthrough_pressure(),
        record.breakthrough_pressure()
    );
    let last = restored.steps.last().unwrap();
    assert_eq!(last.saturation, Some(1.0));
}

#[test]
fn test_config_serialises() {
    let config = RunConfig::explicit(vec![1.0, 2.0]).until_breakthrough();
    let json = serde_json::to_string(&config).unwrap();
    let back: RunConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let topo = Topology::new(2).throat(0, 1).inlet(0);
    let back: Topology = serde_json::from_str(&serde_json::to_string(&topo).unwrap()).unwrap();
    assert_eq!(back, topo);
}
