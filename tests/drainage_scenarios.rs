//! End-to-end drainage scenarios: access limitation, monotonicity,
//! determinism, sampling and the capillary curve.

use std::collections::VecDeque;

use pnm_core::{
    BoundaryDefect, CapillaryCurve, Drainage, Element, ElementVolumes, InvasionRecord,
    InvasionState, Network, PnmError, PoreId, RunConfig, ThresholdTable, ThroatId, Topology,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// `nx × ny` square lattice; left column inlets, right column outlets.
fn lattice(nx: u32, ny: u32) -> Topology {
    let mut topo = Topology::new((nx * ny) as usize);
    for y in 0..ny {
        for x in 0..nx {
            let p = y * nx + x;
            if x + 1 < nx {
                topo = topo.throat(p, p + 1);
            }
            if y + 1 < ny {
                topo = topo.throat(p, p + nx);
            }
        }
        topo = topo.inlet(y * nx).outlet(y * nx + nx - 1);
    }
    topo
}

/// Deterministic scattered thresholds in `[1, levels]`.
fn scattered(n: usize, levels: u64) -> Vec<f64> {
    (0..n as u64)
        .map(|i| ((i.wrapping_mul(2_654_435_761) >> 7) % levels + 1) as f64)
        .collect()
}

/// A(0) inlet, T0 = A–B at 10, T1 = B–C at 20, C outlet.
fn abc() -> (Network, ThresholdTable) {
    let net = Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0).outlet(2))
        .unwrap();
    (net, ThresholdTable::from_values(vec![10.0, 20.0]))
}

/// Elements reachable from the baseline through elements invaded at `pressure`.
fn reachable(net: &Network, record: &InvasionRecord, pressure: f64) -> (Vec<bool>, Vec<bool>) {
    let occ = record.occupancy_at(pressure);
    let mut pores = vec![false; net.num_pores()];
    let mut throats = vec![false; net.num_throats()];
    let mut queue: VecDeque<PoreId> = record.baseline().iter().copied().collect();
    for p in record.baseline() {
        pores[p.index()] = true;
    }
    while let Some(p) = queue.pop_front() {
        for (t, q) in net.adjacent_pores(p) {
            if !occ.throats[t.index()] {
                continue;
            }
            throats[t.index()] = true;
            if occ.pores[q.index()] && !pores[q.index()] {
                pores[q.index()] = true;
                queue.push_back(q);
            }
        }
    }
    (pores, throats)
}

fn run(net: &Network, table: &ThresholdTable, config: RunConfig) -> InvasionRecord {
    Drainage::new(net, table, config).run().unwrap()
}

// ─── scenarios ───────────────────────────────────────────────────────────────

#[test]
fn test_abc_scenario() {
    let (net, table) = abc();
    let record = run(&net, &table, RunConfig::explicit(vec![5.0, 10.0, 15.0, 20.0]));

    assert_eq!(record.invaded_at(5.0), vec![Element::Pore(PoreId(0))]);
    assert_eq!(
        record.invaded_at(10.0),
        vec![
            Element::Pore(PoreId(0)),
            Element::Pore(PoreId(1)),
            Element::Throat(ThroatId(0)),
        ]
    );
    assert_eq!(record.invaded_at(20.0).len(), 5);
    assert!(record.events()[0].is_empty());
    assert!(record.events()[2].is_empty());
    assert_eq!(record.breakthrough_pressure(), Some(20.0));

    let curve = CapillaryCurve::assemble(&record, &ElementVolumes::pores_only(vec![1.0; 3]));
    let s = curve.saturations();
    assert_eq!(curve.pressures(), vec![5.0, 10.0, 15.0, 20.0]);
    assert_eq!(s[0], curve.initial().saturation);
    assert!(s[1] > s[0]);
    assert_eq!(s[2], s[1]);
    assert!(s[3] > s[2]);
    assert_eq!(s[3], 1.0);
}

#[test]
fn test_no_inlet_fails_before_any_state() {
    let topo = Topology::new(3).throat(0, 1).throat(1, 2).outlet(2);
    let net = Network::from_topology(&topo).unwrap();
    let table = ThresholdTable::from_values(vec![1.0, 2.0]);
    let mut drainage = Drainage::new(&net, &table, RunConfig::default());
    assert_eq!(
        drainage.start(),
        Err(PnmError::InvalidBoundaryCondition(BoundaryDefect::NoInlets))
    );
    assert!(drainage.events().is_empty());
    assert_eq!(drainage.pending_count(), 0);
}

#[test]
fn test_invaded_sets_grow_monotonically() {
    let net = Network::from_topology(&lattice(8, 6)).unwrap();
    let table = ThresholdTable::from_values(scattered(net.num_throats(), 40));
    let record = run(&net, &table, RunConfig::default());

    let mut previous = record.occupancy_at(f64::NEG_INFINITY);
    for event in record.events() {
        let occ = record.occupancy_at(event.pressure);
        for (was, now) in previous.pores.iter().zip(&occ.pores) {
            assert!(!was || *now, "pore left the invaded set at {}", event.pressure);
        }
        for (was, now) in previous.throats.iter().zip(&occ.throats) {
            assert!(!was || *now, "throat left the invaded set at {}", event.pressure);
        }
        previous = occ;
    }
}

#[test]
fn test_every_invaded_element_has_path_to_inlet() {
    let net = Network::from_topology(&lattice(10, 7)).unwrap();
    let table = ThresholdTable::from_values(scattered(net.num_throats(), 25));
    let record = run(&net, &table, RunConfig::count(12));

    for event in record.events() {
        let occ = record.occupancy_at(event.pressure);
        let (pores, throats) = reachable(&net, &record, event.pressure);
        assert_eq!(occ.pores, pores, "unreachable pore invaded at {}", event.pressure);
        assert_eq!(occ.throats, throats, "unreachable throat invaded at {}", event.pressure);
    }
}

#[test]
fn test_access_limitation_blocks_cheap_interior() {
    // 0 inlet ─(100)─ 1 ─(1)─ 2 ─(1)─ 3
    let net = Network::from_topology(
        &Topology::new(4).throat(0, 1).throat(1, 2).throat(2, 3).inlet(0),
    )
    .unwrap();
    let table = ThresholdTable::from_values(vec![100.0, 1.0, 1.0]);
    let record = run(&net, &table, RunConfig::default());
    for p in 1..4 {
        assert_eq!(record.pore_invasion_pressure(PoreId(p)), 100.0);
    }
    assert_eq!(record.throat_invasion_pressure(ThroatId(2)), 100.0);
    assert!(record.events()[0].is_empty());
}

#[test]
fn test_ties_resolve_independently_of_input_order() {
    let topo = lattice(6, 5);
    let thresholds = scattered(topo.throats.len(), 3);

    // Same network with the throat list reversed.
    let mut reversed = topo.clone();
    reversed.throats.reverse();
    let mut reversed_thresholds = thresholds.clone();
    reversed_thresholds.reverse();

    let a_net = Network::from_topology(&topo).unwrap();
    let b_net = Network::from_topology(&reversed).unwrap();
    let a_table = ThresholdTable::from_values(thresholds);
    let b_table = ThresholdTable::from_values(reversed_thresholds);
    let a = run(&a_net, &a_table, RunConfig::default());
    let b = run(&b_net, &b_table, RunConfig::default());

    let nt = a_net.num_throats() as u32;
    for p in a_net.pores() {
        assert_eq!(a.pore_invasion_pressure(p), b.pore_invasion_pressure(p));
    }
    for t in 0..nt {
        assert_eq!(
            a.throat_invasion_pressure(ThroatId(t)),
            b.throat_invasion_pressure(ThroatId(nt - 1 - t))
        );
    }
    // Repeating a run reproduces it exactly.
    assert_eq!(a, run(&a_net, &a_table, RunConfig::default()));
}

#[test]
fn test_saturation_bounded_and_nondecreasing() {
    // Lattice plus one pore hanging off nothing.
    let mut topo = lattice(5, 5);
    topo.num_pores += 1;
    let net = Network::from_topology(&topo).unwrap();
    let table = ThresholdTable::from_values(scattered(net.num_throats(), 50));
    let record = run(&net, &table, RunConfig::default());
    let volumes = ElementVolumes::pores_only(vec![1.0; net.num_pores()]);
    let curve = CapillaryCurve::assemble(&record, &volumes);

    let mut last = curve.initial().saturation;
    for s in curve.saturations() {
        assert!((0.0..=1.0).contains(&s));
        assert!(s >= last);
        last = s;
    }
    assert!(!record.fully_invaded());
    assert!(last < 1.0, "isolated pore must keep the curve below 1");
    assert!((last - 25.0 / 26.0).abs() < 1e-12);
}

#[test]
fn test_isolated_component_never_invaded() {
    // 0 inlet – 1;   2 – 3 – 4 disconnected, very cheap
    let net = Network::from_topology(
        &Topology::new(5).throat(0, 1).throat(2, 3).throat(3, 4).inlet(0),
    )
    .unwrap();
    let table = ThresholdTable::from_values(vec![50.0, 0.5, 0.5]);
    let record = run(&net, &table, RunConfig::default());
    for p in 2..5 {
        assert_eq!(record.pore_invasion_pressure(PoreId(p)), f64::INFINITY);
    }
    assert_eq!(record.throat_invasion_pressure(ThroatId(1)), f64::INFINITY);
    assert_eq!(record.pore_invasion_pressure(PoreId(1)), 50.0);
}

#[test]
fn test_coarse_sampling_attributes_to_next_sample() {
    let net = Network::from_topology(
        &Topology::new(4).throat(0, 1).throat(1, 2).throat(2, 3).inlet(0),
    )
    .unwrap();
    let table = ThresholdTable::from_values(vec![3.0, 7.0, 12.0]);
    let record = run(&net, &table, RunConfig::explicit(vec![5.0, 10.0, 15.0]));
    assert_eq!(record.throat_invasion_pressure(ThroatId(0)), 5.0);
    assert_eq!(record.throat_invasion_pressure(ThroatId(1)), 10.0);
    assert_eq!(record.throat_invasion_pressure(ThroatId(2)), 15.0);
}

#[test]
fn test_count_sampling_reaches_same_final_state() {
    let net = Network::from_topology(&lattice(7, 7)).unwrap();
    let table = ThresholdTable::from_values(scattered(net.num_throats(), 90));
    let fine = run(&net, &table, RunConfig::default());
    let coarse = run(&net, &table, RunConfig::count(6));
    assert_eq!(coarse.events().len(), 6);
    assert_eq!(
        fine.occupancy_at(f64::INFINITY),
        coarse.occupancy_at(f64::INFINITY)
    );
    // Coarse sampling can only delay an element, never advance it.
    for p in net.pores() {
        assert!(coarse.pore_invasion_pressure(p) >= fine.pore_invasion_pressure(p));
    }
}

#[test]
fn test_trapped_defending_fluid_is_reported() {
    // 0 inlet, 2 outlet; dead end 3 behind 1.
    //   0 ─(1)─ 1 ─(9)─ 2
    //           │
    //          (1)
    //           │
    //           3
    let net = Network::from_topology(
        &Topology::new(4).throat(0, 1).throat(1, 2).throat(1, 3).inlet(0).outlet(2),
    )
    .unwrap();
    let table = ThresholdTable::from_values(vec![1.0, 9.0, 50.0]);
    let record = run(&net, &table, RunConfig::explicit(vec![1.0, 9.0]));
    let states = record.states_at(&net, 9.0);
    assert_eq!(states.pores[2], InvasionState::Invaded);
    // Pore 3 only drains through pore 1, which is invaded.
    assert_eq!(states.pores[3], InvasionState::Trapped);
    assert_eq!(states.throats[2], InvasionState::Trapped);

    let before = record.states_at(&net, 0.0);
    assert_eq!(before.pores[3], InvasionState::Uninvaded);
}

#[test]
fn test_concurrent_runs_share_network_and_table() {
    let net = Network::from_topology(&lattice(9, 9)).unwrap();
    let table = ThresholdTable::from_values(scattered(net.num_throats(), 60));
    let left = net.boundary_pores(pnm_core::BoundaryRole::Inlet).to_vec();
    let right = net.boundary_pores(pnm_core::BoundaryRole::Outlet).to_vec();

    let (a, b) = std::thread::scope(|s| {
        let a = s.spawn(|| {
            Drainage::new(&net, &table, RunConfig::default())
                .with_inlets(&left)
                .run()
                .unwrap()
        });
        let b = s.spawn(|| {
            Drainage::new(&net, &table, RunConfig::default())
                .with_inlets(&right)
                .run()
                .unwrap()
        });
        (a.join().unwrap(), b.join().unwrap())
    });

    assert_eq!(a, run(&net, &table, RunConfig::default()));
    assert_eq!(
        b,
        Drainage::new(&net, &table, RunConfig::default())
            .with_inlets(&right)
            .run()
            .unwrap()
    );
    assert_eq!(b.baseline(), right.as_slice());
}

#[test]
fn test_run_with_reports_progress() {
    let (net, table) = abc();
    let mut seen = Vec::new();
    let record = Drainage::new(&net, &table, RunConfig::default())
        .run_with(|p| {
            seen.push((p.step, p.pressure, p.invaded_pores));
            true
        })
        .unwrap();
    assert_eq!(seen, vec![(0, 10.0, 1), (1, 20.0, 2)]);
    assert_eq!(record.events().len(), 2);
}
