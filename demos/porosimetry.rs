//! # Mercury Intrusion Porosimetry Simulation
//!
//! Builds a 20×20 square lattice with scattered throat sizes, derives Washburn
//! entry pressures and volumes through the model graph, intrudes mercury from
//! the left face and prints the capillary pressure curve and the apparent
//! pore-size distribution.
//!
//! ```bash
//! RUST_LOG=pnm_core=debug cargo run --example porosimetry
//! ```

use pnm_core::models::{CylinderVolume, RadiusFromDiameter, SphereVolume, WashburnEntryPressure};
use pnm_core::{
    Capillary, CapillaryCurve, Drainage, ElementVolumes, Location, ModelGraph, Network, Phase,
    PropertyStore, RunConfig, ThresholdTable, Topology,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NX: u32 = 20;
const NY: u32 = 20;
const SPACING: f64 = 4.0e-5;

// ── Network ──────────────────────────────────────────────────────────────────

fn lattice() -> Topology {
    let mut topo = Topology::new((NX * NY) as usize);
    for y in 0..NY {
        for x in 0..NX {
            let p = y * NX + x;
            if x + 1 < NX {
                topo = topo.throat(p, p + 1);
            }
            if y + 1 < NY {
                topo = topo.throat(p, p + NX);
            }
        }
        topo = topo.inlet(y * NX).outlet(y * NX + NX - 1);
    }
    topo
}

/// Log-uniform sample in `[lo, hi]`.
fn log_uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    rng.gen_range(lo.ln()..=hi.ln()).exp()
}

// ── Display ──────────────────────────────────────────────────────────────────

fn bar(v: f64) -> String {
    let filled = (v * 30.0).round() as usize;
    let empty = 30usize.saturating_sub(filled);
    format!("[{}{}] {:.3}", "█".repeat(filled), "░".repeat(empty), v)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║  Mercury intrusion into a {NX}×{NY} pore lattice                          ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝\n");

    let net = Network::from_topology(&lattice())?;
    let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);

    let mut store = PropertyStore::for_network(&net);
    let capillary = Capillary::default();
    Phase::MERCURY.write_to(&mut store, &capillary)?;
    let throat_d: Vec<f64> = net.throats().map(|_| log_uniform(&mut rng, 2e-7, 2e-5)).collect();
    let pore_d: Vec<f64> = net.pores().map(|_| log_uniform(&mut rng, 2e-5, 3.5e-5)).collect();
    store.set_values("throat.diameter", throat_d)?;
    store.set_values("pore.diameter", pore_d)?;
    store.set_uniform("throat.length", SPACING / 2.0)?;

    let mut models = ModelGraph::new();
    models
        .add(RadiusFromDiameter::new(Location::Throat))?
        .add(WashburnEntryPressure::new(Location::Throat, &capillary))?
        .add(SphereVolume)?
        .add(CylinderVolume)?;
    let diagnostics = models.regenerate(&mut store)?;
    println!("models: {models:?} ({} diagnostics)", diagnostics.len());

    let (table, _) = ThresholdTable::from_property(&net, &store, "throat.entry_pressure");
    if let Some((lo, hi)) = table.finite_range() {
        println!("entry pressures: {:.3e} .. {:.3e} Pa\n", lo, hi);
    }

    let record = Drainage::new(&net, &table, RunConfig::count(25)).run()?;
    let (volumes, _) = ElementVolumes::from_properties(&net, &store);
    let curve = CapillaryCurve::assemble(&record, &volumes);

    println!("── Capillary pressure curve ──");
    println!("{:>12}  saturation", "P [Pa]");
    for point in curve.points() {
        println!("{:>12.4e}  {}", point.pressure, bar(point.saturation));
    }
    match record.breakthrough_pressure() {
        Some(p) => println!("\nbreakthrough at {p:.4e} Pa"),
        None => println!("\nno breakthrough"),
    }

    println!("\n── Apparent pore-size distribution ──");
    println!("{:>12}  {:>14}  dV/dln r", "r [m]", "V [m³]");
    let bins = curve.pore_size_distribution(&Phase::MERCURY);
    let peak = bins.iter().map(|b| b.differential).fold(0.0, f64::max);
    for bin in &bins {
        let rel = if peak > 0.0 { bin.differential / peak } else { 0.0 };
        println!(
            "{:>12.3e}  {:>14.4e}  {}",
            bin.radius,
            bin.cumulative_volume,
            bar(rel)
        );
    }
    Ok(())
}
