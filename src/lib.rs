//! # pnm-core
//!
//! Access-limited percolation for pore network models: drainage and
//! mercury-intrusion capillary pressure curves.
//!
//! ---
//!
//! ## What it computes
//!
//! A porous medium is a graph: **pores** (voids) joined by **throats**
//! (constrictions). Each throat has an invasion threshold, the capillary
//! pressure a non-wetting fluid needs to push through it. Raise the applied
//! pressure step by step and the invading fluid advances, but only through
//! a connected path from the inlet face:
//! > "Cheap is not enough. It also has to be reachable."
//!
//! A throat whose threshold is met but which sits behind an expensive
//! neighbour waits (*pending*) until that neighbour gives way, then the whole
//! waiting region is invaded at once. A union-find forest with one virtual
//! inlet root makes that bookkeeping near O(1) per throat.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! Topology → Network ──────────────┐
//!                                   ├─→ Drainage ─→ InvasionRecord ─→ CapillaryCurve
//! PropertyStore → ThresholdTable ──┘        ↑              ↓
//!       ↑                             ClusterForest   states_at (trapping)
//!   ModelGraph
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`network`] | [`Network`], [`Topology`] | Validated, immutable CSR graph of pores and throats |
//! | [`properties`] | [`PropertyStore`] | Explicit named property arrays with gaps |
//! | [`models`] | [`ModelGraph`], [`PropertyModel`] | Dependency-ordered derived properties |
//! | [`threshold`] | [`ThresholdTable`], [`Phase`] | Washburn entry pressures, computed once |
//! | [`cluster`] | [`ClusterForest`] | Union-find with a virtual inlet root and pending members |
//! | [`drainage`] | [`Drainage`], [`RunConfig`] | The invasion state machine |
//! | [`record`] | [`InvasionRecord`] | Immutable run history and occupancy queries |
//! | [`curve`] | [`CapillaryCurve`] | Pressure/saturation curve and pore-size distribution |
//! | [`snapshot`] | [`snapshot::DrainageSnapshot`] | Serialisable run summary (requires `serde` feature) |
//!
//! ## Example
//!
//! ```rust
//! use pnm_core::{CapillaryCurve, Drainage, ElementVolumes, Network, RunConfig, ThresholdTable, Topology};
//!
//! // A ── B ── C, A is the inlet
//! let net = Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0)).unwrap();
//! let table = ThresholdTable::from_values(vec![10.0, 20.0]);
//! let config = RunConfig::explicit(vec![5.0, 10.0, 15.0, 20.0]);
//!
//! let record = Drainage::new(&net, &table, config).run().unwrap();
//! let curve = CapillaryCurve::assemble(&record, &ElementVolumes::pores_only(vec![1.0; 3]));
//! assert_eq!(curve.saturations().last(), Some(&1.0));
//! ```
//!
//! ## Logging
//!
//! Runs emit [`tracing`] events (`info` on start and completion, `debug` per
//! step, `warn` per degraded element). The crate never installs a subscriber.
//!
//! ## Features
//!
//! - `serde`: serialisation for configuration, records and [`snapshot`].
//! - `python-ffi`: PyO3 bindings (`ffi`).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod network;
pub mod properties;
pub mod models;
pub mod threshold;
pub mod cluster;
pub mod drainage;
pub mod record;
pub mod curve;
#[cfg(feature = "serde")]
pub mod snapshot;

#[cfg(feature = "python-ffi")]
pub mod ffi;

// ─── Re-exports ──────────────────────────────────────────────────────────────

pub use error::{BoundaryDefect, Diagnostic, PnmError, Result, TopologyDefect};
pub use network::{BoundaryRole, Element, Network, PoreId, ThroatId, Topology};
pub use properties::{Location, PropertyStore, PropertyValues};
pub use models::{ModelGraph, PropertyModel};
pub use threshold::{washburn, washburn_radius, Capillary, Phase, ThresholdTable};
pub use cluster::{Cluster, ClusterForest};
pub use drainage::{Drainage, PressureSampling, RunConfig, RunState, StepProgress};
pub use record::{InvasionEvent, InvasionRecord, InvasionState};
pub use curve::{CapillaryCurve, CurvePoint, ElementVolumes};
