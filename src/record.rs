//! Invasion record: the immutable output of a drainage run, and the query
//! layer built on top of it.
//!
//! The record is a baseline (the inlet pores, invaded before any pressure is
//! applied) followed by one [`InvasionEvent`] per pressure step, in increasing
//! pressure order. Per-element invasion pressures and step numbers are derived
//! from the events when the run completes.
//!
//! # Invariants
//!
//! - Every element appears in at most one event (or in the baseline).
//! - Event pressures are strictly increasing.
//! - Within an event, pores and throats are sorted by identity.

use crate::cluster::ClusterForest;
use crate::error::Diagnostic;
use crate::network::{BoundaryRole, Element, Network, PoreId, ThroatId};

/// Elements newly invaded at one pressure step.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvasionEvent {
    /// Applied pressure of the step.
    pub pressure: f64,
    /// Pores confirmed invaded at this step.
    pub pores: Vec<PoreId>,
    /// Throats confirmed invaded at this step.
    pub throats: Vec<ThroatId>,
}

impl InvasionEvent {
    /// Whether the step invaded nothing.
    pub fn is_empty(&self) -> bool {
        self.pores.is_empty() && self.throats.is_empty()
    }

    /// Pores and throats of this event as elements.
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.pores
            .iter()
            .map(|&p| Element::Pore(p))
            .chain(self.throats.iter().map(|&t| Element::Throat(t)))
    }
}

/// Occupancy of an element at a given pressure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvasionState {
    /// Holds defending fluid that can still escape.
    Uninvaded,
    /// Holds invading fluid.
    Invaded,
    /// Holds defending fluid cut off from every outlet.
    Trapped,
}

/// Invaded flags of every pore and throat at one pressure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupancy {
    /// Per pore.
    pub pores: Vec<bool>,
    /// Per throat.
    pub throats: Vec<bool>,
}

/// Three-way state of every pore and throat at one pressure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementStates {
    /// Per pore.
    pub pores: Vec<InvasionState>,
    /// Per throat.
    pub throats: Vec<InvasionState>,
}

/// Complete, immutable history of one drainage run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvasionRecord {
    baseline: Vec<PoreId>,
    events: Vec<InvasionEvent>,
    /// `-∞` for baseline pores, `+∞` for never-invaded ones.
    pore_pressure: Vec<f64>,
    throat_pressure: Vec<f64>,
    /// 0 for the baseline, `k` for the k-th step (1-based).
    pore_sequence: Vec<Option<u32>>,
    throat_sequence: Vec<Option<u32>>,
    outlets: Vec<PoreId>,
    diagnostics: Vec<Diagnostic>,
}

impl InvasionRecord {
    pub(crate) fn new(
        num_pores: usize,
        num_throats: usize,
        baseline: Vec<PoreId>,
        events: Vec<InvasionEvent>,
        outlets: Vec<PoreId>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut pore_pressure = vec![f64::INFINITY; num_pores];
        let mut throat_pressure = vec![f64::INFINITY; num_throats];
        let mut pore_sequence = vec![None; num_pores];
        let mut throat_sequence = vec![None; num_throats];
        for &p in &baseline {
            pore_pressure[p.index()] = f64::NEG_INFINITY;
            pore_sequence[p.index()] = Some(0);
        }
        for (k, event) in events.iter().enumerate() {
            let seq = Some(k as u32 + 1);
            for &p in &event.pores {
                pore_pressure[p.index()] = event.pressure;
                pore_sequence[p.index()] = seq;
            }
            for &t in &event.throats {
                throat_pressure[t.index()] = event.pressure;
                throat_sequence[t.index()] = seq;
            }
        }
        Self {
            baseline,
            events,
            pore_pressure,
            throat_pressure,
            pore_sequence,
            throat_sequence,
            outlets,
            diagnostics,
        }
    }

    /// Inlet pores, invaded before the first step.
    pub fn baseline(&self) -> &[PoreId] {
        &self.baseline
    }

    /// Pressure steps in increasing order.
    pub fn events(&self) -> &[InvasionEvent] {
        &self.events
    }

    /// Applied pressure of each step.
    pub fn pressures(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.pressure).collect()
    }

    /// Non-fatal conditions met while preparing and running.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of pores covered by the record.
    pub fn num_pores(&self) -> usize {
        self.pore_pressure.len()
    }

    /// Number of throats covered by the record.
    pub fn num_throats(&self) -> usize {
        self.throat_pressure.len()
    }

    /// Pressure at which `pore` was invaded; `-∞` for inlets, `+∞` if never
    /// or if the pore is outside the record.
    pub fn pore_invasion_pressure(&self, pore: PoreId) -> f64 {
        self.pore_pressure
            .get(pore.index())
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Pressure at which `throat` was invaded; `+∞` if never or if the throat
    /// is outside the record.
    pub fn throat_invasion_pressure(&self, throat: ThroatId) -> f64 {
        self.throat_pressure
            .get(throat.index())
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Pressure at which `element` was invaded.
    pub fn invasion_pressure(&self, element: Element) -> f64 {
        match element {
            Element::Pore(p) => self.pore_invasion_pressure(p),
            Element::Throat(t) => self.throat_invasion_pressure(t),
        }
    }

    /// Step number at which `element` was invaded (0 = baseline).
    pub fn sequence(&self, element: Element) -> Option<u32> {
        let seq = match element {
            Element::Pore(p) => self.pore_sequence.get(p.index()),
            Element::Throat(t) => self.throat_sequence.get(t.index()),
        };
        seq.copied().flatten()
    }

    /// Whether `element` holds invading fluid at `pressure`.
    pub fn is_invaded_at(&self, element: Element, pressure: f64) -> bool {
        self.invasion_pressure(element) <= pressure
    }

    /// Invaded flags at `pressure`.
    pub fn occupancy_at(&self, pressure: f64) -> Occupancy {
        Occupancy {
            pores: self.pore_pressure.iter().map(|&p| p <= pressure).collect(),
            throats: self.throat_pressure.iter().map(|&p| p <= pressure).collect(),
        }
    }

    /// Every element invaded at `pressure`, pores first, each sorted.
    pub fn invaded_at(&self, pressure: f64) -> Vec<Element> {
        let pores = self
            .pore_pressure
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p <= pressure)
            .map(|(i, _)| Element::Pore(PoreId(i as u32)));
        let throats = self
            .throat_pressure
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p <= pressure)
            .map(|(i, _)| Element::Throat(ThroatId(i as u32)));
        pores.chain(throats).collect()
    }

    /// Lowest pressure at which any outlet pore is invaded.
    pub fn breakthrough_pressure(&self) -> Option<f64> {
        self.outlets
            .iter()
            .map(|&p| self.pore_pressure[p.index()])
            .filter(|p| *p < f64::INFINITY)
            .min_by(f64::total_cmp)
    }

    /// Whether every pore and throat was invaded by the end of the run.
    pub fn fully_invaded(&self) -> bool {
        self.pore_pressure
            .iter()
            .chain(&self.throat_pressure)
            .all(|&p| p < f64::INFINITY)
    }

    /// Uninvaded / invaded / trapped state of every element at `pressure`.
    ///
    /// An uninvaded element is trapped when no path of uninvaded elements
    /// leads from it to an outlet. Without outlets nothing is trapped.
    pub fn states_at(&self, network: &Network, pressure: f64) -> ElementStates {
        let occ = self.occupancy_at(pressure);
        let outlets: Vec<PoreId> = network
            .boundary_pores(BoundaryRole::Outlet)
            .iter()
            .copied()
            .filter(|p| !occ.pores[p.index()])
            .collect();
        let track_trapping = !network.boundary_pores(BoundaryRole::Outlet).is_empty();

        // The forest's anchor root stands for "reaches an outlet" here.
        let mut defending = ClusterForest::new(network.num_pores(), &outlets);
        for t in network.throats() {
            let (a, b) = network.endpoints_of(t);
            if !occ.throats[t.index()] && !occ.pores[a.index()] && !occ.pores[b.index()] {
                defending.merge(a, b);
            }
        }

        let state = |invaded: bool, escapes: bool| {
            if invaded {
                InvasionState::Invaded
            } else if !track_trapping || escapes {
                InvasionState::Uninvaded
            } else {
                InvasionState::Trapped
            }
        };
        let pores = network
            .pores()
            .map(|p| state(occ.pores[p.index()], defending.is_connected_to_inlet(p)))
            .collect();
        let throats = network
            .throats()
            .map(|t| {
                let (a, b) = network.endpoints_of(t);
                let escapes = [a, b]
                    .iter()
                    .any(|&p| !occ.pores[p.index()] && defending.is_connected_to_inlet(p));
                state(occ.throats[t.index()], escapes)
            })
            .collect();
        ElementStates { pores, throats }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
