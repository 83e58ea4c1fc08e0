//! Portable snapshot of a drainage run for persistence and transport.
//!
//! ```text
//! DrainageSnapshot
//!   version       u16 = 1
//!   num_pores     u32
//!   num_throats   u32
//!   baseline      [pore id]                    inlets, invaded before step 1
//!   steps         [StepRecord]                 one per pressure step, in order
//!   breakthrough  step number | null           0 = baseline
//!   diagnostics   [Diagnostic]
//! ```
//!
//! Only finite numbers are stored, so the snapshot survives formats without
//! infinities (JSON). Never-invaded elements are simply absent from every
//! step. [`DrainageSnapshot::to_record`] restores an identical
//! [`InvasionRecord`].
//!
//! This module requires the `serde` feature.

use crate::curve::CapillaryCurve;
use crate::error::Diagnostic;
use crate::network::{Element, PoreId, ThroatId};
use crate::record::{InvasionEvent, InvasionRecord};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// A serialisable summary of one completed drainage run.
///
/// # Example
///
/// ```rust,ignore
/// use pnm_core::snapshot::DrainageSnapshot;
///
/// let snapshot = DrainageSnapshot::from_run(&record, Some(&curve), &outlets);
/// let json = serde_json::to_string(&snapshot).unwrap();
/// let restored: DrainageSnapshot = serde_json::from_str(&json).unwrap();
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct DrainageSnapshot {
    /// Format version; [`SNAPSHOT_VERSION`] for new snapshots.
    pub version: u16,
    /// Pores in the network.
    pub num_pores: u32,
    /// Throats in the network.
    pub num_throats: u32,
    /// Inlet pores.
    pub baseline: Vec<u32>,
    /// Pressure steps in order.
    pub steps: Vec<StepRecord>,
    /// Outlet pores, used to restore breakthrough queries.
    pub outlets: Vec<u32>,
    /// Step at which an outlet was first invaded.
    pub breakthrough: Option<u32>,
    /// Non-fatal conditions of the run.
    pub diagnostics: Vec<Diagnostic>,
}

/// Serialisable representation of one pressure step.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct StepRecord {
    /// Applied pressure.
    pub pressure: f64,
    /// Saturation after the step, when a curve was supplied.
    pub saturation: Option<f64>,
    /// Newly invaded pores.
    pub pores: Vec<u32>,
    /// Newly invaded throats.
    pub throats: Vec<u32>,
}

impl From<&InvasionEvent> for StepRecord {
    fn from(event: &InvasionEvent) -> Self {
        Self {
            pressure: event.pressure,
            saturation: None,
            pores: event.pores.iter().map(|p| p.0).collect(),
            throats: event.throats.iter().map(|t| t.0).collect(),
        }
    }
}

impl From<&StepRecord> for InvasionEvent {
    fn from(step: &StepRecord) -> Self {
        Self {
            pressure: step.pressure,
            pores: step.pores.iter().map(|&p| PoreId(p)).collect(),
            throats: step.throats.iter().map(|&t| ThroatId(t)).collect(),
        }
    }
}

impl DrainageSnapshot {
    /// Build a snapshot from a completed run.
    ///
    /// - `record`: the run's invasion record.
    /// - `curve`: when given, each step also carries its saturation.
    /// - `outlets`: outlet pores of the network the run used.
    pub fn from_run(
        record: &InvasionRecord,
        curve: Option<&CapillaryCurve>,
        outlets: &[PoreId],
    ) -> Self {
        let steps = record
            .events()
            .iter()
            .map(|event| StepRecord {
                saturation: curve.map(|c| c.saturation_at(event.pressure)),
                ..StepRecord::from(event)
            })
            .collect();
        let breakthrough = outlets
            .iter()
            .filter_map(|&p| record.sequence(Element::Pore(p)))
            .min();

        Self {
            version: SNAPSHOT_VERSION,
            num_pores: record.num_pores() as u32,
            num_throats: record.num_throats() as u32,
            baseline: record.baseline().iter().map(|p| p.0).collect(),
            steps,
            outlets: outlets.iter().map(|p| p.0).collect(),
            breakthrough,
            diagnostics: record.diagnostics().to_vec(),
        }
    }

    /// Number of pressure steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Step record at exactly `pressure`.
    pub fn find_step(&self, pressure: f64) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.pressure == pressure)
    }

    /// Rebuild the invasion record.
    pub fn to_record(&self) -> InvasionRecord {
        InvasionRecord::new(
            self.num_pores as usize,
            self.num_throats as usize,
            self.baseline.iter().map(|&p| PoreId(p)).collect(),
            self.steps.iter().map(InvasionEvent::from).collect(),
            self.outlets.iter().map(|&p| PoreId(p)).collect(),
            self.diagnostics.clone(),
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
