//! Capillary pressure curve: the invasion record projected onto volumes.
//!
//! Walks the record in pressure order, accumulating the volume of every
//! newly invaded pore and throat, and emits one `(pressure, saturation)`
//! point per distinct pressure. Assembly is pure and cannot fail.
//!
//! # Invariants
//!
//! - Saturation is non-decreasing and stays within `[0, 1]`.
//! - Saturation is exactly 1 only once every element with volume is invaded.
//! - With zero total volume every saturation is 0.

use crate::error::Diagnostic;
use crate::network::{Element, Network, PoreId, ThroatId};
use crate::properties::PropertyStore;
use crate::record::InvasionRecord;
use crate::threshold::Phase;

// ─── Volumes ─────────────────────────────────────────────────────────────────

/// Per-element volumes, an external input to the curve.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementVolumes {
    pore: Vec<f64>,
    throat: Vec<f64>,
}

impl ElementVolumes {
    /// Pore and throat volumes.
    pub fn new(pore: Vec<f64>, throat: Vec<f64>) -> Self {
        Self { pore, throat }
    }

    /// Pore volumes only; throats hold nothing.
    pub fn pores_only(pore: Vec<f64>) -> Self {
        Self {
            pore,
            throat: Vec::new(),
        }
    }

    /// Read `"pore.volume"` and, when present, `"throat.volume"`.
    ///
    /// Missing entries count as zero volume and are reported.
    pub fn from_properties(network: &Network, store: &PropertyStore) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let pore = network
            .pores()
            .map(|p| {
                store.get("pore.volume", p.index()).unwrap_or_else(|| {
                    diagnostics.push(Diagnostic::missing(Element::Pore(p), "pore.volume"));
                    0.0
                })
            })
            .collect();
        let throat = if store.contains("throat.volume") {
            network
                .throats()
                .map(|t| {
                    store.get("throat.volume", t.index()).unwrap_or_else(|| {
                        diagnostics.push(Diagnostic::missing(Element::Throat(t), "throat.volume"));
                        0.0
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        (Self { pore, throat }, diagnostics)
    }

    /// Volume of one element; zero past the end of the arrays.
    #[inline]
    pub fn of(&self, element: Element) -> f64 {
        let v = match element {
            Element::Pore(p) => self.pore.get(p.index()),
            Element::Throat(t) => self.throat.get(t.index()),
        };
        v.copied().filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
    }

    /// Total volume over `num_pores` pores and `num_throats` throats.
    pub fn total(&self, num_pores: usize, num_throats: usize) -> f64 {
        all_elements(num_pores, num_throats).map(|e| self.of(e)).sum()
    }
}

// ─── Curve ───────────────────────────────────────────────────────────────────

/// One point of the capillary pressure curve.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    /// Applied pressure.
    pub pressure: f64,
    /// Invaded fraction of the total volume.
    pub saturation: f64,
    /// Cumulative invaded volume.
    pub volume: f64,
}

/// One bin of a pore-size distribution derived from the curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeBin {
    /// Radius entered at the bin's pressure.
    pub radius: f64,
    /// Volume invaded down to this radius.
    pub cumulative_volume: f64,
    /// `dV / d ln r` against the previous bin; 0 for the first.
    pub differential: f64,
}

/// Pressure/saturation curve of one run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CapillaryCurve {
    initial: CurvePoint,
    points: Vec<CurvePoint>,
    total_volume: f64,
}

impl CapillaryCurve {
    /// Project `record` onto `volumes`.
    pub fn assemble(record: &InvasionRecord, volumes: &ElementVolumes) -> Self {
        let total = volumes.total(record.num_pores(), record.num_throats());
        let remaining = all_elements(record.num_pores(), record.num_throats())
            .filter(|&e| volumes.of(e) > 0.0)
            .count();
        let mut tally = Tally {
            total,
            volume: 0.0,
            remaining,
        };

        for &p in record.baseline() {
            tally.add(volumes.of(Element::Pore(p)));
        }
        let initial = tally.point(f64::NEG_INFINITY);

        let mut points: Vec<CurvePoint> = Vec::with_capacity(record.events().len());
        for event in record.events() {
            for element in event.elements() {
                tally.add(volumes.of(element));
            }
            let point = tally.point(event.pressure);
            match points.last_mut() {
                Some(last) if last.pressure == point.pressure => *last = point,
                _ => points.push(point),
            }
        }
        Self {
            initial,
            points,
            total_volume: total,
        }
    }

    /// State before the first step (inlets only).
    pub fn initial(&self) -> CurvePoint {
        self.initial
    }

    /// Curve points in increasing pressure order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Total volume the saturations are relative to.
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// Pressures of every point.
    pub fn pressures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.pressure).collect()
    }

    /// Saturations of every point.
    pub fn saturations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.saturation).collect()
    }

    /// Cumulative intruded volume of every point.
    pub fn intruded_volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    /// Saturation at an arbitrary pressure: the last point at or below it.
    pub fn saturation_at(&self, pressure: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.pressure <= pressure);
        match idx {
            0 => self.initial.saturation,
            i => self.points[i - 1].saturation,
        }
    }

    /// Pore-size distribution implied by the curve for `phase`.
    ///
    /// Points at non-positive pressure carry no radius and are skipped. Bins
    /// come out in decreasing radius order, matching increasing pressure.
    pub fn pore_size_distribution(&self, phase: &Phase) -> Vec<SizeBin> {
        let mut bins: Vec<SizeBin> = Vec::new();
        for point in self.points.iter().filter(|p| p.pressure > 0.0) {
            let radius = phase.radius_at(point.pressure);
            if !(radius.is_finite() && radius > 0.0) {
                continue;
            }
            let differential = match bins.last() {
                Some(prev) => {
                    let span = prev.radius.ln() - radius.ln();
                    if span > 0.0 {
                        (point.volume - prev.cumulative_volume) / span
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };
            bins.push(SizeBin {
                radius,
                cumulative_volume: point.volume,
                differential,
            });
        }
        bins
    }
}

/// Running sum of invaded volume.
struct Tally {
    total: f64,
    volume: f64,
    /// Elements with volume not yet invaded.
    remaining: usize,
}

impl Tally {
    fn add(&mut self, v: f64) {
        if v > 0.0 {
            self.volume += v;
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    fn point(&self, pressure: f64) -> CurvePoint {
        let saturation = if self.total <= 0.0 {
            0.0
        } else if self.remaining == 0 {
            1.0
        } else {
            // Rounding can reach 1.0 while a volume is still uninvaded.
            (self.volume / self.total).clamp(0.0, 1.0 - f64::EPSILON / 2.0)
        };
        CurvePoint {
            pressure,
            saturation,
            volume: self.volume,
        }
    }
}

fn all_elements(num_pores: usize, num_throats: usize) -> impl Iterator<Item = Element> {
    let pores = (0..num_pores as u32).map(|i| Element::Pore(PoreId(i)));
    let throats = (0..num_throats as u32).map(|i| Element::Throat(ThroatId(i)));
    pores.chain(throats)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
