//! Capillary entry thresholds from the Young–Laplace / Washburn relation.
//!
//! ```text
//! P_c = -2 · σ · cos(θ) / r
//! ```
//!
//! σ is interfacial tension, θ the contact angle measured through the
//! defending phase (degrees), r the characteristic radius. For a non-wetting
//! invader (θ > 90°) the threshold is positive; larger means harder to invade.
//!
//! # Invariants
//!
//! - Thresholds are computed once and never modified; a [`ThresholdTable`] is
//!   read-only after construction.
//! - A missing input degrades only that element, to `+∞`, with a
//!   [`Diagnostic::MissingProperty`]. The table never holds a sentinel other
//!   than `+∞`.
//! - NaN and `-∞` may be stored (e.g. from raw user values) but are rejected
//!   when a run validates the table.

use crate::error::{Diagnostic, PnmError, Result};
use crate::network::{Element, Network, PoreId, ThroatId};
use crate::properties::{Location, PropertyStore};

/// Washburn capillary entry pressure.
///
/// `contact_angle` is in degrees.
#[inline]
pub fn washburn(surface_tension: f64, contact_angle: f64, radius: f64) -> f64 {
    -2.0 * surface_tension * contact_angle.to_radians().cos() / radius
}

/// Radius entered at pressure `pressure`: the inverse of [`washburn`].
#[inline]
pub fn washburn_radius(surface_tension: f64, contact_angle: f64, pressure: f64) -> f64 {
    -2.0 * surface_tension * contact_angle.to_radians().cos() / pressure
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Interfacial properties of an invading/defending fluid pair.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Phase {
    /// Interfacial tension, N/m.
    pub surface_tension: f64,
    /// Contact angle, degrees.
    pub contact_angle: f64,
}

impl Phase {
    /// Mercury against vacuum, the porosimetry convention.
    pub const MERCURY: Phase = Phase {
        surface_tension: 0.480,
        contact_angle: 140.0,
    };

    /// Write this phase as uniform pore and throat properties named by `capillary`.
    pub fn write_to(&self, store: &mut PropertyStore, capillary: &Capillary) -> Result<()> {
        for loc in ["pore", "throat"] {
            let tension = format!("{loc}.{}", capillary.surface_tension);
            let angle = format!("{loc}.{}", capillary.contact_angle);
            store.set_uniform(&tension, self.surface_tension)?;
            store.set_uniform(&angle, self.contact_angle)?;
        }
        Ok(())
    }

    /// Washburn threshold of a radius for this phase.
    pub fn entry_pressure(&self, radius: f64) -> f64 {
        washburn(self.surface_tension, self.contact_angle, radius)
    }

    /// Radius entered at `pressure` for this phase.
    pub fn radius_at(&self, pressure: f64) -> f64 {
        washburn_radius(self.surface_tension, self.contact_angle, pressure)
    }
}

// ─── Capillary inputs ────────────────────────────────────────────────────────

/// Names of the properties the Washburn relation reads.
///
/// Names carry no location prefix; `"surface_tension"` is looked up as
/// `"throat.surface_tension"` for throats and `"pore.surface_tension"` for pores.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capillary {
    /// Interfacial tension property.
    pub surface_tension: String,
    /// Contact angle property (degrees).
    pub contact_angle: String,
    /// Characteristic radius property.
    pub radius: String,
    /// Also compute per-pore thresholds (site-bond drainage).
    pub pore_thresholds: bool,
}

impl Default for Capillary {
    fn default() -> Self {
        Self {
            surface_tension: "surface_tension".into(),
            contact_angle: "contact_angle".into(),
            radius: "radius".into(),
            pore_thresholds: false,
        }
    }
}

impl Capillary {
    /// Entry pressure for one element, or the first missing property name.
    pub(crate) fn entry_pressure(
        &self,
        store: &PropertyStore,
        location: Location,
        index: usize,
    ) -> core::result::Result<f64, String> {
        let prefix = match location {
            Location::Pore => "pore",
            Location::Throat => "throat",
        };
        let lookup = |name: &str| {
            let full = format!("{prefix}.{name}");
            store.get(&full, index).ok_or(full)
        };
        let sigma = lookup(&self.surface_tension)?;
        let theta = lookup(&self.contact_angle)?;
        let r = lookup(&self.radius)?;
        Ok(washburn(sigma, theta, r))
    }
}

// ─── ThresholdTable ──────────────────────────────────────────────────────────

/// Per-throat (and optionally per-pore) invasion thresholds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdTable {
    throat: Vec<f64>,
    pore: Option<Vec<f64>>,
    /// Inputs found missing while the table was computed.
    diagnostics: Vec<Diagnostic>,
}

impl ThresholdTable {
    /// Table from raw per-throat values, indexed by throat identity.
    pub fn from_values(throat: Vec<f64>) -> Self {
        Self {
            throat,
            pore: None,
            diagnostics: Vec::new(),
        }
    }

    /// Add per-pore thresholds; a pore is only available once the applied
    /// pressure reaches its value. Inlet pores are always available.
    pub fn with_pore_thresholds(mut self, pore: Vec<f64>) -> Self {
        self.pore = Some(pore);
        self
    }

    /// Read thresholds from a precomputed property such as `"throat.entry_pressure"`.
    ///
    /// Absent entries become `+∞` and are reported.
    pub fn from_property(
        network: &Network,
        store: &PropertyStore,
        name: &str,
    ) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let throat = network
            .throats()
            .map(|t| {
                store.get(name, t.index()).unwrap_or_else(|| {
                    diagnostics.push(Diagnostic::missing(Element::Throat(t), name));
                    f64::INFINITY
                })
            })
            .collect();
        let table = Self {
            diagnostics: diagnostics.clone(),
            ..Self::from_values(throat)
        };
        (table, diagnostics)
    }

    /// Compute thresholds with the Washburn relation from `store`.
    ///
    /// Elements missing any input become `+∞` and are reported.
    pub fn washburn(
        network: &Network,
        store: &PropertyStore,
        capillary: &Capillary,
    ) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let throat = network
            .throats()
            .map(|t| {
                capillary
                    .entry_pressure(store, Location::Throat, t.index())
                    .unwrap_or_else(|missing| {
                        diagnostics.push(Diagnostic::missing(Element::Throat(t), &missing));
                        f64::INFINITY
                    })
            })
            .collect();
        let mut table = Self::from_values(throat);
        if capillary.pore_thresholds {
            let pore = network
                .pores()
                .map(|p| {
                    capillary
                        .entry_pressure(store, Location::Pore, p.index())
                        .unwrap_or_else(|missing| {
                            diagnostics.push(Diagnostic::missing(Element::Pore(p), &missing));
                            f64::INFINITY
                        })
                })
                .collect();
            table = table.with_pore_thresholds(pore);
        }
        table.diagnostics = diagnostics.clone();
        (table, diagnostics)
    }

    /// Threshold of `throat`; `+∞` when the table has no entry.
    #[inline]
    pub fn threshold(&self, throat: ThroatId) -> f64 {
        self.throat.get(throat.index()).copied().unwrap_or(f64::INFINITY)
    }

    /// Threshold of `pore`, when pore thresholds are in use.
    #[inline]
    pub fn pore_threshold(&self, pore: PoreId) -> Option<f64> {
        self.pore
            .as_ref()
            .map(|p| p.get(pore.index()).copied().unwrap_or(f64::INFINITY))
    }

    /// Whether per-pore thresholds are in use.
    pub fn has_pore_thresholds(&self) -> bool {
        self.pore.is_some()
    }

    /// Raw per-throat values.
    pub fn throat_values(&self) -> &[f64] {
        &self.throat
    }

    /// Inputs found missing while the table was computed.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Check every threshold a run on `network` will read.
    ///
    /// NaN or `-∞` fail with [`PnmError::InvalidThreshold`]; entries beyond the
    /// end of the table are reported as missing and read as `+∞`. The result
    /// also carries the diagnostics raised while the table was computed.
    pub fn validate(&self, network: &Network) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = self.diagnostics.clone();
        for t in network.throats() {
            match self.throat.get(t.index()) {
                Some(&v) => check_value(Element::Throat(t), v)?,
                None => diagnostics.push(Diagnostic::missing(Element::Throat(t), "threshold")),
            }
        }
        if let Some(pore) = &self.pore {
            for p in network.pores() {
                match pore.get(p.index()) {
                    Some(&v) => check_value(Element::Pore(p), v)?,
                    None => diagnostics.push(Diagnostic::missing(Element::Pore(p), "threshold")),
                }
            }
        }
        Ok(diagnostics)
    }

    /// Smallest and largest finite thresholds, pores included.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        let pores = self.pore.iter().flatten();
        self.throat
            .iter()
            .chain(pores)
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn check_value(element: Element, value: f64) -> Result<()> {
    if value.is_nan() || value == f64::NEG_INFINITY {
        return Err(PnmError::InvalidThreshold { element, value });
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
