//! Python FFI bindings via PyO3.
//!
//! Exposes network construction, Washburn thresholds and a complete drainage
//! run (record plus curve) to Python. Property models and step-by-step
//! control stay on the Rust API.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from pnm_core import Network, drainage, washburn
//!
//! net = Network(3, [(0, 1), (1, 2)], inlets=[0], outlets=[2])
//! thresholds = [washburn(0.48, 140.0, r) for r in (2e-6, 1e-6)]
//! result = drainage(net, thresholds, pore_volumes=[1.0, 1.0, 1.0])
//! print(result.pressures)     # [367701.5..., 735403.0...]
//! print(result.saturations)   # [0.666..., 1.0]
//! print(result.breakthrough)  # 735403.0...
//! ```

#![allow(non_snake_case)]

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::curve::{CapillaryCurve, ElementVolumes};
use crate::drainage::{Drainage, PressureSampling, RunConfig};
use crate::error::PnmError;
use crate::network::{Network as RustNetwork, PoreId, ThroatId, Topology};
use crate::record::InvasionRecord;
use crate::threshold::{self, ThresholdTable};

fn to_py(err: PnmError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

// ── Network ──────────────────────────────────────────────────────────────────

/// Immutable pore network: pores `0..num_pores` joined by throats.
#[pyclass(name = "Network", frozen)]
pub struct PyNetwork {
    inner: RustNetwork,
}

#[pymethods]
impl PyNetwork {
    /// Build a network.
    ///
    /// Args:
    ///     num_pores: Number of pores.
    ///     throats: List of (pore, pore) pairs, one per throat.
    ///     inlets: Pores where the invading fluid enters.
    ///     outlets: Pores where the defending fluid escapes (optional).
    #[new]
    #[pyo3(signature = (num_pores, throats, inlets, outlets=Vec::new()))]
    pub fn new(
        num_pores: usize,
        throats: Vec<(u32, u32)>,
        inlets: Vec<u32>,
        outlets: Vec<u32>,
    ) -> PyResult<Self> {
        let topology = Topology {
            num_pores,
            throats,
            inlets,
            outlets,
        };
        let inner = RustNetwork::from_topology(&topology).map_err(to_py)?;
        Ok(Self { inner })
    }

    /// Number of pores.
    #[getter]
    pub fn num_pores(&self) -> usize {
        self.inner.num_pores()
    }

    /// Number of throats.
    #[getter]
    pub fn num_throats(&self) -> usize {
        self.inner.num_throats()
    }

    /// Throat ids incident to `pore`.
    pub fn neighbors(&self, pore: u32) -> PyResult<Vec<u32>> {
        if pore as usize >= self.inner.num_pores() {
            return Err(PyValueError::new_err(format!("pore {pore} out of range")));
        }
        Ok(self.inner.neighbors_of(PoreId(pore)).iter().map(|t| t.0).collect())
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "Network(num_pores={}, num_throats={})",
            self.inner.num_pores(),
            self.inner.num_throats()
        )
    }
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Outcome of a drainage run: the capillary pressure curve and per-element
/// invasion pressures.
#[pyclass(name = "DrainageResult", frozen)]
pub struct PyDrainageResult {
    record: InvasionRecord,
    curve: CapillaryCurve,
}

#[pymethods]
impl PyDrainageResult {
    /// Applied pressure of every curve point.
    #[getter]
    pub fn pressures(&self) -> Vec<f64> {
        self.curve.pressures()
    }

    /// Saturation of every curve point.
    #[getter]
    pub fn saturations(&self) -> Vec<f64> {
        self.curve.saturations()
    }

    /// Cumulative intruded volume of every curve point.
    #[getter]
    pub fn intruded_volumes(&self) -> Vec<f64> {
        self.curve.intruded_volumes()
    }

    /// Invasion pressure per pore (`-inf` for inlets, `inf` if never invaded).
    #[getter]
    pub fn pore_invasion_pressure(&self) -> Vec<f64> {
        (0..self.record.num_pores() as u32)
            .map(|p| self.record.pore_invasion_pressure(PoreId(p)))
            .collect()
    }

    /// Invasion pressure per throat (`inf` if never invaded).
    #[getter]
    pub fn throat_invasion_pressure(&self) -> Vec<f64> {
        (0..self.record.num_throats() as u32)
            .map(|t| self.record.throat_invasion_pressure(ThroatId(t)))
            .collect()
    }

    /// First pressure at which an outlet was invaded, or None.
    #[getter]
    pub fn breakthrough(&self) -> Option<f64> {
        self.record.breakthrough_pressure()
    }

    /// Number of non-fatal diagnostics raised by the run.
    #[getter]
    pub fn diagnostic_count(&self) -> usize {
        self.record.diagnostics().len()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("DrainageResult(points={})", self.curve.points().len())
    }
}

// ── Functions ────────────────────────────────────────────────────────────────

/// Washburn entry pressure `-2 σ cos θ / r` (θ in degrees).
#[pyfunction]
pub fn washburn(surface_tension: f64, contact_angle: f64, radius: f64) -> f64 {
    threshold::washburn(surface_tension, contact_angle, radius)
}

/// Run access-limited drainage.
///
/// Args:
///     network: The Network to invade.
///     thresholds: Entry pressure per throat.
///     pore_volumes: Volume per pore.
///     throat_volumes: Volume per throat (optional).
///     points: Number of log-spaced pressures; every threshold when omitted.
///     pressures: Explicit pressure list; overrides `points`.
///     stop_at_breakthrough: End the run once an outlet is invaded.
#[pyfunction]
#[pyo3(signature = (
    network,
    thresholds,
    pore_volumes,
    throat_volumes=None,
    points=None,
    pressures=None,
    stop_at_breakthrough=false
))]
pub fn drainage(
    network: &PyNetwork,
    thresholds: Vec<f64>,
    pore_volumes: Vec<f64>,
    throat_volumes: Option<Vec<f64>>,
    points: Option<usize>,
    pressures: Option<Vec<f64>>,
    stop_at_breakthrough: bool,
) -> PyResult<PyDrainageResult> {
    let sampling = match (pressures, points) {
        (Some(list), _) => PressureSampling::Explicit(list),
        (None, Some(n)) => PressureSampling::Count(n),
        (None, None) => PressureSampling::EveryThreshold,
    };
    let config = RunConfig {
        sampling,
        stop_at_breakthrough,
        ..RunConfig::default()
    };
    let table = ThresholdTable::from_values(thresholds);
    let record = Drainage::new(&network.inner, &table, config).run().map_err(to_py)?;
    let volumes = ElementVolumes::new(pore_volumes, throat_volumes.unwrap_or_default());
    let curve = CapillaryCurve::assemble(&record, &volumes);
    Ok(PyDrainageResult { record, curve })
}

// ── Module ───────────────────────────────────────────────────────────────────

/// Register all Python classes and functions.
#[pymodule]
pub fn pnm_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyNetwork>()?;
    m.add_class::<PyDrainageResult>()?;
    m.add_function(wrap_pyfunction!(washburn, m)?)?;
    m.add_function(wrap_pyfunction!(drainage, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
