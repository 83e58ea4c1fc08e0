//! Derived-property models evaluated in dependency order.
//!
//! Each [`PropertyModel`] declares one output property and its inputs; an
//! input is either required or optional with a default. [`ModelGraph::regenerate`]
//! orders the models so every model runs after the models producing its
//! inputs, then evaluates them element by element.
//!
//! # Degradation
//!
//! - A required input missing for one element leaves that element's output
//!   missing and yields a [`Diagnostic::MissingProperty`]. Other elements and
//!   other models are unaffected.
//! - A required input array that is absent altogether (and produced by no
//!   model) skips the model with a [`Diagnostic::SkippedModel`].
//! - Optional inputs fall back to their declared default.

use crate::error::{Diagnostic, PnmError, Result};
use crate::network::{Element, PoreId, ThroatId};
use crate::properties::{Location, PropertyStore};
use crate::threshold::{washburn, Capillary};

/// One declared input of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    /// Full property name, e.g. `"throat.diameter"`.
    pub name: String,
    /// Value used when absent; `None` makes the input required.
    pub default: Option<f64>,
}

impl Input {
    /// Input that must be present.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Input that falls back to `default` when absent.
    pub fn optional(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// A pointwise derived property.
///
/// Inputs and output must share one location (all `pore.*` or all `throat.*`).
pub trait PropertyModel: Send + Sync {
    /// Full name of the property written.
    fn output(&self) -> &str;

    /// Declared inputs, in the order `evaluate` receives them.
    fn inputs(&self) -> Vec<Input>;

    /// Output value for one element from its input values.
    fn evaluate(&self, inputs: &[f64]) -> f64;
}

// ─── ModelGraph ──────────────────────────────────────────────────────────────

/// Ordered collection of models over one property store.
#[derive(Default)]
pub struct ModelGraph {
    models: Vec<Box<dyn PropertyModel>>,
}

impl ModelGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    ///
    /// Rejects models whose inputs sit at a different location than the output,
    /// and a second model for an output that already has one.
    pub fn add(&mut self, model: impl PropertyModel + 'static) -> Result<&mut Self> {
        let out = model.output();
        let location = Location::of(out)
            .ok_or_else(|| PnmError::config(format!("model output `{out}` has no location")))?;
        if let Some(bad) = model
            .inputs()
            .into_iter()
            .find(|i| Location::of(&i.name) != Some(location))
        {
            return Err(PnmError::config(format!(
                "model `{out}` reads `{}` from another location",
                bad.name
            )));
        }
        if self.models.iter().any(|m| m.output() == out) {
            return Err(PnmError::config(format!("model for `{out}` already registered")));
        }
        self.models.push(Box::new(model));
        Ok(self)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model indices in dependency order (Kahn; ties keep registration order).
    fn evaluation_order(&self) -> Result<Vec<usize>> {
        let n = self.models.len();
        let inputs: Vec<Vec<Input>> = self.models.iter().map(|m| m.inputs()).collect();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (consumer, ins) in inputs.iter().enumerate() {
            for input in ins {
                if let Some(producer) = self.models.iter().position(|m| m.output() == input.name) {
                    dependents[producer].push(consumer);
                    indegree[consumer] += 1;
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut done = vec![false; n];
        while order.len() < n {
            let Some(next) = (0..n).find(|&i| !done[i] && indegree[i] == 0) else {
                let stuck = (0..n).find(|&i| !done[i]).unwrap_or(0);
                return Err(PnmError::ModelCycle(self.models[stuck].output().into()));
            };
            done[next] = true;
            order.push(next);
            for &d in &dependents[next] {
                indegree[d] -= 1;
            }
        }
        Ok(order)
    }

    /// Evaluate every model into `store`, in dependency order.
    ///
    /// Returns the diagnostics of all degraded elements and skipped models.
    pub fn regenerate(&self, store: &mut PropertyStore) -> Result<Vec<Diagnostic>> {
        let order = self.evaluation_order()?;
        let mut diagnostics = Vec::new();

        for idx in order {
            let model = &self.models[idx];
            let out = model.output();
            let inputs = model.inputs();

            if let Some(absent) = inputs
                .iter()
                .find(|i| i.default.is_none() && !store.contains(&i.name))
            {
                tracing::warn!(model = out, input = %absent.name, "skipping model, input absent");
                diagnostics.push(Diagnostic::SkippedModel {
                    model: out.into(),
                    missing_input: absent.name.clone(),
                });
                continue;
            }

            let location = Location::of(out).unwrap_or(Location::Pore);
            let count = store.len_of(location);
            let mut values = Vec::with_capacity(count);
            let mut scratch = Vec::with_capacity(inputs.len());
            for index in 0..count {
                scratch.clear();
                let mut missing = None;
                for input in &inputs {
                    match store.get(&input.name, index).or(input.default) {
                        Some(v) => scratch.push(v),
                        None => {
                            missing = Some(&input.name);
                            break;
                        }
                    }
                }
                match missing {
                    None => values.push(Some(model.evaluate(&scratch))),
                    Some(name) => {
                        let element = match location {
                            Location::Pore => Element::Pore(PoreId(index as u32)),
                            Location::Throat => Element::Throat(ThroatId(index as u32)),
                        };
                        diagnostics.push(Diagnostic::missing(element, name));
                        values.push(None);
                    }
                }
            }
            tracing::debug!(model = out, elements = count, "model evaluated");
            store.set_optional(out, values)?;
        }
        Ok(diagnostics)
    }
}

impl core::fmt::Debug for ModelGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.models.iter().map(|m| m.output()))
            .finish()
    }
}

// ─── Built-in models ─────────────────────────────────────────────────────────

fn prefix(location: Location) -> &'static str {
    match location {
        Location::Pore => "pore",
        Location::Throat => "throat",
    }
}

/// `radius = diameter / 2`.
#[derive(Clone, Debug)]
pub struct RadiusFromDiameter {
    output: String,
    input: String,
}

impl RadiusFromDiameter {
    /// Model for `"{loc}.radius"` from `"{loc}.diameter"`.
    pub fn new(location: Location) -> Self {
        let p = prefix(location);
        Self {
            output: format!("{p}.radius"),
            input: format!("{p}.diameter"),
        }
    }
}

impl PropertyModel for RadiusFromDiameter {
    fn output(&self) -> &str {
        &self.output
    }

    fn inputs(&self) -> Vec<Input> {
        vec![Input::required(self.input.clone())]
    }

    fn evaluate(&self, inputs: &[f64]) -> f64 {
        inputs[0] / 2.0
    }
}

/// Washburn capillary entry pressure, `"{loc}.entry_pressure"`.
#[derive(Clone, Debug)]
pub struct WashburnEntryPressure {
    output: String,
    inputs: [String; 3],
}

impl WashburnEntryPressure {
    /// Model reading tension, angle and radius named by `capillary`.
    pub fn new(location: Location, capillary: &Capillary) -> Self {
        let p = prefix(location);
        Self {
            output: format!("{p}.entry_pressure"),
            inputs: [
                format!("{p}.{}", capillary.surface_tension),
                format!("{p}.{}", capillary.contact_angle),
                format!("{p}.{}", capillary.radius),
            ],
        }
    }
}

impl PropertyModel for WashburnEntryPressure {
    fn output(&self) -> &str {
        &self.output
    }

    fn inputs(&self) -> Vec<Input> {
        self.inputs.iter().cloned().map(Input::required).collect()
    }

    fn evaluate(&self, inputs: &[f64]) -> f64 {
        washburn(inputs[0], inputs[1], inputs[2])
    }
}

/// Spherical pore body volume from `"pore.diameter"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphereVolume;

impl PropertyModel for SphereVolume {
    fn output(&self) -> &str {
        "pore.volume"
    }

    fn inputs(&self) -> Vec<Input> {
        vec![Input::required("pore.diameter")]
    }

    fn evaluate(&self, inputs: &[f64]) -> f64 {
        core::f64::consts::PI * inputs[0].powi(3) / 6.0
    }
}

/// Cylindrical throat volume; a throat with no `"throat.length"` holds none.
#[derive(Clone, Copy, Debug, Default)]
pub struct CylinderVolume;

impl PropertyModel for CylinderVolume {
    fn output(&self) -> &str {
        "throat.volume"
    }

    fn inputs(&self) -> Vec<Input> {
        vec![
            Input::required("throat.diameter"),
            Input::optional("throat.length", 0.0),
        ]
    }

    fn evaluate(&self, inputs: &[f64]) -> f64 {
        core::f64::consts::PI * inputs[0].powi(2) / 4.0 * inputs[1]
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler {
        from: &'static str,
        to: &'static str,
    }

    impl PropertyModel for Doubler {
        fn output(&self) -> &str {
            self.to
        }
        fn inputs(&self) -> Vec<Input> {
            vec![Input::required(self.from)]
        }
        fn evaluate(&self, inputs: &[f64]) -> f64 {
            inputs[0] * 2.0
        }
    }

    #[test]
    fn test_dependency_order_independent_of_registration() {
        let mut graph = ModelGraph::new();
        // Registered consumer-first; entry pressure needs the radius model.
        graph
            .add(WashburnEntryPressure::new(Location::Throat, &Capillary::default()))
            .unwrap()
            .add(RadiusFromDiameter::new(Location::Throat))
            .unwrap();

        let mut store = PropertyStore::new(2, 2);
        store.set_uniform("throat.surface_tension", 0.48).unwrap();
        store.set_uniform("throat.contact_angle", 140.0).unwrap();
        store.set_values("throat.diameter", vec![2e-6, 1e-6]).unwrap();

        let diags = graph.regenerate(&mut store).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(store.get("throat.radius", 0), Some(1e-6));
        let p0 = store.get("throat.entry_pressure", 0).unwrap();
        let p1 = store.get("throat.entry_pressure", 1).unwrap();
        assert!(p1 > p0);
    }

    #[test]
    fn test_missing_element_degrades_independently() {
        let mut graph = ModelGraph::new();
        graph.add(SphereVolume).unwrap();
        graph.add(CylinderVolume).unwrap();

        let mut store = PropertyStore::new(3, 1);
        store
            .set_optional("pore.diameter", vec![Some(1.0), None, Some(2.0)])
            .unwrap();
        store.set_values("throat.diameter", vec![1.0]).unwrap();

        let diags = graph.regenerate(&mut store).unwrap();
        assert_eq!(
            diags,
            vec![Diagnostic::MissingProperty {
                element: Element::Pore(PoreId(1)),
                property: "pore.diameter".into(),
            }]
        );
        assert!(store.get("pore.volume", 0).is_some());
        assert_eq!(store.get("pore.volume", 1), None);
        // Optional length defaults to zero: throat carries no volume.
        assert_eq!(store.get("throat.volume", 0), Some(0.0));
    }

    #[test]
    fn test_absent_input_skips_model_with_warning() {
        let mut graph = ModelGraph::new();
        graph.add(SphereVolume).unwrap();
        let mut store = PropertyStore::new(2, 0);
        let diags = graph.regenerate(&mut store).unwrap();
        assert_eq!(
            diags,
            vec![Diagnostic::SkippedModel {
                model: "pore.volume".into(),
                missing_input: "pore.diameter".into(),
            }]
        );
        assert!(!store.contains("pore.volume"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = ModelGraph::new();
        graph.add(Doubler { from: "pore.a", to: "pore.b" }).unwrap();
        graph.add(Doubler { from: "pore.b", to: "pore.a" }).unwrap();
        let mut store = PropertyStore::new(1, 0);
        assert!(matches!(
            graph.regenerate(&mut store),
            Err(PnmError::ModelCycle(_))
        ));
    }

    #[test]
    fn test_mixed_locations_rejected() {
        let mut graph = ModelGraph::new();
        let err = graph
            .add(Doubler { from: "throat.a", to: "pore.b" })
            .unwrap_err();
        assert!(matches!(err, PnmError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let mut graph = ModelGraph::new();
        graph.add(SphereVolume).unwrap();
        assert!(graph.add(SphereVolume).is_err());
        assert_eq!(graph.len(), 1);
    }
}
