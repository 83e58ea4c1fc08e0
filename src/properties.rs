//! Explicit, read-only physical property context.
//!
//! Properties are named the way pore-network tools name them: a location
//! prefix and a quantity, e.g. `"throat.diameter"` or `"pore.volume"`. Each
//! array either broadcasts one value to every element (typical for phase
//! properties such as surface tension) or stores one optional value per
//! element. A missing entry is `None`, never a sentinel number.
//!
//! Consumers receive a `&PropertyStore`; nothing reaches into shared state.

use hashbrown::HashMap;

use crate::error::{PnmError, Result};

/// Which kind of element a property is defined on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    /// One value per pore.
    Pore,
    /// One value per throat.
    Throat,
}

impl Location {
    /// Location implied by a `"pore.*"` / `"throat.*"` property name.
    pub fn of(name: &str) -> Option<Self> {
        match name.split_once('.') {
            Some(("pore", _)) => Some(Self::Pore),
            Some(("throat", _)) => Some(Self::Throat),
            _ => None,
        }
    }
}

/// Values of one property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValues {
    /// Same value for every element.
    Uniform(f64),
    /// One optional value per element.
    PerElement(Vec<Option<f64>>),
}

impl PropertyValues {
    /// Value for element `index`; `None` if absent or out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Self::Uniform(v) => Some(*v),
            Self::PerElement(values) => values.get(index).copied().flatten(),
        }
    }
}

/// Named property arrays for one network.
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    num_pores: usize,
    num_throats: usize,
    arrays: HashMap<String, PropertyValues>,
}

impl PropertyStore {
    /// Empty store sized for a network.
    pub fn new(num_pores: usize, num_throats: usize) -> Self {
        Self {
            num_pores,
            num_throats,
            arrays: HashMap::new(),
        }
    }

    /// Empty store sized for `network`.
    pub fn for_network(network: &crate::network::Network) -> Self {
        Self::new(network.num_pores(), network.num_throats())
    }

    fn expected_len(&self, name: &str) -> Result<usize> {
        match Location::of(name) {
            Some(Location::Pore) => Ok(self.num_pores),
            Some(Location::Throat) => Ok(self.num_throats),
            None => Err(PnmError::config(format!(
                "property `{name}` must start with `pore.` or `throat.`"
            ))),
        }
    }

    /// Store one value for every element of the property's location.
    pub fn set_uniform(&mut self, name: &str, value: f64) -> Result<()> {
        self.expected_len(name)?;
        self.arrays.insert(name.into(), PropertyValues::Uniform(value));
        Ok(())
    }

    /// Store a complete per-element array.
    pub fn set_values(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        self.set_optional(name, values.into_iter().map(Some).collect())
    }

    /// Store a per-element array with gaps.
    ///
    /// The array length must match the element count of the property's location.
    pub fn set_optional(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        let expected = self.expected_len(name)?;
        if values.len() != expected {
            return Err(PnmError::config(format!(
                "property `{name}` has {} entries, expected {expected}",
                values.len()
            )));
        }
        self.arrays.insert(name.into(), PropertyValues::PerElement(values));
        Ok(())
    }

    /// The whole array for `name`.
    pub fn values(&self, name: &str) -> Option<&PropertyValues> {
        self.arrays.get(name)
    }

    /// Value of `name` at element `index`.
    #[inline]
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.arrays.get(name).and_then(|v| v.get(index))
    }

    /// Whether an array named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Remove an array, returning it.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValues> {
        self.arrays.remove(name)
    }

    /// Number of elements at `location`.
    pub fn len_of(&self, location: Location) -> usize {
        match location {
            Location::Pore => self.num_pores,
            Location::Throat => self.num_throats,
        }
    }

    /// Names of all stored arrays, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.arrays.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
