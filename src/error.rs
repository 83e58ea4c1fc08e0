//! Error and diagnostic types.
//!
//! Fatal conditions are [`PnmError`] values: they stop the operation before any
//! invasion state is produced. Degraded inputs are reported as [`Diagnostic`]s,
//! which never abort a run.

use thiserror::Error;

use crate::network::{Element, PoreId};

/// Result type alias for pnm-core operations.
pub type Result<T> = std::result::Result<T, PnmError>;

/// Structural defect found while loading a topology.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyDefect {
    /// A throat references a pore index outside the network.
    #[error("references missing {0}")]
    DanglingPore(PoreId),
    /// A throat connects a pore to itself.
    #[error("connects a pore to itself")]
    SelfLoop,
    /// A boundary role was assigned to a pore outside the network.
    #[error("boundary role on a pore outside the network")]
    UnknownBoundaryPore,
}

/// Reason a boundary configuration cannot start a run.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryDefect {
    /// No pore carries the inlet role.
    #[error("no inlet pores")]
    NoInlets,
    /// The network has no throats to invade.
    #[error("network has zero throats")]
    NoThroats,
    /// An inlet pore index lies outside the network.
    #[error("inlet {0} is outside the network")]
    InletOutOfRange(PoreId),
}

/// Main error type for pnm-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PnmError {
    /// Structural graph defect, raised at load time.
    #[error("malformed topology: {element} {defect}")]
    MalformedTopology {
        /// Offending throat or pore.
        element: Element,
        /// What is wrong with it.
        defect: TopologyDefect,
    },

    /// A threshold is NaN or negative infinity.
    #[error("invalid threshold {value} on {element}")]
    InvalidThreshold {
        /// Offending throat or pore.
        element: Element,
        /// The rejected value.
        value: f64,
    },

    /// Boundary conditions cannot start a run.
    #[error("invalid boundary condition: {0}")]
    InvalidBoundaryCondition(BoundaryDefect),

    /// Run configuration is unusable (sampling, bounds, table shape).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation called in the wrong run state.
    #[error("invalid run state: expected {expected}, found {found}")]
    InvalidState {
        /// State the operation requires.
        expected: &'static str,
        /// State the run is in.
        found: &'static str,
    },

    /// The caller stopped the run at a step boundary.
    #[error("run cancelled before step {step}")]
    Cancelled {
        /// Index of the step that was not started.
        step: usize,
    },

    /// Property models form a dependency cycle.
    #[error("property model cycle involving `{0}`")]
    ModelCycle(String),
}

impl PnmError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// The element this error is about, when there is one.
    pub fn element(&self) -> Option<Element> {
        match self {
            Self::MalformedTopology { element, .. } | Self::InvalidThreshold { element, .. } => {
                Some(*element)
            }
            Self::InvalidBoundaryCondition(BoundaryDefect::InletOutOfRange(p)) => {
                Some(Element::Pore(*p))
            }
            _ => None,
        }
    }
}

/// Non-fatal condition surfaced alongside a result.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Diagnostic {
    /// A required physical input was absent; the element is never invadable
    /// (or its derived property stays missing).
    MissingProperty {
        /// Element whose input was missing.
        element: Element,
        /// Name of the missing property.
        property: String,
    },
    /// A property model was not evaluated because an input array is absent.
    SkippedModel {
        /// Output property of the skipped model.
        model: String,
        /// The input that could not be found.
        missing_input: String,
    },
}

impl Diagnostic {
    /// Construct a missing-property diagnostic and log it.
    pub(crate) fn missing(element: Element, property: &str) -> Self {
        tracing::warn!(%element, property, "missing property, element degraded");
        Self::MissingProperty {
            element,
            property: property.into(),
        }
    }

    /// The element this diagnostic is about, when there is one.
    pub fn element(&self) -> Option<Element> {
        match self {
            Self::MissingProperty { element, .. } => Some(*element),
            Self::SkippedModel { .. } => None,
        }
    }
}
