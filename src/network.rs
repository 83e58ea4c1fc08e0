//! Graph store: the immutable pore/throat topology.
//!
//! A [`Network`] is built once from a [`Topology`] descriptor and never mutated.
//! Incidence is stored in compressed sparse row form, so every query is O(1)
//! (plus the length of the returned slice).
//!
//! # Invariants
//!
//! - Every throat joins two distinct pores that exist in the network.
//! - Boundary roles only name existing pores.
//! - Boundary pore lists are sorted and free of duplicates.

use crate::error::{PnmError, Result, TopologyDefect};

// ─── Identities ──────────────────────────────────────────────────────────────

/// Stable index of a pore (graph node).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PoreId(pub u32);

/// Stable index of a throat (graph edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ThroatId(pub u32);

impl PoreId {
    /// Position of this pore in per-pore arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ThroatId {
    /// Position of this throat in per-throat arrays.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for PoreId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pore {}", self.0)
    }
}

impl core::fmt::Display for ThroatId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "throat {}", self.0)
    }
}

/// Either kind of network element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    /// A pore.
    Pore(PoreId),
    /// A throat.
    Throat(ThroatId),
}

impl core::fmt::Display for Element {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pore(p) => p.fmt(f),
            Self::Throat(t) => t.fmt(f),
        }
    }
}

/// Boundary role of a pore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryRole {
    /// Invading fluid enters here.
    Inlet,
    /// Defending fluid escapes here; used for breakthrough and trapping.
    Outlet,
}

// ─── Topology descriptor ─────────────────────────────────────────────────────

/// Unvalidated description of a network, as delivered by a network generator.
///
/// ```rust
/// use pnm_core::network::{Network, Topology};
///
/// let topo = Topology::new(3).throat(0, 1).throat(1, 2).inlet(0).outlet(2);
/// let net = Network::from_topology(&topo).unwrap();
/// assert_eq!(net.num_throats(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    /// Number of pores; pores are `0..num_pores`.
    pub num_pores: usize,
    /// Throat endpoint pairs; throat `i` is `throats[i]`.
    pub throats: Vec<(u32, u32)>,
    /// Pores carrying the inlet role.
    pub inlets: Vec<u32>,
    /// Pores carrying the outlet role.
    pub outlets: Vec<u32>,
}

impl Topology {
    /// Descriptor with `num_pores` pores and nothing else.
    pub fn new(num_pores: usize) -> Self {
        Self {
            num_pores,
            ..Self::default()
        }
    }

    /// Append a throat between pores `a` and `b`.
    pub fn throat(mut self, a: u32, b: u32) -> Self {
        self.throats.push((a, b));
        self
    }

    /// Assign the inlet role to `pore`.
    pub fn inlet(mut self, pore: u32) -> Self {
        self.inlets.push(pore);
        self
    }

    /// Assign the outlet role to `pore`.
    pub fn outlet(mut self, pore: u32) -> Self {
        self.outlets.push(pore);
        self
    }
}

// ─── Network ─────────────────────────────────────────────────────────────────

/// Immutable pore network.
///
/// Shared read-only between any number of independent invasion runs.
#[derive(Clone, Debug)]
pub struct Network {
    conns: Vec<(PoreId, PoreId)>,
    /// CSR row offsets into `incident`, one per pore plus a sentinel.
    offsets: Vec<u32>,
    incident: Vec<ThroatId>,
    inlets: Vec<PoreId>,
    outlets: Vec<PoreId>,
    inlet_flag: Vec<bool>,
    outlet_flag: Vec<bool>,
}

impl Network {
    /// Validate a descriptor and build the incidence structure.
    ///
    /// Rejects dangling pore references, self-loops and boundary roles on
    /// unknown pores with [`PnmError::MalformedTopology`].
    pub fn from_topology(topology: &Topology) -> Result<Self> {
        let n = topology.num_pores;
        let mut conns = Vec::with_capacity(topology.throats.len());
        let mut degree = vec![0u32; n + 1];

        for (i, &(a, b)) in topology.throats.iter().enumerate() {
            let throat = ThroatId(i as u32);
            for p in [a, b] {
                if p as usize >= n {
                    return Err(PnmError::MalformedTopology {
                        element: Element::Throat(throat),
                        defect: TopologyDefect::DanglingPore(PoreId(p)),
                    });
                }
            }
            if a == b {
                return Err(PnmError::MalformedTopology {
                    element: Element::Throat(throat),
                    defect: TopologyDefect::SelfLoop,
                });
            }
            degree[a as usize] += 1;
            degree[b as usize] += 1;
            conns.push((PoreId(a), PoreId(b)));
        }

        // Exclusive prefix sum turns degrees into row offsets.
        let mut offsets = Vec::with_capacity(n + 1);
        let mut acc = 0u32;
        for d in degree.iter().take(n) {
            offsets.push(acc);
            acc += d;
        }
        offsets.push(acc);

        let mut cursor: Vec<u32> = offsets[..n].to_vec();
        let mut incident = vec![ThroatId(0); acc as usize];
        for (i, &(a, b)) in conns.iter().enumerate() {
            for p in [a, b] {
                let slot = &mut cursor[p.index()];
                incident[*slot as usize] = ThroatId(i as u32);
                *slot += 1;
            }
        }

        let mut net = Self {
            conns,
            offsets,
            incident,
            inlets: Vec::new(),
            outlets: Vec::new(),
            inlet_flag: vec![false; n],
            outlet_flag: vec![false; n],
        };
        net.assign_boundaries(&topology.inlets, &topology.outlets)?;
        Ok(net)
    }

    /// Same topology with a different inlet/outlet assignment.
    ///
    /// Cheap way to run the same medium from several faces.
    pub fn with_boundaries(&self, inlets: &[u32], outlets: &[u32]) -> Result<Self> {
        let mut net = Self {
            conns: self.conns.clone(),
            offsets: self.offsets.clone(),
            incident: self.incident.clone(),
            inlets: Vec::new(),
            outlets: Vec::new(),
            inlet_flag: vec![false; self.num_pores()],
            outlet_flag: vec![false; self.num_pores()],
        };
        net.assign_boundaries(inlets, outlets)?;
        Ok(net)
    }

    fn assign_boundaries(&mut self, inlets: &[u32], outlets: &[u32]) -> Result<()> {
        let n = self.num_pores();
        for (list, flags, ids) in [
            (inlets, &mut self.inlet_flag, &mut self.inlets),
            (outlets, &mut self.outlet_flag, &mut self.outlets),
        ] {
            for &p in list {
                if p as usize >= n {
                    return Err(PnmError::MalformedTopology {
                        element: Element::Pore(PoreId(p)),
                        defect: TopologyDefect::UnknownBoundaryPore,
                    });
                }
                flags[p as usize] = true;
            }
            ids.extend(
                flags
                    .iter()
                    .enumerate()
                    .filter(|&(_, &f)| f)
                    .map(|(i, _)| PoreId(i as u32)),
            );
        }
        Ok(())
    }

    /// Number of pores.
    pub fn num_pores(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of throats.
    pub fn num_throats(&self) -> usize {
        self.conns.len()
    }

    /// Throats incident to `pore`.
    #[inline]
    pub fn neighbors_of(&self, pore: PoreId) -> &[ThroatId] {
        let lo = self.offsets[pore.index()] as usize;
        let hi = self.offsets[pore.index() + 1] as usize;
        &self.incident[lo..hi]
    }

    /// The two pores joined by `throat`, in descriptor order.
    #[inline]
    pub fn endpoints_of(&self, throat: ThroatId) -> (PoreId, PoreId) {
        self.conns[throat.index()]
    }

    /// The endpoint of `throat` that is not `pore`.
    #[inline]
    pub fn other_end(&self, throat: ThroatId, pore: PoreId) -> PoreId {
        let (a, b) = self.endpoints_of(throat);
        if a == pore {
            b
        } else {
            a
        }
    }

    /// Pores one throat away from `pore`, with the connecting throat.
    pub fn adjacent_pores(&self, pore: PoreId) -> impl Iterator<Item = (ThroatId, PoreId)> + '_ {
        self.neighbors_of(pore)
            .iter()
            .map(move |&t| (t, self.other_end(t, pore)))
    }

    /// Sorted pores carrying `role`.
    pub fn boundary_pores(&self, role: BoundaryRole) -> &[PoreId] {
        match role {
            BoundaryRole::Inlet => &self.inlets,
            BoundaryRole::Outlet => &self.outlets,
        }
    }

    /// Whether `pore` is an inlet.
    #[inline]
    pub fn is_inlet(&self, pore: PoreId) -> bool {
        self.inlet_flag[pore.index()]
    }

    /// Whether `pore` is an outlet.
    #[inline]
    pub fn is_outlet(&self, pore: PoreId) -> bool {
        self.outlet_flag[pore.index()]
    }

    /// All pore identities in index order.
    pub fn pores(&self) -> impl Iterator<Item = PoreId> {
        (0..self.num_pores() as u32).map(PoreId)
    }

    /// All throat identities in index order.
    pub fn throats(&self) -> impl Iterator<Item = ThroatId> {
        (0..self.num_throats() as u32).map(ThroatId)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
