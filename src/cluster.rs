//! Connectivity engine: incremental clustering with a virtual inlet root.
//!
//! A disjoint-set forest over pores plus one extra node, the *inlet root*.
//! Every inlet pore is merged with the inlet root at construction, so
//! "connected to an inlet" is a single `find` comparison.
//!
//! # Pending members
//!
//! Elements whose threshold has been reached but whose cluster is not yet
//! connected to the inlet are *pending*. Each cluster root owns the list of
//! its pending members. When a union joins a cluster to the inlet cluster, the
//! pending list of the joining side is drained and returned to the caller as
//! newly confirmed. Lists are merged smaller-into-larger, so each member moves
//! O(log n) times over a run.
//!
//! # Complexity
//!
//! Path halving plus union by rank: amortised near O(1) per operation,
//! O(E · α(E)) over a full run. Clusters only ever merge; nothing splits.
//!
//! # Invariants
//!
//! - The inlet cluster never holds pending members.
//! - `size` counts pores only; the inlet root contributes nothing.

use crate::network::{Element, PoreId, ThroatId};

/// Snapshot of the cluster containing a pore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cluster {
    /// Numeric label: the index of the cluster's current root.
    pub label: u32,
    /// Whether the cluster contains an inlet pore.
    pub connected_to_inlet: bool,
    /// Number of pores in the cluster.
    pub size: usize,
}

/// Disjoint-set forest over pores with a virtual inlet root.
#[derive(Clone, Debug)]
pub struct ClusterForest {
    parent: Vec<u32>,
    rank: Vec<u8>,
    size: Vec<u32>,
    pending: Vec<Vec<Element>>,
    root: u32,
}

impl ClusterForest {
    /// Forest of `num_pores` singleton clusters with `inlets` pre-merged into
    /// the inlet root.
    pub fn new(num_pores: usize, inlets: &[PoreId]) -> Self {
        let total = num_pores + 1;
        let mut size = vec![1u32; total];
        size[num_pores] = 0;
        let mut forest = Self {
            parent: (0..total as u32).collect(),
            rank: vec![0; total],
            size,
            pending: vec![Vec::new(); total],
            root: num_pores as u32,
        };
        for &p in inlets {
            forest.union_nodes(p.0, forest.root);
        }
        forest
    }

    /// Number of pores tracked (excluding the inlet root).
    pub fn num_pores(&self) -> usize {
        self.root as usize
    }

    /// Root of `node` with path halving.
    fn find(&mut self, mut node: u32) -> u32 {
        while self.parent[node as usize] != node {
            let grand = self.parent[self.parent[node as usize] as usize];
            self.parent[node as usize] = grand;
            node = grand;
        }
        node
    }

    /// Root of `node` without compressing; for shared-borrow queries.
    fn root_of(&self, mut node: u32) -> u32 {
        while self.parent[node as usize] != node {
            node = self.parent[node as usize];
        }
        node
    }

    /// Union two nodes' sets. Returns the drained pending members when the
    /// union connected a cluster to the inlet cluster.
    fn union_nodes(&mut self, a: u32, b: u32) -> Vec<Element> {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return Vec::new();
        }
        let inlet = self.find(self.root);
        let joins_inlet = ra == inlet || rb == inlet;

        let (winner, loser) = match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            core::cmp::Ordering::Less => (rb, ra),
            core::cmp::Ordering::Greater => (ra, rb),
            core::cmp::Ordering::Equal => {
                self.rank[ra as usize] += 1;
                (ra, rb)
            }
        };
        self.parent[loser as usize] = winner;
        self.size[winner as usize] += self.size[loser as usize];

        let mut moved = core::mem::take(&mut self.pending[loser as usize]);
        if joins_inlet {
            // One side is the inlet cluster, whose list is empty; the other
            // side's members are confirmed now.
            let mut kept = core::mem::take(&mut self.pending[winner as usize]);
            if kept.len() < moved.len() {
                core::mem::swap(&mut kept, &mut moved);
            }
            kept.append(&mut moved);
            kept
        } else {
            let target = &mut self.pending[winner as usize];
            if target.len() < moved.len() {
                core::mem::swap(target, &mut moved);
            }
            target.append(&mut moved);
            Vec::new()
        }
    }

    /// Release a throat: union its endpoints' clusters and add the throat as a
    /// member of the merged cluster.
    ///
    /// Returns every element newly confirmed by this release (the throat
    /// itself included when the merged cluster reaches the inlet).
    pub fn release(&mut self, throat: ThroatId, a: PoreId, b: PoreId) -> Vec<Element> {
        let mut confirmed = self.merge(a, b);
        if self.attach(a, Element::Throat(throat)) {
            confirmed.push(Element::Throat(throat));
        }
        confirmed
    }

    /// Union the clusters of two pores without adding a member.
    ///
    /// Returns the pending members confirmed by the union.
    pub fn merge(&mut self, a: PoreId, b: PoreId) -> Vec<Element> {
        self.union_nodes(a.0, b.0)
    }

    /// Add `member` to the cluster of `pore`.
    ///
    /// Returns `true` when that cluster is inlet-connected, i.e. the member is
    /// confirmed immediately; otherwise it is kept pending.
    pub fn attach(&mut self, pore: PoreId, member: Element) -> bool {
        let r = self.find(pore.0);
        if r == self.find(self.root) {
            true
        } else {
            self.pending[r as usize].push(member);
            false
        }
    }

    /// Whether `pore` is in the inlet cluster.
    pub fn is_connected_to_inlet(&self, pore: PoreId) -> bool {
        self.root_of(pore.0) == self.root_of(self.root)
    }

    /// Number of pores in the cluster of `pore`.
    pub fn component_size(&self, pore: PoreId) -> usize {
        self.size[self.root_of(pore.0) as usize] as usize
    }

    /// Label, inlet flag and size of the cluster containing `pore`.
    pub fn cluster(&self, pore: PoreId) -> Cluster {
        let r = self.root_of(pore.0);
        Cluster {
            label: r,
            connected_to_inlet: r == self.root_of(self.root),
            size: self.size[r as usize] as usize,
        }
    }

    /// Number of pending members of the cluster containing `pore`.
    pub fn pending_count(&self, pore: PoreId) -> usize {
        self.pending[self.root_of(pore.0) as usize].len()
    }

    /// Total pending members across all clusters.
    pub fn total_pending(&self) -> usize {
        self.pending.iter().map(Vec::len).sum()
    }

    /// Cluster label of every pore, in pore order.
    pub fn labels(&self) -> Vec<u32> {
        (0..self.root).map(|p| self.root_of(p)).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
