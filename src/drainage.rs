//! Invasion scheduler: access-limited drainage over a pressure schedule.
//!
//! A run walks a monotonically increasing list of applied pressures. At each
//! step every element whose threshold is at or below the step pressure is
//! *released* into the [`ClusterForest`] as one batch; afterwards, everything
//! whose cluster reaches the inlet root is confirmed invaded at that step's
//! pressure, including elements released earlier that were waiting on
//! access (pending).
//!
//! ```text
//!   NotStarted ──start()──▶ Running ──last step──▶ Completed
//!        │                     │
//!        └── invalid input ────┴── abort() / cancel ──▶ Aborted
//! ```
//!
//! # Invariants
//!
//! - Validation happens before any state is built: a failed `start` leaves no
//!   partial record.
//! - Release order is a total order, `(threshold, element)`, so ties resolve
//!   the same way regardless of input ordering.
//! - Cancellation is only observed between steps; a step is never half applied.
//! - The network and threshold table are only borrowed: any number of runs may
//!   share them across threads.

use tracing::{debug, info};

use crate::cluster::{Cluster, ClusterForest};
use crate::error::{BoundaryDefect, Diagnostic, PnmError, Result};
use crate::network::{BoundaryRole, Element, Network, PoreId, ThroatId};
use crate::record::{InvasionEvent, InvasionRecord};
use crate::threshold::ThresholdTable;

// ─── Configuration ───────────────────────────────────────────────────────────

/// How the applied pressure schedule is chosen.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PressureSampling {
    /// One step per distinct finite threshold.
    EveryThreshold,
    /// `n` points between the bounds, log-spaced (linear if the lower bound is
    /// not positive). End points are exact.
    Count(usize),
    /// Caller-supplied pressures; sorted and de-duplicated before use.
    Explicit(Vec<f64>),
}

/// Drainage run configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Pressure schedule.
    pub sampling: PressureSampling,
    /// Lowest pressure to apply. Defaults to the smallest finite threshold.
    pub start: Option<f64>,
    /// Highest pressure to apply. Defaults to the largest finite threshold.
    pub stop: Option<f64>,
    /// End the run after the first step that invades an outlet pore.
    pub stop_at_breakthrough: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sampling: PressureSampling::EveryThreshold,
            start: None,
            stop: None,
            stop_at_breakthrough: false,
        }
    }
}

impl RunConfig {
    /// `n` sampled pressures between the threshold extremes.
    pub fn count(n: usize) -> Self {
        Self {
            sampling: PressureSampling::Count(n),
            ..Self::default()
        }
    }

    /// An explicit pressure list.
    pub fn explicit(pressures: Vec<f64>) -> Self {
        Self {
            sampling: PressureSampling::Explicit(pressures),
            ..Self::default()
        }
    }

    /// Restrict the schedule to `[start, stop]`.
    pub fn bounded(mut self, start: f64, stop: f64) -> Self {
        self.start = Some(start);
        self.stop = Some(stop);
        self
    }

    /// Stop once an outlet is reached.
    pub fn until_breakthrough(mut self) -> Self {
        self.stop_at_breakthrough = true;
        self
    }

    /// Pressure steps for the given sorted, distinct, finite candidate
    /// thresholds.
    fn schedule(&self, candidates: &[f64]) -> Result<Vec<f64>> {
        for (name, bound) in [("start", self.start), ("stop", self.stop)] {
            if bound.is_some_and(f64::is_nan) {
                return Err(PnmError::config(format!("{name} pressure is NaN")));
            }
        }
        if let (Some(lo), Some(hi)) = (self.start, self.stop) {
            if lo > hi {
                return Err(PnmError::config(format!(
                    "start pressure {lo} exceeds stop pressure {hi}"
                )));
            }
        }
        let within = |p: f64| {
            self.start.map_or(true, |lo| p >= lo) && self.stop.map_or(true, |hi| p <= hi)
        };

        let mut steps = match &self.sampling {
            PressureSampling::EveryThreshold => {
                let mut steps: Vec<f64> = self.start.into_iter().collect();
                steps.extend(candidates.iter().copied().filter(|&p| {
                    self.start.map_or(true, |lo| p > lo) && self.stop.map_or(true, |hi| p <= hi)
                }));
                steps
            }
            PressureSampling::Count(0) => {
                return Err(PnmError::config("pressure sample count must be at least 1"));
            }
            PressureSampling::Count(n) => {
                let lo = self.start.or_else(|| candidates.first().copied());
                let hi = self.stop.or_else(|| candidates.last().copied());
                match (lo, hi) {
                    (Some(lo), Some(hi)) if lo > hi => {
                        return Err(PnmError::config(format!(
                            "start pressure {lo} exceeds largest threshold {hi}"
                        )));
                    }
                    (Some(lo), Some(hi)) => spaced(lo, hi, *n),
                    _ => Vec::new(),
                }
            }
            PressureSampling::Explicit(list) => {
                if list.is_empty() {
                    return Err(PnmError::config("explicit pressure list is empty"));
                }
                if let Some(bad) = list.iter().find(|p| !p.is_finite()) {
                    return Err(PnmError::config(format!("explicit pressure {bad} is not finite")));
                }
                let mut steps: Vec<f64> = list.iter().copied().filter(|&p| within(p)).collect();
                if steps.is_empty() {
                    return Err(PnmError::config("no explicit pressure lies within the bounds"));
                }
                steps.sort_by(f64::total_cmp);
                steps
            }
        };
        steps.dedup();
        Ok(steps)
    }
}

/// `n` points from `lo` to `hi`, geometric when `lo > 0`, with exact ends.
fn spaced(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![hi];
    }
    let last = (n - 1) as f64;
    let mut points: Vec<f64> = if lo > 0.0 {
        let (a, b) = (lo.ln(), hi.ln());
        (0..n).map(|i| (a + (b - a) * i as f64 / last).exp()).collect()
    } else {
        (0..n).map(|i| lo + (hi - lo) * i as f64 / last).collect()
    };
    points[0] = lo;
    points[n - 1] = hi;
    // exp/ln round trips can break strict ordering near equal ends.
    for i in 1..n {
        if points[i] < points[i - 1] {
            points[i] = points[i - 1];
        }
    }
    points
}

// ─── Run state ───────────────────────────────────────────────────────────────

/// Lifecycle of a drainage run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    /// Configured, not validated yet.
    NotStarted,
    /// Validated; steps remain.
    Running,
    /// Every step processed; the record can be taken.
    Completed,
    /// Stopped by invalid input, `abort()` or cancellation.
    Aborted,
}

impl RunState {
    /// Short lowercase name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

/// Position of a run, handed to the `run_with` callback before each step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepProgress {
    /// Index of the step about to run.
    pub step: usize,
    /// Number of steps in the schedule.
    pub total_steps: usize,
    /// Pressure of the step about to run.
    pub pressure: f64,
    /// Pores invaded so far, baseline included.
    pub invaded_pores: usize,
    /// Released elements still waiting on inlet access.
    pub pending: usize,
}

/// Working state of a started run.
#[derive(Debug)]
struct Active {
    forest: ClusterForest,
    /// Releasable elements in `(threshold, element)` order.
    queue: Vec<(f64, Element)>,
    cursor: usize,
    steps: Vec<f64>,
    next: usize,
    pore_ready: Vec<bool>,
    throat_ready: Vec<bool>,
    pore_invaded: Vec<bool>,
    throat_invaded: Vec<bool>,
    invaded_pores: usize,
    baseline: Vec<PoreId>,
    events: Vec<InvasionEvent>,
    diagnostics: Vec<Diagnostic>,
    broke_through: bool,
}

impl Active {
    fn release_throat(&mut self, network: &Network, throat: ThroatId, out: &mut Vec<Element>) {
        self.throat_ready[throat.index()] = true;
        let (a, b) = network.endpoints_of(throat);
        match (self.pore_ready[a.index()], self.pore_ready[b.index()]) {
            (true, true) => out.extend(self.forest.release(throat, a, b)),
            (true, false) => self.attach(a, Element::Throat(throat), out),
            (false, true) => self.attach(b, Element::Throat(throat), out),
            // Attached when one of its pores becomes available.
            (false, false) => {}
        }
    }

    fn release_pore(&mut self, network: &Network, pore: PoreId, out: &mut Vec<Element>) {
        self.pore_ready[pore.index()] = true;
        self.attach(pore, Element::Pore(pore), out);
        for (throat, other) in network.adjacent_pores(pore) {
            if !self.throat_ready[throat.index()] {
                continue;
            }
            if self.pore_ready[other.index()] {
                // Already attached on the other side.
                out.extend(self.forest.merge(pore, other));
            } else {
                self.attach(pore, Element::Throat(throat), out);
            }
        }
    }

    fn attach(&mut self, pore: PoreId, member: Element, out: &mut Vec<Element>) {
        if self.forest.attach(pore, member) {
            out.push(member);
        }
    }

    fn progress(&self) -> StepProgress {
        StepProgress {
            step: self.next,
            total_steps: self.steps.len(),
            pressure: self.steps.get(self.next).copied().unwrap_or(f64::INFINITY),
            invaded_pores: self.invaded_pores,
            pending: self.forest.total_pending(),
        }
    }
}

// ─── Drainage ────────────────────────────────────────────────────────────────

/// One access-limited drainage run over a borrowed network and threshold table.
///
/// ```rust
/// use pnm_core::drainage::{Drainage, RunConfig};
/// use pnm_core::network::{Network, Topology};
/// use pnm_core::threshold::ThresholdTable;
///
/// let net = Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0)).unwrap();
/// let table = ThresholdTable::from_values(vec![10.0, 20.0]);
/// let record = Drainage::new(&net, &table, RunConfig::default()).run().unwrap();
/// assert_eq!(record.pressures(), vec![10.0, 20.0]);
/// ```
#[derive(Debug)]
pub struct Drainage<'a> {
    network: &'a Network,
    thresholds: &'a ThresholdTable,
    config: RunConfig,
    inlets: Vec<PoreId>,
    state: RunState,
    active: Option<Active>,
}

impl<'a> Drainage<'a> {
    /// New run using the network's inlet pores.
    pub fn new(network: &'a Network, thresholds: &'a ThresholdTable, config: RunConfig) -> Self {
        Self {
            network,
            thresholds,
            config,
            inlets: network.boundary_pores(BoundaryRole::Inlet).to_vec(),
            state: RunState::NotStarted,
            active: None,
        }
    }

    /// Replace the inlet set for this run only.
    pub fn with_inlets(mut self, inlets: &[PoreId]) -> Self {
        let mut inlets = inlets.to_vec();
        inlets.sort_unstable();
        inlets.dedup();
        self.inlets = inlets;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn require(&self, expected: RunState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PnmError::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    /// Validate inputs and build the initial state: inlets invaded, nothing else.
    ///
    /// On failure the run moves to [`RunState::Aborted`] and no state is kept.
    pub fn start(&mut self) -> Result<()> {
        self.require(RunState::NotStarted)?;
        match self.prepare() {
            Ok(active) => {
                info!(
                    pores = self.network.num_pores(),
                    throats = self.network.num_throats(),
                    inlets = self.inlets.len(),
                    steps = active.steps.len(),
                    "drainage started"
                );
                let done = active.steps.is_empty()
                    || (self.config.stop_at_breakthrough && active.broke_through);
                self.active = Some(active);
                self.state = RunState::Running;
                if done {
                    self.complete();
                }
                Ok(())
            }
            Err(err) => {
                info!(error = %err, "drainage aborted before start");
                self.state = RunState::Aborted;
                Err(err)
            }
        }
    }

    fn prepare(&self) -> Result<Active> {
        let net = self.network;
        if self.inlets.is_empty() {
            return Err(PnmError::InvalidBoundaryCondition(BoundaryDefect::NoInlets));
        }
        if net.num_throats() == 0 {
            return Err(PnmError::InvalidBoundaryCondition(BoundaryDefect::NoThroats));
        }
        if let Some(&p) = self.inlets.iter().find(|p| p.index() >= net.num_pores()) {
            return Err(PnmError::InvalidBoundaryCondition(BoundaryDefect::InletOutOfRange(p)));
        }
        let diagnostics = self.thresholds.validate(net)?;

        let mut is_inlet = vec![false; net.num_pores()];
        for p in &self.inlets {
            is_inlet[p.index()] = true;
        }
        let site_bond = self.thresholds.has_pore_thresholds();

        let mut queue: Vec<(f64, Element)> = net
            .throats()
            .map(|t| (self.thresholds.threshold(t), Element::Throat(t)))
            .collect();
        if site_bond {
            queue.extend(net.pores().filter(|p| !is_inlet[p.index()]).map(|p| {
                let v = self.thresholds.pore_threshold(p).unwrap_or(f64::INFINITY);
                (v, Element::Pore(p))
            }));
        }
        queue.retain(|(v, _)| v.is_finite());
        queue.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut candidates: Vec<f64> = queue.iter().map(|(v, _)| *v).collect();
        candidates.dedup();
        let steps = self.config.schedule(&candidates)?;
        if let Some(&last) = steps.last() {
            queue.retain(|(v, _)| *v <= last);
        } else {
            queue.clear();
        }

        let mut active = Active {
            forest: ClusterForest::new(net.num_pores(), &self.inlets),
            queue,
            cursor: 0,
            steps,
            next: 0,
            pore_ready: is_inlet.clone(),
            throat_ready: vec![false; net.num_throats()],
            pore_invaded: is_inlet,
            throat_invaded: vec![false; net.num_throats()],
            invaded_pores: self.inlets.len(),
            baseline: self.inlets.clone(),
            events: Vec::new(),
            diagnostics,
            broke_through: self.inlets.iter().any(|&p| net.is_outlet(p)),
        };
        if !site_bond {
            // Bond drainage: every pore is available from the outset.
            for p in net.pores() {
                if !active.pore_ready[p.index()] {
                    active.pore_ready[p.index()] = true;
                    active.forest.attach(p, Element::Pore(p));
                }
            }
        }
        Ok(active)
    }

    /// Apply the next pressure step.
    ///
    /// Returns the recorded event, or `None` when the run has already
    /// completed.
    pub fn step(&mut self) -> Result<Option<&InvasionEvent>> {
        if self.state == RunState::Completed {
            return Ok(None);
        }
        self.require(RunState::Running)?;
        let net = self.network;
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        let Some(&pressure) = active.steps.get(active.next) else {
            self.complete();
            return Ok(None);
        };

        let mut confirmed = Vec::new();
        while let Some(&(threshold, element)) = active.queue.get(active.cursor) {
            if threshold > pressure {
                break;
            }
            active.cursor += 1;
            match element {
                Element::Throat(t) => active.release_throat(net, t, &mut confirmed),
                Element::Pore(p) => active.release_pore(net, p, &mut confirmed),
            }
        }

        confirmed.sort_unstable();
        let mut event = InvasionEvent {
            pressure,
            pores: Vec::new(),
            throats: Vec::new(),
        };
        for element in confirmed {
            match element {
                Element::Pore(p) => {
                    active.pore_invaded[p.index()] = true;
                    active.broke_through |= net.is_outlet(p);
                    event.pores.push(p);
                }
                Element::Throat(t) => {
                    active.throat_invaded[t.index()] = true;
                    event.throats.push(t);
                }
            }
        }
        active.invaded_pores += event.pores.len();
        debug!(
            step = active.next,
            pressure,
            pores = event.pores.len(),
            throats = event.throats.len(),
            pending = active.forest.total_pending(),
            "pressure step"
        );
        active.events.push(event);
        active.next += 1;

        let done = active.next == active.steps.len()
            || (self.config.stop_at_breakthrough && active.broke_through);
        if done {
            self.complete();
        }
        Ok(self.active.as_ref().and_then(|a| a.events.last()))
    }

    fn complete(&mut self) {
        self.state = RunState::Completed;
        if let Some(active) = &self.active {
            info!(
                steps = active.events.len(),
                invaded_pores = active.invaded_pores,
                breakthrough = active.broke_through,
                "drainage completed"
            );
        }
    }

    /// Stop the run at the current step boundary. The partial state is dropped.
    pub fn abort(&mut self) {
        if matches!(self.state, RunState::NotStarted | RunState::Running) {
            info!(step = self.active.as_ref().map_or(0, |a| a.next), "drainage aborted");
            self.state = RunState::Aborted;
            self.active = None;
        }
    }

    /// Start if needed and process every step.
    pub fn run(self) -> Result<InvasionRecord> {
        self.run_with(|_| true)
    }

    /// Like [`run`](Self::run), asking `keep_going` before each step.
    ///
    /// Returning `false` aborts the run with [`PnmError::Cancelled`].
    pub fn run_with<F>(mut self, mut keep_going: F) -> Result<InvasionRecord>
    where
        F: FnMut(&StepProgress) -> bool,
    {
        if self.state == RunState::NotStarted {
            self.start()?;
        }
        while self.state == RunState::Running {
            if let Some(progress) = self.progress() {
                if !keep_going(&progress) {
                    self.abort();
                    return Err(PnmError::Cancelled { step: progress.step });
                }
            }
            self.step()?;
        }
        self.finish()
    }

    /// Take the record of a completed run.
    pub fn finish(self) -> Result<InvasionRecord> {
        self.require(RunState::Completed)?;
        let net = self.network;
        let active = self.active.ok_or(PnmError::InvalidState {
            expected: RunState::Completed.name(),
            found: RunState::Aborted.name(),
        })?;
        Ok(InvasionRecord::new(
            net.num_pores(),
            net.num_throats(),
            active.baseline,
            active.events,
            net.boundary_pores(BoundaryRole::Outlet).to_vec(),
            active.diagnostics,
        ))
    }

    // ─── Queries on a live run ───────────────────────────────────────────

    /// Progress before the next step; `None` before start or after abort.
    pub fn progress(&self) -> Option<StepProgress> {
        self.active.as_ref().map(Active::progress)
    }

    /// The planned pressure schedule.
    pub fn pressures(&self) -> &[f64] {
        self.active.as_ref().map_or(&[], |a| a.steps.as_slice())
    }

    /// Events recorded so far.
    pub fn events(&self) -> &[InvasionEvent] {
        self.active.as_ref().map_or(&[], |a| a.events.as_slice())
    }

    /// Non-fatal conditions collected at start.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.active.as_ref().map_or(&[], |a| a.diagnostics.as_slice())
    }

    /// Released elements still waiting on inlet access.
    pub fn pending_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.forest.total_pending())
    }

    /// Whether `element` is invaded at the current step.
    pub fn is_invaded(&self, element: Element) -> bool {
        self.active.as_ref().is_some_and(|a| match element {
            Element::Pore(p) => a.pore_invaded.get(p.index()).copied().unwrap_or(false),
            Element::Throat(t) => a.throat_invaded.get(t.index()).copied().unwrap_or(false),
        })
    }

    /// Cluster of `pore` in the current step's forest.
    pub fn cluster(&self, pore: PoreId) -> Option<Cluster> {
        self.active
            .as_ref()
            .filter(|_| pore.index() < self.network.num_pores())
            .map(|a| a.forest.cluster(pore))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Topology;

    // ─── Helpers ──────────────────────────────────────────────────────────

    /// A(0) inlet, T0 = A–B at 10, T1 = B–C at 20.
    fn chain() -> (Network, ThresholdTable) {
        let net =
            Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0).outlet(2))
                .unwrap();
        (net, ThresholdTable::from_values(vec![10.0, 20.0]))
    }

    // ─── Schedule ─────────────────────────────────────────────────────────

    #[test]
    fn test_every_threshold_schedule() {
        let steps = RunConfig::default().schedule(&[1.0, 2.0, 5.0]).unwrap();
        assert_eq!(steps, vec![1.0, 2.0, 5.0]);
        let steps = RunConfig::default().bounded(1.5, 4.0).schedule(&[1.0, 2.0, 5.0]).unwrap();
        assert_eq!(steps, vec![1.5, 2.0]);
    }

    #[test]
    fn test_count_schedule_is_log_spaced_with_exact_ends() {
        let steps = RunConfig::count(3).schedule(&[1.0, 50.0, 100.0]).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], 1.0);
        assert_eq!(steps[2], 100.0);
        assert!((steps[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_schedule_linear_from_zero() {
        let steps = RunConfig::count(3).bounded(0.0, 10.0).schedule(&[]).unwrap();
        assert_eq!(steps, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_count_one_is_upper_bound() {
        assert_eq!(RunConfig::count(1).schedule(&[2.0, 8.0]).unwrap(), vec![8.0]);
    }

    #[test]
    fn test_bad_schedules_rejected() {
        assert!(RunConfig::count(0).schedule(&[1.0]).is_err());
        assert!(RunConfig::explicit(vec![]).schedule(&[1.0]).is_err());
        assert!(RunConfig::explicit(vec![1.0, f64::NAN]).schedule(&[1.0]).is_err());
        assert!(RunConfig::default().bounded(5.0, 1.0).schedule(&[1.0]).is_err());
        assert!(RunConfig::explicit(vec![1.0]).bounded(2.0, 3.0).schedule(&[]).is_err());
    }

    #[test]
    fn test_explicit_sorted_and_deduplicated() {
        let steps = RunConfig::explicit(vec![20.0, 5.0, 20.0, 10.0]).schedule(&[]).unwrap();
        assert_eq!(steps, vec![5.0, 10.0, 20.0]);
    }

    // ─── State machine ────────────────────────────────────────────────────

    #[test]
    fn test_step_by_step() {
        let (net, table) = chain();
        let mut run = Drainage::new(&net, &table, RunConfig::explicit(vec![5.0, 10.0, 15.0, 20.0]));
        assert_eq!(run.state(), RunState::NotStarted);
        run.start().unwrap();
        assert_eq!(run.state(), RunState::Running);
        assert!(run.is_invaded(Element::Pore(PoreId(0))));

        assert!(run.step().unwrap().unwrap().is_empty());
        let ev = run.step().unwrap().unwrap().clone();
        assert_eq!(ev.pores, vec![PoreId(1)]);
        assert_eq!(ev.throats, vec![ThroatId(0)]);
        run.step().unwrap();
        let ev = run.step().unwrap().unwrap().clone();
        assert_eq!(ev.pores, vec![PoreId(2)]);
        assert_eq!(run.state(), RunState::Completed);
        assert!(run.step().unwrap().is_none());

        let record = run.finish().unwrap();
        assert_eq!(record.events().len(), 4);
        assert_eq!(record.baseline(), &[PoreId(0)]);
    }

    #[test]
    fn test_step_before_start_is_invalid_state() {
        let (net, table) = chain();
        let mut run = Drainage::new(&net, &table, RunConfig::default());
        assert!(matches!(run.step(), Err(PnmError::InvalidState { .. })));
    }

    #[test]
    fn test_finish_requires_completion() {
        let (net, table) = chain();
        let mut run = Drainage::new(&net, &table, RunConfig::default());
        run.start().unwrap();
        assert!(matches!(run.finish(), Err(PnmError::InvalidState { .. })));
    }

    #[test]
    fn test_no_inlets_aborts_before_state() {
        let net = Network::from_topology(&Topology::new(2).throat(0, 1)).unwrap();
        let table = ThresholdTable::from_values(vec![1.0]);
        let mut run = Drainage::new(&net, &table, RunConfig::default());
        let err = run.start().unwrap_err();
        assert_eq!(err, PnmError::InvalidBoundaryCondition(BoundaryDefect::NoInlets));
        assert_eq!(run.state(), RunState::Aborted);
        assert!(run.events().is_empty());
        assert!(run.progress().is_none());
    }

    #[test]
    fn test_zero_throats_aborts() {
        let net = Network::from_topology(&Topology::new(2).inlet(0)).unwrap();
        let table = ThresholdTable::from_values(vec![]);
        let err = Drainage::new(&net, &table, RunConfig::default()).run().unwrap_err();
        assert_eq!(err, PnmError::InvalidBoundaryCondition(BoundaryDefect::NoThroats));
    }

    #[test]
    fn test_inlet_override_out_of_range() {
        let (net, table) = chain();
        let err = Drainage::new(&net, &table, RunConfig::default())
            .with_inlets(&[PoreId(9)])
            .run()
            .unwrap_err();
        assert_eq!(
            err,
            PnmError::InvalidBoundaryCondition(BoundaryDefect::InletOutOfRange(PoreId(9)))
        );
        assert_eq!(err.element(), Some(Element::Pore(PoreId(9))));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let (net, _) = chain();
        let table = ThresholdTable::from_values(vec![1.0, f64::NAN]);
        let err = Drainage::new(&net, &table, RunConfig::default()).run().unwrap_err();
        assert_eq!(err.element(), Some(Element::Throat(ThroatId(1))));
    }

    #[test]
    fn test_short_table_degrades_with_diagnostic() {
        let (net, _) = chain();
        let table = ThresholdTable::from_values(vec![1.0]);
        let record = Drainage::new(&net, &table, RunConfig::default()).run().unwrap();
        assert_eq!(record.diagnostics().len(), 1);
        assert_eq!(record.pore_invasion_pressure(PoreId(2)), f64::INFINITY);
    }

    #[test]
    fn test_abort_drops_state() {
        let (net, table) = chain();
        let mut run = Drainage::new(&net, &table, RunConfig::default());
        run.start().unwrap();
        run.step().unwrap();
        run.abort();
        assert_eq!(run.state(), RunState::Aborted);
        assert!(matches!(run.step(), Err(PnmError::InvalidState { .. })));
    }

    #[test]
    fn test_cancel_at_step_boundary() {
        let (net, table) = chain();
        let err = Drainage::new(&net, &table, RunConfig::default())
            .run_with(|p| p.step < 1)
            .unwrap_err();
        assert_eq!(err, PnmError::Cancelled { step: 1 });
    }

    #[test]
    fn test_pending_until_access() {
        // 0 inlet; 1–2 cheap but only reachable through expensive 0–1.
        let net =
            Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0)).unwrap();
        let table = ThresholdTable::from_values(vec![10.0, 1.0]);
        let mut run = Drainage::new(&net, &table, RunConfig::default());
        run.start().unwrap();
        let ev = run.step().unwrap().unwrap().clone();
        assert!(ev.is_empty());
        // pores 1 and 2 plus throat 1 wait in one cluster
        assert_eq!(run.pending_count(), 3);
        assert_eq!(run.cluster(PoreId(2)).unwrap().size, 2);

        let ev = run.step().unwrap().unwrap().clone();
        assert_eq!(ev.pores, vec![PoreId(1), PoreId(2)]);
        assert_eq!(ev.throats, vec![ThroatId(0), ThroatId(1)]);
        assert_eq!(run.pending_count(), 0);
    }

    #[test]
    fn test_stop_at_breakthrough() {
        // 0 inlet – 1 outlet at 5, 1 – 2 at 50.
        let net =
            Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0).outlet(1))
                .unwrap();
        let table = ThresholdTable::from_values(vec![5.0, 50.0]);
        let record = Drainage::new(&net, &table, RunConfig::default().until_breakthrough())
            .run()
            .unwrap();
        assert_eq!(record.pressures(), vec![5.0]);
        assert_eq!(record.breakthrough_pressure(), Some(5.0));
    }

    #[test]
    fn test_site_bond_pore_gates_passage() {
        // 0 inlet – 1 – 2, throats cheap, pore 1 expensive.
        let net =
            Network::from_topology(&Topology::new(3).throat(0, 1).throat(1, 2).inlet(0)).unwrap();
        let table = ThresholdTable::from_values(vec![1.0, 1.0]).with_pore_thresholds(vec![
            f64::INFINITY,
            30.0,
            2.0,
        ]);
        let record = Drainage::new(&net, &table, RunConfig::default()).run().unwrap();
        assert_eq!(record.pressures(), vec![1.0, 2.0, 30.0]);
        // throat 0 enters at 1 against the inlet; nothing else until pore 1 opens
        assert_eq!(record.throat_invasion_pressure(ThroatId(0)), 1.0);
        assert_eq!(record.pore_invasion_pressure(PoreId(1)), 30.0);
        assert_eq!(record.pore_invasion_pressure(PoreId(2)), 30.0);
        assert_eq!(record.throat_invasion_pressure(ThroatId(1)), 30.0);
    }

    #[test]
    fn test_no_finite_thresholds_completes_with_baseline() {
        let (net, _) = chain();
        let table = ThresholdTable::from_values(vec![f64::INFINITY, f64::INFINITY]);
        let record = Drainage::new(&net, &table, RunConfig::default()).run().unwrap();
        assert!(record.events().is_empty());
        assert_eq!(record.baseline(), &[PoreId(0)]);
    }
}
