//! The shared source of randomness.
//!
//! A [`Universe`] owns the slot counter, the ChaCha8 generator, the node
//! arena and the restart epoch. Every atomic uniform takes one slot; a
//! sample is one uniform(0,1) draw per slot, and every random variable
//! is a pure function of such a sample.
//!
//! `Universe` is a cheap `Rc` handle. It is neither `Send` nor `Sync`:
//! construction and sampling must stay on one thread.

use crate::error::{Error, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::lift::Function;
use crate::value::Value;
use crate::variable::{Operand, RandomVariable};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Open01};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Configuration for a universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Seed of the generator at creation time.
    pub seed: u64,
    /// Cache node values within one evaluation, so shared sub-expressions
    /// are computed once per call instead of once per reference.
    pub memoize: bool,
}

/// Uniform draws fed to [`RandomVariable::evaluate`].
///
/// A batch has shape `(n, k)`: row `i` holds the `k` draws of slot `i`.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Single(Array1<f64>),
    Batch(Array2<f64>),
}

impl Sample {
    /// Number of slots covered by the sample.
    pub fn dim(&self) -> usize {
        match self {
            Sample::Single(s) => s.len(),
            Sample::Batch(b) => b.nrows(),
        }
    }

    /// Number of draws in a batch, `None` for a single sample.
    pub fn batch_size(&self) -> Option<usize> {
        match self {
            Sample::Single(_) => None,
            Sample::Batch(b) => Some(b.ncols()),
        }
    }

    /// The `j`-th draw of a batch as a single sample.
    pub fn column(&self, j: usize) -> Option<Sample> {
        match self {
            Sample::Batch(b) if j < b.ncols() => Some(Sample::Single(b.column(j).to_owned())),
            _ => None,
        }
    }

    /// Component `slot` of every draw, `None` past the sample dimension.
    pub(crate) fn component(&self, slot: usize) -> Option<Value> {
        match self {
            Sample::Single(s) => s.get(slot).copied().map(Value::Real),
            Sample::Batch(b) if slot < b.nrows() => Some(Value::RealArray(b.row(slot).to_owned())),
            Sample::Batch(_) => None,
        }
    }
}

impl From<Vec<f64>> for Sample {
    fn from(v: Vec<f64>) -> Self {
        Sample::Single(Array1::from(v))
    }
}

impl From<Array1<f64>> for Sample {
    fn from(a: Array1<f64>) -> Self {
        Sample::Single(a)
    }
}

impl From<Array2<f64>> for Sample {
    fn from(a: Array2<f64>) -> Self {
        Sample::Batch(a)
    }
}

/// Generator state and slot count captured by [`Universe::save`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseSnapshot {
    n: usize,
    seed: u64,
    epoch: u64,
    rng: ChaCha8Rng,
}

impl UniverseSnapshot {
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

struct State {
    config: UniverseConfig,
    seed: u64,
    n: usize,
    epoch: u64,
    rng: ChaCha8Rng,
    graph: Graph,
}

/// Handle onto a shared universe. Clones refer to the same universe.
#[derive(Clone)]
pub struct Universe {
    state: Rc<RefCell<State>>,
}

impl Universe {
    /// A universe seeded with `0`.
    pub fn new() -> Self {
        Self::from_config(UniverseConfig::default())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_config(UniverseConfig {
            seed,
            ..UniverseConfig::default()
        })
    }

    pub fn from_config(config: UniverseConfig) -> Self {
        debug!(seed = config.seed, memoize = config.memoize, "universe created");
        let state = State {
            seed: config.seed,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            n: 0,
            epoch: 0,
            graph: Graph::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Number of slots allocated since the last restart.
    pub fn n(&self) -> usize {
        self.state.borrow().n
    }

    /// Seed of the current generator stream.
    pub fn seed(&self) -> u64 {
        self.state.borrow().seed
    }

    /// Number of restarts performed so far.
    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn config(&self) -> UniverseConfig {
        self.state.borrow().config.clone()
    }

    /// Number of nodes built since the last restart.
    pub fn node_count(&self) -> usize {
        self.state.borrow().graph.len()
    }

    /// Whether two handles refer to the same universe.
    pub fn same(&self, other: &Universe) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn allocate_slot(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let slot = state.n;
        state.n += 1;
        trace!(slot, "allocated slot");
        slot
    }

    /// Draws one uniform(0,1) value per slot.
    pub fn sample(&self) -> Sample {
        let mut state = self.state.borrow_mut();
        let n = state.n;
        let draws: Array1<f64> = (0..n)
            .map(|_| -> f64 { Open01.sample(&mut state.rng) })
            .collect();
        trace!(n, "drew sample");
        Sample::Single(draws)
    }

    /// Draws `k` samples at once as an `(n, k)` batch.
    ///
    /// The generator is consumed in the same order as `k` successive
    /// [`sample`](Self::sample) calls, so column `j` of the batch equals
    /// the `j`-th of those single draws.
    pub fn sample_batch(&self, k: usize) -> Sample {
        let mut state = self.state.borrow_mut();
        let n = state.n;
        let draws: Vec<f64> = (0..n * k)
            .map(|_| -> f64 { Open01.sample(&mut state.rng) })
            .collect();
        trace!(n, k, "drew sample batch");
        Sample::Batch(Array2::from_shape_fn((n, k), |(i, j)| draws[j * n + i]))
    }

    /// Zeroes the slot count, reseeds the generator and invalidates every
    /// random variable created so far.
    ///
    /// Slot indices are reused after a restart, so variables from the old
    /// epoch would otherwise read unrelated draws.
    pub fn restart(&self, seed: u64) {
        let mut state = self.state.borrow_mut();
        let discarded = state.graph.len();
        state.graph.clear();
        state.n = 0;
        state.epoch += 1;
        state.seed = seed;
        state.rng = ChaCha8Rng::seed_from_u64(seed);
        debug!(seed, epoch = state.epoch, discarded, "universe restarted");
    }

    /// Captures the slot count and generator state.
    pub fn save(&self) -> UniverseSnapshot {
        let state = self.state.borrow();
        debug!(n = state.n, epoch = state.epoch, "universe saved");
        UniverseSnapshot {
            n: state.n,
            seed: state.seed,
            epoch: state.epoch,
            rng: state.rng.clone(),
        }
    }

    /// Restores the slot count and generator of a snapshot; no variable is
    /// invalidated.
    ///
    /// Fails with [`Error::StaleSnapshot`] if the universe was restarted
    /// since the snapshot was taken, and with [`Error::SnapshotConflict`]
    /// if the snapshot records fewer slots than are allocated now, since
    /// restoring it would hand out owned slots a second time.
    pub fn load(&self, snapshot: &UniverseSnapshot) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if snapshot.epoch != state.epoch {
            return Err(Error::StaleSnapshot {
                snapshot: snapshot.epoch,
                current: state.epoch,
            });
        }
        if snapshot.n < state.n {
            return Err(Error::SnapshotConflict {
                snapshot: snapshot.n,
                current: state.n,
            });
        }
        state.n = snapshot.n;
        state.seed = snapshot.seed;
        state.rng = snapshot.rng.clone();
        debug!(n = state.n, epoch = state.epoch, "universe loaded");
        Ok(())
    }

    /// A constant random variable; a random `value` is frozen and delegated to.
    ///
    /// # Panics
    /// If `value` is a random variable of another universe.
    pub fn constant(&self, value: impl Into<Operand>) -> RandomVariable {
        let (id, epoch) = match value.into() {
            Operand::Value(v) => {
                let epoch = self.epoch();
                (self.state.borrow_mut().graph.add_constant(v), epoch)
            }
            Operand::Random(rv) => {
                let (target, epoch) = constructed(self.resolve(Operand::Random(rv)));
                (self.state.borrow_mut().graph.add_frozen(target), epoch)
            }
        };
        self.handle(id, epoch)
    }

    /// An atomic uniform on `[low, high]` owning the next slot.
    ///
    /// The bounds may be random; they are evaluated on the same sample as
    /// the draw itself.
    ///
    /// # Panics
    /// If a bound is a random variable of another universe.
    pub fn uniform(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> RandomVariable {
        let (low, low_epoch) = constructed(self.resolve(low.into()));
        let (high, high_epoch) = constructed(self.resolve(high.into()));
        let slot = self.allocate_slot();
        let id = self.state.borrow_mut().graph.add_uniform(slot, low, high);
        self.handle(id, low_epoch.min(high_epoch))
    }

    /// Builds a composite node over `args` and `kwargs`.
    pub(crate) fn composite(
        &self,
        function: Function,
        args: Vec<Operand>,
        kwargs: Vec<(String, Operand)>,
    ) -> Result<RandomVariable> {
        let mut epoch = self.epoch();
        let mut arg_ids = Vec::with_capacity(args.len());
        for arg in args {
            let (id, arg_epoch) = self.resolve(arg)?;
            epoch = epoch.min(arg_epoch);
            arg_ids.push(id);
        }
        let mut kwarg_ids = Vec::with_capacity(kwargs.len());
        for (name, arg) in kwargs {
            let (id, arg_epoch) = self.resolve(arg)?;
            epoch = epoch.min(arg_epoch);
            kwarg_ids.push((name, id));
        }
        let id = self
            .state
            .borrow_mut()
            .graph
            .add_composite(function, arg_ids, kwarg_ids);
        Ok(self.handle(id, epoch))
    }

    /// Node id and epoch of an operand, adding a constant node for plain values.
    fn resolve(&self, operand: Operand) -> Result<(NodeId, u64)> {
        match operand {
            Operand::Value(v) => {
                let id = self.state.borrow_mut().graph.add_constant(v);
                Ok((id, self.epoch()))
            }
            Operand::Random(rv) if rv.universe().same(self) => Ok((rv.id(), rv.epoch())),
            Operand::Random(_) => Err(Error::UniverseMismatch),
        }
    }

    fn handle(&self, id: NodeId, epoch: u64) -> RandomVariable {
        RandomVariable::from_parts(self.clone(), id, epoch)
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<Rc<Node>> {
        self.state.borrow().graph.node(id)
    }

    pub(crate) fn slots_of(&self, id: NodeId) -> Vec<usize> {
        self.state.borrow().graph.slots_of(id)
    }

    /// Checks that `epoch` is current and `sample` covers every slot.
    pub(crate) fn check(&self, epoch: u64, sample: &Sample) -> Result<()> {
        let state = self.state.borrow();
        if epoch != state.epoch {
            return Err(Error::InvalidRandomVariable);
        }
        if sample.dim() != state.n {
            return Err(Error::InvalidSample {
                expected: state.n,
                found: sample.dim(),
            });
        }
        Ok(())
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Universe")
            .field("n", &state.n)
            .field("seed", &state.seed)
            .field("epoch", &state.epoch)
            .field("nodes", &state.graph.len())
            .finish()
    }
}

/// Unwraps a construction result; operators and constructors cannot
/// return `Result`, so mixing universes there is a programming error.
pub(crate) fn constructed<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_slots_are_sequential() {
        let universe = Universe::new();
        let slots: Vec<usize> = (0..5).map(|_| universe.allocate_slot()).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4]);
        assert_eq!(universe.n(), 5);
    }

    #[test]
    fn test_empty_universe_samples_empty() {
        let universe = Universe::new();
        assert_eq!(universe.sample().dim(), 0);
        let batch = universe.sample_batch(4);
        assert_eq!(batch.dim(), 0);
        assert_eq!(batch.batch_size(), Some(4));
    }

    #[test]
    fn test_golden_first_draws() {
        let universe = Universe::with_seed(0);
        universe.allocate_slot();
        universe.allocate_slot();
        let Sample::Single(s) = universe.sample() else {
            panic!("expected a single sample");
        };
        assert_eq!(s[0], 0.7090754154265618);
        assert_eq!(s[1], 0.46592172228961026);
    }

    #[test]
    fn test_samples_in_open_unit_interval() {
        let universe = Universe::with_seed(7);
        for _ in 0..8 {
            universe.allocate_slot();
        }
        let Sample::Batch(b) = universe.sample_batch(500) else {
            panic!("expected a batch");
        };
        assert!(b.iter().all(|&u| u > 0.0 && u < 1.0));
        assert_abs_diff_eq!(b.mean().unwrap(), 0.5, epsilon = 0.02);
    }

    #[test]
    fn test_batch_matches_sequential_draws() {
        let batched = Universe::with_seed(11);
        let sequential = Universe::with_seed(11);
        for _ in 0..3 {
            batched.allocate_slot();
            sequential.allocate_slot();
        }
        let batch = batched.sample_batch(4);
        for j in 0..4 {
            assert_eq!(batch.column(j), Some(sequential.sample()));
        }
        assert_eq!(batched.sample(), sequential.sample());
    }

    #[test]
    fn test_restart_resets_and_reseeds() {
        let universe = Universe::with_seed(3);
        universe.allocate_slot();
        let first = universe.sample();
        universe.restart(3);
        assert_eq!(universe.n(), 0);
        assert_eq!(universe.epoch(), 1);
        universe.allocate_slot();
        assert_eq!(universe.sample(), first);
    }

    #[test]
    fn test_save_load_replays_stream() {
        let universe = Universe::with_seed(5);
        universe.allocate_slot();
        let snapshot = universe.save();
        let a = universe.sample();
        let b = universe.sample();
        universe.load(&snapshot).unwrap();
        assert_eq!(universe.sample(), a);
        assert_eq!(universe.sample(), b);
        assert_eq!(universe.epoch(), 0);
    }

    #[test]
    fn test_load_rejects_stale_and_conflicting_snapshots() {
        let universe = Universe::new();
        let empty = universe.save();
        universe.allocate_slot();
        assert_eq!(
            universe.load(&empty).unwrap_err(),
            Error::SnapshotConflict {
                snapshot: 0,
                current: 1
            }
        );
        let before = universe.save();
        universe.restart(0);
        universe.allocate_slot();
        assert_eq!(
            universe.load(&before).unwrap_err(),
            Error::StaleSnapshot {
                snapshot: 0,
                current: 1
            }
        );
    }

    #[test]
    fn test_config_roundtrip_defaults() {
        let config: UniverseConfig = serde_json::from_str(r#"{"memoize": true}"#).unwrap();
        assert_eq!(
            config,
            UniverseConfig {
                seed: 0,
                memoize: true
            }
        );
        let universe = Universe::from_config(config.clone());
        assert_eq!(universe.config(), config);
    }

    #[test]
    fn test_sample_component_bounds() {
        let sample = Sample::from(vec![0.25, 0.75]);
        assert_eq!(sample.component(1), Some(Value::Real(0.75)));
        assert_eq!(sample.component(2), None);
        assert_eq!(sample.column(0), None);
    }

    #[test]
    fn test_load_restores_a_larger_slot_count() {
        let universe = Universe::with_seed(2);
        universe.allocate_slot();
        let mut json = serde_json::to_value(universe.save()).unwrap();
        json["n"] = serde_json::json!(3);
        let widened: UniverseSnapshot = serde_json::from_value(json).unwrap();

        universe.load(&widened).unwrap();
        assert_eq!(universe.n(), 3);
        assert_eq!(universe.sample().dim(), 3);
        assert_eq!(universe.allocate_slot(), 3);
        assert!(matches!(
            universe.load(&widened),
            Err(Error::SnapshotConflict {
                snapshot: 3,
                current: 4
            })
        ));
    }

    #[test]
    fn test_arena_keeps_dropped_temporaries_until_restart() {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 1.0);
        let built = universe.node_count();
        for _ in 0..10 {
            let _ = &x + 1.0;
        }
        assert_eq!(universe.node_count(), built + 20);
        universe.restart(0);
        assert_eq!(universe.node_count(), 0);
    }
}
