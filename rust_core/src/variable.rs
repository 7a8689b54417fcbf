use crate::error::{Error, Result};
use crate::evaluate::Evaluator;
use crate::functions::kernels;
use crate::graph::NodeId;
use crate::lift::{lifted, Function};
use crate::universe::{Sample, Universe};
use crate::value::Value;
use ndarray::Array1;
use std::fmt;

/// Handle onto one node of a universe's expression graph.
///
/// A random variable is a pure function of the universe's sample. Handles
/// are cheap to clone and never change once built; arithmetic on them
/// builds new nodes.
///
/// Comparisons are methods (`lt`, `le`, ...) returning another random
/// variable. There is no conversion to `bool`: branch on a drawn value
/// instead.
#[derive(Clone)]
pub struct RandomVariable {
    universe: Universe,
    id: NodeId,
    epoch: u64,
}

/// Argument to a constructor or lifted function: a concrete value or a
/// random variable.
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Random(RandomVariable),
}

impl Operand {
    pub fn as_random(&self) -> Option<&RandomVariable> {
        match self {
            Operand::Random(rv) => Some(rv),
            Operand::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Random(_) => None,
        }
    }

    pub fn into_random(self) -> Option<RandomVariable> {
        match self {
            Operand::Random(rv) => Some(rv),
            Operand::Value(_) => None,
        }
    }
}

impl From<f64> for Operand {
    fn from(x: f64) -> Self {
        Operand::Value(Value::Real(x))
    }
}

impl From<i32> for Operand {
    fn from(x: i32) -> Self {
        Operand::Value(Value::Real(f64::from(x)))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Value(Value::Bool(b))
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Array1<f64>> for Operand {
    fn from(a: Array1<f64>) -> Self {
        Operand::Value(Value::RealArray(a))
    }
}

impl From<RandomVariable> for Operand {
    fn from(rv: RandomVariable) -> Self {
        Operand::Random(rv)
    }
}

impl From<&RandomVariable> for Operand {
    fn from(rv: &RandomVariable) -> Self {
        Operand::Random(rv.clone())
    }
}

impl RandomVariable {
    pub(crate) fn from_parts(universe: Universe, id: NodeId, epoch: u64) -> Self {
        Self {
            universe,
            id,
            epoch,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Epoch of the universe when this variable (or its oldest operand) was built.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// False once the universe has been restarted.
    pub fn is_valid(&self) -> bool {
        self.epoch == self.universe.epoch()
    }

    /// Evaluates the variable on a caller-supplied sample.
    ///
    /// A batched sample yields an array with one element per draw.
    pub fn evaluate(&self, sample: &Sample) -> Result<Value> {
        Evaluator::new(&self.universe, sample).evaluate(self)
    }

    /// Draws a fresh sample from the universe and evaluates on it.
    pub fn draw(&self) -> Result<Value> {
        if !self.is_valid() {
            return Err(Error::InvalidRandomVariable);
        }
        self.evaluate(&self.universe.sample())
    }

    /// Draws `k` samples at once; the result is an array of length `k`.
    pub fn draw_batch(&self, k: usize) -> Result<Array1<f64>> {
        if !self.is_valid() {
            return Err(Error::InvalidRandomVariable);
        }
        self.evaluate(&self.universe.sample_batch(k))?.broadcast_to(k)
    }

    /// Slots of the atomic uniforms this variable depends on.
    pub fn slots(&self) -> Result<Vec<usize>> {
        if !self.is_valid() {
            return Err(Error::InvalidRandomVariable);
        }
        Ok(self.universe.slots_of(self.id))
    }

    /// A constant node delegating to this variable.
    pub fn freeze(&self) -> RandomVariable {
        self.universe.constant(self)
    }

    pub(crate) fn map_unary(&self, function: Function) -> RandomVariable {
        lifted(&self.universe, function, vec![self.into()])
    }

    fn combine(&self, function: Function, other: impl Into<Operand>) -> RandomVariable {
        lifted(&self.universe, function, vec![self.into(), other.into()])
    }

    /// `self < other`
    ///
    /// # Panics
    /// If `other` belongs to another universe; this holds for every
    /// binary method below.
    pub fn lt(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("less", kernels::less), other)
    }

    /// `self <= other`
    pub fn le(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("less_equal", kernels::less_equal), other)
    }

    /// `self > other`
    pub fn gt(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("greater", kernels::greater), other)
    }

    /// `self >= other`
    pub fn ge(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("greater_equal", kernels::greater_equal), other)
    }

    /// `self == other`, elementwise.
    pub fn equals(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("equal", kernels::equal), other)
    }

    /// `self != other`, elementwise.
    pub fn not_equals(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::comparison("not_equal", kernels::not_equal), other)
    }

    /// `floor(self / other)`
    pub fn floor_div(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::binary("floor_divide", kernels::floor_divide), other)
    }

    pub fn pow(&self, exponent: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::binary("power", kernels::power), exponent)
    }

    /// Unary plus: a new node with the same value.
    pub fn pos(&self) -> RandomVariable {
        self.map_unary(Function::unary("positive", kernels::positive))
    }

    pub fn max(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::binary("maximum", kernels::maximum), other)
    }

    pub fn min(&self, other: impl Into<Operand>) -> RandomVariable {
        self.combine(Function::binary("minimum", kernels::minimum), other)
    }
}

impl fmt::Debug for RandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomVariable")
            .field("id", &self.id.0)
            .field("epoch", &self.epoch)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// A random variable has no truth value until it is evaluated.
impl TryFrom<&RandomVariable> for bool {
    type Error = Error;

    fn try_from(_: &RandomVariable) -> Result<bool> {
        Err(Error::BooleanCoercion)
    }
}

impl TryFrom<RandomVariable> for bool {
    type Error = Error;

    fn try_from(rv: RandomVariable) -> Result<bool> {
        bool::try_from(&rv)
    }
}
