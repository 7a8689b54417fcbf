use crate::error::{Error, Result};
use ndarray::{Array1, CowArray, Ix1, Zip};
use std::fmt;

/// Value produced by evaluating a random variable.
///
/// Scalars come from single samples, arrays from batched samples (one
/// element per draw) or from array-valued constants. Scalars broadcast
/// against arrays, and booleans count as `0.0`/`1.0` in arithmetic, so a
/// sum of Bernoulli draws is a count.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Real(f64),
    Bool(bool),
    RealArray(Array1<f64>),
    BoolArray(Array1<bool>),
}

/// A value viewed as a scalar or a one-dimensional lane of elements.
enum Lane<'a, T> {
    Scalar(T),
    Array(CowArray<'a, T, Ix1>),
}

/// Result of an elementwise operation before it is wrapped as a [`Value`].
enum Broadcast<R> {
    Scalar(R),
    Array(Array1<R>),
}

impl From<Broadcast<f64>> for Value {
    fn from(b: Broadcast<f64>) -> Self {
        match b {
            Broadcast::Scalar(x) => Value::Real(x),
            Broadcast::Array(a) => Value::RealArray(a),
        }
    }
}

impl From<Broadcast<bool>> for Value {
    fn from(b: Broadcast<bool>) -> Self {
        match b {
            Broadcast::Scalar(x) => Value::Bool(x),
            Broadcast::Array(a) => Value::BoolArray(a),
        }
    }
}

fn bool_to_real(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn broadcast<A: Copy, B: Copy, R>(
    lhs: &Lane<'_, A>,
    rhs: &Lane<'_, B>,
    f: impl Fn(A, B) -> R,
) -> Result<Broadcast<R>> {
    Ok(match (lhs, rhs) {
        (Lane::Scalar(a), Lane::Scalar(b)) => Broadcast::Scalar(f(*a, *b)),
        (Lane::Scalar(a), Lane::Array(bs)) => Broadcast::Array(bs.map(|&b| f(*a, b))),
        (Lane::Array(xs), Lane::Scalar(b)) => Broadcast::Array(xs.map(|&a| f(a, *b))),
        (Lane::Array(xs), Lane::Array(bs)) => {
            if xs.len() != bs.len() {
                return Err(Error::ShapeMismatch {
                    left: xs.len(),
                    right: bs.len(),
                });
            }
            Broadcast::Array(Zip::from(xs).and(bs).map_collect(|&a, &b| f(a, b)))
        }
    })
}

impl<T: Copy> Lane<'_, T> {
    fn len(&self) -> Option<usize> {
        match self {
            Lane::Scalar(_) => None,
            Lane::Array(a) => Some(a.len()),
        }
    }

    fn get(&self, i: usize) -> T {
        match self {
            Lane::Scalar(x) => *x,
            Lane::Array(a) => a[i],
        }
    }
}

impl Value {
    fn real_lane(&self) -> Lane<'_, f64> {
        match self {
            Value::Real(x) => Lane::Scalar(*x),
            Value::Bool(b) => Lane::Scalar(bool_to_real(*b)),
            Value::RealArray(a) => Lane::Array(CowArray::from(a.view())),
            Value::BoolArray(a) => Lane::Array(CowArray::from(a.mapv(bool_to_real))),
        }
    }

    fn bool_lane(&self) -> Lane<'_, bool> {
        match self {
            Value::Real(x) => Lane::Scalar(*x != 0.0),
            Value::Bool(b) => Lane::Scalar(*b),
            Value::RealArray(a) => Lane::Array(CowArray::from(a.mapv(|x| x != 0.0))),
            Value::BoolArray(a) => Lane::Array(CowArray::from(a.view())),
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
            Value::RealArray(_) => "real array",
            Value::BoolArray(_) => "bool array",
        }
    }

    /// Scalar value as a real; booleans map to `0.0`/`1.0`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            Value::Bool(b) => Some(bool_to_real(*b)),
            _ => None,
        }
    }

    /// Scalar boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of elements of an array value, `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::RealArray(a) => Some(a.len()),
            Value::BoolArray(a) => Some(a.len()),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.len().is_some()
    }

    /// Elements as reals, repeating a scalar `len` times.
    ///
    /// Used to line up constant results with batched ones.
    pub fn broadcast_to(&self, len: usize) -> Result<Array1<f64>> {
        match self.real_lane() {
            Lane::Scalar(x) => Ok(Array1::from_elem(len, x)),
            Lane::Array(a) if a.len() == len => Ok(a.into_owned()),
            Lane::Array(a) => Err(Error::ShapeMismatch {
                left: a.len(),
                right: len,
            }),
        }
    }

    /// Elements as reals; a scalar becomes a one-element array.
    pub fn to_reals(&self) -> Array1<f64> {
        match self.real_lane() {
            Lane::Scalar(x) => Array1::from_elem(1, x),
            Lane::Array(a) => a.into_owned(),
        }
    }

    pub fn map_real(&self, f: impl Fn(f64) -> f64) -> Value {
        match self.real_lane() {
            Lane::Scalar(x) => Value::Real(f(x)),
            Lane::Array(a) => Value::RealArray(a.mapv(f)),
        }
    }

    pub fn map_bool(&self, f: impl Fn(bool) -> bool) -> Value {
        match self.bool_lane() {
            Lane::Scalar(x) => Value::Bool(f(x)),
            Lane::Array(a) => Value::BoolArray(a.mapv(f)),
        }
    }

    /// Elementwise real operation with broadcasting.
    pub fn zip_real(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        broadcast(&self.real_lane(), &other.real_lane(), f).map(Value::from)
    }

    /// Elementwise real operation over three operands with broadcasting.
    pub fn zip3_real(
        &self,
        second: &Value,
        third: &Value,
        f: impl Fn(f64, f64, f64) -> f64,
    ) -> Result<Value> {
        let lanes = [self.real_lane(), second.real_lane(), third.real_lane()];
        let mut len = None;
        for lane_len in lanes.iter().filter_map(Lane::len) {
            match len {
                Some(expected) if expected != lane_len => {
                    return Err(Error::ShapeMismatch {
                        left: expected,
                        right: lane_len,
                    })
                }
                _ => len = Some(lane_len),
            }
        }
        let [a, b, c] = &lanes;
        Ok(match len {
            None => Value::Real(f(a.get(0), b.get(0), c.get(0))),
            Some(len) => Value::RealArray(Array1::from_shape_fn(len, |i| {
                f(a.get(i), b.get(i), c.get(i))
            })),
        })
    }

    /// Elementwise comparison of reals with broadcasting.
    pub fn zip_compare(&self, other: &Value, f: impl Fn(f64, f64) -> bool) -> Result<Value> {
        broadcast(&self.real_lane(), &other.real_lane(), f).map(Value::from)
    }

    /// Elementwise logical operation with broadcasting; reals are truthy when non-zero.
    pub fn zip_bool(&self, other: &Value, f: impl Fn(bool, bool) -> bool) -> Result<Value> {
        broadcast(&self.bool_lane(), &other.bool_lane(), f).map(Value::from)
    }

    /// Elementwise sum of any number of values; the empty sum is `0.0`.
    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<Value> {
        values
            .into_iter()
            .try_fold(Value::Real(0.0), |acc, v| acc.zip_real(v, |a, b| a + b))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Array1<f64>> for Value {
    fn from(a: Array1<f64>) -> Self {
        Value::RealArray(a)
    }
}

impl From<Array1<bool>> for Value {
    fn from(a: Array1<bool>) -> Self {
        Value::BoolArray(a)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::RealArray(Array1::from(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Real(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::RealArray(a) => write!(f, "{}", a),
            Value::BoolArray(a) => write!(f, "{}", a),
        }
    }
}
