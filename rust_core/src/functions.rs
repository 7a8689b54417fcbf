//! Elementwise numeric functions lifted onto random variables.
//!
//! The registry is hand-maintained: every entry is listed below, and
//! [`lookup`] resolves names against a per-thread copy built on first use.

use crate::error::Result;
use crate::lift::Function;
use crate::special;
use crate::variable::{Operand, RandomVariable};
use std::collections::BTreeMap;

/// Scalar kernels shared by the registry, the operators and the methods.
pub(crate) mod kernels {
    pub fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    pub fn subtract(a: f64, b: f64) -> f64 {
        a - b
    }

    pub fn multiply(a: f64, b: f64) -> f64 {
        a * b
    }

    pub fn divide(a: f64, b: f64) -> f64 {
        a / b
    }

    pub fn floor_divide(a: f64, b: f64) -> f64 {
        (a / b).floor()
    }

    /// Truncated remainder, matching `%` on `f64`.
    pub fn remainder(a: f64, b: f64) -> f64 {
        a % b
    }

    pub fn power(a: f64, b: f64) -> f64 {
        a.powf(b)
    }

    // NaN in either argument propagates, unlike f64::max
    pub fn maximum(a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            a.max(b)
        }
    }

    pub fn minimum(a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            a.min(b)
        }
    }

    pub fn negative(x: f64) -> f64 {
        -x
    }

    pub fn positive(x: f64) -> f64 {
        x
    }

    pub fn square(x: f64) -> f64 {
        x * x
    }

    /// `-1`, `0` or `1`; NaN stays NaN.
    pub fn sign(x: f64) -> f64 {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            x
        }
    }

    pub fn less(a: f64, b: f64) -> bool {
        a < b
    }

    pub fn less_equal(a: f64, b: f64) -> bool {
        a <= b
    }

    pub fn greater(a: f64, b: f64) -> bool {
        a > b
    }

    pub fn greater_equal(a: f64, b: f64) -> bool {
        a >= b
    }

    pub fn equal(a: f64, b: f64) -> bool {
        a == b
    }

    pub fn not_equal(a: f64, b: f64) -> bool {
        a != b
    }

    pub fn logical_not(a: bool) -> bool {
        !a
    }

    pub fn truth(a: bool) -> bool {
        a
    }

    pub fn logical_and(a: bool, b: bool) -> bool {
        a && b
    }

    pub fn logical_or(a: bool, b: bool) -> bool {
        a || b
    }

    pub fn logical_xor(a: bool, b: bool) -> bool {
        a != b
    }
}

macro_rules! unary_functions {
    ($($name:ident => $kernel:path;)*) => {
        const UNARY: &[(&str, fn(f64) -> f64)] = &[$((stringify!($name), $kernel)),*];

        $(
            pub fn $name(x: impl Into<Operand>) -> Operand {
                match x.into() {
                    Operand::Random(rv) => {
                        Operand::Random(rv.map_unary(Function::unary(stringify!($name), $kernel)))
                    }
                    Operand::Value(v) => Operand::Value(v.map_real($kernel)),
                }
            }
        )*
    };
}

unary_functions! {
    exp => f64::exp;
    exp2 => f64::exp2;
    expm1 => f64::exp_m1;
    log => f64::ln;
    log2 => f64::log2;
    log10 => f64::log10;
    log1p => f64::ln_1p;
    sqrt => f64::sqrt;
    cbrt => f64::cbrt;
    square => kernels::square;
    sin => f64::sin;
    cos => f64::cos;
    tan => f64::tan;
    arcsin => f64::asin;
    arccos => f64::acos;
    arctan => f64::atan;
    sinh => f64::sinh;
    cosh => f64::cosh;
    tanh => f64::tanh;
    arcsinh => f64::asinh;
    arccosh => f64::acosh;
    arctanh => f64::atanh;
    absolute => f64::abs;
    sign => kernels::sign;
    floor => f64::floor;
    ceil => f64::ceil;
    rint => f64::round_ties_even;
    trunc => f64::trunc;
    erf => special::erf;
    erfc => special::erfc;
    erfinv => special::erfinv;
}

macro_rules! predicate_functions {
    ($($name:ident => $kernel:path;)*) => {
        const PREDICATE: &[(&str, fn(bool) -> bool)] = &[$((stringify!($name), $kernel)),*];

        $(
            pub fn $name(x: impl Into<Operand>) -> Operand {
                match x.into() {
                    Operand::Random(rv) => {
                        let function = Function::predicate(stringify!($name), $kernel);
                        Operand::Random(rv.map_unary(function))
                    }
                    Operand::Value(v) => Operand::Value(v.map_bool($kernel)),
                }
            }
        )*
    };
}

predicate_functions! {
    logical_not => kernels::logical_not;
    truth => kernels::truth;
}

macro_rules! binary_functions {
    ($table:ident, $constructor:ident, $ty:ty; $($name:ident => $kernel:path;)*) => {
        const $table: &[(&str, $ty)] = &[$((stringify!($name), $kernel)),*];

        $(
            /// Fails only on a universe mismatch or when two arrays of
            /// different length are combined.
            pub fn $name(a: impl Into<Operand>, b: impl Into<Operand>) -> Result<Operand> {
                Function::$constructor(stringify!($name), $kernel).call(vec![a.into(), b.into()])
            }
        )*
    };
}

binary_functions! {
    BINARY, binary, fn(f64, f64) -> f64;
    add => kernels::add;
    subtract => kernels::subtract;
    multiply => kernels::multiply;
    divide => kernels::divide;
    floor_divide => kernels::floor_divide;
    power => kernels::power;
    remainder => kernels::remainder;
    arctan2 => f64::atan2;
    hypot => f64::hypot;
    maximum => kernels::maximum;
    minimum => kernels::minimum;
}

binary_functions! {
    LOGICAL, logical, fn(bool, bool) -> bool;
    logical_and => kernels::logical_and;
    logical_or => kernels::logical_or;
    logical_xor => kernels::logical_xor;
}

binary_functions! {
    COMPARISON, comparison, fn(f64, f64) -> bool;
    less => kernels::less;
    less_equal => kernels::less_equal;
    equal => kernels::equal;
    not_equal => kernels::not_equal;
    greater_equal => kernels::greater_equal;
    greater => kernels::greater;
}

/// Named functions available for lookup.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in elementwise function.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for &(name, f) in UNARY {
            registry.register(Function::unary(name, f));
        }
        for &(name, f) in PREDICATE {
            registry.register(Function::predicate(name, f));
        }
        for &(name, f) in BINARY {
            registry.register(Function::binary(name, f));
        }
        for &(name, f) in LOGICAL {
            registry.register(Function::logical(name, f));
        }
        for &(name, f) in COMPARISON {
            registry.register(Function::comparison(name, f));
        }
        registry
    }

    /// Adds a function under its own name, returning any function it replaces.
    pub fn register(&mut self, function: Function) -> Option<Function> {
        self.functions.insert(function.name().to_string(), function)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

thread_local! {
    static STANDARD: FunctionRegistry = FunctionRegistry::standard();
}

/// Looks up a built-in function by name.
///
/// # Examples
/// ```
/// use nanoppl_core::functions::lookup;
/// use nanoppl_core::Value;
///
/// let hypot = lookup("hypot").unwrap();
/// let out = hypot.call(vec![3.0.into(), 4.0.into()]).unwrap();
/// assert_eq!(out.into_value(), Some(Value::Real(5.0)));
/// ```
pub fn lookup(name: &str) -> Option<Function> {
    STANDARD.with(|registry| registry.get(name).cloned())
}

macro_rules! unary_methods {
    ($($(#[$doc:meta])* $method:ident => $name:literal, $kernel:path;)*) => {
        impl RandomVariable {
            $(
                $(#[$doc])*
                pub fn $method(&self) -> RandomVariable {
                    self.map_unary(Function::unary($name, $kernel))
                }
            )*
        }
    };
}

unary_methods! {
    exp => "exp", f64::exp;
    /// Natural logarithm.
    ln => "log", f64::ln;
    log2 => "log2", f64::log2;
    log10 => "log10", f64::log10;
    log1p => "log1p", f64::ln_1p;
    sqrt => "sqrt", f64::sqrt;
    square => "square", kernels::square;
    abs => "absolute", f64::abs;
    sin => "sin", f64::sin;
    cos => "cos", f64::cos;
    tan => "tan", f64::tan;
    tanh => "tanh", f64::tanh;
    floor => "floor", f64::floor;
    ceil => "ceil", f64::ceil;
    erf => "erf", special::erf;
    erfinv => "erfinv", special::erfinv;
}

impl RandomVariable {
    /// Lifts boolean conversion into the graph.
    pub fn truth(&self) -> RandomVariable {
        self.map_unary(Function::predicate("truth", kernels::truth))
    }
}
