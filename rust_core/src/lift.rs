//! Lifting deterministic functions onto random variables.
//!
//! A [`Function`] wraps a pure kernel over [`Value`]s. Calling it with
//! concrete arguments runs the kernel immediately; calling it with at least
//! one random argument builds a composite node instead.

use crate::error::{Error, Result};
use crate::functions::kernels;
use crate::universe::{constructed, Universe};
use crate::value::Value;
use crate::variable::{Operand, RandomVariable};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Not, Rem, Sub};
use std::rc::Rc;

/// Named arguments passed to a kernel.
pub type Kwargs = BTreeMap<String, Value>;

type Kernel = dyn Fn(&[Value], &Kwargs) -> Result<Value>;

/// A named, pure transform of evaluated operands.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    arity: Option<usize>,
    kernel: Rc<Kernel>,
}

impl Function {
    /// A variadic function receiving positional and named arguments.
    pub fn new(
        name: &str,
        kernel: impl Fn(&[Value], &Kwargs) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            arity: None,
            kernel: Rc::new(kernel),
        }
    }

    /// A function of exactly `arity` positional arguments. Named arguments
    /// are ignored.
    pub fn positional(
        name: &str,
        arity: usize,
        kernel: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            arity: Some(arity),
            kernel: Rc::new(move |args: &[Value], _: &Kwargs| kernel(args)),
        }
    }

    /// Elementwise real function of one argument.
    pub fn unary(name: &str, f: fn(f64) -> f64) -> Self {
        Self::positional(name, 1, move |args| Ok(args[0].map_real(f)))
    }

    /// Elementwise real function of two broadcast arguments.
    pub fn binary(name: &str, f: fn(f64, f64) -> f64) -> Self {
        Self::positional(name, 2, move |args| args[0].zip_real(&args[1], f))
    }

    /// Elementwise comparison yielding booleans.
    pub fn comparison(name: &str, f: fn(f64, f64) -> bool) -> Self {
        Self::positional(name, 2, move |args| args[0].zip_compare(&args[1], f))
    }

    /// Elementwise boolean function of one argument.
    pub fn predicate(name: &str, f: fn(bool) -> bool) -> Self {
        Self::positional(name, 1, move |args| Ok(args[0].map_bool(f)))
    }

    /// Elementwise boolean function of two broadcast arguments.
    pub fn logical(name: &str, f: fn(bool, bool) -> bool) -> Self {
        Self::positional(name, 2, move |args| args[0].zip_bool(&args[1], f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of positional arguments, `None` if variadic.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    fn check_arity(&self, found: usize) -> Result<()> {
        match self.arity {
            Some(expected) if expected != found => Err(Error::Arity {
                function: self.name.to_string(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Runs the kernel on concrete values.
    pub fn apply(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        self.check_arity(args.len())?;
        (self.kernel)(args, kwargs)
    }

    /// Calls the function on positional operands.
    ///
    /// # Examples
    /// ```
    /// use nanoppl_core::{lift, Operand, Universe, Value};
    ///
    /// let twice = lift("twice", |args, _| Ok(args[0].map_real(|x| 2.0 * x)));
    /// let concrete = twice.call(vec![Operand::from(1.5)]).unwrap();
    /// assert_eq!(concrete.into_value(), Some(Value::Real(3.0)));
    ///
    /// let universe = Universe::new();
    /// let x = universe.uniform(0.0, 1.0);
    /// let lifted = twice.call(vec![Operand::from(&x)]).unwrap();
    /// assert!(lifted.as_random().is_some());
    /// ```
    pub fn call(&self, args: Vec<Operand>) -> Result<Operand> {
        self.call_with(args, Vec::new())
    }

    /// Calls the function on positional and named operands.
    pub fn call_with(&self, args: Vec<Operand>, kwargs: Vec<(String, Operand)>) -> Result<Operand> {
        self.check_arity(args.len())?;
        let universe = args
            .iter()
            .chain(kwargs.iter().map(|(_, arg)| arg))
            .find_map(Operand::as_random)
            .map(|rv| rv.universe().clone());
        match universe {
            Some(universe) => universe
                .composite(self.clone(), args, kwargs)
                .map(Operand::Random),
            None => {
                let values: Vec<Value> = args.into_iter().filter_map(Operand::into_value).collect();
                let named: Kwargs = kwargs
                    .into_iter()
                    .filter_map(|(name, arg)| arg.into_value().map(|v| (name, v)))
                    .collect();
                (self.kernel)(&values, &named).map(Operand::Value)
            }
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Lifts a kernel over values into a [`Function`].
pub fn lift(
    name: &str,
    kernel: impl Fn(&[Value], &Kwargs) -> Result<Value> + 'static,
) -> Function {
    Function::new(name, kernel)
}

/// Builds a composite for an operator, panicking on a universe mismatch.
pub(crate) fn lifted(
    universe: &Universe,
    function: Function,
    args: Vec<Operand>,
) -> RandomVariable {
    constructed(universe.composite(function, args, Vec::new()))
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $name:literal, $kernel:path) => {
        impl $trait<RandomVariable> for RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: RandomVariable) -> RandomVariable {
                let universe = self.universe().clone();
                let function = Function::binary($name, $kernel);
                lifted(&universe, function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<&RandomVariable> for RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                let universe = self.universe().clone();
                let function = Function::binary($name, $kernel);
                lifted(&universe, function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<RandomVariable> for &RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: RandomVariable) -> RandomVariable {
                let function = Function::binary($name, $kernel);
                lifted(self.universe(), function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<&RandomVariable> for &RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                let function = Function::binary($name, $kernel);
                lifted(self.universe(), function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<f64> for RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: f64) -> RandomVariable {
                let universe = self.universe().clone();
                let function = Function::binary($name, $kernel);
                lifted(&universe, function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<f64> for &RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: f64) -> RandomVariable {
                let function = Function::binary($name, $kernel);
                lifted(self.universe(), function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<RandomVariable> for f64 {
            type Output = RandomVariable;
            fn $method(self, rhs: RandomVariable) -> RandomVariable {
                let universe = rhs.universe().clone();
                let function = Function::binary($name, $kernel);
                lifted(&universe, function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<&RandomVariable> for f64 {
            type Output = RandomVariable;
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                let function = Function::binary($name, $kernel);
                lifted(rhs.universe(), function, vec![self.into(), rhs.into()])
            }
        }
    };
}

// # Panics
// Every binary operator panics when its operands belong to different
// universes; use `Function::call` to get `Error::UniverseMismatch` instead.
binary_operator!(Add, add, "add", kernels::add);
binary_operator!(Sub, sub, "subtract", kernels::subtract);
binary_operator!(Mul, mul, "multiply", kernels::multiply);
binary_operator!(Div, div, "divide", kernels::divide);
binary_operator!(Rem, rem, "remainder", kernels::remainder);

macro_rules! logical_operator {
    ($trait:ident, $method:ident, $name:literal, $kernel:path) => {
        impl $trait<RandomVariable> for RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: RandomVariable) -> RandomVariable {
                let universe = self.universe().clone();
                let function = Function::logical($name, $kernel);
                lifted(&universe, function, vec![self.into(), rhs.into()])
            }
        }

        impl $trait<&RandomVariable> for &RandomVariable {
            type Output = RandomVariable;
            fn $method(self, rhs: &RandomVariable) -> RandomVariable {
                let function = Function::logical($name, $kernel);
                lifted(self.universe(), function, vec![self.into(), rhs.into()])
            }
        }
    };
}

logical_operator!(BitAnd, bitand, "logical_and", kernels::logical_and);
logical_operator!(BitOr, bitor, "logical_or", kernels::logical_or);

impl Neg for RandomVariable {
    type Output = RandomVariable;
    fn neg(self) -> RandomVariable {
        (&self).neg()
    }
}

impl Neg for &RandomVariable {
    type Output = RandomVariable;
    fn neg(self) -> RandomVariable {
        self.map_unary(Function::unary("negative", kernels::negative))
    }
}

impl Not for RandomVariable {
    type Output = RandomVariable;
    fn not(self) -> RandomVariable {
        (&self).not()
    }
}

impl Not for &RandomVariable {
    type Output = RandomVariable;
    fn not(self) -> RandomVariable {
        self.map_unary(Function::predicate("logical_not", kernels::logical_not))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Sample;
    use ndarray::array;

    #[test]
    fn test_concrete_call_runs_immediately() {
        let add = Function::binary("add", kernels::add);
        let out = add.call(vec![2.0.into(), 3.0.into()]).unwrap();
        assert_eq!(out.into_value(), Some(Value::Real(5.0)));
    }

    #[test]
    fn test_random_call_builds_composite() {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 1.0);
        let before = universe.node_count();
        let add = Function::binary("add", kernels::add);
        let out = add.call(vec![Operand::from(&x), 1.0.into()]).unwrap();
        let rv = out.as_random().unwrap();
        // one constant for the literal plus the composite itself
        assert_eq!(universe.node_count(), before + 2);
        assert_eq!(
            rv.evaluate(&Sample::from(vec![0.25])).unwrap(),
            Value::Real(1.25)
        );
    }

    #[test]
    fn test_arity_checked_at_call() {
        let exp = Function::unary("exp", f64::exp);
        assert_eq!(
            exp.call(vec![1.0.into(), 2.0.into()]).unwrap_err(),
            Error::Arity {
                function: "exp".to_string(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_named_arguments() {
        let scale = lift("scale", |args, kwargs| {
            let factor = kwargs.get("by").ok_or_else(|| Error::MissingArgument {
                function: "scale".to_string(),
                name: "by".to_string(),
            })?;
            args[0].zip_real(factor, |x, f| x * f)
        });
        let universe = Universe::new();
        let x = universe.uniform(0.0, 2.0);
        let out = scale
            .call_with(vec![(&x).into()], vec![("by".to_string(), 10.0.into())])
            .unwrap();
        let rv = out.as_random().unwrap();
        assert_eq!(
            rv.evaluate(&Sample::from(vec![0.5])).unwrap(),
            Value::Real(10.0)
        );
        assert_eq!(
            scale.call(vec![1.0.into()]).unwrap_err(),
            Error::MissingArgument {
                function: "scale".to_string(),
                name: "by".to_string()
            }
        );
    }

    #[test]
    fn test_mixed_universes_rejected() {
        let a = Universe::new().uniform(0.0, 1.0);
        let b = Universe::new().uniform(0.0, 1.0);
        let add = Function::binary("add", kernels::add);
        assert_eq!(
            add.call(vec![(&a).into(), (&b).into()]).unwrap_err(),
            Error::UniverseMismatch
        );
    }

    #[test]
    #[should_panic(expected = "different universes")]
    fn test_operator_panics_on_mixed_universes() {
        let a = Universe::new().uniform(0.0, 1.0);
        let b = Universe::new().uniform(0.0, 1.0);
        let _ = a + b;
    }

    #[test]
    fn test_operators_evaluate_elementwise() {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 4.0);
        let y = universe.uniform(0.0, 4.0);
        let sample = Sample::from(array![0.5, 0.25]);
        let eval = |rv: RandomVariable| rv.evaluate(&sample).unwrap();
        assert_eq!(eval(&x + &y), Value::Real(3.0));
        assert_eq!(eval(&x - &y), Value::Real(1.0));
        assert_eq!(eval(1.0 - &x), Value::Real(-1.0));
        assert_eq!(eval(&x * 3.0), Value::Real(6.0));
        assert_eq!(eval(8.0 / &x), Value::Real(4.0));
        assert_eq!(eval(&x % 1.5), Value::Real(0.5));
        assert_eq!(eval(-&y), Value::Real(-1.0));
        assert_eq!(eval(!x.gt(1.0)), Value::Bool(false));
        assert_eq!(eval(x.gt(1.0) & y.gt(1.0)), Value::Bool(false));
        assert_eq!(eval(x.gt(1.0) | y.gt(1.0)), Value::Bool(true));
    }
}
