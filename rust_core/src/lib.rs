//! Lazy random variables over a shared uniform universe.
//!
//! A [`Universe`] hands out one slot per atomic uniform. Random variables
//! are expression graphs over those uniforms, built with ordinary operators
//! and evaluated on a sample of the universe:
//!
//! ```
//! use nanoppl_core::{distributions::Normal, Universe, Value};
//!
//! let universe = Universe::with_seed(0);
//! let x = universe.uniform(0.0, 1.0);
//! let y = universe.uniform(0.0, &x);
//! let z = Normal::new(&universe, &y, 0.01);
//!
//! let sample = universe.sample();
//! let (x, y) = (x.evaluate(&sample).unwrap(), y.evaluate(&sample).unwrap());
//! assert!(y.as_real().unwrap() <= x.as_real().unwrap());
//! assert!(matches!(z.draw().unwrap(), Value::Real(_)));
//! ```
//!
//! Comparisons such as `x.lt(&y)` build boolean random variables; they
//! cannot be used as host booleans until evaluated.
//!
//! Universes are single-threaded: the handles are `Rc`-based and neither
//! `Send` nor `Sync`.
//!
//! Every node stays in the universe's arena until the next
//! [`Universe::restart`], whether or not a handle to it survives. A
//! temporary such as `&x + 1.0` adds two nodes (the constant and the sum),
//! so a long-running loop that keeps building expressions should restart
//! its universe between independent models.

pub mod distributions;
pub mod error;
pub mod evaluate;
pub mod functions;
pub mod graph;
pub mod lift;
pub mod sampler;
pub mod special;
pub mod summary;
pub mod universe;
pub mod value;
pub mod variable;

pub use error::{Error, Result};
pub use evaluate::Evaluator;
pub use functions::{lookup, FunctionRegistry};
pub use lift::{lift, Function, Kwargs};
pub use sampler::{sample, DrawPolicy, SampleResult, SamplerConfig};
pub use summary::Summary;
pub use universe::{Sample, Universe, UniverseConfig, UniverseSnapshot};
pub use value::Value;
pub use variable::{Operand, RandomVariable};
