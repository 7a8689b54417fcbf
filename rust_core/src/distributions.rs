//! Distributions as inverse-CDF transforms of atomic uniform draws.
//!
//! Each constructor allocates its own uniform slot(s) and returns a
//! composite over the draw and the parameters. Parameters may themselves
//! be random; they are evaluated on the same sample as the draw.

use crate::lift::{lifted, Function};
use crate::special;
use crate::universe::Universe;
use crate::value::Value;
use crate::variable::{Operand, RandomVariable};

fn draw(universe: &Universe) -> RandomVariable {
    universe.uniform(0.0, 1.0)
}

/// Composite of a uniform draw and one parameter.
fn transform1(
    universe: &Universe,
    name: &str,
    param: Operand,
    f: fn(f64, f64) -> f64,
) -> RandomVariable {
    let u = draw(universe);
    lifted(universe, Function::binary(name, f), vec![u.into(), param])
}

/// Composite of a uniform draw and two parameters.
fn transform2(
    universe: &Universe,
    name: &str,
    first: Operand,
    second: Operand,
    f: fn(f64, f64, f64) -> f64,
) -> RandomVariable {
    let u = draw(universe);
    let function = Function::positional(name, 3, move |args| {
        args[0].zip3_real(&args[1], &args[2], f)
    });
    lifted(universe, function, vec![u.into(), first, second])
}

// ── Uniform ─────────────────────────────────────────────────────────

pub struct Uniform;

impl Uniform {
    pub fn new(
        universe: &Universe,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> RandomVariable {
        universe.uniform(low, high)
    }

    /// Uniform on `[0, 1]`.
    pub fn standard(universe: &Universe) -> RandomVariable {
        universe.uniform(0.0, 1.0)
    }
}

// ── Bernoulli (boolean-valued) ──────────────────────────────────────

pub struct Bernoulli;

impl Bernoulli {
    /// `u <= p`; a `p` outside `[0, 1]` saturates to always or never.
    pub fn new(universe: &Universe, p: impl Into<Operand>) -> RandomVariable {
        draw(universe).le(p)
    }

    /// A fair coin.
    pub fn standard(universe: &Universe) -> RandomVariable {
        Self::new(universe, 0.5)
    }
}

// ── Binomial (sum of Bernoulli draws) ───────────────────────────────

pub struct Binomial;

impl Binomial {
    /// Sum of `n` independent Bernoulli(p) draws, each with its own slot.
    pub fn new(universe: &Universe, n: usize, p: impl Into<Operand>) -> RandomVariable {
        if n == 0 {
            return universe.constant(0.0);
        }
        let p = p.into();
        let trials: Vec<Operand> = (0..n)
            .map(|_| Bernoulli::new(universe, p.clone()).into())
            .collect();
        let sum = Function::new("binomial", |args, _| Value::sum(args));
        lifted(universe, sum, trials)
    }

    /// Number of successes in `n` fair coin flips.
    pub fn standard(universe: &Universe, n: usize) -> RandomVariable {
        Self::new(universe, n, 0.5)
    }
}

// ── Normal (parameterized by variance) ──────────────────────────────

pub struct Normal;

impl Normal {
    /// Normal with mean `mu` and variance `sigma2`.
    pub fn new(
        universe: &Universe,
        mu: impl Into<Operand>,
        sigma2: impl Into<Operand>,
    ) -> RandomVariable {
        transform2(universe, "normal", mu.into(), sigma2.into(), |u, mu, sigma2| {
            mu + (2.0 * sigma2).sqrt() * special::erfinv(2.0 * u - 1.0)
        })
    }

    pub fn standard(universe: &Universe) -> RandomVariable {
        Self::new(universe, 0.0, 1.0)
    }
}

// ── Exponential ─────────────────────────────────────────────────────

pub struct Exponential;

impl Exponential {
    /// Exponential with rate `lambda`.
    pub fn new(universe: &Universe, lambda: impl Into<Operand>) -> RandomVariable {
        transform1(universe, "exponential", lambda.into(), |u, lambda| {
            -(-u).ln_1p() / lambda
        })
    }

    pub fn standard(universe: &Universe) -> RandomVariable {
        Self::new(universe, 1.0)
    }
}

// ── Cauchy ──────────────────────────────────────────────────────────

pub struct Cauchy;

impl Cauchy {
    /// Cauchy with location `x0` and scale `gamma`.
    pub fn new(
        universe: &Universe,
        x0: impl Into<Operand>,
        gamma: impl Into<Operand>,
    ) -> RandomVariable {
        transform2(universe, "cauchy", x0.into(), gamma.into(), |u, x0, gamma| {
            x0 + gamma * (std::f64::consts::PI * (u - 0.5)).tan()
        })
    }

    pub fn standard(universe: &Universe) -> RandomVariable {
        Self::new(universe, 0.0, 1.0)
    }
}

// ── Poisson ─────────────────────────────────────────────────────────

pub struct Poisson;

impl Poisson {
    pub fn new(universe: &Universe, lambda: impl Into<Operand>) -> RandomVariable {
        transform1(universe, "poisson", lambda.into(), special::poisson_quantile)
    }
}

// ── Beta ────────────────────────────────────────────────────────────

pub struct Beta;

impl Beta {
    pub fn new(
        universe: &Universe,
        alpha: impl Into<Operand>,
        beta: impl Into<Operand>,
    ) -> RandomVariable {
        transform2(universe, "beta", alpha.into(), beta.into(), special::beta_quantile)
    }
}

// ── StudentT ────────────────────────────────────────────────────────

pub struct StudentT;

impl StudentT {
    /// Student's t with `nu` degrees of freedom, centred at zero.
    pub fn new(universe: &Universe, nu: impl Into<Operand>) -> RandomVariable {
        transform1(universe, "student_t", nu.into(), special::t_quantile)
    }
}
