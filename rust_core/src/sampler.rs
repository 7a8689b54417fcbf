use crate::error::{Error, Result};
use crate::evaluate::Evaluator;
use crate::summary::{render_table, Summary};
use crate::variable::RandomVariable;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How draws are taken from the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawPolicy {
    /// One `(n, k)` batch evaluated once per variable.
    Batched,
    /// `k` single samples evaluated one at a time.
    Sequential,
}

/// Configuration for joint sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub num_draws: usize,
    pub policy: DrawPolicy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_draws: 1000,
            policy: DrawPolicy::Batched,
        }
    }
}

/// Joint draws of several random variables.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub names: Vec<String>,
    /// columns[var][draw]; entry `j` of every column comes from the same sample.
    pub columns: Vec<Array1<f64>>,
}

impl SampleResult {
    pub fn mean(&self) -> Vec<f64> {
        self.summaries().iter().map(|s| s.mean).collect()
    }

    pub fn std(&self) -> Vec<f64> {
        self.summaries().iter().map(|s| s.std).collect()
    }

    pub fn summaries(&self) -> Vec<Summary> {
        self.columns
            .iter()
            .map(|column| Summary::from_values(column.view()))
            .collect()
    }

    /// Render the summaries as a formatted table string.
    pub fn to_table(&self) -> String {
        let summaries = self.summaries();
        let rows: Vec<(&str, &Summary)> = self
            .names
            .iter()
            .map(String::as_str)
            .zip(summaries.iter())
            .collect();
        render_table(&rows)
    }
}

/// Draws `config.num_draws` joint samples of `vars`, named `rv0`, `rv1`, ...
pub fn sample(vars: &[&RandomVariable], config: SamplerConfig) -> Result<SampleResult> {
    let named: Vec<(String, &RandomVariable)> = vars
        .iter()
        .enumerate()
        .map(|(i, rv)| (format!("rv{}", i), *rv))
        .collect();
    sample_named(&named, config)
}

/// Draws joint samples of named variables.
///
/// Every variable must be live and belong to the same universe; this is
/// checked before the generator is advanced.
pub fn sample_named<S: AsRef<str>>(
    vars: &[(S, &RandomVariable)],
    config: SamplerConfig,
) -> Result<SampleResult> {
    let names = vars.iter().map(|(name, _)| name.as_ref().to_string()).collect();
    let Some((_, first)) = vars.first() else {
        return Ok(SampleResult {
            names,
            columns: Vec::new(),
        });
    };
    let universe = first.universe();
    for (_, rv) in vars {
        if !rv.universe().same(universe) {
            return Err(Error::UniverseMismatch);
        }
        if !rv.is_valid() {
            return Err(Error::InvalidRandomVariable);
        }
    }

    let k = config.num_draws;
    debug!(vars = vars.len(), draws = k, policy = ?config.policy, "sampling");
    let columns = match config.policy {
        DrawPolicy::Batched => {
            let batch = universe.sample_batch(k);
            let mut evaluator = Evaluator::new(universe, &batch);
            vars.iter()
                .map(|(_, rv)| evaluator.evaluate(rv)?.broadcast_to(k))
                .collect::<Result<Vec<_>>>()?
        }
        DrawPolicy::Sequential => {
            let mut columns: Vec<Array1<f64>> = vec![Array1::zeros(k); vars.len()];
            for j in 0..k {
                let single = universe.sample();
                let mut evaluator = Evaluator::new(universe, &single);
                for (column, (_, rv)) in columns.iter_mut().zip(vars) {
                    column[j] = evaluator.evaluate(rv)?.broadcast_to(1)?[0];
                }
            }
            columns
        }
    };
    Ok(SampleResult { names, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::Normal;
    use crate::universe::Universe;

    #[test]
    fn test_policies_agree() {
        let build = || {
            let universe = Universe::with_seed(9);
            let x = Normal::standard(&universe);
            let y = &x * 2.0 + universe.uniform(0.0, 1.0);
            (universe, x, y)
        };
        let (_u1, x1, y1) = build();
        let (_u2, x2, y2) = build();
        let batched = sample(
            &[&x1, &y1],
            SamplerConfig {
                num_draws: 50,
                policy: DrawPolicy::Batched,
            },
        )
        .unwrap();
        let sequential = sample(
            &[&x2, &y2],
            SamplerConfig {
                num_draws: 50,
                policy: DrawPolicy::Sequential,
            },
        )
        .unwrap();
        assert_eq!(batched.columns, sequential.columns);
    }

    #[test]
    fn test_constant_is_broadcast() {
        let universe = Universe::new();
        let c = universe.constant(3.0);
        let result = sample(&[&c], SamplerConfig::default()).unwrap();
        assert_eq!(result.columns[0].len(), 1000);
        assert!(result.columns[0].iter().all(|&x| x == 3.0));
        assert_eq!(result.mean(), vec![3.0]);
    }

    #[test]
    fn test_rejects_stale_and_foreign_variables() {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 1.0);
        let foreign = Universe::new().uniform(0.0, 1.0);
        assert_eq!(
            sample(&[&x, &foreign], SamplerConfig::default()).unwrap_err(),
            Error::UniverseMismatch
        );
        universe.restart(0);
        assert_eq!(
            sample(&[&x], SamplerConfig::default()).unwrap_err(),
            Error::InvalidRandomVariable
        );
    }

    #[test]
    fn test_named_table() {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 1.0);
        let result = sample_named(&[("x", &x)], SamplerConfig::default()).unwrap();
        assert_eq!(result.names, vec!["x".to_string()]);
        assert!(result.to_table().contains("x "));
        assert!(sample(&[], SamplerConfig::default()).unwrap().columns.is_empty());
    }
}
