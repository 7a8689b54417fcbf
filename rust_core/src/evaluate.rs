//! Evaluation of random variables on one sample.

use crate::error::{Error, Result};
use crate::graph::{Constant, Node, NodeId};
use crate::lift::Kwargs;
use crate::universe::{Sample, Universe};
use crate::value::Value;
use crate::variable::RandomVariable;
use std::collections::HashMap;
use std::rc::Rc;

/// Evaluates variables of one universe against a fixed sample.
///
/// Every operand of a node sees the same sample, so two references to one
/// atomic uniform always agree. With memoization on, each node is computed
/// at most once for the lifetime of the evaluator; otherwise shared
/// sub-expressions are recomputed per reference.
pub struct Evaluator<'a> {
    universe: &'a Universe,
    sample: &'a Sample,
    cache: Option<HashMap<NodeId, Value>>,
}

impl<'a> Evaluator<'a> {
    /// An evaluator following the universe's `memoize` setting.
    pub fn new(universe: &'a Universe, sample: &'a Sample) -> Self {
        let memoize = universe.config().memoize;
        Self {
            universe,
            sample,
            cache: memoize.then(HashMap::new),
        }
    }

    pub fn with_memoization(mut self, memoize: bool) -> Self {
        self.cache = if memoize {
            self.cache.take().or_else(|| Some(HashMap::new()))
        } else {
            None
        };
        self
    }

    /// Checks validity before the sample dimension, then evaluates.
    pub fn evaluate(&mut self, rv: &RandomVariable) -> Result<Value> {
        if !rv.universe().same(self.universe) {
            return Err(Error::UniverseMismatch);
        }
        self.universe.check(rv.epoch(), self.sample)?;
        self.node_value(rv.id())
    }

    /// Post-order walk with an explicit work stack, so chain depth is bounded
    /// by the heap rather than the call stack.
    fn node_value(&mut self, root: NodeId) -> Result<Value> {
        let mut tasks = vec![Task::Visit(root)];
        let mut values: Vec<Value> = Vec::new();
        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(id) => {
                    if let Some(value) = self.cache.as_ref().and_then(|cache| cache.get(&id)) {
                        values.push(value.clone());
                        continue;
                    }
                    let node = self.universe.node(id).ok_or(Error::InvalidRandomVariable)?;
                    let operands = node.operands();
                    tasks.push(Task::Apply {
                        id,
                        node,
                        arity: operands.len(),
                    });
                    // reversed so the first operand is evaluated first
                    tasks.extend(operands.into_iter().rev().map(Task::Visit));
                }
                Task::Apply { id, node, arity } => {
                    let operands = values.split_off(values.len() - arity);
                    let value = self.apply(&node, operands)?;
                    if let Some(cache) = self.cache.as_mut() {
                        cache.insert(id, value.clone());
                    }
                    values.push(value);
                }
            }
        }
        values.pop().ok_or(Error::InvalidRandomVariable)
    }

    /// Computes one node from its already evaluated operands.
    fn apply(&self, node: &Node, mut operands: Vec<Value>) -> Result<Value> {
        match node {
            Node::Constant(Constant::Literal(value)) => Ok(value.clone()),
            Node::Constant(Constant::Frozen(_)) => {
                operands.pop().ok_or(Error::InvalidRandomVariable)
            }
            Node::Uniform { slot, .. } => {
                let u = self.sample.component(*slot).ok_or(Error::InvalidSample {
                    expected: slot + 1,
                    found: self.sample.dim(),
                })?;
                match operands.as_slice() {
                    [low, high] => u.zip3_real(low, high, |u, l, h| l * (1.0 - u) + h * u),
                    _ => Err(Error::InvalidRandomVariable),
                }
            }
            Node::Composite {
                function,
                args,
                kwargs,
            } => {
                let named_values = operands.split_off(args.len());
                let named: Kwargs = kwargs
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(named_values)
                    .collect();
                function.apply(&operands, &named)
            }
        }
    }
}

enum Task {
    Visit(NodeId),
    Apply {
        id: NodeId,
        node: Rc<Node>,
        arity: usize,
    },
}
