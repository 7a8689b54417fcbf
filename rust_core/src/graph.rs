use crate::lift::Function;
use crate::value::Value;
use std::rc::Rc;

/// Unique identifier for a node in a universe's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Payload of a constant node.
#[derive(Debug, Clone)]
pub enum Constant {
    /// A literal number, boolean or array.
    Literal(Value),
    /// A frozen sub-expression: evaluates to whatever the target evaluates to.
    Frozen(NodeId),
}

/// Node variants of the expression graph.
///
/// Nodes only reference nodes created before them, so the arena is
/// always in topological order.
#[derive(Debug, Clone)]
pub enum Node {
    Constant(Constant),
    /// Atomic uniform draw reading component `slot` of the sample and
    /// mapping it affinely onto `[low, high]`.
    Uniform {
        slot: usize,
        low: NodeId,
        high: NodeId,
    },
    /// Pure transform of other nodes' values.
    Composite {
        function: Function,
        args: Vec<NodeId>,
        kwargs: Vec<(String, NodeId)>,
    },
}

impl Node {
    /// Operands this node reads, in evaluation order.
    pub fn operands(&self) -> Vec<NodeId> {
        match self {
            Node::Constant(Constant::Literal(_)) => Vec::new(),
            Node::Constant(Constant::Frozen(target)) => vec![*target],
            Node::Uniform { low, high, .. } => vec![*low, *high],
            Node::Composite { args, kwargs, .. } => args
                .iter()
                .copied()
                .chain(kwargs.iter().map(|(_, id)| *id))
                .collect(),
        }
    }
}

/// Append-only arena holding every node built against one universe epoch.
///
/// Nodes are never reclaimed before [`Graph::clear`], even when no handle
/// refers to them any more.
///
/// Nodes are stored behind `Rc` so an evaluator can hold one while user
/// transforms run, without keeping the arena borrowed.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Rc<Node>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Rc::new(node));
        id
    }

    pub fn add_constant(&mut self, value: Value) -> NodeId {
        self.add_node(Node::Constant(Constant::Literal(value)))
    }

    pub fn add_frozen(&mut self, target: NodeId) -> NodeId {
        self.add_node(Node::Constant(Constant::Frozen(target)))
    }

    pub fn add_uniform(&mut self, slot: usize, low: NodeId, high: NodeId) -> NodeId {
        self.add_node(Node::Uniform { slot, low, high })
    }

    pub fn add_composite(
        &mut self,
        function: Function,
        args: Vec<NodeId>,
        kwargs: Vec<(String, NodeId)>,
    ) -> NodeId {
        self.add_node(Node::Composite {
            function,
            args,
            kwargs,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<Rc<Node>> {
        self.nodes.get(id.0).cloned()
    }

    /// Nodes built since the last clear, reachable or not.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Slots owned by the uniforms reachable from `root`, in ascending order.
    pub fn slots_of(&self, root: NodeId) -> Vec<usize> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        let mut slots = Vec::new();
        while let Some(id) = stack.pop() {
            match seen.get_mut(id.0) {
                Some(visited) if !*visited => *visited = true,
                _ => continue,
            }
            let node = &self.nodes[id.0];
            if let Node::Uniform { slot, .. } = node.as_ref() {
                slots.push(*slot);
            }
            stack.extend(node.operands());
        }
        slots.sort_unstable();
        slots
    }

    /// Drops every node; ids handed out before become dangling.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
