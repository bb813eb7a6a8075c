use std::fmt;

use log::trace;
use rand::Rng;

use crate::{
    error::{Error, Result},
    program::FunctionId,
    value::TypeTag,
};

/// The decisions the synthesis grammar asks a coordinator to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Choice {
    /// Place a node for an existing function.
    Reuse(FunctionId),
    /// Read a parameter already introduced by the function being built.
    Accessor(usize),
    /// Give the function being built a new parameter.
    NewParameter { ty: TypeTag, index: usize },
    /// End of a trial's path.
    Terminate,
    /// Synthesize a new helper function and call it.
    NewFunction,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Reuse(id) => write!(f, "#{}", id.index()),
            Choice::Accessor(index) => write!(f, "?{index}"),
            Choice::NewParameter { ty, index } => write!(f, "new ?{index}: {ty}"),
            Choice::Terminate => f.write_str("terminate"),
            Choice::NewFunction => f.write_str("new function"),
        }
    }
}

/// Drives a search by picking among candidates and learning from the
/// reward of each finished path.
pub trait SearchCoordinator<C> {
    /// Picks one element of `candidates`.
    fn choose(&mut self, candidates: &[C]) -> Result<C>;

    /// Records the outcome of the path chosen since the last call.
    fn terminate(&mut self, reward: f64);
}

#[derive(Debug, Clone)]
struct TreeNode<C> {
    visits: u64,
    total: f64,
    children: Vec<(C, usize)>,
}

impl<C> TreeNode<C> {
    fn new() -> Self {
        Self {
            visits: 0,
            total: 0.0,
            children: Vec::new(),
        }
    }

    fn mean(&self) -> f64 {
        self.total / self.visits as f64
    }
}

/// Statistics of every choice sequence tried so far, shared by all trials
/// of a run. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct SearchTree<C> {
    nodes: Vec<TreeNode<C>>,
}

impl<C: Copy + PartialEq + fmt::Debug> SearchTree<C> {
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new()],
        }
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no choice has been recorded yet.
    pub fn is_unexplored(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of finished paths.
    pub fn visits(&self) -> u64 {
        self.nodes[0].visits
    }

    pub fn mean_reward(&self) -> Option<f64> {
        let root = &self.nodes[0];

        (root.visits > 0).then(|| root.mean())
    }

    /// Starts walking the tree from the root. `exploration` is the UCB1
    /// constant; `rng` breaks ties between unexplored candidates.
    pub fn session<'a, R: Rng>(&'a mut self, exploration: f64, rng: &'a mut R) -> Session<'a, C, R> {
        Session {
            tree: self,
            rng,
            exploration,
            path: vec![0],
        }
    }

    fn child(&self, node: usize, choice: C) -> Option<usize> {
        self.nodes[node].children.iter()
            .find(|(c, _)| *c == choice)
            .map(|(_, idx)| *idx)
    }

    fn add_child(&mut self, node: usize, choice: C) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::new());
        self.nodes[node].children.push((choice, idx));

        idx
    }
}

impl<C: Copy + PartialEq + fmt::Debug> Default for SearchTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// One trial's walk down a [`SearchTree`].
pub struct Session<'a, C, R> {
    tree: &'a mut SearchTree<C>,
    rng: &'a mut R,
    exploration: f64,
    path: Vec<usize>,
}

impl<C, R> Session<'_, C, R>
where
    C: Copy + PartialEq + fmt::Debug,
    R: Rng,
{
    fn cursor(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    /// Number of choices made on this path.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    fn ucb_pick(&self, cursor: usize, candidates: &[C]) -> usize {
        let parent = self.tree.nodes[cursor].visits.max(1) as f64;
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;

        for (idx, candidate) in candidates.iter().enumerate() {
            let Some(child) = self.tree.child(cursor, *candidate) else {
                continue;
            };
            let node = &self.tree.nodes[child];
            let score = node.mean()
                + self.exploration * (parent.ln() / node.visits as f64).sqrt();

            if score > best_score {
                best = idx;
                best_score = score;
            }
        }

        best
    }
}

impl<C, R> SearchCoordinator<C> for Session<'_, C, R>
where
    C: Copy + PartialEq + fmt::Debug,
    R: Rng,
{
    fn choose(&mut self, candidates: &[C]) -> Result<C> {
        if candidates.is_empty() {
            return Err(Error::NoCandidates);
        }

        let cursor = self.cursor();
        let unexplored = candidates.iter()
            .enumerate()
            .filter(|(_, c)| match self.tree.child(cursor, **c) {
                None => true,
                Some(child) => self.tree.nodes[child].visits == 0,
            })
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();

        let pick = if unexplored.is_empty() {
            self.ucb_pick(cursor, candidates)
        } else {
            unexplored[self.rng.random_range(0..unexplored.len())]
        };

        let choice = candidates[pick];
        let node = match self.tree.child(cursor, choice) {
            Some(node) => node,
            None => self.tree.add_child(cursor, choice),
        };
        self.path.push(node);

        trace!("Chose {choice:?} out of {}", candidates.len());

        Ok(choice)
    }

    fn terminate(&mut self, reward: f64) {
        for node in &self.path {
            let node = &mut self.tree.nodes[*node];
            node.visits += 1;
            node.total += reward;
        }

        self.path.truncate(1);
    }
}
