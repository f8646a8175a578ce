//! The witness store: a forest of run nodes folding an accepted infinite
//! run, with per-state graft and dependency tables.
//!
//! Nodes live in an arena keyed by [`Node`] references; the raw tree shape
//! is carried by parent/child links on the nodes themselves. For each state
//! `q` with a proven witness, `grafts[q]` points at the root of an accepted
//! subtree for `q`. That subtree may be embedded inside another state's
//! subtree; `dependencies[q]` then names the owning root so a traversal can
//! reach it, and `roots` lists the owners themselves.

use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{PrimaryMap, entity_impl};
use rustc_hash::FxHashSet;

use crate::automaton::State;

/// An opaque reference to a node of the witness forest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(u32);
entity_impl!(Node, "n");

/// One node of the witness forest. Interior nodes have exactly two
/// children; a leaf with `graft` set means "continue as the stored witness
/// for this node's state".
#[derive(Clone, Copy, Debug)]
pub struct RunNode {
    /// The automaton state labelling this tree position.
    pub state: State,
    /// The enclosing interior node, absent on a subtree root.
    pub parent: PackedOption<Node>,
    /// Left child.
    pub left: PackedOption<Node>,
    /// Right child.
    pub right: PackedOption<Node>,
    /// Whether this leaf refers back to the stored witness of its state.
    pub graft: bool,
}

impl RunNode {
    /// Does this node have children?
    pub fn is_interior(&self) -> bool {
        self.left.is_some()
    }
}

/// An accepted subtree in transfer form: what the search hands to
/// [`Run::save_subruns`] before the nodes are adopted into the arena.
pub(crate) struct RunTree {
    pub state: State,
    pub graft: bool,
    pub children: Option<Box<[RunTree; 2]>>,
}

impl RunTree {
    /// A graft leaf for `state`.
    pub fn graft(state: State) -> Self {
        Self {
            state,
            graft: true,
            children: None,
        }
    }

    /// An interior node labelled `state` over two subtrees.
    pub fn interior(state: State, left: RunTree, right: RunTree) -> Self {
        Self {
            state,
            graft: false,
            children: Some(Box::new([left, right])),
        }
    }
}

/// A folded accepted run: the witness forest plus the per-state tables.
///
/// During a search the store sits behind a mutex shared by the workers;
/// the value returned from a completed search is plain owned data.
pub struct Run {
    states: State,
    start: State,
    nodes: PrimaryMap<Node, RunNode>,
    grafts: Vec<PackedOption<Node>>,
    dependencies: Vec<PackedOption<Node>>,
    roots: Vec<Node>,
}

impl Run {
    pub(crate) fn new(states: State, start: State) -> Self {
        Self {
            states,
            start,
            nodes: PrimaryMap::new(),
            grafts: vec![PackedOption::default(); states as usize],
            dependencies: vec![PackedOption::default(); states as usize],
            roots: Vec::new(),
        }
    }

    /// The state count of the automaton this run belongs to.
    pub fn states(&self) -> State {
        self.states
    }

    /// The automaton's start state.
    pub fn start(&self) -> State {
        self.start
    }

    /// Has an accepted subtree been stored for `q`? Once true, this stays
    /// true: witnesses are never overwritten.
    pub fn has_witness(&self, q: State) -> bool {
        self.grafts[q as usize].is_some()
    }

    /// The root of the stored witness subtree for `q`, if any.
    pub fn witness(&self, q: State) -> Option<Node> {
        self.grafts[q as usize].expand()
    }

    /// The root that owns `q`'s witness subtree, when that subtree was
    /// discovered embedded in another state's subtree.
    pub fn dependency(&self, q: State) -> Option<Node> {
        self.dependencies[q as usize].expand()
    }

    /// The roots of the independently installed subtrees. Every node of
    /// the forest is reachable from one of these.
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Look up a node.
    pub fn node(&self, n: Node) -> &RunNode {
        &self.nodes[n]
    }

    /// Install `tree` as the witness for its root state, unless one is
    /// already present (in which case the tree is discarded and `false`
    /// returned). On installation, every interior descendant whose state
    /// has no witness yet also becomes that state's witness, with the new
    /// root recorded as its dependency.
    pub(crate) fn save_subruns(&mut self, tree: RunTree) -> bool {
        if self.has_witness(tree.state) {
            return false;
        }
        let root = self.adopt(tree, None);
        let root_state = self.nodes[root].state;
        self.grafts[root_state as usize] = root.into();
        self.roots.push(root);
        log::trace!("installed witness for state {root_state} at {root}");
        if let (Some(left), Some(right)) =
            (self.nodes[root].left.expand(), self.nodes[root].right.expand())
        {
            self.save_subruns_aux(left, root);
            self.save_subruns_aux(right, root);
        }
        true
    }

    /// Copy `tree` into the arena, wiring parent and child links.
    fn adopt(&mut self, tree: RunTree, parent: Option<Node>) -> Node {
        let node = self.nodes.push(RunNode {
            state: tree.state,
            parent: parent.into(),
            left: None.into(),
            right: None.into(),
            graft: tree.graft,
        });
        if let Some(children) = tree.children {
            let [left, right] = *children;
            let left = self.adopt(left, Some(node));
            let right = self.adopt(right, Some(node));
            self.nodes[node].left = left.into();
            self.nodes[node].right = right.into();
        }
        node
    }

    fn save_subruns_aux(&mut self, n: Node, root: Node) {
        let RunNode {
            state, left, right, ..
        } = self.nodes[n];
        let (Some(left), Some(right)) = (left.expand(), right.expand()) else {
            return;
        };
        if self.grafts[state as usize].is_none() {
            self.grafts[state as usize] = n.into();
            self.dependencies[state as usize] = root.into();
            log::trace!("state {state} witnessed as subrun of {root}");
        }
        self.save_subruns_aux(left, root);
        self.save_subruns_aux(right, root);
    }

    /// Append to `out` the unresolved leaf states reachable from `q`'s
    /// witness: a graft leaf is chased through the stored witness of its
    /// state, a plain leaf contributes its own state. The traversal keeps
    /// a visited set so the cyclic graft structure of a folded run
    /// terminates.
    pub fn frontier(&self, q: State, out: &mut Vec<State>) {
        let Some(root) = self.witness(q) else {
            return;
        };
        let mut visited = FxHashSet::default();
        self.frontier_aux(root, &mut visited, out);
    }

    fn frontier_aux(&self, n: Node, visited: &mut FxHashSet<Node>, out: &mut Vec<State>) {
        if !visited.insert(n) {
            return;
        }
        let node = &self.nodes[n];
        if let (Some(left), Some(right)) = (node.left.expand(), node.right.expand()) {
            self.frontier_aux(left, visited, out);
            self.frontier_aux(right, visited, out);
            return;
        }
        if node.graft {
            if let Some(target) = self.witness(node.state) {
                self.frontier_aux(target, visited, out);
                return;
            }
        }
        out.push(node.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A two-level subtree: 0 over an interior 1 on each side, every leaf
    // grafting back to 0.
    fn sample_tree() -> RunTree {
        let inner = || RunTree::interior(1, RunTree::graft(0), RunTree::graft(0));
        RunTree::interior(0, inner(), inner())
    }

    #[test]
    fn save_registers_interior_descendants() {
        let mut run = Run::new(3, 0);
        assert!(run.save_subruns(sample_tree()));

        assert!(run.has_witness(0));
        assert!(run.has_witness(1));
        assert!(!run.has_witness(2));

        // State 1's witness was found inside state 0's subtree.
        let root = run.witness(0).unwrap();
        assert_eq!(run.dependency(0), None);
        assert_eq!(run.dependency(1), Some(root));
        assert_eq!(run.roots(), [root]);

        // The arena shape survived the transfer.
        let root_node = run.node(root);
        assert_eq!(root_node.state, 0);
        assert!(root_node.is_interior());
        let left = run.node(root_node.left.expand().unwrap());
        assert_eq!(left.state, 1);
        let leaf = run.node(left.left.expand().unwrap());
        assert!(leaf.graft);
        assert_eq!(leaf.state, 0);
        assert_eq!(leaf.parent.expand(), root_node.left.expand());
    }

    #[test]
    fn witnesses_are_single_assignment() {
        let mut run = Run::new(3, 0);
        assert!(run.save_subruns(sample_tree()));
        let root = run.witness(0).unwrap();
        let before = run.witness(1).unwrap();

        // A second tree for an already-witnessed state is refused.
        assert!(!run.save_subruns(sample_tree()));
        assert_eq!(run.witness(0), Some(root));
        assert_eq!(run.witness(1), Some(before));
        assert_eq!(run.roots().len(), 1);
    }

    #[test]
    fn frontier_resolves_through_grafts() {
        let mut run = Run::new(3, 0);
        run.save_subruns(sample_tree());

        // Every leaf grafts to the witnessed state 0, so nothing is
        // unresolved.
        let mut out = Vec::new();
        run.frontier(0, &mut out);
        assert!(out.is_empty());

        run.frontier(2, &mut out);
        assert!(out.is_empty());
    }
}
