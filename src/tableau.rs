use crate::action::Action;
use crate::term::Literal;

/// One node of the proof tableau, stored in the arena `Tableau::nodes`.
///
/// The root is `literal: None, depth: -1, parent: None`. A node becomes
/// `proven` when a reduction closes it directly, when an extension's
/// connected child is rotated into place, or when every one of its children
/// has become `proven`. `actions`/`removed` hold the node's legal-action
/// list and a parallel "already tried, don't offer again" mask — `removed[i]`
/// corresponds to `actions[i]`.
pub struct Node {
    pub literal: Option<Literal>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: i32,
    pub proven: bool,
    pub num_attempted: u32,
    pub actions: Vec<Action>,
    pub removed: Vec<bool>,
}

impl Node {
    fn root() -> Node {
        Node {
            literal: None,
            parent: None,
            children: Vec::new(),
            depth: -1,
            proven: false,
            num_attempted: 0,
            actions: Vec::new(),
            removed: Vec::new(),
        }
    }

    fn leaf(literal: Literal, parent: usize, depth: i32) -> Node {
        Node {
            literal: Some(literal),
            parent: Some(parent),
            children: Vec::new(),
            depth,
            proven: false,
            num_attempted: 0,
            actions: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// The legal actions still available: those not yet `removed`.
    pub fn open_actions(&self) -> impl Iterator<Item = (usize, &Action)> {
        self.actions
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.removed[*i])
    }
}

/// Arena-backed proof tree. Index `0` is always the root. Nodes are never
/// deallocated individually — clearing a node's children drops their arena
/// slot's reachability but the slots themselves are reclaimed only by
/// rebuilding the whole tableau (`Tableau::new`), matching how iterative
/// deepening resets start from an empty tree rather than pruning in place.
pub struct Tableau {
    nodes: Vec<Node>,
}

impl Tableau {
    pub fn new() -> Tableau {
        Tableau {
            nodes: vec![Node::root()],
        }
    }

    pub const ROOT: usize = 0;

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    /// Appends a fresh child literal under `parent`, returning its index.
    pub fn add_child(&mut self, parent: usize, literal: Literal) -> usize {
        let depth = self.nodes[parent].depth + 1;
        let idx = self.nodes.len();
        self.nodes.push(Node::leaf(literal, parent, depth));
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Removes every child of `node` (e.g. undoing a Start/Extension so the
    /// node can be re-expanded differently), and resets its own `proven`
    /// flag. The orphaned child slots remain in the arena but are no longer
    /// reachable from the root.
    pub fn clear_children(&mut self, node: usize) {
        self.nodes[node].children.clear();
        self.nodes[node].proven = false;
    }

    /// Marks `node` and every strict ancestor as not-yet-proven, used when
    /// an admissibility check rejects a classically-closed tableau and
    /// search must resume from the same goal.
    pub fn unprove_ancestors(&mut self, node: usize) {
        let mut cur = Some(node);
        while let Some(idx) = cur {
            self.nodes[idx].proven = false;
            cur = self.nodes[idx].parent;
        }
    }

    /// Depth-first, left-to-right search from `start` for the next node not
    /// yet `proven`, marking each fully-proven subtree along the way.
    /// Returns `None` once the whole tableau above `start` is closed.
    ///
    /// Implemented as an explicit loop rather than recursion: deep proof
    /// trees would otherwise risk overflowing the call stack.
    pub fn find_next(&mut self, start: usize) -> Option<usize> {
        let mut node = start;
        loop {
            if let Some(child) = self.first_unproven_child(node) {
                node = child;
                continue;
            }
            if !self.nodes[node].children.is_empty() {
                self.nodes[node].proven = true;
            }
            if !self.nodes[node].proven {
                return Some(node);
            }
            // `node` is proven: climb until a sibling to its right is open,
            // marking each exhausted ancestor proven as we go.
            loop {
                let parent = self.nodes[node].parent?;
                if let Some(sibling) = self.next_unproven_sibling(parent, node) {
                    node = sibling;
                    break;
                }
                self.nodes[parent].proven = true;
                node = parent;
            }
        }
    }

    fn first_unproven_child(&self, node: usize) -> Option<usize> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&c| !self.nodes[c].proven)
    }

    fn next_unproven_sibling(&self, parent: usize, current: usize) -> Option<usize> {
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == current)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&c| !self.nodes[c].proven)
    }

    /// Dual of `find_next`: locates the previous choice point for
    /// backtracking. If `node` is the first position a backtrack could have
    /// landed on at its level (the first child under a null-literal root, or
    /// the first real subgoal after an extension's auto-proven connected
    /// child), returns the parent. Otherwise returns the deepest, rightmost
    /// descendant of the immediately preceding sibling.
    pub fn find_prev(&self, node: usize) -> Option<usize> {
        let parent = self.nodes[node].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&c| c == node)?;
        let root_parent = self.nodes[parent].literal.is_none();
        let first_choice_pos = if root_parent { 0 } else { 1 };
        if pos <= first_choice_pos {
            return Some(parent);
        }
        let mut prev = siblings[pos - 1];
        while let Some(&last) = self.nodes[prev].children.last() {
            prev = last;
        }
        Some(prev)
    }

    /// The literals from the root down to `node`, exclusive of the
    /// sentinel root.
    pub fn path(&self, node: usize) -> Vec<&Literal> {
        let mut chain = Vec::new();
        let mut cur = Some(node);
        while let Some(idx) = cur {
            if let Some(lit) = &self.nodes[idx].literal {
                chain.push(lit);
            }
            cur = self.nodes[idx].parent;
        }
        chain.reverse();
        chain
    }

    pub fn path_node_indices(&self, node: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cur = Some(node);
        while let Some(idx) = cur {
            if self.nodes[idx].literal.is_some() {
                chain.push(idx);
            }
            cur = self.nodes[idx].parent;
        }
        chain.reverse();
        chain
    }

    /// True once the root is marked proven — every branch of the tableau
    /// has been closed.
    pub fn is_closed(&self) -> bool {
        self.nodes[Tableau::ROOT].proven
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(symbol: &str) -> Literal {
        Literal::new(symbol, vec![], false)
    }

    #[test]
    fn find_next_descends_into_open_children() {
        let mut t = Tableau::new();
        let a = t.add_child(Tableau::ROOT, lit("p"));
        let b = t.add_child(a, lit("q"));
        assert_eq!(t.find_next(a), Some(b));
    }

    #[test]
    fn find_next_climbs_once_children_are_proven() {
        let mut t = Tableau::new();
        let a = t.add_child(Tableau::ROOT, lit("p"));
        let b = t.add_child(Tableau::ROOT, lit("q"));
        t.node_mut(a).proven = true;
        assert_eq!(t.find_next(a), Some(b));
    }

    #[test]
    fn find_next_returns_none_when_fully_closed() {
        let mut t = Tableau::new();
        let a = t.add_child(Tableau::ROOT, lit("p"));
        t.node_mut(a).proven = true;
        assert_eq!(t.find_next(a), None);
        assert!(t.is_closed());
    }

    #[test]
    fn path_excludes_the_sentinel_root() {
        let mut t = Tableau::new();
        let a = t.add_child(Tableau::ROOT, lit("p"));
        let b = t.add_child(a, lit("q"));
        let path = t.path(b);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].symbol.as_ref(), "p");
        assert_eq!(path[1].symbol.as_ref(), "q");
    }

    #[test]
    fn find_prev_returns_parent_for_first_child_under_root() {
        let mut t = Tableau::new();
        let a = t.add_child(Tableau::ROOT, lit("p"));
        assert_eq!(t.find_prev(a), Some(Tableau::ROOT));
    }
}
