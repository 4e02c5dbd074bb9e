use crate::substitution::Frame;
use crate::term::Literal;

/// One of the four moves available in the connection calculus.
///
/// `Start`/`Extension` carry the already-materialized `clause_copy`: the
/// literals were produced once, up front, by `matrix.copy`, and the same
/// `Vec<Literal>` is replayed on application rather than copied again — a
/// second `matrix.copy` call would mint different variable instances than
/// the ones `sub_updates` was computed against. `clause_idx: None` on
/// `Start` is the "no candidate clauses" sentinel: applying it yields zero
/// children and an immediate Non-Theorem.
#[derive(Debug, Clone)]
pub enum Action {
    Start {
        clause_idx: Option<usize>,
        clause_copy: Vec<Literal>,
    },
    Extension {
        clause_idx: usize,
        lit_idx: usize,
        clause_copy: Vec<Literal>,
        sub_updates: Frame,
    },
    Reduction {
        path_node: usize,
        sub_updates: Frame,
    },
    Backtrack,
}

impl Action {
    pub fn is_backtrack(&self) -> bool {
        matches!(self, Action::Backtrack)
    }
}
