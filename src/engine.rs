//! The connection-tableau search engine: a single `ConnectionState`, tagged
//! by `Logic`/`Domain`, implements the classical connection calculus and
//! layers prefix unification on top for the intuitionistic and modal
//! variants, rather than five separate state machines. The modal and
//! intuitionistic variants differ from the classical core only in
//! `_pre_eq`, the enabled `pre_unify` case set, and the admissible-pair
//! rule.

use crate::action::Action;
use crate::matrix::Matrix;
use crate::prefix::{self, CaseSet, Gensym};
use crate::settings::{Domain, Logic, Settings};
use crate::substitution::{Frame, Substitution};
use crate::tableau::Tableau;
use crate::term::{Literal, Term, VarKey};

/// The result of a completed (or externally interrupted) proof attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Theorem,
    NonTheorem(String),
    Unknown,
    Error(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Outcome::Theorem => write!(f, "Theorem"),
            Outcome::NonTheorem(reason) => write!(f, "Non-Theorem: {reason}"),
            Outcome::Unknown => write!(f, "Unknown"),
            Outcome::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

fn last_one(t: &Term) -> Term {
    Term::string(t.args().last().cloned().into_iter().collect())
}

/// The goal-based connection-tableau engine. One instance proves (or
/// refutes) a single `Matrix` under one `Settings`.
pub struct ConnectionState {
    matrix: Matrix,
    settings: Settings,
    tableau: Tableau,
    /// The node currently under expansion. `None` only once the proof
    /// attempt has produced its final `info`.
    goal: Option<usize>,
    substitution: Substitution,
    max_depth: i32,
    /// Set once a terminal outcome is known; `step` becomes a no-op.
    info: Option<Outcome>,
    /// `(goal_node, action)` for every action actually applied, in order —
    /// replayed by `proof_pairs` when a non-classical logic needs to
    /// recheck prefix admissibility across the whole closed tableau.
    proof_sequence: Vec<(usize, Action)>,
    /// The prefix substitution that discharged the admissibility check, kept
    /// around for anyone wanting to inspect the actual proof term. Distinct
    /// from `substitution`: prefix bindings checked during admissibility are
    /// never committed back into the live substitution, only into a
    /// throwaway clone.
    prefix_unifier: Option<Substitution>,
    var_gen_num: u32,
    pub verbose: bool,
}

impl ConnectionState {
    pub fn new(matrix: Matrix, settings: Settings) -> ConnectionState {
        let mut state = ConnectionState {
            matrix,
            settings,
            tableau: Tableau::new(),
            goal: None,
            substitution: Substitution::new(),
            max_depth: 1,
            info: None,
            proof_sequence: Vec::new(),
            prefix_unifier: None,
            var_gen_num: 0,
            verbose: false,
        };
        state.reset(None);
        state
    }

    pub fn is_terminal(&self) -> bool {
        self.info.is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.info.as_ref()
    }

    pub fn goal(&self) -> Option<usize> {
        self.goal
    }

    pub fn prefix_unifier(&self) -> Option<&Substitution> {
        self.prefix_unifier.as_ref()
    }

    pub fn proof_sequence(&self) -> &[(usize, Action)] {
        &self.proof_sequence
    }

    /// The currently-open action indices at `goal` — the legal moves `step`
    /// will accept right now.
    pub fn legal_action_indices(&self) -> Vec<usize> {
        match self.goal {
            None => Vec::new(),
            Some(g) => self.tableau.node(g).open_actions().map(|(i, _)| i).collect(),
        }
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Starts (or restarts, for a fresh iterative-deepening round) the proof
    /// attempt at `depth`, defaulting to `settings.iterative_deepening_initial_depth`.
    pub fn reset(&mut self, depth: Option<i32>) {
        self.max_depth = depth.unwrap_or(self.settings.iterative_deepening_initial_depth);
        self.matrix.reset();
        self.tableau = Tableau::new();
        self.substitution = Substitution::new();
        self.proof_sequence.clear();
        self.prefix_unifier = None;
        self.var_gen_num = 0;
        self.info = None;
        self.goal = Some(Tableau::ROOT);
        self.compute_actions(Tableau::ROOT);
    }

    /// Applies the action currently at `action_idx` in the active goal's
    /// legal-action list. A no-op once the attempt is terminal.
    pub fn step(&mut self, action_idx: usize) {
        if self.is_terminal() {
            return;
        }
        let Some(goal) = self.goal else { return };
        self.apply(goal, action_idx);
    }

    fn apply(&mut self, goal: usize, action_idx: usize) {
        let action = self.tableau.node(goal).actions[action_idx].clone();
        self.tableau.node_mut(goal).removed[action_idx] = true;
        self.tableau.node_mut(goal).num_attempted += 1;
        if self.verbose {
            println!("{}", self.describe_action(goal, &action));
        }
        match action {
            Action::Backtrack => self.do_backtrack(),
            Action::Start { clause_idx: None, .. } => {
                self.info = Some(Outcome::NonTheorem(
                    "no positive start clauses available".to_string(),
                ));
            }
            Action::Start {
                clause_idx: Some(_),
                ref clause_copy,
            } => {
                self.open_children(goal, clause_copy.clone(), None);
                self.proof_sequence.push((goal, action));
                self.theorem_or_next();
            }
            Action::Extension {
                lit_idx,
                ref clause_copy,
                ref sub_updates,
                ..
            } => {
                self.substitution.update(sub_updates.clone());
                self.open_children(goal, clause_copy.clone(), Some(lit_idx));
                self.proof_sequence.push((goal, action));
                self.theorem_or_next();
            }
            Action::Reduction { ref sub_updates, .. } => {
                self.substitution.update(sub_updates.clone());
                self.tableau.node_mut(goal).proven = true;
                self.proof_sequence.push((goal, action));
                self.theorem_or_next();
            }
        }
    }

    fn open_children(&mut self, goal: usize, clause_copy: Vec<Literal>, connected_idx: Option<usize>) {
        let mut child_idxs = Vec::with_capacity(clause_copy.len());
        for lit in clause_copy {
            child_idxs.push(self.tableau.add_child(goal, lit));
        }
        if let Some(idx) = connected_idx {
            self.tableau.node_mut(child_idxs[idx]).proven = true;
            let node = self.tableau.node_mut(goal);
            let connected = node.children.remove(idx);
            node.children.insert(0, connected);
        }
    }

    fn describe_action(&self, goal: usize, action: &Action) -> String {
        match action {
            Action::Start { clause_idx, .. } => {
                format!("goal {goal}: start from clause {clause_idx:?}")
            }
            Action::Extension {
                clause_idx, lit_idx, ..
            } => format!("goal {goal}: extend against clause {clause_idx} lit {lit_idx}"),
            Action::Reduction { path_node, .. } => {
                format!("goal {goal}: reduce against ancestor {path_node}")
            }
            Action::Backtrack => format!("goal {goal}: backtrack"),
        }
    }

    /// Finds the next open goal after the tableau changed, closing the
    /// classical proof (and, for non-classical logics, checking prefix
    /// admissibility) if none remains.
    fn theorem_or_next(&mut self) {
        let Some(current) = self.goal else { return };
        if let Some(next) = self.tableau.find_next(current) {
            self.goal = Some(next);
            self.compute_actions(next);
            return;
        }

        if self.settings.logic.is_classical() {
            self.info = Some(Outcome::Theorem);
            return;
        }

        let mut equations = self.admissible_pairs();
        equations.extend(self.proof_pairs());
        let cases = self.prefix_cases();
        let mut gensym = Gensym::default();
        let mut probe = self.substitution.clone();
        if let Some(unifier) = prefix::pre_unify_list(&equations, &mut probe, cases, &mut gensym) {
            self.prefix_unifier = Some(unifier);
            self.info = Some(Outcome::Theorem);
            return;
        }

        if self.verbose {
            println!("goal {current}: admissibility check failed, resuming search");
        }
        if let Some((_, popped)) = self.proof_sequence.pop() {
            // `Start` never calls `substitution.update`, so it never opened
            // a trail frame — only Extension/Reduction did.
            if !matches!(popped, Action::Start { .. }) {
                self.substitution.backtrack();
            }
        }
        self.tableau.clear_children(current);
        self.tableau.unprove_ancestors(current);
        // Leave `current`'s `actions`/`removed` untouched: the just-tried
        // connection stays removed, so the next `step` falls through to
        // whatever is left (another connection, or `Backtrack`) rather than
        // re-offering the one that already failed admissibility.
    }

    fn do_backtrack(&mut self) {
        loop {
            let Some(prev) = self.tableau.find_prev(self.goal.unwrap()) else {
                if self.settings.iterative_deepening {
                    let next_depth = self.max_depth + 1;
                    if self.verbose {
                        println!("exhausted depth {}, deepening to {next_depth}", self.max_depth);
                    }
                    self.reset(Some(next_depth));
                } else {
                    self.info = Some(Outcome::NonTheorem(
                        "search space exhausted".to_string(),
                    ));
                }
                return;
            };
            self.goal = Some(prev);
            if let Some((_, popped)) = self.proof_sequence.pop() {
                // `Start` never calls `substitution.update`, so it never
                // opened a trail frame — only Extension/Reduction did.
                if !matches!(popped, Action::Start { .. }) {
                    self.substitution.backtrack();
                }
            }
            self.tableau.clear_children(prev);

            let node = self.tableau.node(prev);
            let has_other_action = node.open_actions().any(|(_, a)| !a.is_backtrack());
            let attempts_allowed = !self.settings.restricted_backtracking
                || node.num_attempted <= self.settings.backtrack_after;
            if has_other_action && attempts_allowed {
                self.compute_actions_if_empty(prev);
                return;
            }
        }
    }

    /// `compute_actions` already ran for `prev` the first time it became the
    /// active goal; re-run it only if its action list was consumed down to
    /// nothing by the walk above (shouldn't normally happen, since the loop
    /// only stops when an action remains, but keeps `step` safe regardless).
    fn compute_actions_if_empty(&mut self, node: usize) {
        if self.tableau.node(node).actions.is_empty() {
            self.compute_actions(node);
        }
    }

    fn compute_actions(&mut self, node: usize) {
        let actions = if self.tableau.node(node).parent.is_none() {
            self.starts()
        } else if self.regularizable(node) {
            vec![Action::Backtrack]
        } else if self.settings.iterative_deepening && self.tableau.node(node).depth >= self.max_depth {
            let mut a = self.reductions(node);
            a.push(Action::Backtrack);
            a
        } else {
            let mut a = self.reductions(node);
            a.extend(self.extensions(node));
            a.push(Action::Backtrack);
            a
        };
        let removed = vec![false; actions.len()];
        let n = self.tableau.node_mut(node);
        n.actions = actions;
        n.removed = removed;
    }

    fn starts(&mut self) -> Vec<Action> {
        let candidates: Vec<usize> = if self.settings.positive_start_clauses {
            self.matrix.positive_clauses().to_vec()
        } else {
            (0..self.matrix.num_clauses()).collect()
        };
        if candidates.is_empty() {
            return vec![Action::Start {
                clause_idx: None,
                clause_copy: Vec::new(),
            }];
        }
        candidates
            .into_iter()
            .map(|idx| Action::Start {
                clause_idx: Some(idx),
                clause_copy: self.matrix.copy(idx),
            })
            .collect()
    }

    fn extensions(&mut self, goal: usize) -> Vec<Action> {
        let goal_lit = self.tableau.node(goal).literal.clone().expect("goal has a literal");
        let candidates = self.matrix.complements(&goal_lit).to_vec();
        let mut out = Vec::new();
        for (clause_idx, lit_idx) in candidates {
            let copy = self.matrix.copy(clause_idx);
            let (ok, frame) = self
                .substitution
                .can_unify(&goal_lit.as_term(), &copy[lit_idx].as_term());
            if !ok {
                continue;
            }
            if !self.settings.logic.is_classical()
                && !self.passes_prefix_filter(&goal_lit, &copy[lit_idx], &frame)
            {
                continue;
            }
            out.push(Action::Extension {
                clause_idx,
                lit_idx,
                clause_copy: copy,
                sub_updates: frame,
            });
        }
        out
    }

    fn reductions(&mut self, goal: usize) -> Vec<Action> {
        let goal_lit = self.tableau.node(goal).literal.clone().expect("goal has a literal");
        let mut ancestors = self.tableau.path_node_indices(goal);
        ancestors.pop(); // drop goal itself
        ancestors.reverse(); // nearest ancestor first
        let mut out = Vec::new();
        for anc in ancestors {
            let anc_lit = self.tableau.node(anc).literal.clone().expect("ancestor has a literal");
            if anc_lit.neg == goal_lit.neg || anc_lit.symbol != goal_lit.symbol {
                continue;
            }
            let (ok, frame) = self
                .substitution
                .can_unify(&goal_lit.as_term(), &anc_lit.as_term());
            if !ok {
                continue;
            }
            if !self.settings.logic.is_classical()
                && !self.passes_prefix_filter(&goal_lit, &anc_lit, &frame)
            {
                continue;
            }
            out.push(Action::Reduction {
                path_node: anc,
                sub_updates: frame,
            });
        }
        out
    }

    /// Regularity: the just-opened clause (the goal's siblings under its
    /// parent — the unresolved remainder of the clause copy, including the
    /// auto-closed connected child) is a dead branch if ANY of its literals
    /// already occurs, under the current substitution, among the ancestors
    /// above that clause. One duplicate anywhere in the clause condemns the
    /// whole clause, not just the literal currently at `goal`. Non-classical
    /// logics strengthen the check to also require the two literals'
    /// prefixes to agree, since two syntactically identical atoms at
    /// different worlds are not redundant.
    fn regularizable(&mut self, goal: usize) -> bool {
        let Some(parent) = self.tableau.node(goal).parent else {
            return false;
        };
        let current_clause = self.tableau.node(parent).children.clone();
        let ancestors = self.tableau.path_node_indices(parent);
        for sibling in current_clause {
            let sib_lit = self
                .tableau
                .node(sibling)
                .literal
                .clone()
                .expect("clause sibling has a literal");
            for &anc in &ancestors {
                let anc_lit = self.tableau.node(anc).literal.clone().expect("ancestor has a literal");
                if anc_lit.neg != sib_lit.neg || anc_lit.symbol != sib_lit.symbol {
                    continue;
                }
                if !self.substitution.equal(&anc_lit.as_term(), &sib_lit.as_term()) {
                    continue;
                }
                if self.settings.logic.is_classical() {
                    return true;
                }
                let anc_pre = anc_lit.prefix_or_empty();
                let sib_pre = sib_lit.prefix_or_empty();
                if self.substitution.equal(&anc_pre, &sib_pre) {
                    return true;
                }
            }
        }
        false
    }

    /// Probes whether `sub_updates` (already passing classical unification)
    /// also admits a prefix unifier for `(goal_lit, other_lit)`, without
    /// retaining any of the bindings tried: the classical `sub_updates`
    /// frame is replayed, the probe runs, and everything opened since the
    /// mark is rolled back regardless of outcome.
    fn passes_prefix_filter(&mut self, goal_lit: &Literal, other_lit: &Literal, sub_updates: &Frame) -> bool {
        let mark = self.substitution.mark();
        self.substitution.update(sub_updates.clone());
        let (pre_1, pre_2) = self.pre_eq(goal_lit, other_lit);
        let cases = self.prefix_cases();
        let mut gensym = Gensym::default();
        let ok = prefix::pre_unify(pre_1.args(), &[], pre_2.args(), &mut self.substitution, cases, &mut gensym);
        self.substitution.undo_to(mark);
        ok
    }

    fn append_fresh_var(&mut self, prefix: &Term) -> Term {
        self.var_gen_num += 1;
        let mut args = prefix.args().to_vec();
        args.push(Term::var(&format!("W{}", self.var_gen_num), 0));
        Term::string(args)
    }

    /// `_pre_eq`: the per-logic rule turning a candidate connection's two
    /// literals into the pair of prefixes `pre_unify` is asked to reconcile.
    fn pre_eq(&mut self, lit_1: &Literal, lit_2: &Literal) -> (Term, Term) {
        match self.settings.logic {
            Logic::Classical => (lit_1.prefix_or_empty(), lit_2.prefix_or_empty()),
            Logic::Intuitionistic => {
                let (neg_lit, other_lit) = if lit_1.neg { (lit_1, lit_2) } else { (lit_2, lit_1) };
                let pre_neg = self.append_fresh_var(&neg_lit.prefix_or_empty());
                (pre_neg, other_lit.prefix_or_empty())
            }
            Logic::D | Logic::T | Logic::S4 => (lit_1.prefix_or_empty(), lit_2.prefix_or_empty()),
            Logic::S5 => (last_one(&lit_1.prefix_or_empty()), last_one(&lit_2.prefix_or_empty())),
        }
    }

    fn prefix_cases(&self) -> CaseSet {
        match self.settings.logic {
            Logic::Classical => CaseSet::Simple,
            Logic::Intuitionistic | Logic::S4 | Logic::S5 => CaseSet::Full,
            Logic::T => CaseSet::Restricted,
            Logic::D => CaseSet::Simple,
        }
    }

    /// Every `(var, term)` binding the current substitution holds, paired
    /// with every eigenvariable `find_eigenvariables` finds inside `term`.
    fn bound_eigenvariables(&self) -> Vec<(VarKey, Term, Term)> {
        let mut out = Vec::new();
        for (key, term) in self.substitution.bindings() {
            let mut eigens = Vec::new();
            term.find_eigenvariables(&mut eigens);
            if eigens.is_empty() {
                continue;
            }
            let var_prefix = self.substitution.prefix_of(&key);
            for eigen in eigens {
                out.push((key.clone(), var_prefix.clone(), eigen.prefix_or_empty()));
            }
        }
        out
    }

    /// The admissible-pair equations, which must hold alongside
    /// `proof_pairs` for the tableau's prefix assignment to witness the
    /// modal/intuitionistic accessibility relation `settings.domain` picks.
    fn admissible_pairs(&mut self) -> Vec<(Term, Term)> {
        if self.settings.logic.is_classical() {
            return Vec::new();
        }
        match (self.settings.domain, self.settings.logic) {
            (Domain::Constant, _) => Vec::new(),
            (Domain::Cumulative, Logic::S5) => Vec::new(),
            (Domain::Cumulative, Logic::Intuitionistic) | (Domain::Cumulative, Logic::S4) => {
                let pairs = self.bound_eigenvariables();
                pairs
                    .into_iter()
                    .map(|(_, var_prefix, eigen_prefix)| (var_prefix, self.append_fresh_var(&eigen_prefix)))
                    .collect()
            }
            (Domain::Cumulative, Logic::D) | (Domain::Cumulative, Logic::T) => self
                .bound_eigenvariables()
                .into_iter()
                .map(|(_, var_prefix, eigen_prefix)| {
                    let n = eigen_prefix.args().len();
                    let truncated: Vec<Term> = var_prefix.args().iter().take(n).cloned().collect();
                    (Term::string(truncated), eigen_prefix)
                })
                .collect(),
            (Domain::Varying, Logic::S5) => self
                .bound_eigenvariables()
                .into_iter()
                .map(|(_, var_prefix, eigen_prefix)| (last_one(&var_prefix), last_one(&eigen_prefix)))
                .collect(),
            (Domain::Varying, Logic::Classical) => Vec::new(),
            (Domain::Varying, _) => self
                .bound_eigenvariables()
                .into_iter()
                .map(|(_, var_prefix, eigen_prefix)| (var_prefix, eigen_prefix))
                .collect(),
            (Domain::Cumulative, Logic::Classical) => Vec::new(),
        }
    }

    /// One `pre_eq` pair per action actually applied along the closed proof
    /// (excluding `Start`/`Backtrack`, which carry no connection).
    fn proof_pairs(&mut self) -> Vec<(Term, Term)> {
        let sequence = self.proof_sequence.clone();
        let mut out = Vec::with_capacity(sequence.len());
        for (node_idx, action) in sequence {
            let lit_1 = self
                .tableau
                .node(node_idx)
                .literal
                .clone()
                .expect("proof-sequence node has a literal");
            let lit_2 = match &action {
                Action::Extension { clause_copy, lit_idx, .. } => clause_copy[*lit_idx].clone(),
                Action::Reduction { path_node, .. } => self
                    .tableau
                    .node(*path_node)
                    .literal
                    .clone()
                    .expect("reduction ancestor has a literal"),
                _ => continue,
            };
            out.push(self.pre_eq(&lit_1, &lit_2));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn unit(symbol: &str, neg: bool) -> Vec<Literal> {
        vec![Literal::new(symbol, vec![], neg)]
    }

    fn run_to_completion(state: &mut ConnectionState) -> Outcome {
        for _ in 0..10_000 {
            if let Some(outcome) = state.outcome() {
                return outcome.clone();
            }
            let actions = state.legal_action_indices();
            state.step(actions[0]);
        }
        panic!("search did not terminate");
    }

    #[test]
    fn propositional_complementary_unit_clauses_prove() {
        let matrix = Matrix::new(vec![unit("p", false), unit("p", true)]);
        let mut state = ConnectionState::new(matrix, Settings::default());
        assert_eq!(run_to_completion(&mut state), Outcome::Theorem);
    }

    #[test]
    fn disjoint_unit_clauses_are_non_theorems() {
        let matrix = Matrix::new(vec![unit("p", false), unit("q", false)]);
        let mut state = ConnectionState::new(matrix, Settings::default());
        assert!(matches!(run_to_completion(&mut state), Outcome::NonTheorem(_)));
    }

    #[test]
    fn first_order_extension_unifies_the_connecting_variable() {
        let a = Term::constant("a");
        let px_pos = Literal::new("p", vec![a.clone()], false);
        let px_neg = Literal::new("p", vec![Term::var("X", 0)], true);
        let matrix = Matrix::new(vec![vec![px_pos], vec![px_neg]]);
        let mut state = ConnectionState::new(matrix, Settings::default());
        assert_eq!(run_to_completion(&mut state), Outcome::Theorem);
    }

    #[test]
    fn backtracking_finds_the_matching_extension_after_a_wrong_first_choice() {
        // [P(X), Q(X)], [-P(a)], [-Q(b)]: X must unify with a through the
        // P-branch and the proof only closes via the P(a) connection, so any
        // engine that commits Q(X) to b first must backtrack.
        let a = Term::constant("a");
        let b = Term::constant("b");
        let start = vec![
            Literal::new("p", vec![Term::var("X", 0)], false),
            Literal::new("q", vec![Term::var("X", 0)], false),
        ];
        let not_p = vec![Literal::new("p", vec![a], true)];
        let not_q = vec![Literal::new("q", vec![b], true)];
        let matrix = Matrix::new(vec![start, not_p, not_q]);
        let mut state = ConnectionState::new(matrix, Settings::default());
        assert!(matches!(
            run_to_completion(&mut state),
            Outcome::NonTheorem(_)
        ));
    }

    #[test]
    fn restricted_backtracking_still_reaches_a_terminal_outcome() {
        let matrix = Matrix::new(vec![unit("p", false), unit("p", true)]);
        let mut settings = Settings::default();
        settings.restricted_backtracking = true;
        settings.backtrack_after = 1;
        let mut state = ConnectionState::new(matrix, settings);
        assert_eq!(run_to_completion(&mut state), Outcome::Theorem);
    }
}
