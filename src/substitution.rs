use fxhash::FxHashMap;

use crate::term::{Term, VarKey};

/// One trail entry, recording enough to undo — or later redo — a single
/// `find`/`union` step.
///
/// `Fresh` records a variable that was added to `parent` with no prior
/// binding (undone by removing it, redone by reinserting it as its own
/// representative); `Rebind` records a variable whose `parent` entry changed
/// from `old` to `new` (undone by restoring `old`, redone by reinstating
/// `new`), covering both path-compression updates inside `find` and the
/// actual binding performed by `union`.
#[derive(Debug, Clone)]
pub enum TrailEntry {
    Fresh(VarKey),
    Rebind { var: VarKey, old: Term, new: Term },
}

/// A captured trail frame: the entries one `union` call produced. Stored
/// verbatim inside a connection action as `sub_updates` so that choosing the
/// action later replays the same bindings without redoing the unification
/// search.
pub type Frame = Vec<TrailEntry>;

/// Union-find substitution over first-order terms, with explicit trail-based
/// backtracking instead of `deepcopy`-per-branch.
///
/// `parent` maps a variable key to its current binding (which may itself be
/// another unbound variable, acting as its own representative). `trail` is a
/// stack of frames; each frame groups the entries produced by one `union`
/// call (or, outside of `union`, one `find`-driven path compression) so that
/// `backtrack()` can undo exactly one such call.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    parent: FxHashMap<VarKey, Term>,
    trail: Vec<Frame>,
    /// The prefix each variable carried the first time it was seen, kept
    /// aside because `parent` overwrites a variable's own `Variable { prefix
    ///, .. }` with whatever it gets bound to. Read by the admissibility
    /// check (`crate::engine`), which needs `var.prefix` for variables that
    /// may already be bound to something else entirely.
    var_prefixes: FxHashMap<VarKey, Term>,
}

impl Substitution {
    pub fn new() -> Substitution {
        Substitution {
            parent: FxHashMap::default(),
            trail: Vec::new(),
            var_prefixes: FxHashMap::default(),
        }
    }

    fn note_prefix(&mut self, item: &Term) {
        if let Some(p) = item.prefix() {
            let key = item.var_key();
            self.var_prefixes.entry(key).or_insert_with(|| p.clone());
        }
    }

    /// The prefix `key`'s variable was introduced with, or an empty one if
    /// it was never stamped with one.
    pub fn prefix_of(&self, key: &VarKey) -> Term {
        self.var_prefixes
            .get(key)
            .cloned()
            .unwrap_or_else(|| Term::string(vec![]))
    }

    /// Finds the representative of `item`. Non-variables are returned
    /// unchanged. When `add` is true, an unbound variable not yet present is
    /// registered as its own representative (and the registration is
    /// trailed); when false, it is returned as-is without being added.
    pub fn find(&mut self, item: &Term, add: bool) -> Term {
        let Term::Variable { .. } = item else {
            return item.clone();
        };
        let key = item.var_key();
        match self.parent.get(&key).cloned() {
            None => {
                if !add {
                    return item.clone();
                }
                self.note_prefix(item);
                self.ensure_frame();
                self.trail
                    .last_mut()
                    .unwrap()
                    .push(TrailEntry::Fresh(key.clone()));
                self.parent.insert(key, item.clone());
                item.clone()
            }
            Some(bound) => {
                if bound == *item {
                    return bound;
                }
                let resolved = self.find(&bound, add);
                if resolved != bound {
                    self.ensure_frame();
                    self.trail.last_mut().unwrap().push(TrailEntry::Rebind {
                        var: key.clone(),
                        old: bound,
                        new: resolved.clone(),
                    });
                    self.parent.insert(key, resolved.clone());
                }
                resolved
            }
        }
    }

    fn ensure_frame(&mut self) {
        if self.trail.is_empty() {
            self.trail.push(Vec::new());
        }
    }

    /// Finds without registering unbound variables, used wherever a caller
    /// reads a term's current binding without committing to trail it (e.g.
    /// `occurs_check`, `equal`, `apply`).
    pub fn find_readonly(&mut self, item: &Term) -> Term {
        self.find(item, false)
    }

    /// Attempts to unify `s` and `t`, opening one new trail frame. Returns
    /// `true` on success with the frame left open; on failure the frame is
    /// left in place too, with whatever partial bindings were made before
    /// the mismatch — callers rely on their own `backtrack()` to roll an
    /// unsuccessful `union` back rather than this method undoing itself.
    pub fn union(&mut self, s: &Term, t: &Term) -> bool {
        self.trail.push(Vec::new());
        let mut equations = vec![(s.clone(), t.clone())];

        while let Some((s, t)) = equations.pop() {
            let s = self.find(&s, true);
            let t = self.find(&t, true);
            if s == t {
                continue;
            }
            if s.is_variable() {
                if self.occurs_check(&s, &t) {
                    return false;
                }
                self.bind(&s, t);
            } else if t.is_variable() {
                if self.occurs_check(&t, &s) {
                    return false;
                }
                self.bind(&t, s);
            } else {
                if s.symbol() != t.symbol() || s.args().len() != t.args().len() {
                    return false;
                }
                for (a, b) in s.args().iter().zip(t.args().iter()) {
                    equations.push((a.clone(), b.clone()));
                }
            }
        }
        true
    }

    fn bind(&mut self, var: &Term, value: Term) {
        self.note_prefix(var);
        let key = var.var_key();
        let old = self
            .parent
            .get(&key)
            .cloned()
            .unwrap_or_else(|| var.clone());
        self.trail.last_mut().unwrap().push(TrailEntry::Rebind {
            var: key.clone(),
            old,
            new: value.clone(),
        });
        self.parent.insert(key, value);
    }

    /// True if `var` occurs anywhere inside `term`'s current binding chain.
    pub fn occurs_check(&mut self, var: &Term, term: &Term) -> bool {
        let root = self.find_readonly(term);
        if var == &root {
            return true;
        }
        if root.is_function() {
            return root.args().iter().any(|arg| self.occurs_check(var, arg));
        }
        false
    }

    /// Undoes the most recently opened trail frame, restoring `parent` to
    /// its state before that frame's `union`/`find`-compression began.
    pub fn backtrack(&mut self) {
        let frame = self.trail.pop().expect("backtrack() with no open frame");
        for entry in frame.into_iter().rev() {
            match entry {
                TrailEntry::Fresh(key) => {
                    self.parent.remove(&key);
                }
                TrailEntry::Rebind { var, old, .. } => {
                    self.parent.insert(var, old);
                }
            }
        }
    }

    /// Re-applies a previously captured frame (e.g. one obtained from
    /// `can_unify`) without redoing the unification search: pushes it onto
    /// the trail and re-applies its entries forward (`Fresh` → insert
    /// identity, `Rebind` → set `parent[var] = new`).
    pub fn update(&mut self, frame: Frame) {
        for entry in &frame {
            match entry {
                TrailEntry::Fresh(key) => {
                    self.parent
                        .insert(key.clone(), Term::var(&key.symbol, key.copy_num));
                }
                TrailEntry::Rebind { var, new, .. } => {
                    self.parent.insert(var.clone(), new.clone());
                }
            }
        }
        self.trail.push(frame);
    }

    /// Attempts `s` ~ `t`, reporting success and the frame of bindings that
    /// would realize it, without retaining any binding: the probe is always
    /// rolled back before returning. The returned frame can later be
    /// `update`d to commit the same bindings.
    pub fn can_unify(&mut self, s: &Term, t: &Term) -> (bool, Frame) {
        let ok = self.union(s, t);
        let frame = self.trail.last().cloned().unwrap_or_default();
        self.backtrack();
        (ok, frame)
    }

    /// Structural equality of `s` and `t` under the current bindings,
    /// without adding any new variable to `parent`.
    pub fn equal(&mut self, s: &Term, t: &Term) -> bool {
        let s = self.find_readonly(s);
        let t = self.find_readonly(t);
        if s == t {
            return true;
        }
        if s.is_function() && t.is_function() {
            return s.symbol() == t.symbol()
                && s.args().len() == t.args().len()
                && s.args()
                    .iter()
                    .zip(t.args().iter())
                    .all(|(a, b)| self.equal(a, b));
        }
        false
    }

    /// Applies the substitution to `term`, recursively resolving every
    /// variable to its current binding. Unbound variables are returned
    /// as-is; bound compound terms are rebuilt with their resolved args.
    pub fn apply(&mut self, term: &Term) -> Term {
        let root = self.find_readonly(term);
        if root.is_variable() {
            return root;
        }
        match &root {
            Term::Constant { .. } => root,
            Term::Function {
                symbol,
                args,
                prefix,
            } => Term::Function {
                symbol: symbol.clone(),
                args: args.iter().map(|a| self.apply(a)).collect(),
                prefix: prefix.clone(),
            },
            Term::Variable { .. } => unreachable!(),
        }
    }

    /// How many frames are currently open, for tests and callers that want
    /// to confirm a probe left no trace.
    pub fn depth(&self) -> usize {
        self.trail.len()
    }

    /// Records the current trail depth, to be paired with `undo_to`. This is
    /// the trail-checkpoint technique the prefix unifier (`crate::prefix`)
    /// uses in place of deep-copying the substitution per branch: mark,
    /// attempt a multi-step probe, and roll every frame opened since the
    /// mark back in one call on failure.
    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Pops frames until the trail is back to `mark` frames deep. A no-op if
    /// already at or below that depth.
    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            self.backtrack();
        }
    }

    /// A dump of every non-trivial binding, mirroring `Substitution.to_dict`.
    pub fn bindings(&self) -> Vec<(VarKey, Term)> {
        self.parent
            .iter()
            .filter(|(k, v)| v.var_key_if_variable().as_ref() != Some(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn unifies_variable_with_constant() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let a = Term::constant("a");
        assert!(sub.union(&x, &a));
        assert_eq!(sub.apply(&x), a);
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let fx = Term::func("f", vec![x.clone()]);
        assert!(!sub.union(&x, &fx));
    }

    #[test]
    fn backtrack_undoes_a_union() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let a = Term::constant("a");
        assert!(sub.union(&x, &a));
        sub.backtrack();
        assert_eq!(sub.apply(&x), x);
    }

    #[test]
    fn can_unify_leaves_no_trace() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let a = Term::constant("a");
        let depth_before = sub.depth();
        let (ok, _frame) = sub.can_unify(&x, &a);
        assert!(ok);
        assert_eq!(sub.depth(), depth_before);
        assert_eq!(sub.apply(&x), x);
    }

    #[test]
    fn can_unify_frame_can_be_committed_later() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let a = Term::constant("a");
        let (ok, frame) = sub.can_unify(&x, &a);
        assert!(ok);
        assert_eq!(sub.apply(&x), x);
        sub.update(frame);
        assert_eq!(sub.apply(&x), a);
    }

    #[test]
    fn unify_fails_on_symbol_mismatch() {
        let mut sub = Substitution::new();
        let f = Term::func("f", vec![Term::constant("a")]);
        let g = Term::func("g", vec![Term::constant("a")]);
        assert!(!sub.union(&f, &g));
    }

    #[test]
    fn apply_resolves_nested_variables() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let y = Term::var("Y", 0);
        assert!(sub.union(&x, &y));
        assert!(sub.union(&y, &Term::constant("a")));
        assert_eq!(sub.apply(&x), Term::constant("a"));
    }

    #[test]
    fn update_then_backtrack_is_a_no_op() {
        let mut sub = Substitution::new();
        let x = Term::var("X", 0);
        let a = Term::constant("a");
        let (_, frame) = sub.can_unify(&x, &a);
        let before = sub.bindings();
        sub.update(frame);
        sub.backtrack();
        assert_eq!(sub.bindings(), before);
    }
}
