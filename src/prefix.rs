//! Prefix unification: string-unification over sequences of prefix
//! variables and world-introducing Function constants, used to lift the
//! classical connection calculus to the intuitionistic and modal calculi.
//! Implements the 11 rewriting cases shared by the full-prefix logics plus
//! the narrower variants needed by T and D.
//!
//! Each case recurses on the *same* `Substitution`, isolating a failed
//! branch with a trail checkpoint (`Substitution::mark`/`undo_to`) rather
//! than copying the whole map per branch. Recursion is used instead of an
//! explicit work stack: prefix sequences are short (bounded by formula
//! nesting depth), so the risk of stack exhaustion that motivates explicit
//! stacks for deep tableau DFS does not apply here.

use crate::substitution::Substitution;
use crate::term::Term;

/// Which subset of the 11 rewriting cases is enabled for a given logic.
/// `Full` is shared by intuitionistic logic and S4/S5 (S5 restricts the
/// *input* prefixes to their last element before calling in, rather than
/// restricting the case set). `Restricted` is T's narrower variant: cases 8
/// and 10, which grow a prefix by accumulating an arbitrary run of
/// world-constants or mint a fresh chaining variable, are disabled — T's
/// accessibility relation is reflexive but not transitive, so its prefixes
/// never need to grow past one extra world per step. `Simple` is D: no
/// rewriting at all, just ordinary term unification over prefixes of equal
/// length (see `pre_unify_simple`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSet {
    Full,
    Restricted,
    Simple,
}

/// Monotonic counter used to name the fresh chaining variables case 10
/// invents (`_gen<n>`), threaded through a single top-level `pre_unify`
/// call so names stay unique within one unification attempt.
#[derive(Debug, Default)]
pub struct Gensym(u32);

impl Gensym {
    pub fn fresh(&mut self) -> Term {
        self.0 += 1;
        Term::var(&format!("_gen{}", self.0), 0)
    }
}

fn flatten_string(t: &Term) -> Vec<Term> {
    let mut out = Vec::new();
    for arg in t.args() {
        if arg.is_string() {
            out.extend(flatten_string(arg));
        } else {
            out.push(arg.clone());
        }
    }
    out
}

/// Resolves each term under the current substitution, then splices any
/// resulting `string(...)` term's own (recursively flattened) args into the
/// output list in place — nested prefixes are never treated as opaque.
fn apply_and_flatten(items: &[Term], sub: &mut Substitution) -> Vec<Term> {
    let mut out = Vec::new();
    for item in items {
        let resolved = sub.apply(item);
        if resolved.is_string() {
            out.extend(flatten_string(&resolved));
        } else {
            out.push(resolved);
        }
    }
    out
}

/// D's prefix unification: plain term unification of two equal-length
/// flattened sequences, with no rewriting at all.
fn pre_unify_simple(l_pre: &[Term], r_pre: &[Term], sub: &mut Substitution) -> bool {
    let l = apply_and_flatten(l_pre, sub);
    let r = apply_and_flatten(r_pre, sub);
    if l.len() != r.len() {
        return false;
    }
    let mark = sub.mark();
    for (a, b) in l.iter().zip(r.iter()) {
        if !sub.union(a, b) {
            sub.undo_to(mark);
            return false;
        }
    }
    true
}

/// Attempts to find a single prefix unifier for `(l_pre, m_pre, r_pre)`
/// under `cases`, committing the winning branch's bindings to `sub` on
/// success and leaving `sub` exactly as it started on failure.
pub fn pre_unify(
    l_pre: &[Term],
    m_pre: &[Term],
    r_pre: &[Term],
    sub: &mut Substitution,
    cases: CaseSet,
    gensym: &mut Gensym,
) -> bool {
    if cases == CaseSet::Simple {
        return pre_unify_simple(l_pre, r_pre, sub);
    }

    let l = apply_and_flatten(l_pre, sub);
    let m = apply_and_flatten(m_pre, sub);
    let r = apply_and_flatten(r_pre, sub);

    // Case 1.
    if l.is_empty() && m.is_empty() && r.is_empty() {
        return true;
    }

    // Case 2: rotate.
    if l.is_empty() && m.is_empty() && !r.is_empty() {
        let mark = sub.mark();
        if pre_unify(&r, &[], &[], sub, cases, gensym) {
            return true;
        }
        sub.undo_to(mark);
    }

    // Cases 3 & 4.
    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (x, y) = (l[0].clone(), r[0].clone());
        if x.is_variable() && y.is_variable() && x == y {
            let mark = sub.mark();
            if pre_unify(&l[1..], &[], &r[1..], sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        } else if x.is_function() && y.is_function() {
            let mark = sub.mark();
            if sub.union(&x, &y) && pre_unify(&l[1..], &[], &r[1..], sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 5: swap.
    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (a, v) = (l[0].clone(), r[0].clone());
        if a.is_function() && v.is_variable() {
            let mark = sub.mark();
            if pre_unify(&r, &[], &l, sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 6: (V::u, z, []).
    if !l.is_empty() && r.is_empty() {
        let v = l[0].clone();
        if v.is_variable() {
            let mark = sub.mark();
            let bound = Term::string(m.clone());
            if sub.union(&v, &bound) && pre_unify(&l[1..], &[], &[], sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 7: (V::u, [], a::w).
    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (v, a) = (l[0].clone(), r[0].clone());
        if v.is_variable() && a.is_function() {
            let mark = sub.mark();
            if sub.union(&v, &Term::string(vec![]))
                && pre_unify(&l[1..], &[], &r, sub, cases, gensym)
            {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 8: (V::u, z, a::b::w) — disabled for T.
    if cases != CaseSet::Restricted && !l.is_empty() && r.len() >= 2 {
        let v = l[0].clone();
        let (a, b) = (r[0].clone(), r[1].clone());
        if v.is_variable() && a.is_function() && b.is_function() {
            let mark = sub.mark();
            let mut bound_args = m.clone();
            bound_args.push(a.clone());
            let bound = Term::string(bound_args);
            if sub.union(&v, &bound) && pre_unify(&l[1..], &[], &r[1..], sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 9: (V::Y::u, [], V̂::w).
    if l.len() >= 2 && m.is_empty() && !r.is_empty() {
        let (v, y, v_hat) = (l[0].clone(), l[1].clone(), r[0].clone());
        if v.is_variable() && v_hat.is_variable() && v != v_hat {
            let mark = sub.mark();
            let mut newl = vec![v_hat.clone()];
            newl.extend_from_slice(&r[1..]);
            let newm = vec![v.clone()];
            let mut newr = vec![y.clone()];
            newr.extend_from_slice(&l[2..]);
            if pre_unify(&newl, &newm, &newr, sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    // Case 10: (V::Y::u, X::z, V̂::w) — disabled for T.
    if cases != CaseSet::Restricted && l.len() >= 2 && !m.is_empty() && !r.is_empty() {
        let (v, y, v_hat) = (l[0].clone(), l[1].clone(), r[0].clone());
        if v.is_variable() && v_hat.is_variable() && v != v_hat {
            let mark = sub.mark();
            let v_dash = gensym.fresh();
            let mut bound_args = m.clone();
            bound_args.push(v_dash.clone());
            let bound = Term::string(bound_args);
            if sub.union(&v, &bound) {
                let mut newl = vec![v_hat.clone()];
                newl.extend_from_slice(&r[1..]);
                let newm = vec![v_dash.clone()];
                let mut newr = vec![y.clone()];
                newr.extend_from_slice(&l[2..]);
                if pre_unify(&newl, &newm, &newr, sub, cases, gensym) {
                    return true;
                }
            }
            sub.undo_to(mark);
        }
    }

    // Case 11: shift.
    if !l.is_empty() && !r.is_empty() {
        let v = l[0].clone();
        let x = r[0].clone();
        let u_empty = l.len() == 1;
        let w_nonempty = r.len() > 1;
        if v.is_variable() && v != x && (u_empty || w_nonempty || x.is_function()) {
            let mark = sub.mark();
            let mut newm = m.clone();
            newm.push(x.clone());
            if pre_unify(&l, &newm, &r[1..], sub, cases, gensym) {
                return true;
            }
            sub.undo_to(mark);
        }
    }

    false
}

/// Exhaustively collects every solution, in the same case order as
/// `pre_unify` but never stopping at the first: every successful branch is
/// recorded (as a cloned `Substitution`, since the caller needs independent
/// snapshots to try against a second equation) and the search continues
/// through the remaining cases.
pub fn pre_unify_all(
    l_pre: &[Term],
    m_pre: &[Term],
    r_pre: &[Term],
    sub: &mut Substitution,
    cases: CaseSet,
    gensym: &mut Gensym,
    out: &mut Vec<Substitution>,
) {
    if cases == CaseSet::Simple {
        let mark = sub.mark();
        if pre_unify_simple(l_pre, r_pre, sub) {
            out.push(sub.clone());
        }
        sub.undo_to(mark);
        return;
    }

    let l = apply_and_flatten(l_pre, sub);
    let m = apply_and_flatten(m_pre, sub);
    let r = apply_and_flatten(r_pre, sub);

    if l.is_empty() && m.is_empty() && r.is_empty() {
        out.push(sub.clone());
    }

    if l.is_empty() && m.is_empty() && !r.is_empty() {
        let mark = sub.mark();
        pre_unify_all(&r, &[], &[], sub, cases, gensym, out);
        sub.undo_to(mark);
    }

    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (x, y) = (l[0].clone(), r[0].clone());
        if x.is_variable() && y.is_variable() && x == y {
            let mark = sub.mark();
            pre_unify_all(&l[1..], &[], &r[1..], sub, cases, gensym, out);
            sub.undo_to(mark);
        } else if x.is_function() && y.is_function() {
            let mark = sub.mark();
            if sub.union(&x, &y) {
                pre_unify_all(&l[1..], &[], &r[1..], sub, cases, gensym, out);
            }
            sub.undo_to(mark);
        }
    }

    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (a, v) = (l[0].clone(), r[0].clone());
        if a.is_function() && v.is_variable() {
            let mark = sub.mark();
            pre_unify_all(&r, &[], &l, sub, cases, gensym, out);
            sub.undo_to(mark);
        }
    }

    if !l.is_empty() && r.is_empty() {
        let v = l[0].clone();
        if v.is_variable() {
            let mark = sub.mark();
            let bound = Term::string(m.clone());
            if sub.union(&v, &bound) {
                pre_unify_all(&l[1..], &[], &[], sub, cases, gensym, out);
            }
            sub.undo_to(mark);
        }
    }

    if !l.is_empty() && m.is_empty() && !r.is_empty() {
        let (v, a) = (l[0].clone(), r[0].clone());
        if v.is_variable() && a.is_function() {
            let mark = sub.mark();
            if sub.union(&v, &Term::string(vec![])) {
                pre_unify_all(&l[1..], &[], &r, sub, cases, gensym, out);
            }
            sub.undo_to(mark);
        }
    }

    if cases != CaseSet::Restricted && !l.is_empty() && r.len() >= 2 {
        let v = l[0].clone();
        let (a, b) = (r[0].clone(), r[1].clone());
        if v.is_variable() && a.is_function() && b.is_function() {
            let mark = sub.mark();
            let mut bound_args = m.clone();
            bound_args.push(a.clone());
            if sub.union(&v, &Term::string(bound_args)) {
                pre_unify_all(&l[1..], &[], &r[1..], sub, cases, gensym, out);
            }
            sub.undo_to(mark);
        }
    }

    if l.len() >= 2 && m.is_empty() && !r.is_empty() {
        let (v, y, v_hat) = (l[0].clone(), l[1].clone(), r[0].clone());
        if v.is_variable() && v_hat.is_variable() && v != v_hat {
            let mark = sub.mark();
            let mut newl = vec![v_hat.clone()];
            newl.extend_from_slice(&r[1..]);
            let newm = vec![v.clone()];
            let mut newr = vec![y.clone()];
            newr.extend_from_slice(&l[2..]);
            pre_unify_all(&newl, &newm, &newr, sub, cases, gensym, out);
            sub.undo_to(mark);
        }
    }

    if cases != CaseSet::Restricted && l.len() >= 2 && !m.is_empty() && !r.is_empty() {
        let (v, y, v_hat) = (l[0].clone(), l[1].clone(), r[0].clone());
        if v.is_variable() && v_hat.is_variable() && v != v_hat {
            let mark = sub.mark();
            let v_dash = gensym.fresh();
            let mut bound_args = m.clone();
            bound_args.push(v_dash.clone());
            if sub.union(&v, &Term::string(bound_args)) {
                let mut newl = vec![v_hat.clone()];
                newl.extend_from_slice(&r[1..]);
                let newm = vec![v_dash.clone()];
                let mut newr = vec![y.clone()];
                newr.extend_from_slice(&l[2..]);
                pre_unify_all(&newl, &newm, &newr, sub, cases, gensym, out);
            }
            sub.undo_to(mark);
        }
    }

    if !l.is_empty() && !r.is_empty() {
        let v = l[0].clone();
        let x = r[0].clone();
        let u_empty = l.len() == 1;
        let w_nonempty = r.len() > 1;
        if v.is_variable() && v != x && (u_empty || w_nonempty || x.is_function()) {
            let mark = sub.mark();
            let mut newm = m.clone();
            newm.push(x.clone());
            pre_unify_all(&l, &newm, &r[1..], sub, cases, gensym, out);
            sub.undo_to(mark);
        }
    }
}

/// Finds a single substitution satisfying every pair in `equations`, by
/// chaining `pre_unify_all` calls: each equation's every solution is tried
/// as the starting point for the next equation, depth-first, returning the
/// first substitution that satisfies the whole list.
pub fn pre_unify_list(
    equations: &[(Term, Term)],
    sub: &mut Substitution,
    cases: CaseSet,
    gensym: &mut Gensym,
) -> Option<Substitution> {
    let Some((first, rest)) = equations.split_first() else {
        return Some(sub.clone());
    };
    let (l, r) = first;
    let l_args = l.args().to_vec();
    let r_args = r.args().to_vec();

    let mark = sub.mark();
    let mut unifiers = Vec::new();
    pre_unify_all(&l_args, &[], &r_args, sub, cases, gensym, &mut unifiers);
    sub.undo_to(mark);

    if rest.is_empty() {
        return unifiers.into_iter().next();
    }

    for mut unifier in unifiers {
        if let Some(result) = pre_unify_list(rest, &mut unifier, cases, gensym) {
            return Some(result);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn empty_prefixes_unify_trivially() {
        let mut sub = Substitution::new();
        let mut gensym = Gensym::default();
        assert!(pre_unify(&[], &[], &[], &mut sub, CaseSet::Full, &mut gensym));
    }

    #[test]
    fn matching_world_constants_unify() {
        let mut sub = Substitution::new();
        let mut gensym = Gensym::default();
        let l = vec![Term::func("w1", vec![])];
        let r = vec![Term::func("w1", vec![])];
        assert!(pre_unify(&l, &[], &r, &mut sub, CaseSet::Full, &mut gensym));
    }

    #[test]
    fn mismatched_world_constants_fail() {
        let mut sub = Substitution::new();
        let mut gensym = Gensym::default();
        let l = vec![Term::func("w1", vec![])];
        let r = vec![Term::func("w2", vec![])];
        assert!(!pre_unify(&l, &[], &r, &mut sub, CaseSet::Full, &mut gensym));
    }

    #[test]
    fn variable_prefix_binds_to_remaining_sequence() {
        let mut sub = Substitution::new();
        let mut gensym = Gensym::default();
        let v = Term::var("V", 0);
        let l = vec![v.clone()];
        let r = vec![Term::func("w1", vec![]), Term::func("w2", vec![])];
        assert!(pre_unify(&l, &[], &r, &mut sub, CaseSet::Full, &mut gensym));
        let bound = sub.apply(&v);
        assert_eq!(
            bound,
            Term::string(vec![Term::func("w1", vec![]), Term::func("w2", vec![])])
        );
    }

    #[test]
    fn d_simple_unification_requires_equal_length() {
        let mut sub = Substitution::new();
        let l = vec![Term::func("w1", vec![])];
        let r = vec![Term::func("w1", vec![]), Term::func("w2", vec![])];
        assert!(!pre_unify_simple(&l, &r, &mut sub));
    }

    #[test]
    fn failed_probe_leaves_substitution_untouched() {
        let mut sub = Substitution::new();
        let mut gensym = Gensym::default();
        let before = sub.bindings();
        let l = vec![Term::func("w1", vec![])];
        let r = vec![Term::func("w2", vec![])];
        let mark = sub.mark();
        assert!(!pre_unify(&l, &[], &r, &mut sub, CaseSet::Full, &mut gensym));
        sub.undo_to(mark);
        assert_eq!(sub.bindings(), before);
    }
}
