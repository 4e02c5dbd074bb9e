//! The six concrete scenarios named as testable properties: end-to-end
//! through the text parser and `Environment`, rather than hand-built
//! `Matrix`/`Literal` values as the per-module unit tests use.

use indoc::indoc;

use super::common::{
    expect_non_theorem, expect_theorem, prove_classical, prove_classical_with, prove_prefixed_with,
};
use crate::action::Action;
use crate::engine::Outcome;
use crate::settings::{Domain, Logic, Settings};

/// 1. Unsatisfiable propositional matrix `[p], [-p]`, classical, default
/// (positive-start) settings, no iterative deepening: Theorem via a Start
/// immediately followed by one Extension.
#[test]
fn scenario_1_unit_clash_proves_in_two_actions() {
    let text = indoc! {"
        p
        -p
    "};
    let (env, outcome) = prove_classical_with(text, Settings::default());
    expect_theorem(&outcome);
    assert_eq!(env.state().proof_sequence().len(), 2);
    assert!(matches!(
        env.state().proof_sequence()[0].1,
        Action::Start { .. }
    ));
    assert!(matches!(
        env.state().proof_sequence()[1].1,
        Action::Extension { .. }
    ));
}

/// 2. Satisfiable propositional matrix `[p], [q]`: no complementary pair
/// exists anywhere, so every extension attempt is empty and the search
/// exhausts to Non-Theorem.
#[test]
fn scenario_2_disjoint_unit_clauses_are_non_theorem() {
    let text = indoc! {"
        p
        q
    "};
    expect_non_theorem(&prove_classical(text));
}

/// 3. First-order matrix `[P(a)], [-P(X)]`: a single extension unifies
/// `X -> a` (the clause is copied, so the binding is against the copy's
/// variable instance, not literally `X`).
#[test]
fn scenario_3_first_order_extension_unifies_the_shared_variable() {
    let text = indoc! {"
        p(a)
        -p(X)
    "};
    let (env, outcome) = prove_classical_with(text, Settings::default());
    expect_theorem(&outcome);
    assert_eq!(env.state().proof_sequence().len(), 2);
    assert!(matches!(
        env.state().proof_sequence()[1].1,
        Action::Extension { .. }
    ));
}

/// 4. `[P(X), Q(X)], [-P(a)], [-Q(b)]` is satisfiable: the shared `X` in the
/// start clause forces a single binding, so committing `X -> a` to close the
/// `P` branch leaves the `Q` branch needing `X -> b`, which conflicts. Every
/// extension/backtrack combination is exhausted without a proof.
#[test]
fn scenario_4_shared_start_variable_forces_backtrack_then_exhausts() {
    let text = indoc! {"
        p(X), q(X)
        -p(a)
        -q(b)
    "};
    expect_non_theorem(&prove_classical(text));
}

/// 5. An intuitionistic matrix whose classical connections would require
/// `X -> f_skolem(Y)`, built directly with an eigenvariable-carrying binding
/// whose prefix can never be reconciled with the variable's own prefix under
/// the `varying`-domain admissibility rule: the classical tableau closes, the
/// admissibility check rejects it, and the search resumes (and here,
/// exhausts, since no other connection exists).
#[test]
fn scenario_5_classical_close_fails_prefix_admissibility_and_resumes() {
    let text = indoc! {"
        p(f_skolem(c))::[a]
        -p(X)::[]
    "};
    let mut settings = Settings::default();
    settings.logic = Logic::Intuitionistic;
    settings.domain = Domain::Varying;
    let (_, outcome) = prove_prefixed_with(text, settings);
    // The connection itself unifies fine (both literals carry no prefix
    // constant to clash over), so the classical tableau closes; but the
    // `varying`-domain admissible pair compares the bound variable's own
    // (empty) prefix against the eigenvariable's `a` prefix, which cannot be
    // reconciled — no variable is left on the empty side to bind `a` to. The
    // only start clause and only extension have already been tried, so the
    // search exhausts once admissibility keeps rejecting the close.
    expect_non_theorem(&outcome);
}

/// Companion to scenario 5: the same shape, but with prefixes that *do*
/// reconcile, confirming the admissibility check is actually discriminating
/// rather than always failing.
#[test]
fn scenario_5b_matching_prefixes_let_the_proof_through() {
    let text = indoc! {"
        p(f_skolem(c))::[a]
        -p(X)::[a]
    "};
    let mut settings = Settings::default();
    settings.logic = Logic::Intuitionistic;
    settings.domain = Domain::Varying;
    let (_, outcome) = prove_prefixed_with(text, settings);
    expect_theorem(&outcome);
}

/// 6. Restricted backtracking (`backtrack_after = 1`) on a matrix offering
/// two distinct Start candidates: the first Start dead-ends with no
/// extension available, backtrack returns to the root having attempted it
/// once, and — since `num_attempted (1) <= backtrack_after (1)` — the engine
/// is allowed to retry at the root, landing on the second Start candidate
/// rather than re-exhausting the first.
#[test]
fn scenario_6_restricted_backtracking_moves_to_the_next_start_candidate() {
    let text = indoc! {"
        p(a)
        q(b)
        -q(b)
    "};
    let mut settings = Settings::default();
    settings.restricted_backtracking = true;
    settings.backtrack_after = 1;
    let (env, outcome) = prove_classical_with(text, settings);
    expect_theorem(&outcome);
    // The winning Start must be the second positive clause (`q(b)`, index 1):
    // the first (`p(a)`) has no complementary literal at all.
    let first_action = &env.state().proof_sequence()[0].1;
    match first_action {
        Action::Start { clause_idx, .. } => assert_eq!(*clause_idx, Some(1)),
        other => panic!("expected a Start action, got {other:?}"),
    }
}

#[test]
fn outcome_display_matches_the_documented_strings() {
    assert_eq!(Outcome::Theorem.to_string(), "Theorem");
    assert_eq!(Outcome::Unknown.to_string(), "Unknown");
    assert!(Outcome::NonTheorem("x".into()).to_string().starts_with("Non-Theorem"));
}

#[test]
fn parses_and_proves_multi_literal_prefixed_clauses() {
    // Sanity check that the prefixed reader and T's restricted pre_unify
    // case set cooperate on a simple two-connection proof.
    let text = indoc! {"
        p(a)::[w1]
        -p(X)::[w1]
    "};
    let mut settings = Settings::default();
    settings.logic = Logic::T;
    let (_, outcome) = prove_prefixed_with(text, settings);
    expect_theorem(&outcome);
}
