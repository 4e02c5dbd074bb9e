//! Shared fixtures for the scenario tests in `tests/scenarios.rs`: writes a
//! CNF/iCNF matrix given as inline text to a temp file, parses it, and drives
//! an `Environment` to completion — the integration-test analogue of what
//! `bin/prove.rs` does from the command line.

use tempfile::NamedTempFile;
use std::io::Write;

use crate::engine::Outcome;
use crate::environment::Environment;
use crate::parser::{read_classical_cnf, read_prefixed_cnf};
use crate::settings::Settings;

fn write_matrix(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp matrix file");
    file.write_all(text.as_bytes()).expect("write temp matrix file");
    file
}

/// Parses `text` as a classical CNF matrix and drives it to completion under
/// `settings`, returning both the outcome and the `Environment` so a test can
/// still inspect `proof_sequence`/`tableau` afterwards.
pub fn prove_classical_with(text: &str, settings: Settings) -> (Environment, Outcome) {
    let file = write_matrix(text);
    let matrix = read_classical_cnf(file.path()).expect("parse classical matrix");
    let mut env = Environment::new(matrix, settings, Some(100_000));
    let outcome = env.run_to_completion();
    (env, outcome)
}

pub fn prove_classical(text: &str) -> Outcome {
    prove_classical_with(text, Settings::default()).1
}

/// Parses `text` as a prefixed (intuitionistic/modal) iCNF matrix and drives
/// it to completion under `settings`.
pub fn prove_prefixed_with(text: &str, settings: Settings) -> (Environment, Outcome) {
    let file = write_matrix(text);
    let matrix = read_prefixed_cnf(file.path()).expect("parse prefixed matrix");
    let mut env = Environment::new(matrix, settings, Some(100_000));
    let outcome = env.run_to_completion();
    (env, outcome)
}

pub fn expect_theorem(outcome: &Outcome) {
    assert_eq!(outcome, &Outcome::Theorem, "expected Theorem, got {outcome}");
}

pub fn expect_non_theorem(outcome: &Outcome) {
    assert!(
        matches!(outcome, Outcome::NonTheorem(_)),
        "expected Non-Theorem, got {outcome}"
    );
}
