//! The external driving surface over `ConnectionState`: a step-capped
//! wrapper a caller (the CLI, or any future search driver) can call `reset`/
//! `step`/`action_space` on without reaching into tableau internals.

use crate::engine::{ConnectionState, Outcome};
use crate::matrix::Matrix;
use crate::settings::Settings;

/// Drives one `ConnectionState` to completion, enforcing an optional wall
/// step cap the engine itself knows nothing about.
pub struct Environment {
    state: ConnectionState,
    max_steps: Option<u64>,
    steps_taken: u64,
    capped: bool,
}

impl Environment {
    pub fn new(matrix: Matrix, settings: Settings, max_steps: Option<u64>) -> Environment {
        let state = ConnectionState::new(matrix, settings);
        Environment {
            state,
            max_steps,
            steps_taken: 0,
            capped: false,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    pub fn reset(&mut self) {
        self.state.reset(None);
        self.steps_taken = 0;
        self.capped = false;
    }

    pub fn is_done(&self) -> bool {
        self.capped || self.state.is_terminal()
    }

    /// The currently legal action indices, empty once `is_done()`.
    pub fn action_space(&self) -> Vec<usize> {
        if self.is_done() {
            return Vec::new();
        }
        self.state.legal_action_indices()
    }

    /// Applies `action_idx`, returning `(reward, done, outcome)`: `reward`
    /// is `1` on any step that reaches a terminal state (`Theorem`,
    /// `NonTheorem`, or a capped `Unknown` alike), `0` on a non-terminal
    /// step; `outcome` is only meaningful once `done`.
    pub fn step(&mut self, action_idx: usize) -> (u32, bool, Outcome) {
        if self.capped {
            return (1, true, Outcome::Unknown);
        }
        if !self.state.is_terminal() {
            self.state.step(action_idx);
            self.steps_taken += 1;
            if !self.state.is_terminal() {
                if let Some(cap) = self.max_steps {
                    if self.steps_taken >= cap {
                        self.capped = true;
                    }
                }
            }
        }
        if self.capped {
            return (1, true, Outcome::Unknown);
        }
        let done = self.state.is_terminal();
        let reward = if done { 1 } else { 0 };
        (reward, done, self.outcome())
    }

    /// Drives the environment to completion (or the step cap), applying the
    /// first legal action at every choice point. Used by `bin/prove.rs` and
    /// `bin/search.rs`, which don't make search-policy decisions of their
    /// own.
    pub fn run_to_completion(&mut self) -> Outcome {
        loop {
            if self.is_done() {
                return self.outcome();
            }
            let actions = self.action_space();
            if actions.is_empty() {
                // No legal action and not yet terminal: treat as stuck
                // rather than spin. Should not occur — `compute_actions`
                // always leaves at least one action (even if just
                // `Backtrack`) on a non-terminal goal — but callers driving
                // the engine blind deserve a defined outcome either way.
                return Outcome::Unknown;
            }
            let (_, done, outcome) = self.step(actions[0]);
            if done {
                return outcome;
            }
        }
    }

    fn outcome(&self) -> Outcome {
        if self.capped {
            return Outcome::Unknown;
        }
        self.state.outcome().cloned().unwrap_or(Outcome::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Literal;

    fn unit(symbol: &str, neg: bool) -> Vec<Literal> {
        vec![Literal::new(symbol, vec![], neg)]
    }

    #[test]
    fn run_to_completion_proves_complementary_units() {
        let matrix = Matrix::new(vec![unit("p", false), unit("p", true)]);
        let mut env = Environment::new(matrix, Settings::default(), None);
        assert_eq!(env.run_to_completion(), Outcome::Theorem);
    }

    #[test]
    fn step_cap_surfaces_unknown_instead_of_looping_forever() {
        let matrix = Matrix::new(vec![unit("p", false), unit("q", false)]);
        let mut env = Environment::new(matrix, Settings::default(), Some(1));
        assert_eq!(env.run_to_completion(), Outcome::Unknown);
    }

    #[test]
    fn reset_allows_a_second_run_after_the_first_completes() {
        let matrix = Matrix::new(vec![unit("p", false), unit("p", true)]);
        let mut env = Environment::new(matrix, Settings::default(), None);
        assert_eq!(env.run_to_completion(), Outcome::Theorem);
        env.reset();
        assert_eq!(env.run_to_completion(), Outcome::Theorem);
    }
}
