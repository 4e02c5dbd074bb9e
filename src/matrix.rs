use fxhash::FxHashMap;

use crate::term::Literal;

/// A clausal matrix: the fixed set of input clauses the connection engine
/// searches over, plus the lookup tables the engine needs on every step.
///
/// `clauses[i][j]` is addressed by a `(clause_idx, lit_idx)` pair throughout
/// the engine, the same position pair Python's `Literal.matrix_pos` carries.
pub struct Matrix {
    clauses: Vec<Vec<Literal>>,
    /// Fresh-copy counter; bumped once per `copy()` call, never reset except
    /// by an explicit `reset()` between independent proof attempts.
    index: u32,
    /// `(polarity_to_match, symbol) -> [(clause_idx, lit_idx)]`, where
    /// `polarity_to_match` is `!lit.neg` for the literal being matched
    /// against (a positive query literal matches stored negative literals
    /// and vice versa).
    complement: FxHashMap<(bool, String), Vec<(usize, usize)>>,
    /// `(clause_idx, lit_idx) -> flattened position`, a stable index usable
    /// once the matrix has been copied and its clauses renumbered.
    flattened_idx: FxHashMap<(usize, usize), usize>,
    positive_clauses: Vec<usize>,
    num_lits: usize,
}

impl Matrix {
    /// Builds a matrix from clauses, stamping `matrix_pos` on every literal
    /// and populating the complement/flattened-index tables.
    pub fn new(mut clauses: Vec<Vec<Literal>>) -> Matrix {
        let mut complement: FxHashMap<(bool, String), Vec<(usize, usize)>> = FxHashMap::default();
        let mut flattened_idx = FxHashMap::default();
        let mut positive_clauses = Vec::new();
        let mut num_lits = 0;
        let mut lit_idx_counter = 0;

        for (i, clause) in clauses.iter_mut().enumerate() {
            let mut positive = true;
            for (j, lit) in clause.iter_mut().enumerate() {
                lit.matrix_pos = Some((i, j));
                flattened_idx.insert((i, j), lit_idx_counter);
                lit_idx_counter += 1;
                num_lits += 1;
                complement
                    .entry((!lit.neg, lit.symbol.to_string()))
                    .or_default()
                    .push((i, j));
                if lit.neg {
                    positive = false;
                }
            }
            if positive {
                positive_clauses.push(i);
            }
        }

        Matrix {
            clauses,
            index: 0,
            complement,
            flattened_idx,
            positive_clauses,
            num_lits,
        }
    }

    pub fn clause(&self, idx: usize) -> &[Literal] {
        &self.clauses[idx]
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn num_lits(&self) -> usize {
        self.num_lits
    }

    pub fn positive_clauses(&self) -> &[usize] {
        &self.positive_clauses
    }

    /// Resets the fresh-copy counter. Does not clear any substitution state
    /// — callers are expected to have already discarded it.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Every matrix position whose literal is a complement of `literal`:
    /// same symbol, opposite polarity.
    pub fn complements(&self, literal: &Literal) -> &[(usize, usize)] {
        static EMPTY: Vec<(usize, usize)> = Vec::new();
        self.complement
            .get(&(literal.neg, literal.symbol.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&EMPTY)
    }

    /// Returns a fresh-variable copy of clause `clause_idx`: every variable
    /// in the clause gets `copy_num` bumped to a new, never-before-used
    /// value, so that two copies of the same clause never share a variable.
    pub fn copy(&mut self, clause_idx: usize) -> Vec<Literal> {
        self.index += 1;
        let num = self.index;
        self.clauses[clause_idx]
            .iter()
            .map(|lit| lit.fresh_copy(num))
            .collect()
    }

    pub fn lit_idx(&self, literal: &Literal) -> usize {
        self.flattened_idx[&literal.matrix_pos.expect("literal missing matrix_pos")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn p(neg: bool) -> Literal {
        Literal::new("p", vec![Term::constant("a")], neg)
    }

    #[test]
    fn complements_index_by_symbol_and_opposite_polarity() {
        let m = Matrix::new(vec![vec![p(false)], vec![p(true)]]);
        let positions = m.complements(&p(false));
        assert_eq!(positions, &[(1, 0)]);
    }

    #[test]
    fn copy_bumps_every_variable_in_the_clause() {
        let mut m = Matrix::new(vec![vec![Literal::new(
            "p",
            vec![Term::var("X", 0)],
            false,
        )]]);
        let c1 = m.copy(0);
        let c2 = m.copy(0);
        assert_ne!(c1[0].args[0], c2[0].args[0]);
    }

    #[test]
    fn positive_clauses_excludes_clauses_with_a_negative_literal() {
        let m = Matrix::new(vec![vec![p(false)], vec![p(false), p(true)]]);
        assert_eq!(m.positive_clauses(), &[0]);
    }
}
