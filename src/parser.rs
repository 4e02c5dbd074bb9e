//! A minimal line-oriented CNF/iCNF reader: a file path in, a `Matrix` out.
//! Not a goal of the rigor spent on the calculi themselves: one clause per
//! line, comma-separated literals, `-p(a,b)` negation, and an optional
//! `::[w1,W]` prefix annotation for the iCNF variant. `%` starts a line
//! comment; blank lines are skipped.
//!
//! Term syntax: a leading uppercase letter means a variable; anything else
//! is a constant, or a function if followed by a parenthesized argument
//! list. Inside a prefix annotation specifically, an uppercase name is
//! still a prefix variable, but a lowercase name is always a world
//! constant — a zero-arity `Function`, never a `Constant`.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{ParseError, ParseResult};
use crate::matrix::Matrix;
use crate::term::{Literal, Term};

struct Tokens<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn peek(&self) -> Option<&str> {
        self.toks.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> Option<&str> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &str, line_no: usize) -> ParseResult<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ParseError::at_line(
                format!("expected '{expected}', found '{tok}'"),
                line_no,
            )),
            None => Err(ParseError::at_line(
                format!("expected '{expected}', found end of line"),
                line_no,
            )),
        }
    }
}

fn tokenize(line: &str) -> Vec<String> {
    let re = Regex::new(r"::|[A-Za-z_][A-Za-z0-9_]*|[(),\[\]]|-").unwrap();
    re.find_iter(line).map(|m| m.as_str().to_string()).collect()
}

fn is_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn parse_args(toks: &mut Tokens, line_no: usize) -> ParseResult<Vec<Term>> {
    let mut args = Vec::new();
    if toks.peek() != Some(")") {
        loop {
            args.push(parse_term(toks, line_no)?);
            if toks.peek() == Some(",") {
                toks.next();
                continue;
            }
            break;
        }
    }
    toks.expect(")", line_no)?;
    Ok(args)
}

fn parse_term(toks: &mut Tokens, line_no: usize) -> ParseResult<Term> {
    let name = toks
        .next()
        .ok_or_else(|| ParseError::at_line("expected a term", line_no))?
        .to_string();
    if toks.peek() == Some("(") {
        toks.next();
        let args = parse_args(toks, line_no)?;
        Ok(Term::func(&name, args))
    } else if is_variable_name(&name) {
        Ok(Term::var(&name, 0))
    } else {
        Ok(Term::constant(&name))
    }
}

/// Like `parse_term`, but a bare lowercase name with no argument list is
/// still a zero-arity `Function` (a world constant), never a `Constant`.
fn parse_prefix_elem(toks: &mut Tokens, line_no: usize) -> ParseResult<Term> {
    let name = toks
        .next()
        .ok_or_else(|| ParseError::at_line("expected a prefix element", line_no))?
        .to_string();
    let args = if toks.peek() == Some("(") {
        toks.next();
        parse_args(toks, line_no)?
    } else {
        Vec::new()
    };
    if is_variable_name(&name) {
        if !args.is_empty() {
            return Err(ParseError::at_line(
                format!("prefix variable '{name}' cannot take arguments"),
                line_no,
            ));
        }
        Ok(Term::var(&name, 0))
    } else {
        Ok(Term::func(&name, args))
    }
}

fn parse_literal(toks: &mut Tokens, line_no: usize, prefixed: bool) -> ParseResult<Literal> {
    let neg = if toks.peek() == Some("-") {
        toks.next();
        true
    } else {
        false
    };
    let atom = parse_term(toks, line_no)?;
    if atom.is_variable() {
        return Err(ParseError::at_line(
            "a literal's head cannot be a variable",
            line_no,
        ));
    }
    let mut lit = Literal::new(atom.symbol(), atom.args().to_vec(), neg);

    if prefixed {
        toks.expect("::", line_no)?;
        toks.expect("[", line_no)?;
        let mut elems = Vec::new();
        if toks.peek() != Some("]") {
            loop {
                elems.push(parse_prefix_elem(toks, line_no)?);
                if toks.peek() == Some(",") {
                    toks.next();
                    continue;
                }
                break;
            }
        }
        toks.expect("]", line_no)?;
        lit = lit.with_prefix(Term::string(elems));
        lit.stamp_prefix();
    }

    Ok(lit)
}

fn parse_clause_line(line: &str, line_no: usize, prefixed: bool) -> ParseResult<Vec<Literal>> {
    let token_vec = tokenize(line);
    let mut toks = Tokens {
        toks: &token_vec,
        pos: 0,
    };
    let mut lits = Vec::new();
    loop {
        lits.push(parse_literal(&mut toks, line_no, prefixed)?);
        if toks.peek() == Some(",") {
            toks.next();
            continue;
        }
        break;
    }
    if toks.peek().is_some() {
        return Err(ParseError::at_line(
            format!("unexpected trailing token '{}'", toks.peek().unwrap()),
            line_no,
        ));
    }
    Ok(lits)
}

fn strip_comment(line: &str) -> &str {
    match line.find('%') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn read_cnf(path: &Path, prefixed: bool) -> ParseResult<Matrix> {
    let text = fs::read_to_string(path)
        .map_err(|e| ParseError::new(format!("could not read {}: {e}", path.display())))?;
    let mut clauses = Vec::new();
    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        clauses.push(parse_clause_line(line, line_no, prefixed)?);
    }
    if clauses.is_empty() {
        return Err(ParseError::new("matrix file contains no clauses"));
    }
    Ok(Matrix::new(clauses))
}

/// Reads a classical CNF matrix: one clause per line, no prefixes.
pub fn read_classical_cnf(path: &Path) -> ParseResult<Matrix> {
    read_cnf(path, false)
}

/// Reads an iCNF matrix: one clause per line, every literal annotated with
/// a `::[...]` prefix sequence.
pub fn read_prefixed_cnf(path: &Path) -> ParseResult<Matrix> {
    read_cnf(path, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn reads_a_classical_matrix_of_unit_clauses() {
        let file = write_temp("p(a)\n-p(X)\n");
        let matrix = read_classical_cnf(file.path()).expect("parse");
        assert_eq!(matrix.num_clauses(), 2);
        assert_eq!(matrix.clause(0)[0].symbol.as_ref(), "p");
        assert!(!matrix.clause(0)[0].neg);
        assert!(matrix.clause(1)[0].neg);
    }

    #[test]
    fn reads_multi_literal_clauses_and_skips_comments_and_blanks() {
        let file = write_temp("% a comment\n\np(X), q(X)\n-p(a)\n-q(b)\n");
        let matrix = read_classical_cnf(file.path()).expect("parse");
        assert_eq!(matrix.num_clauses(), 3);
        assert_eq!(matrix.clause(0).len(), 2);
    }

    #[test]
    fn reads_a_prefixed_literal_and_stamps_its_variables() {
        let file = write_temp("p(X)::[w1,W]\n-p(a)::[w1]\n");
        let matrix = read_prefixed_cnf(file.path()).expect("parse");
        let lit = &matrix.clause(0)[0];
        let prefix = lit.prefix.as_ref().expect("prefix set");
        assert_eq!(prefix.args().len(), 2);
        assert!(prefix.args()[0].is_function());
        assert!(prefix.args()[1].is_variable());
        let x = &lit.args[0];
        assert_eq!(x.prefix(), Some(prefix));
    }

    #[test]
    fn rejects_an_unterminated_argument_list() {
        let file = write_temp("p(a\n");
        let err = read_classical_cnf(file.path()).unwrap_err();
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn rejects_an_empty_matrix_file() {
        let file = write_temp("% nothing but a comment\n");
        assert!(read_classical_cnf(file.path()).is_err());
    }
}
