use std::fmt;
use std::rc::Rc;

/// The sentinel symbol used for the `Function` that wraps a prefix sequence.
pub const STRING_SYMBOL: &str = "string";

/// The reserved symbol marking an eigenvariable introduced by skolemization.
pub const SKOLEM_SYMBOL: &str = "f_skolem";

/// A first-order term: a variable, a constant, or a function application.
///
/// Two `Variable`s are equal iff `(symbol, copy_num)` match; two
/// `Function`/`Constant` terms are equal iff `(symbol, args)` match. The
/// `prefix` field is never considered by `PartialEq`.
#[derive(Debug, Clone)]
pub enum Term {
    Variable {
        symbol: Rc<str>,
        copy_num: u32,
        prefix: Option<Box<Term>>,
    },
    Constant {
        symbol: Rc<str>,
        prefix: Option<Box<Term>>,
    },
    Function {
        symbol: Rc<str>,
        args: Vec<Term>,
        prefix: Option<Box<Term>>,
    },
}

impl Term {
    pub fn var(symbol: &str, copy_num: u32) -> Term {
        Term::Variable {
            symbol: Rc::from(symbol),
            copy_num,
            prefix: None,
        }
    }

    pub fn constant(symbol: &str) -> Term {
        Term::Constant {
            symbol: Rc::from(symbol),
            prefix: None,
        }
    }

    pub fn func(symbol: &str, args: Vec<Term>) -> Term {
        Term::Function {
            symbol: Rc::from(symbol),
            args,
            prefix: None,
        }
    }

    /// Builds a `string(args...)` prefix term: the sentinel wrapper around a
    /// sequence of prefix variables and world-constants.
    pub fn string(args: Vec<Term>) -> Term {
        Term::func(STRING_SYMBOL, args)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Term::Function { symbol, .. } if &**symbol == STRING_SYMBOL)
    }

    pub fn symbol(&self) -> &str {
        match self {
            Term::Variable { symbol, .. } => symbol,
            Term::Constant { symbol, .. } => symbol,
            Term::Function { symbol, .. } => symbol,
        }
    }

    pub fn args(&self) -> &[Term] {
        match self {
            Term::Variable { .. } | Term::Constant { .. } => &[],
            Term::Function { args, .. } => args,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Term::Function { .. })
    }

    pub fn prefix(&self) -> Option<&Term> {
        match self {
            Term::Variable { prefix, .. } => prefix.as_deref(),
            Term::Constant { prefix, .. } => prefix.as_deref(),
            Term::Function { prefix, .. } => prefix.as_deref(),
        }
    }

    pub fn set_prefix(&mut self, new_prefix: Term) {
        let slot = match self {
            Term::Variable { prefix, .. } => prefix,
            Term::Constant { prefix, .. } => prefix,
            Term::Function { prefix, .. } => prefix,
        };
        *slot = Some(Box::new(new_prefix));
    }

    /// `Some(var_key())` when this term is a variable, `None` otherwise.
    pub fn var_key_if_variable(&self) -> Option<VarKey> {
        match self {
            Term::Variable {
                symbol, copy_num, ..
            } => Some(VarKey {
                symbol: symbol.clone(),
                copy_num: *copy_num,
            }),
            _ => None,
        }
    }

    /// The key used to identify this term as a substitution variable:
    /// `(symbol, copy_num)`. Panics if called on a non-variable.
    pub fn var_key(&self) -> VarKey {
        match self {
            Term::Variable {
                symbol, copy_num, ..
            } => VarKey {
                symbol: symbol.clone(),
                copy_num: *copy_num,
            },
            _ => panic!("var_key() called on a non-variable term"),
        }
    }

    /// Rebuilds this term with every `Variable` replaced by a fresh instance
    /// carrying `copy_num = num`. Constants and Functions are rebuilt
    /// recursively so that prefixes are copied too.
    pub fn fresh_copy(&self, num: u32) -> Term {
        match self {
            Term::Variable { symbol, prefix, .. } => Term::Variable {
                symbol: symbol.clone(),
                copy_num: num,
                prefix: prefix.as_ref().map(|p| Box::new(p.fresh_copy(num))),
            },
            Term::Constant { symbol, prefix } => Term::Constant {
                symbol: symbol.clone(),
                prefix: prefix.as_ref().map(|p| Box::new(p.fresh_copy(num))),
            },
            Term::Function {
                symbol,
                args,
                prefix,
            } => Term::Function {
                symbol: symbol.clone(),
                args: args.iter().map(|a| a.fresh_copy(num)).collect(),
                prefix: prefix.as_ref().map(|p| Box::new(p.fresh_copy(num))),
            },
        }
    }

    /// True if `symbol == f_skolem`, the reserved eigenvariable marker.
    pub fn is_skolem(&self) -> bool {
        self.symbol() == SKOLEM_SYMBOL
    }

    /// Collects every skolem-marked subterm reachable from this term.
    pub fn find_eigenvariables<'a>(&'a self, out: &mut Vec<&'a Term>) {
        if self.is_skolem() {
            out.push(self);
            return;
        }
        if let Term::Function { args, .. } = self {
            for arg in args {
                arg.find_eigenvariables(out);
            }
        }
    }

    /// This term's `prefix`, defaulting to an empty `string()` when unset,
    /// lifted to any term (not just literals).
    pub fn prefix_or_empty(&self) -> Term {
        self.prefix().cloned().unwrap_or_else(|| Term::string(vec![]))
    }

    /// Rebuilds this term with `prefix` set on it and, recursively, on
    /// every subterm — including Variables, which otherwise carry no
    /// prefix of their own. This is how a parsed prefixed literal stamps
    /// its world-context onto each of its argument variables, so that an
    /// eigenvariable or substitution variable found deep inside a bound
    /// term later carries the prefix that was in force where it was
    /// introduced (used by the admissibility check).
    pub fn with_uniform_prefix(&self, prefix: &Term) -> Term {
        let stamped_args = || match self {
            Term::Function { args, .. } => args
                .iter()
                .map(|a| a.with_uniform_prefix(prefix))
                .collect(),
            _ => Vec::new(),
        };
        match self {
            Term::Variable { symbol, copy_num, .. } => Term::Variable {
                symbol: symbol.clone(),
                copy_num: *copy_num,
                prefix: Some(Box::new(prefix.clone())),
            },
            Term::Constant { symbol, .. } => Term::Constant {
                symbol: symbol.clone(),
                prefix: Some(Box::new(prefix.clone())),
            },
            Term::Function { symbol, .. } => Term::Function {
                symbol: symbol.clone(),
                args: stamped_args(),
                prefix: Some(Box::new(prefix.clone())),
            },
        }
    }
}

/// Equality ignores `prefix`.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Term::Variable {
                    symbol: s1,
                    copy_num: c1,
                    ..
                },
                Term::Variable {
                    symbol: s2,
                    copy_num: c2,
                    ..
                },
            ) => s1 == s2 && c1 == c2,
            (Term::Constant { symbol: s1, .. }, Term::Constant { symbol: s2, .. }) => s1 == s2,
            (
                Term::Function {
                    symbol: s1,
                    args: a1,
                    ..
                },
                Term::Function {
                    symbol: s2,
                    args: a2,
                    ..
                },
            ) => s1 == s2 && a1 == a2,
            _ => false,
        }
    }
}
impl Eq for Term {}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Variable {
                symbol, copy_num, ..
            } => {
                write!(f, "{}", symbol)?;
                if *copy_num != 0 {
                    write!(f, "[{}]", copy_num)?;
                }
                Ok(())
            }
            Term::Constant { symbol, .. } => write!(f, "{}", symbol),
            Term::Function { symbol, args, .. } => {
                write!(f, "{}", symbol)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

/// Identity key for a `Variable` inside the union-find map: `(symbol, copy_num)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarKey {
    pub symbol: Rc<str>,
    pub copy_num: u32,
}

/// `(symbol, args, prefix, neg, matrix_pos)`. `matrix_pos` pins the literal
/// to its home clause/index in the matrix.
#[derive(Debug, Clone)]
pub struct Literal {
    pub symbol: Rc<str>,
    pub args: Vec<Term>,
    pub prefix: Option<Term>,
    pub neg: bool,
    pub matrix_pos: Option<(usize, usize)>,
}

impl Literal {
    pub fn new(symbol: &str, args: Vec<Term>, neg: bool) -> Literal {
        Literal {
            symbol: Rc::from(symbol),
            args,
            prefix: None,
            neg,
            matrix_pos: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Term) -> Literal {
        self.prefix = Some(prefix);
        self
    }

    /// As an atom term, for unification and equality purposes.
    pub fn as_term(&self) -> Term {
        Term::Function {
            symbol: self.symbol.clone(),
            args: self.args.clone(),
            prefix: self.prefix.clone().map(Box::new),
        }
    }

    pub fn fresh_copy(&self, num: u32) -> Literal {
        Literal {
            symbol: self.symbol.clone(),
            args: self.args.iter().map(|a| a.fresh_copy(num)).collect(),
            prefix: self.prefix.as_ref().map(|p| p.fresh_copy(num)),
            neg: self.neg,
            matrix_pos: self.matrix_pos,
        }
    }

    /// Ensures this literal has a (possibly empty) prefix, defaulting to
    /// an empty `string()` when none was attached during parsing.
    pub fn prefix_or_empty(&self) -> Term {
        self.prefix.clone().unwrap_or_else(|| Term::string(vec![]))
    }

    /// Stamps this literal's own prefix onto every argument, recursively —
    /// called once by the iCNF parser right after a literal's prefix is set,
    /// so a variable buried inside `self.args` still reports the world it
    /// was introduced in when `Substitution::prefix_of` is asked about it
    /// later.
    pub fn stamp_prefix(&mut self) {
        if let Some(p) = self.prefix.clone() {
            for arg in &mut self.args {
                *arg = arg.with_uniform_prefix(&p);
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.neg {
            write!(f, "-")?;
        }
        write!(f, "{}", self.as_term())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_equal_by_symbol_and_copy_num() {
        let v1 = Term::var("X", 0);
        let v2 = Term::var("X", 0);
        let v3 = Term::var("X", 1);
        assert_eq!(v1, v2);
        assert_ne!(v1, v3);
    }

    #[test]
    fn functions_ignore_prefix_in_equality() {
        let mut f1 = Term::func("p", vec![Term::constant("a")]);
        let f2 = Term::func("p", vec![Term::constant("a")]);
        f1.set_prefix(Term::string(vec![Term::constant("w")]));
        assert_eq!(f1, f2);
    }

    #[test]
    fn fresh_copy_stamps_every_variable() {
        let t = Term::func("p", vec![Term::var("X", 0), Term::constant("a")]);
        let copy = t.fresh_copy(3);
        match &copy {
            Term::Function { args, .. } => {
                assert_eq!(args[0], Term::var("X", 3));
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn finds_skolem_eigenvariables() {
        let t = Term::func(
            "p",
            vec![Term::func(SKOLEM_SYMBOL, vec![Term::var("Y", 0)])],
        );
        let mut out = vec![];
        t.find_eigenvariables(&mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol(), SKOLEM_SYMBOL);
    }
}
