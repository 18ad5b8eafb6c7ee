//! Run-condition expressions as a tree.
//!
//! Conditions are built as [`Expr`] values and rendered to the substrate's
//! expression syntax once, at serialization time.

use serde::{Serialize, Serializer};
use std::fmt;

/// Job-status functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Always,
    Success,
    Failure,
    Cancelled,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Always => "always()",
            Status::Success => "success()",
            Status::Failure => "failure()",
            Status::Cancelled => "cancelled()",
        }
    }
}

/// A boolean or value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Status(Status),
    Str(String),
    Bool(bool),
    /// A context property path, e.g. `needs.dispatch.outputs.verdicts`.
    Ctx(String),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn always() -> Self {
        Expr::Status(Status::Always)
    }

    pub fn success() -> Self {
        Expr::Status(Status::Success)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    pub fn ctx(path: impl Into<String>) -> Self {
        Expr::Ctx(path.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(name.into(), args)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    /// Conjunction, flattening nested `And`s.
    pub fn and(parts: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Expr::And(flat)
        }
    }

    /// Disjunction, flattening nested `Or`s.
    pub fn or(parts: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Expr::Or(flat)
        }
    }

    /// Whether the expression is unconditionally evaluated: a top-level
    /// `always()`, alone or as a conjunct.
    pub fn runs_always(&self) -> bool {
        match self {
            Expr::Status(Status::Always) => true,
            Expr::And(parts) => parts.iter().any(|p| matches!(p, Expr::Status(Status::Always))),
            _ => false,
        }
    }

    /// Whether `path` appears anywhere as a context reference.
    pub fn references(&self, path: &str) -> bool {
        match self {
            Expr::Ctx(p) => p == path,
            Expr::Status(_) | Expr::Str(_) | Expr::Bool(_) => false,
            Expr::Call(_, args) => args.iter().any(|a| a.references(path)),
            Expr::Not(inner) => inner.references(path),
            Expr::Eq(a, b) | Expr::Ne(a, b) => a.references(path) || b.references(path),
            Expr::And(parts) | Expr::Or(parts) => parts.iter().any(|p| p.references(path)),
        }
    }

    /// Render wrapped as `${{ ... }}`.
    pub fn wrapped(&self) -> String {
        format!("${{{{ {} }}}}", self)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(_) => 1,
            Expr::And(_) => 2,
            Expr::Eq(..) | Expr::Ne(..) => 3,
            Expr::Not(_) => 4,
            _ => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Status(s) => f.write_str(s.as_str()),
            Expr::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Ctx(p) => f.write_str(p),
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Not(inner) => {
                f.write_str("!")?;
                inner.fmt_child(f, 5)
            }
            Expr::Eq(a, b) => {
                a.fmt_child(f, 4)?;
                f.write_str(" == ")?;
                b.fmt_child(f, 4)
            }
            Expr::Ne(a, b) => {
                a.fmt_child(f, 4)?;
                f.write_str(" != ")?;
                b.fmt_child(f, 4)
            }
            Expr::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    part.fmt_child(f, 3)?;
                }
                Ok(())
            }
            Expr::Or(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    part.fmt_child(f, 2)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wrapped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_comparison() {
        let e = Expr::ctx("needs.dispatch.outputs.verdict_triage").eq(Expr::str("admit"));
        assert_eq!(e.to_string(), "needs.dispatch.outputs.verdict_triage == 'admit'");
        assert_eq!(
            e.wrapped(),
            "${{ needs.dispatch.outputs.verdict_triage == 'admit' }}"
        );
    }

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(Expr::str("it's").to_string(), "'it''s'");
    }

    #[test]
    fn parenthesizes_or_inside_and() {
        let e = Expr::and(vec![
            Expr::always(),
            Expr::or(vec![Expr::ctx("a"), Expr::ctx("b")]),
        ]);
        assert_eq!(e.to_string(), "always() && (a || b)");
    }

    #[test]
    fn and_inside_or_needs_no_parens() {
        let e = Expr::or(vec![
            Expr::and(vec![Expr::ctx("a"), Expr::ctx("b")]),
            Expr::ctx("c"),
        ]);
        assert_eq!(e.to_string(), "a && b || c");
    }

    #[test]
    fn not_wraps_compound_operand() {
        let e = Expr::not(Expr::and(vec![Expr::ctx("a"), Expr::ctx("b")]));
        assert_eq!(e.to_string(), "!(a && b)");
        assert_eq!(Expr::not(Expr::ctx("a")).to_string(), "!a");
    }

    #[test]
    fn nested_and_is_flattened() {
        let e = Expr::and(vec![
            Expr::and(vec![Expr::ctx("a"), Expr::ctx("b")]),
            Expr::ctx("c"),
        ]);
        assert_eq!(e, Expr::And(vec![Expr::ctx("a"), Expr::ctx("b"), Expr::ctx("c")]));
    }

    #[test]
    fn call_renders_arguments() {
        let e = Expr::call(
            "contains",
            vec![
                Expr::call("fromJSON", vec![Expr::str("[\"edited\"]")]),
                Expr::ctx("github.event.action"),
            ],
        );
        assert_eq!(
            e.to_string(),
            "contains(fromJSON('[\"edited\"]'), github.event.action)"
        );
    }

    #[test]
    fn runs_always_detects_conjunct() {
        assert!(Expr::always().runs_always());
        assert!(Expr::and(vec![Expr::always(), Expr::ctx("x")]).runs_always());
        assert!(!Expr::success().runs_always());
        assert!(!Expr::or(vec![Expr::always(), Expr::ctx("x")]).runs_always());
    }

    #[test]
    fn references_finds_nested_paths() {
        let e = Expr::and(vec![
            Expr::always(),
            Expr::not(Expr::ctx("needs.a.result").eq(Expr::str("x"))),
        ]);
        assert!(e.references("needs.a.result"));
        assert!(!e.references("needs.b.result"));
    }
}
