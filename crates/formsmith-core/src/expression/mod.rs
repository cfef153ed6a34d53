//! Derived-field expression language
//!
//! A restricted grammar: literals (numbers, strings, booleans, null,
//! arrays), arithmetic, comparison, `&&`/`||`, ternary, identifier lookup
//! against a [`Scope`], and a fixed set of built-in functions. There is no
//! assignment, member access or user-defined function.
//!
//! Derived fields reference parents by field id. Before parsing, every
//! parent id occurring as a whole token is replaced with the JSON literal of
//! its current value ([`substitute_parents`]); ids made of digits, as older
//! builders generated, therefore work even though they would lex as numbers.

mod eval;
mod lexer;
mod parser;
mod value;

pub use eval::Scope;
pub use parser::{BinaryOp, Expr, UnaryOp};
pub use value::Value;

use thiserror::Error;

use lexer::is_ident_char;

/// Failure computing one derived field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("syntax error at {offset}: {message}")]
    Parse { message: String, offset: usize },

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("parent field '{0}' does not exist")]
    MissingParent(String),

    #[error("dependency cycle through {field}: {}", members.join(" -> "))]
    Cycle { field: String, members: Vec<String> },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("result is not a finite number")]
    NonFinite,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), got {found}")]
    Arity { function: String, expected: &'static str, found: usize },
}

/// Parsed expression, reusable across evaluations
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, EvaluationError> {
        Ok(Self { ast: parser::parse(source)? })
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn evaluate(&self, scope: &Scope) -> Result<Value, EvaluationError> {
        eval::eval(&self.ast, scope)
    }
}

/// Parse and evaluate in one step
pub fn evaluate(source: &str, scope: &Scope) -> Result<Value, EvaluationError> {
    Expression::parse(source)?.evaluate(scope)
}

/// Replace whole-token occurrences of each binding name with its JSON literal.
///
/// A match must not touch identifier characters on either side, so `a` is
/// left alone inside `ab` or `a_1`. Quoted string literals are copied
/// verbatim. Longer names win over their prefixes, and replaced text is
/// never rescanned.
pub fn substitute_parents(expression: &str, bindings: &[(&str, &serde_json::Value)]) -> String {
    let mut names: Vec<(&str, String)> = bindings
        .iter()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (*name, value.to_string()))
        .collect();
    names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(expression.len());
    let mut rest = expression;
    let mut prev: Option<char> = None;

    'scan: while let Some(c) = rest.chars().next() {
        if c == '"' || c == '\'' {
            let end = string_literal_end(rest, c);
            out.push_str(&rest[..end]);
            prev = rest[..end].chars().last();
            rest = &rest[end..];
            continue;
        }
        if !prev.is_some_and(is_ident_char) {
            for (name, literal) in &names {
                if let Some(after) = rest.strip_prefix(name) {
                    if !after.chars().next().is_some_and(is_ident_char) {
                        out.push_str(literal);
                        prev = name.chars().last();
                        rest = after;
                        continue 'scan;
                    }
                }
            }
        }
        out.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Byte length of the quoted literal at the start of `s`, or all of `s` if
/// it never closes
fn string_literal_end(s: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + c.len_utf8();
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitution_respects_boundaries() {
        let a = json!(2);
        let ab = json!(10);
        let out = substitute_parents("a + ab + a_1 + xa", &[("a", &a), ("ab", &ab)]);
        assert_eq!(out, "2 + 10 + a_1 + xa");
    }

    #[test]
    fn test_substitution_skips_string_literals() {
        let name = json!("Ada");
        let out = substitute_parents("'name: ' + name + \"name\"", &[("name", &name)]);
        assert_eq!(out, "'name: ' + \"Ada\" + \"name\"");
    }

    #[test]
    fn test_substitution_numeric_ids() {
        let first = json!(3);
        let second = json!(4);
        let out = substitute_parents(
            "1712000000001 * 1712000000002",
            &[("1712000000001", &first), ("1712000000002", &second)],
        );
        assert_eq!(out, "3 * 4");
        assert_eq!(evaluate(&out, &Scope::now()).unwrap(), Value::Number(12.0));
    }

    #[test]
    fn test_substitution_is_single_pass() {
        let a = json!("b");
        let b = json!(1);
        assert_eq!(substitute_parents("a + b", &[("a", &a), ("b", &b)]), "\"b\" + 1");
    }

    #[test]
    fn test_substituted_values_evaluate() {
        let choices = json!(["x", "y"]);
        let missing = serde_json::Value::Null;
        let out = substitute_parents("len(picks) + (gone || 0)", &[("picks", &choices), ("gone", &missing)]);
        assert_eq!(evaluate(&out, &Scope::now()).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_error_messages() {
        let cycle = EvaluationError::Cycle { field: "a".into(), members: vec!["a".into(), "b".into()] };
        assert_eq!(cycle.to_string(), "dependency cycle through a: a -> b");
        assert_eq!(
            evaluate("1 +", &Scope::now()).unwrap_err().to_string(),
            "syntax error at 3: unexpected end of expression"
        );
    }

    mod properties {
        use super::*;
        use crate::expression::lexer::{tokenize, TokenKind};
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn bindings() -> impl Strategy<Value = BTreeMap<String, i64>> {
            prop::collection::btree_map("[a-z][a-z0-9_]{0,6}", -1000i64..1000, 1..6)
        }

        proptest! {
            #[test]
            fn sum_of_bound_names_evaluates(bound in bindings()) {
                let json: Vec<(String, serde_json::Value)> =
                    bound.iter().map(|(name, n)| (name.clone(), json!(n))).collect();
                let pairs: Vec<(&str, &serde_json::Value)> = json.iter().map(|(n, v)| (n.as_str(), v)).collect();
                let names: Vec<&str> = bound.keys().map(String::as_str).collect();
                let sum: i64 = bound.values().sum();

                let out = substitute_parents(&names.join(" + "), &pairs);
                prop_assert_eq!(evaluate(&out, &Scope::now()), Ok(Value::Number(sum as f64)));
            }

            #[test]
            fn no_bound_name_survives_as_identifier(bound in bindings()) {
                let json: Vec<(String, serde_json::Value)> =
                    bound.iter().map(|(name, n)| (name.clone(), json!(n))).collect();
                let pairs: Vec<(&str, &serde_json::Value)> = json.iter().map(|(n, v)| (n.as_str(), v)).collect();
                let quoted: Vec<String> = bound.keys().map(|name| format!("'{name}' + {name}")).collect();

                let out = substitute_parents(&quoted.join(" + "), &pairs);
                let tokens = tokenize(&out).unwrap();
                for token in &tokens {
                    if let TokenKind::Ident(name) = &token.kind {
                        prop_assert!(!bound.contains_key(name), "{} survived in {}", name, out);
                    }
                }
                for name in bound.keys() {
                    let literal = TokenKind::Str(name.clone());
                    prop_assert!(tokens.iter().any(|t| t.kind == literal));
                }
            }
        }
    }
}
