//! Tree-walking evaluator
//!
//! Only the operators and built-ins below exist; nothing here can reach
//! the host beyond reading the supplied scope.

use chrono::{Datelike, NaiveDate};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::value::Value;
use super::EvaluationError;

/// Variables and clock visible to an expression
#[derive(Debug, Clone)]
pub struct Scope {
    vars: HashMap<String, Value>,
    today: NaiveDate,
}

impl Scope {
    pub fn new(today: NaiveDate) -> Self {
        Self { vars: HashMap::new(), today }
    }

    /// Scope pinned to the current UTC date
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().date_naive())
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::now()
    }
}

pub(crate) fn eval(expr: &Expr, scope: &Scope) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Array(items) => Ok(Value::Array(items.iter().map(|e| eval(e, scope)).collect::<Result<_, _>>()?)),
        Expr::Ident(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownIdentifier(name.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
                UnaryOp::Not => Value::Bool(!value.truthy()),
            })
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            if left.truthy() { eval(rhs, scope) } else { Ok(left) }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let left = eval(lhs, scope)?;
            if left.truthy() { Ok(left) } else { eval(rhs, scope) }
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, eval(lhs, scope)?, eval(rhs, scope)?),
        Expr::Conditional { cond, then, otherwise } => {
            if eval(cond, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call { name, args } => {
            let args = args.iter().map(|a| eval(a, scope)).collect::<Result<Vec<_>, _>>()?;
            call(name, &args, scope)
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvaluationError> {
    let value = match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => Value::String(format!("{left}{right}")),
            (Value::Array(_), _) | (_, Value::Array(_)) => {
                return Err(EvaluationError::TypeMismatch(format!(
                    "cannot add {} and {}",
                    left.type_name(),
                    right.type_name()
                )))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::NotEq => Value::Bool(left != right),
        BinaryOp::Lt => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(compare(&left, &right), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(compare(&left, &right), Some(Ordering::Greater | Ordering::Equal))),
        // eval short-circuits these before both sides are computed
        BinaryOp::And => if left.truthy() { right } else { left },
        BinaryOp::Or => if left.truthy() { left } else { right },
    };
    Ok(value)
}

/// Strings compare lexically with each other, everything else numerically
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn call(name: &str, args: &[Value], scope: &Scope) -> Result<Value, EvaluationError> {
    match name {
        "len" => {
            let [arg] = exact::<1>(name, args)?;
            match arg {
                Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::Array(items) => Ok(Value::Number(items.len() as f64)),
                other => Err(EvaluationError::TypeMismatch(format!("len() of {}", other.type_name()))),
            }
        }
        "upper" => text(name, args, |s| s.to_uppercase()),
        "lower" => text(name, args, |s| s.to_lowercase()),
        "trim" => text(name, args, |s| s.trim().to_string()),
        "string" => text(name, args, |s| s.to_string()),
        "number" => numeric(name, args, |n| n),
        "abs" => numeric(name, args, f64::abs),
        "floor" => numeric(name, args, f64::floor),
        "ceil" => numeric(name, args, f64::ceil),
        "round" => match args {
            [value] => Ok(Value::Number(value.to_number().round())),
            [value, digits] => {
                let factor = 10f64.powi(digits.to_number() as i32);
                Ok(Value::Number((value.to_number() * factor).round() / factor))
            }
            _ => Err(EvaluationError::Arity { function: name.to_string(), expected: "1 or 2", found: args.len() }),
        },
        "min" | "max" => {
            if args.is_empty() {
                return Err(EvaluationError::Arity { function: name.to_string(), expected: "at least 1", found: 0 });
            }
            let numbers = args.iter().map(Value::to_number);
            let result = if name == "min" {
                numbers.fold(f64::INFINITY, f64::min)
            } else {
                numbers.fold(f64::NEG_INFINITY, f64::max)
            };
            Ok(Value::Number(result))
        }
        "today" => {
            exact::<0>(name, args)?;
            Ok(Value::String(scope.today().format("%Y-%m-%d").to_string()))
        }
        "years_between" => {
            let [from, to] = exact::<2>(name, args)?;
            let (from, to) = (date_arg(from)?, date_arg(to)?);
            Ok(Value::Number(whole_years(from, to) as f64))
        }
        _ => Err(EvaluationError::UnknownFunction(name.to_string())),
    }
}

fn exact<'a, const N: usize>(name: &str, args: &'a [Value]) -> Result<&'a [Value; N], EvaluationError> {
    args.try_into().map_err(|_| EvaluationError::Arity {
        function: name.to_string(),
        expected: match N {
            0 => "0",
            1 => "1",
            _ => "2",
        },
        found: args.len(),
    })
}

fn text(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, EvaluationError> {
    let [arg] = exact::<1>(name, args)?;
    Ok(Value::String(f(&arg.to_string())))
}

fn numeric(name: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value, EvaluationError> {
    let [arg] = exact::<1>(name, args)?;
    Ok(Value::Number(f(arg.to_number())))
}

fn date_arg(value: &Value) -> Result<NaiveDate, EvaluationError> {
    let Value::String(s) = value else {
        return Err(EvaluationError::TypeMismatch(format!("expected date string, found {}", value.type_name())));
    };
    // accept full timestamps by reading the calendar part
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| EvaluationError::TypeMismatch(format!("invalid date '{s}'")))
}

fn whole_years(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}
