//! Expression evaluation against a context
//!
//! Evaluation is total: missing variables, type mismatches and invalid
//! arithmetic all produce [`Value::Null`] instead of an error.

use std::cmp::Ordering;

use crate::context::Context;
use crate::expr::ast::{BinaryOp, Expr, UnaryOp};
use crate::value::Value;

/// Evaluate a compiled expression
pub fn eval(expr: &Expr, ctx: &Context<'_>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Var(name) => ctx.get(name).cloned().unwrap_or_default(),
        Expr::Member(object, key) => member(&eval(object, ctx), key),
        Expr::Index(object, index) => {
            let object = eval(object, ctx);
            if object.is_null() {
                return Value::Null;
            }
            match eval(index, ctx) {
                Value::Number(n) => element(&object, n),
                Value::String(key) | Value::Safe(key) => member(&object, &key),
                _ => Value::Null,
            }
        }
        Expr::Array(items) => Value::Array(items.iter().map(|item| eval(item, ctx)).collect()),
        Expr::Unary(UnaryOp::Not, operand) => Value::Bool(!eval(operand, ctx).is_truthy()),
        Expr::Unary(UnaryOp::Neg, operand) => match eval(operand, ctx) {
            Value::Number(n) => Value::Number(-n),
            _ => Value::Null,
        },
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = eval(left, ctx);
            if left.is_truthy() {
                eval(right, ctx)
            } else {
                left
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = eval(left, ctx);
            if left.is_truthy() {
                left
            } else {
                eval(right, ctx)
            }
        }
        Expr::Binary(op, left, right) => binary(*op, eval(left, ctx), eval(right, ctx)),
    }
}

fn member(object: &Value, key: &str) -> Value {
    if let Some(value) = object.get(key) {
        return value.clone();
    }
    match (object, key) {
        (Value::Array(_) | Value::String(_) | Value::Safe(_), "length") => {
            object.length().map(Value::from).unwrap_or_default()
        }
        (Value::Array(_), _) => key
            .parse::<f64>()
            .map(|n| element(object, n))
            .unwrap_or_default(),
        _ => Value::Null,
    }
}

fn element(object: &Value, index: f64) -> Value {
    if index < 0.0 || index.fract() != 0.0 {
        return Value::Null;
    }
    let index = index as usize;
    match object {
        Value::Array(items) => items.get(index).cloned().unwrap_or_default(),
        Value::String(s) | Value::Safe(s) => s
            .chars()
            .nth(index)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        Value::Object(map) => map.get(&index.to_string()).cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(left, right, |a, b| Some(a - b)),
        BinaryOp::Mul => arithmetic(left, right, |a, b| Some(a * b)),
        BinaryOp::Div => arithmetic(left, right, |a, b| (b != 0.0).then(|| a / b)),
        BinaryOp::Rem => arithmetic(left, right, |a, b| (b != 0.0).then(|| a % b)),
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::NotEq => Value::Bool(left != right),
        BinaryOp::Less => ordered(&left, &right, |o| o == Ordering::Less),
        BinaryOp::LessOrEqual => ordered(&left, &right, |o| o != Ordering::Greater),
        BinaryOp::Greater => ordered(&left, &right, |o| o == Ordering::Greater),
        BinaryOp::GreaterOrEqual => ordered(&left, &right, |o| o != Ordering::Less),
        // Short-circuiting operators are handled in `eval`
        BinaryOp::And | BinaryOp::Or => Value::Null,
    }
}

/// `+` adds numbers and concatenates when either side is text
fn add(left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::String(_) | Value::Safe(_), _) | (_, Value::String(_) | Value::Safe(_)) => {
            Value::String(format!("{}{}", left, right))
        }
        _ => Value::Null,
    }
}

fn arithmetic(left: Value, right: Value, f: impl Fn(f64, f64) -> Option<f64>) -> Value {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => f(a, b).map(Value::Number).unwrap_or_default(),
        _ => Value::Null,
    }
}

/// Ordering comparisons are defined for number pairs and string pairs only
fn ordered(left: &Value, right: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        _ => match (left.as_str(), right.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    };
    Value::Bool(ordering.map(test).unwrap_or(false))
}
