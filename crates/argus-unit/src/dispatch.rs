//! Capability dispatch for assertion operands
//!
//! Maps (TypeTag, capability name) → builtin method for non-instance
//! values, so `assert_respond_to`, `assert_send`, and `assert_operator`
//! work uniformly over builtins and fixture instances. Instance
//! capabilities resolve through the class method table instead.

use crate::context::Context;
use crate::fault::{Condition, Eval, Fault};
use crate::value::{TypeTag, Value};
use std::cmp::Ordering;

/// A builtin method over values. Receiver type is guaranteed by the
/// dispatch table; argument shapes are validated per method.
pub type BuiltinMethod = fn(&Value, &[Value]) -> Result<Value, Condition>;

/// Resolve a capability on a builtin value.
/// Returns None if the type/capability combination is not registered.
pub fn resolve_builtin(tag: TypeTag, name: &str) -> Option<BuiltinMethod> {
    match (tag, name) {
        (TypeTag::String, "length") => Some(string_length),
        (TypeTag::String, "empty") => Some(string_empty),
        (TypeTag::String, "include") => Some(string_include),
        (TypeTag::Array, "length") => Some(array_length),
        (TypeTag::Array, "empty") => Some(array_empty),
        (TypeTag::Array, "include") => Some(array_include),
        (TypeTag::Array, "first") => Some(array_first),
        (TypeTag::Array, "last") => Some(array_last),
        (TypeTag::Number, "zero") => Some(number_zero),
        (TypeTag::Number, "positive") => Some(number_positive),
        (TypeTag::Number, "negative") => Some(number_negative),
        (TypeTag::Number, "abs") => Some(number_abs),
        _ => None,
    }
}

/// Does `obj` support the named capability?
pub fn responds_to(obj: &Value, name: &str) -> bool {
    match obj {
        Value::Instance(inst) => inst.responds_to(name),
        other => resolve_builtin(other.type_tag(), name).is_some(),
    }
}

/// Invoke a capability by name. Unknown capabilities raise an
/// `UndefinedMethod` condition, mirroring instance-method resolution.
pub fn invoke(obj: &Value, name: &str, args: &[Value], ctx: &Context) -> Eval {
    match obj {
        Value::Instance(inst) => inst.call(name, ctx, args),
        other => match resolve_builtin(other.type_tag(), name) {
            Some(method) => method(other, args).map_err(Fault::Error),
            None => Condition::new(
                "UndefinedMethod",
                format!("undefined method `{}` for {}", name, other.type_name()),
            )
            .raise(),
        },
    }
}

/// Evaluate a binary operator. Unknown operators are a usage error;
/// operand type mismatches raise a `TypeError` condition.
pub fn binary_op(left: &Value, op: &str, right: &Value) -> Result<Value, Fault> {
    match op {
        "==" => Ok(Value::Bool(left == right)),
        "!=" => Ok(Value::Bool(left != right)),
        "<" | "<=" | ">" | ">=" => {
            let ordering = compare(left, right)?;
            let outcome = match op {
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(outcome))
        }
        other => Err(Fault::usage(format!("unknown operator `{}`", other))),
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, Fault> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).ok_or_else(|| {
            Fault::Error(Condition::new(
                "ComparisonError",
                format!("cannot order <{}> against <{}>", left, right),
            ))
        }),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => Condition::new(
            "TypeError",
            format!("cannot compare {} with {}", left.type_name(), right.type_name()),
        )
        .raise(),
    }
}

fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<(), Condition> {
    if args.len() != expected {
        return Err(Condition::new(
            "ArgumentError",
            format!(
                "{} expects {} argument{}, got {}",
                name,
                expected,
                if expected == 1 { "" } else { "s" },
                args.len()
            ),
        ));
    }
    Ok(())
}

fn receiver_error(expected: &str, got: &Value) -> Condition {
    Condition::new(
        "TypeError",
        format!("expected {} receiver, got {}", expected, got.type_name()),
    )
}

fn string_length(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("length", args, 0)?;
    match recv {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(receiver_error("string", other)),
    }
}

fn string_empty(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("empty", args, 0)?;
    match recv {
        Value::String(s) => Ok(Value::Bool(s.is_empty())),
        other => Err(receiver_error("string", other)),
    }
}

fn string_include(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("include", args, 1)?;
    match (recv, &args[0]) {
        (Value::String(s), Value::String(needle)) => {
            Ok(Value::Bool(s.contains(needle.as_str())))
        }
        (Value::String(_), other) => Err(Condition::new(
            "TypeError",
            format!("include expects a string argument, got {}", other.type_name()),
        )),
        (other, _) => Err(receiver_error("string", other)),
    }
}

fn array_length(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("length", args, 0)?;
    match recv {
        Value::Array(arr) => Ok(Value::Number(arr.len() as f64)),
        other => Err(receiver_error("array", other)),
    }
}

fn array_empty(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("empty", args, 0)?;
    match recv {
        Value::Array(arr) => Ok(Value::Bool(arr.is_empty())),
        other => Err(receiver_error("array", other)),
    }
}

fn array_include(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("include", args, 1)?;
    match recv {
        Value::Array(arr) => Ok(Value::Bool(arr.iter().any(|v| v == &args[0]))),
        other => Err(receiver_error("array", other)),
    }
}

fn array_first(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("first", args, 0)?;
    match recv {
        Value::Array(arr) => Ok(arr.get(0).cloned().unwrap_or(Value::Null)),
        other => Err(receiver_error("array", other)),
    }
}

fn array_last(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("last", args, 0)?;
    match recv {
        Value::Array(arr) => Ok(arr
            .as_slice()
            .last()
            .cloned()
            .unwrap_or(Value::Null)),
        other => Err(receiver_error("array", other)),
    }
}

fn number_zero(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("zero", args, 0)?;
    match recv {
        Value::Number(n) => Ok(Value::Bool(*n == 0.0)),
        other => Err(receiver_error("number", other)),
    }
}

fn number_positive(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("positive", args, 0)?;
    match recv {
        Value::Number(n) => Ok(Value::Bool(*n > 0.0)),
        other => Err(receiver_error("number", other)),
    }
}

fn number_negative(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("negative", args, 0)?;
    match recv {
        Value::Number(n) => Ok(Value::Bool(*n < 0.0)),
        other => Err(receiver_error("number", other)),
    }
}

fn number_abs(recv: &Value, args: &[Value]) -> Result<Value, Condition> {
    check_arity("abs", args, 0)?;
    match recv {
        Value::Number(n) => Ok(Value::Number(n.abs())),
        other => Err(receiver_error("number", other)),
    }
}
