//! Built-in methods on array values. Arrays are immutable: `push` and
//! friends hand back fresh arrays and leave the receiver untouched.

use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::runtime::environment::Env;
use crate::runtime::value::{expect_method_arity, methods_value, Value};
use crate::token::Token;

const METHODS: &[&str] = &[
    "first", "join", "last", "len", "methods", "push", "rest", "sort",
];

pub fn invoke_method(
    receiver: &Rc<Vec<Value>>,
    method: &str,
    token: &Token,
    env: &Env,
    args: &[Value],
) -> Option<Value> {
    match method {
        "len" => Some(Value::Integer(receiver.len() as i64)),
        "methods" => Some(methods_value(METHODS, "array", env)),
        "first" => Some(receiver.first().cloned().unwrap_or(Value::Null)),
        "last" => Some(receiver.last().cloned().unwrap_or(Value::Null)),
        "rest" => {
            let rest: Vec<Value> = receiver.iter().skip(1).cloned().collect();
            Some(Value::array(rest))
        }
        "push" => {
            if let Some(error) = expect_method_arity("push", token, args, 1) {
                return Some(error);
            }
            let mut elements = receiver.as_ref().clone();
            elements.push(args[0].clone());
            Some(Value::array(elements))
        }
        "join" => Some(join(receiver, token, args)),
        "sort" => Some(sort(receiver, token)),
        _ => None,
    }
}

fn join(receiver: &[Value], token: &Token, args: &[Value]) -> Value {
    let separator = match args {
        [] => String::new(),
        [Value::String(separator)] => separator.clone(),
        [other] => {
            return Value::error_at(
                token,
                format!("argument to `join` must be string, got {}", other.type_name()),
            );
        }
        _ => {
            return Value::error_at(
                token,
                format!("wrong number of arguments to `join`. got={}, want=1", args.len()),
            );
        }
    };
    let rendered: Vec<String> = receiver.iter().map(Value::inspect).collect();
    Value::String(rendered.join(&separator))
}

/// Sorts all-numeric arrays numerically and all-string arrays
/// lexicographically; mixed element types have no defensible order.
fn sort(receiver: &[Value], token: &Token) -> Value {
    let all_numeric = receiver
        .iter()
        .all(|value| matches!(value, Value::Integer(_) | Value::Float(_)));
    if all_numeric {
        let mut elements = receiver.to_vec();
        elements.sort_by_key(|value| match value {
            Value::Integer(n) => OrderedFloat(*n as f64),
            Value::Float(n) => OrderedFloat(*n),
            _ => unreachable!("all_numeric checked above"),
        });
        return Value::array(elements);
    }

    let all_strings = receiver.iter().all(|value| matches!(value, Value::String(_)));
    if all_strings {
        let mut elements = receiver.to_vec();
        elements.sort_by(|a, b| match (a, b) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => unreachable!("all_strings checked above"),
        });
        return Value::array(elements);
    }

    Value::error_at(token, "sort requires an array of numbers or of strings")
}
