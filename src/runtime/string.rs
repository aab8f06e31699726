//! Built-in methods on string values.

use crate::runtime::environment::Env;
use crate::runtime::value::{methods_value, Value};
use crate::token::Token;

const METHODS: &[&str] = &[
    "len", "lower", "methods", "ord", "reverse", "split", "to_f", "to_i", "trim", "upper",
];

pub fn invoke_method(
    receiver: &str,
    method: &str,
    token: &Token,
    env: &Env,
    args: &[Value],
) -> Option<Value> {
    match method {
        "len" => Some(Value::Integer(receiver.chars().count() as i64)),
        "methods" => Some(methods_value(METHODS, "string", env)),
        "ord" => Some(match receiver.chars().next() {
            Some(ch) => Value::Integer(ch as i64),
            None => Value::error_at(token, "ord on empty string"),
        }),
        // Failed conversions yield zero rather than an error.
        "to_i" => Some(Value::Integer(receiver.trim().parse::<i64>().unwrap_or(0))),
        "to_f" => Some(Value::Float(receiver.trim().parse::<f64>().unwrap_or(0.0))),
        "reverse" => Some(Value::String(receiver.chars().rev().collect())),
        "upper" => Some(Value::String(receiver.to_uppercase())),
        "lower" => Some(Value::String(receiver.to_lowercase())),
        "trim" => Some(Value::String(receiver.trim().to_string())),
        "split" => Some(split(receiver, token, args)),
        _ => None,
    }
}

fn split(receiver: &str, token: &Token, args: &[Value]) -> Value {
    let parts: Vec<Value> = match args {
        [] => receiver
            .split_whitespace()
            .map(|part| Value::String(part.to_string()))
            .collect(),
        [Value::String(separator)] if separator.is_empty() => receiver
            .chars()
            .map(|ch| Value::String(ch.to_string()))
            .collect(),
        [Value::String(separator)] => receiver
            .split(separator.as_str())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        [other] => {
            return Value::error_at(
                token,
                format!("argument to `split` must be string, got {}", other.type_name()),
            );
        }
        _ => {
            return Value::error_at(
                token,
                format!("wrong number of arguments to `split`. got={}, want=1", args.len()),
            );
        }
    };
    Value::array(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::environment::Environment;
    use crate::token::Token;

    fn call(receiver: &str, method: &str, args: &[Value]) -> Value {
        let env = Environment::global();
        invoke_method(receiver, method, &Token::default(), &env, args)
            .expect("method should be handled")
    }

    #[test]
    fn len_counts_characters_not_bytes() {
        assert_eq!(call("héllo", "len", &[]), Value::Integer(5));
    }

    #[test]
    fn case_and_trim_transforms() {
        assert_eq!(call("Steve", "upper", &[]), Value::String("STEVE".into()));
        assert_eq!(call("Steve", "lower", &[]), Value::String("steve".into()));
        assert_eq!(call("  x  ", "trim", &[]), Value::String("x".into()));
        assert_eq!(call("abc", "reverse", &[]), Value::String("cba".into()));
    }

    #[test]
    fn numeric_conversions_default_to_zero() {
        assert_eq!(call("42", "to_i", &[]), Value::Integer(42));
        assert_eq!(call("nope", "to_i", &[]), Value::Integer(0));
        assert_eq!(call("1.5", "to_f", &[]), Value::Float(1.5));
        assert_eq!(call("nope", "to_f", &[]), Value::Float(0.0));
    }

    #[test]
    fn ord_takes_the_first_character() {
        assert_eq!(call("A", "ord", &[]), Value::Integer(65));
        assert!(call("", "ord", &[]).is_error());
    }

    #[test]
    fn split_on_whitespace_separator_and_chars() {
        assert_eq!(
            call("a b  c", "split", &[]),
            Value::array(vec![
                Value::String("a".into()),
                Value::String("b".into()),
                Value::String("c".into()),
            ])
        );
        assert_eq!(
            call("a,b", "split", &[Value::String(",".into())]),
            Value::array(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert_eq!(
            call("ab", "split", &[Value::String(String::new())]),
            Value::array(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }

    #[test]
    fn unknown_method_falls_through() {
        let env = Environment::global();
        assert!(invoke_method("x", "banana", &Token::default(), &env, &[]).is_none());
    }
}
