//! Built-in methods on integer and float values.

use crate::runtime::environment::Env;
use crate::runtime::value::{methods_value, Value};
use crate::token::Token;

const INTEGER_METHODS: &[&str] = &["chr", "methods", "to_s"];
const FLOAT_METHODS: &[&str] = &["methods", "to_s"];

pub fn invoke_method(
    receiver: &Value,
    method: &str,
    _token: &Token,
    env: &Env,
    _args: &[Value],
) -> Option<Value> {
    match (receiver, method) {
        (Value::Integer(_), "methods") => Some(methods_value(INTEGER_METHODS, "integer", env)),
        (Value::Float(_), "methods") => Some(methods_value(FLOAT_METHODS, "float", env)),
        (Value::Integer(n), "chr") => {
            let rendered = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .map(|ch| ch.to_string())
                .unwrap_or_default();
            Some(Value::String(rendered))
        }
        (Value::Integer(_) | Value::Float(_), "to_s") => Some(Value::String(receiver.inspect())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::environment::Environment;

    fn call(receiver: Value, method: &str) -> Value {
        let env = Environment::global();
        invoke_method(&receiver, method, &Token::default(), &env, &[])
            .expect("method should be handled")
    }

    #[test]
    fn chr_maps_code_points_to_strings() {
        assert_eq!(call(Value::Integer(65), "chr"), Value::String("A".into()));
        assert_eq!(call(Value::Integer(-1), "chr"), Value::String(String::new()));
    }

    #[test]
    fn to_s_renders_both_numeric_types() {
        assert_eq!(call(Value::Integer(42), "to_s"), Value::String("42".into()));
        assert_eq!(call(Value::Float(1.5), "to_s"), Value::String("1.5".into()));
    }

    #[test]
    fn chr_is_integer_only() {
        let env = Environment::global();
        assert!(invoke_method(&Value::Float(65.0), "chr", &Token::default(), &env, &[]).is_none());
    }
}
