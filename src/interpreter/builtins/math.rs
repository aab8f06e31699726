//! Math built-ins. The random generator is the thread-local one, seeded by
//! the host once per thread.

use rand::Rng;

use crate::interpreter::builtins::expect_arity;
use crate::interpreter::Interpreter;
use crate::runtime::{Env, Value};
use crate::token::Token;

pub(super) fn builtin_math_abs(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::Integer(n) => Value::Integer(n.wrapping_abs()),
        Value::Float(n) => Value::Float(n.abs()),
        other => Value::error_at(
            token,
            format!(
                "argument to `math.abs` not supported, got {}",
                other.type_name()
            ),
        ),
    }
}

pub(super) fn builtin_math_random(
    _interp: &mut Interpreter,
    _token: &Token,
    _env: &Env,
    _args: Vec<Value>,
) -> Value {
    Value::Float(rand::thread_rng().gen::<f64>())
}

pub(super) fn builtin_math_sqrt(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::Integer(n) => Value::Float((*n as f64).sqrt()),
        Value::Float(n) => Value::Float(n.sqrt()),
        other => Value::error_at(
            token,
            format!(
                "argument to `math.sqrt` not supported, got {}",
                other.type_name()
            ),
        ),
    }
}
