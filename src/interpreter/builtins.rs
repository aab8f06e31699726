//! The built-in function registry.
//!
//! Every entry is a plain `fn` keyed by a (possibly dotted) flat name.
//! Built-ins report failures as error sentinels; only `exit` terminates the
//! host.

mod io;
mod math;
mod os;

use std::collections::HashMap;

use crate::interpreter::{BuiltinFn, Interpreter};
use crate::parser::{self, ParseError};
use crate::runtime::value::HashKey;
use crate::runtime::{Env, Value};
use crate::token::Token;

/// The default registry. Hosts may add more entries (`version`, `args`)
/// before evaluation begins.
pub(super) fn default_registry() -> HashMap<String, BuiltinFn> {
    let entries: [(&str, BuiltinFn); 27] = [
        ("delete", builtin_delete),
        ("eval", builtin_eval),
        ("exit", builtin_exit),
        ("int", builtin_int),
        ("keys", builtin_keys),
        ("len", builtin_len),
        ("match", builtin_match),
        ("pragma", builtin_pragma),
        ("push", builtin_push),
        ("set", builtin_set),
        ("string", builtin_string),
        ("type", builtin_type),
        ("puts", io::builtin_puts),
        ("printf", io::builtin_printf),
        ("sprintf", io::builtin_sprintf),
        ("open", io::builtin_open),
        ("stat", io::builtin_stat),
        ("chmod", os::builtin_chmod),
        ("mkdir", os::builtin_mkdir),
        ("unlink", os::builtin_unlink),
        ("directory.glob", os::builtin_directory_glob),
        ("os.getenv", os::builtin_os_getenv),
        ("os.setenv", os::builtin_os_setenv),
        ("os.environment", os::builtin_os_environment),
        ("math.abs", math::builtin_math_abs),
        ("math.random", math::builtin_math_random),
        ("math.sqrt", math::builtin_math_sqrt),
    ];
    entries
        .into_iter()
        .map(|(name, func)| (name.to_string(), func))
        .collect()
}

/// Shared arity guard mirroring the "wrong number of arguments" diagnostics.
pub(crate) fn expect_arity(token: &Token, args: &[Value], want: usize) -> Option<Value> {
    if args.len() == want {
        None
    } else {
        Some(Value::error_at(
            token,
            format!("wrong number of arguments. got={}, want={want}", args.len()),
        ))
    }
}

fn builtin_len(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::String(s) => Value::Integer(s.chars().count() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        Value::Hash(pairs) => Value::Integer(pairs.len() as i64),
        other => Value::error_at(
            token,
            format!("argument to `len` not supported, got {}", other.type_name()),
        ),
    }
}

fn builtin_type(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    Value::String(args[0].type_name().to_string())
}

fn builtin_int(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::Integer(n) => Value::Integer(*n),
        Value::Float(n) => Value::Integer(*n as i64),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::error_at(token, format!("could not convert {s:?} to integer")),
        },
        other => Value::error_at(
            token,
            format!("argument to `int` not supported, got {}", other.type_name()),
        ),
    }
}

fn builtin_string(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    Value::String(args[0].inspect())
}

fn builtin_keys(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::Hash(pairs) => Value::array(pairs.keys().map(HashKey::to_value).collect()),
        other => Value::error_at(
            token,
            format!("argument to `keys` must be hash, got {}", other.type_name()),
        ),
    }
}

fn builtin_push(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 2) {
        return error;
    }
    match &args[0] {
        Value::Array(elements) => {
            let mut next = elements.as_ref().clone();
            next.push(args[1].clone());
            Value::array(next)
        }
        other => Value::error_at(
            token,
            format!("argument to `push` must be array, got {}", other.type_name()),
        ),
    }
}

fn builtin_set(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 3) {
        return error;
    }
    match &args[0] {
        Value::Hash(pairs) => {
            let Some(key) = HashKey::from_value(&args[1]) else {
                return Value::error_at(
                    token,
                    format!("unusable as hash key: {}", args[1].type_name()),
                );
            };
            let mut next = pairs.as_ref().clone();
            next.insert(key, args[2].clone());
            Value::hash(next)
        }
        other => Value::error_at(
            token,
            format!("argument to `set` must be hash, got {}", other.type_name()),
        ),
    }
}

fn builtin_delete(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 2) {
        return error;
    }
    match &args[0] {
        Value::Hash(pairs) => {
            let Some(key) = HashKey::from_value(&args[1]) else {
                return Value::error_at(
                    token,
                    format!("unusable as hash key: {}", args[1].type_name()),
                );
            };
            let mut next = pairs.as_ref().clone();
            next.remove(&key);
            Value::hash(next)
        }
        other => Value::error_at(
            token,
            format!(
                "argument to `delete` must be hash, got {}",
                other.type_name()
            ),
        ),
    }
}

/// `match(pattern, subject)`: `null` when there is no match, otherwise the
/// capture groups with the whole match first (unmatched groups are empty
/// strings).
fn builtin_match(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 2) {
        return error;
    }
    let (Value::String(pattern), Value::String(subject)) = (&args[0], &args[1]) else {
        return Value::error_at(
            token,
            format!(
                "arguments to `match` must be strings, got {} and {}",
                args[0].type_name(),
                args[1].type_name()
            ),
        );
    };
    let compiled = match regex::Regex::new(pattern) {
        Ok(compiled) => compiled,
        Err(error) => {
            return Value::error_at(token, format!("invalid regular expression: {error}"));
        }
    };
    match compiled.captures(subject) {
        Some(captures) => {
            let groups = captures
                .iter()
                .map(|group| {
                    Value::String(group.map(|m| m.as_str().to_string()).unwrap_or_default())
                })
                .collect();
            Value::array(groups)
        }
        None => Value::Null,
    }
}

/// `eval(src)`: parses and runs a source string in the caller's environment.
fn builtin_eval(
    interp: &mut Interpreter,
    token: &Token,
    env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    let Value::String(source) = &args[0] else {
        return Value::error_at(
            token,
            format!("argument to `eval` must be string, got {}", args[0].type_name()),
        );
    };
    match parser::parse(source) {
        Ok(program) => interp.eval_program(&program, env),
        Err(errors) => {
            let rendered: Vec<String> = errors.iter().map(ParseError::to_string).collect();
            Value::error_at(token, format!("eval: {}", rendered.join("; ")))
        }
    }
}

fn builtin_exit(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    let code = match args.first() {
        None => 0,
        Some(Value::Integer(n)) => *n as i32,
        Some(other) => {
            return Value::error_at(
                token,
                format!("argument to `exit` must be integer, got {}", other.type_name()),
            );
        }
    };
    std::process::exit(code);
}

fn builtin_pragma(
    interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::String(name) => Value::Boolean(interp.toggle_pragma(name)),
        other => Value::error_at(
            token,
            format!(
                "argument to `pragma` must be string, got {}",
                other.type_name()
            ),
        ),
    }
}
