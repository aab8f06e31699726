//! Filesystem and process-environment built-ins.

use std::collections::BTreeMap;
use std::fs;

use crate::interpreter::builtins::expect_arity;
use crate::interpreter::Interpreter;
use crate::runtime::value::HashKey;
use crate::runtime::{Env, Value};
use crate::token::Token;

/// `chmod(path, mode)`: the mode's decimal digits are read as octal, so
/// `chmod(path, 644)` and `chmod(path, "644")` both mean `0o644`.
pub(super) fn builtin_chmod(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 2) {
        return error;
    }
    let Value::String(path) = &args[0] else {
        return Value::error_at(
            token,
            format!("argument to `chmod` must be string, got {}", args[0].type_name()),
        );
    };
    let digits = match &args[1] {
        Value::Integer(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => {
            return Value::error_at(
                token,
                format!("chmod mode must be integer or string, got {}", other.type_name()),
            );
        }
    };
    let Ok(mode) = u32::from_str_radix(&digits, 8) else {
        return Value::error_at(token, format!("invalid octal mode {digits:?}"));
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Value::Boolean(fs::set_permissions(path, fs::Permissions::from_mode(mode)).is_ok())
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Value::Boolean(false)
    }
}

pub(super) fn builtin_mkdir(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::String(path) => Value::Boolean(fs::create_dir(path).is_ok()),
        other => Value::error_at(
            token,
            format!("argument to `mkdir` must be string, got {}", other.type_name()),
        ),
    }
}

pub(super) fn builtin_unlink(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::String(path) => Value::Boolean(fs::remove_file(path).is_ok()),
        other => Value::error_at(
            token,
            format!("argument to `unlink` must be string, got {}", other.type_name()),
        ),
    }
}

/// `directory.glob(pattern)` → array of matching paths.
pub(super) fn builtin_directory_glob(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    let Value::String(pattern) = &args[0] else {
        return Value::error_at(
            token,
            format!(
                "argument to `directory.glob` must be string, got {}",
                args[0].type_name()
            ),
        );
    };
    match glob::glob(pattern) {
        Ok(paths) => {
            let matches = paths
                .filter_map(|entry| entry.ok())
                .map(|path| Value::String(path.to_string_lossy().into_owned()))
                .collect();
            Value::array(matches)
        }
        Err(error) => Value::error_at(token, format!("invalid glob pattern: {error}")),
    }
}

/// `os.getenv(name)` → the value, or an empty string when unset.
pub(super) fn builtin_os_getenv(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    match &args[0] {
        Value::String(name) => Value::String(std::env::var(name).unwrap_or_default()),
        other => Value::error_at(
            token,
            format!(
                "argument to `os.getenv` must be string, got {}",
                other.type_name()
            ),
        ),
    }
}

pub(super) fn builtin_os_setenv(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 2) {
        return error;
    }
    let (Value::String(name), Value::String(value)) = (&args[0], &args[1]) else {
        return Value::error_at(
            token,
            format!(
                "arguments to `os.setenv` must be strings, got {} and {}",
                args[0].type_name(),
                args[1].type_name()
            ),
        );
    };
    std::env::set_var(name, value);
    Value::Null
}

pub(super) fn builtin_os_environment(
    _interp: &mut Interpreter,
    _token: &Token,
    _env: &Env,
    _args: Vec<Value>,
) -> Value {
    let mut pairs = BTreeMap::new();
    for (name, value) in std::env::vars() {
        pairs.insert(HashKey::String(name), Value::String(value));
    }
    Value::hash(pairs)
}
