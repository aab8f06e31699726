//! I/O built-ins: `puts`, `printf`, `sprintf`, `open`, `stat`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use crate::interpreter::builtins::expect_arity;
use crate::interpreter::Interpreter;
use crate::runtime::file::FileHandle;
use crate::runtime::value::HashKey;
use crate::runtime::{Env, Value};
use crate::token::Token;

/// `puts(...)`: one line per argument, using each value's inspection string.
pub(super) fn builtin_puts(
    interp: &mut Interpreter,
    _token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    for arg in &args {
        let mut line = arg.inspect();
        line.push('\n');
        interp.write_str(&line);
    }
    Value::Null
}

pub(super) fn builtin_printf(
    interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    match format_values(token, &args) {
        Ok(rendered) => {
            interp.write_str(&rendered);
            Value::Null
        }
        Err(error) => error,
    }
}

pub(super) fn builtin_sprintf(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    match format_values(token, &args) {
        Ok(rendered) => Value::String(rendered),
        Err(error) => error,
    }
}

/// Formats `args[1..]` against the format string `args[0]`. Verbs: `%s`,
/// `%d`, `%f` (with optional `%.Nf` precision), `%t`, `%v`, `%%`.
fn format_values(token: &Token, args: &[Value]) -> Result<String, Value> {
    let Some(Value::String(format)) = args.first() else {
        return Err(Value::error_at(
            token,
            "first argument to printf/sprintf must be a format string",
        ));
    };

    let mut out = String::with_capacity(format.len());
    let mut values = args[1..].iter();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        // Optional ".N" precision, only meaningful for %f.
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                digits.push(chars.next().unwrap_or_default());
            }
            precision = digits.parse::<usize>().ok();
        }
        let verb = match chars.next() {
            Some(verb) => verb,
            None => {
                return Err(Value::error_at(token, "format string ends with '%'"));
            }
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let value = values.next().ok_or_else(|| {
            Value::error_at(token, "too few arguments for format string")
        })?;
        match verb {
            's' | 'v' => out.push_str(&value.inspect()),
            'd' => match value {
                Value::Integer(n) => out.push_str(&n.to_string()),
                Value::Float(n) => out.push_str(&(*n as i64).to_string()),
                other => {
                    return Err(Value::error_at(
                        token,
                        format!("%d expects a number, got {}", other.type_name()),
                    ));
                }
            },
            'f' => {
                let rendered = match value {
                    Value::Integer(n) => *n as f64,
                    Value::Float(n) => *n,
                    other => {
                        return Err(Value::error_at(
                            token,
                            format!("%f expects a number, got {}", other.type_name()),
                        ));
                    }
                };
                match precision {
                    Some(precision) => out.push_str(&format!("{rendered:.precision$}")),
                    None => out.push_str(&rendered.to_string()),
                }
            }
            't' => match value {
                Value::Boolean(b) => out.push_str(&b.to_string()),
                other => {
                    return Err(Value::error_at(
                        token,
                        format!("%t expects a boolean, got {}", other.type_name()),
                    ));
                }
            },
            other => {
                return Err(Value::error_at(
                    token,
                    format!("unknown format verb '%{other}'"),
                ));
            }
        }
    }
    Ok(out)
}

/// `open(path, mode)`; the mode defaults to `"r"`.
pub(super) fn builtin_open(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    let (path, mode) = match args.as_slice() {
        [Value::String(path)] => (path.clone(), "r".to_string()),
        [Value::String(path), Value::String(mode)] => (path.clone(), mode.clone()),
        _ => {
            return Value::error_at(token, "open expects a path and an optional mode string");
        }
    };
    match FileHandle::open(&path, &mode) {
        Ok(handle) => Value::File(Rc::new(RefCell::new(handle))),
        Err(error) => Value::error_at(token, format!("failed to open {path}: {error}")),
    }
}

/// `stat(path)` → `{size, mode, type, mtime}`.
pub(super) fn builtin_stat(
    _interp: &mut Interpreter,
    token: &Token,
    _env: &Env,
    args: Vec<Value>,
) -> Value {
    if let Some(error) = expect_arity(token, &args, 1) {
        return error;
    }
    let Value::String(path) = &args[0] else {
        return Value::error_at(
            token,
            format!("argument to `stat` must be string, got {}", args[0].type_name()),
        );
    };
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) => {
            return Value::error_at(token, format!("failed to stat {path}: {error}"));
        }
    };

    let mode = {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() as i64
        }
        #[cfg(not(unix))]
        {
            0
        }
    };
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0);

    let mut pairs = BTreeMap::new();
    pairs.insert(
        HashKey::String("size".to_string()),
        Value::Integer(metadata.len() as i64),
    );
    pairs.insert(HashKey::String("mode".to_string()), Value::Integer(mode));
    pairs.insert(
        HashKey::String("type".to_string()),
        Value::String(if metadata.is_dir() { "directory" } else { "file" }.to_string()),
    );
    pairs.insert(HashKey::String("mtime".to_string()), Value::Integer(mtime));
    Value::hash(pairs)
}
