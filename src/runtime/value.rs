//! The tagged value universe.
//!
//! Every value answers the same small contract: a type tag, an inspection
//! string, truthiness, and a method-invocation hook. The `Return` and
//! `Error` variants are control-flow sentinels: they exist only to drive
//! propagation through the evaluator and are never stored by user code.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::ast::{BlockStatement, Expression, Identifier};
use crate::interpreter::BuiltinFn;
use crate::runtime::environment::{Env, Environment};
use crate::runtime::file::FileHandle;
use crate::runtime::{array, file, hash, number, string};
use crate::token::Token;

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Null,
    Array(Rc<Vec<Value>>),
    Hash(Rc<BTreeMap<HashKey, Value>>),
    Function(Rc<FunctionValue>),
    Builtin(Rc<Builtin>),
    File(Rc<RefCell<FileHandle>>),
    /// Wraps a `return`ed value while it unwinds to the function boundary.
    Return(Box<Value>),
    /// An evaluation failure unwinding to the top level.
    Error(Box<ErrorValue>),
}

/// A user-defined function: parameters, per-parameter default expressions,
/// body, and the environment captured where the function literal was
/// evaluated (static scoping).
pub struct FunctionValue {
    pub parameters: Vec<Identifier>,
    pub defaults: HashMap<String, Expression>,
    pub body: BlockStatement,
    pub env: Env,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment may reference this function; keep Debug
        // shallow.
        let names: Vec<&str> = self.parameters.iter().map(|p| p.value.as_str()).collect();
        write!(f, "FunctionValue({})", names.join(", "))
    }
}

/// A host function registered under a (possibly dotted) name.
pub struct Builtin {
    pub name: String,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub message: String,
    pub token: Token,
}

/// Value forms usable as hash keys; anything else is an evaluation error.
/// The derived ordering gives hashes a deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKey {
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
}

impl HashKey {
    pub fn from_value(value: &Value) -> Option<HashKey> {
        match value {
            Value::Integer(n) => Some(HashKey::Integer(*n)),
            Value::Float(n) => Some(HashKey::Float(OrderedFloat(*n))),
            Value::Boolean(b) => Some(HashKey::Boolean(*b)),
            Value::String(s) => Some(HashKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            HashKey::Integer(n) => Value::Integer(*n),
            HashKey::Float(n) => Value::Float(n.0),
            HashKey::Boolean(b) => Value::Boolean(*b),
            HashKey::String(s) => Value::String(s.clone()),
        }
    }

    pub fn inspect(&self) -> String {
        self.to_value().inspect()
    }
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(elements))
    }

    pub fn hash(pairs: BTreeMap<HashKey, Value>) -> Value {
        Value::Hash(Rc::new(pairs))
    }

    /// Builds an error sentinel anchored to the given token.
    pub fn error_at(token: &Token, message: impl Into<String>) -> Value {
        Value::Error(Box::new(ErrorValue {
            message: message.into(),
            token: token.clone(),
        }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::File(_) => "file",
            Value::Return(_) => "return",
            Value::Error(_) => "error",
        }
    }

    /// `false` and `null` are falsy; everything else (including `0` and `""`)
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Human-readable rendering used by `puts` and the top-level host.
    pub fn inspect(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            Value::Array(elements) => {
                let rendered = elements
                    .iter()
                    .map(Value::inspect)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Hash(pairs) => {
                let rendered = pairs
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.inspect(), value.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{rendered}}}")
            }
            Value::Function(function) => {
                let names: Vec<&str> = function
                    .parameters
                    .iter()
                    .map(|p| p.value.as_str())
                    .collect();
                format!("fn({}) {}", names.join(", "), function.body)
            }
            Value::Builtin(builtin) => format!("builtin function {}", builtin.name),
            Value::File(handle) => format!("<file:{}>", handle.borrow().path()),
            Value::Return(inner) => inner.inspect(),
            Value::Error(error) => format!(
                "ERROR: {} (at {})",
                error.message, error.token.position
            ),
        }
    }

    /// Equality with cross-type numeric promotion, as used by `==` and
    /// `switch` arm matching.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }

    /// Type-specific method dispatch: `Some` when the receiver handles the
    /// method itself, `None` to fall back to environment lookup of
    /// `<typename>.<method>`.
    pub fn invoke_method(
        &self,
        method: &str,
        token: &Token,
        env: &Env,
        args: &[Value],
    ) -> Option<Value> {
        match self {
            Value::String(receiver) => string::invoke_method(receiver, method, token, env, args),
            Value::Array(receiver) => array::invoke_method(receiver, method, token, env, args),
            Value::Hash(receiver) => hash::invoke_method(receiver, method, token, env, args),
            Value::Integer(_) | Value::Float(_) => {
                number::invoke_method(self, method, token, env, args)
            }
            Value::Function(_) => match method {
                "methods" => Some(methods_value(&["methods"], "function", env)),
                _ => None,
            },
            Value::File(receiver) => file::invoke_method(receiver, method, token, env, args),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            (Value::Return(a), Value::Return(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a.message == b.message,
            _ => false,
        }
    }
}

/// Result of the `methods` method: the receiver's static method names plus
/// any `<typename>.<name>` functions registered in the environment, sorted.
pub fn methods_value(static_names: &[&str], type_name: &str, env: &Env) -> Value {
    let mut names: BTreeSet<String> = static_names.iter().map(|s| s.to_string()).collect();
    let prefix = format!("{type_name}.");
    for qualified in Environment::names_with_prefix(env, &prefix) {
        names.insert(qualified[prefix.len()..].to_string());
    }
    Value::array(names.into_iter().map(Value::String).collect())
}

/// Arity guard shared by the per-type method handlers.
pub fn expect_method_arity(
    method: &str,
    token: &Token,
    args: &[Value],
    expected: usize,
) -> Option<Value> {
    if args.len() == expected {
        None
    } else {
        Some(Value::error_at(
            token,
            format!(
                "wrong number of arguments to `{method}`. got={}, want={}",
                args.len(),
                expected
            ),
        ))
    }
}
