//! Built-in methods on hash values. Iteration order is the deterministic
//! key order of the backing map.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::runtime::environment::Env;
use crate::runtime::value::{methods_value, HashKey, Value};
use crate::token::Token;

const METHODS: &[&str] = &["keys", "len", "methods", "values"];

pub fn invoke_method(
    receiver: &Rc<BTreeMap<HashKey, Value>>,
    method: &str,
    _token: &Token,
    env: &Env,
    _args: &[Value],
) -> Option<Value> {
    match method {
        "len" => Some(Value::Integer(receiver.len() as i64)),
        "methods" => Some(methods_value(METHODS, "hash", env)),
        "keys" => Some(Value::array(
            receiver.keys().map(HashKey::to_value).collect(),
        )),
        "values" => Some(Value::array(receiver.values().cloned().collect())),
        _ => None,
    }
}
