//! Runtime object model shared by the evaluator: the tagged value universe,
//! the lexically scoped environment chain, and the per-type method handlers.

pub mod array;
pub mod environment;
pub mod file;
pub mod hash;
pub mod number;
pub mod string;
pub mod value;

pub use environment::{Env, Environment};
pub use value::{HashKey, Value};
