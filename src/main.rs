use std::fs;
use std::io::{self, Read};
use std::process;

use anyhow::{bail, Context, Result};

use howler::interpreter::Interpreter;
use howler::parser;
use howler::runtime::{Env, Environment, Value};
use howler::token::Token;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Implementation of the `version()` built-in registered by this host.
fn builtin_version(
    _interp: &mut Interpreter,
    _token: &Token,
    _env: &Env,
    _args: Vec<Value>,
) -> Value {
    Value::String(VERSION.to_string())
}

/// Implementation of the `args()` built-in: the command-line arguments the
/// interpreter itself was invoked with.
fn builtin_args(
    _interp: &mut Interpreter,
    _token: &Token,
    _env: &Env,
    _args: Vec<Value>,
) -> Value {
    let arguments = std::env::args().skip(1).map(Value::String).collect();
    Value::array(arguments)
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            1
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let mut args = std::env::args().skip(1);
    let mut eval_source: Option<String> = None;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--eval" | "-e" => {
                eval_source = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("Missing code after {arg}"))?,
                );
            }
            "--version" | "-v" => {
                println!("howler {VERSION}");
                return Ok(1);
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(source) = eval_source {
        source
    } else if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    Ok(execute(&source))
}

/// Parses and evaluates a program, returning the process exit code.
fn execute(source: &str) -> i32 {
    let program = match parser::parse(source) {
        Ok(program) => program,
        Err(errors) => {
            for error in errors {
                eprintln!("\t{error}");
            }
            return 1;
        }
    };

    let mut interpreter = Interpreter::new();
    interpreter.register_builtin("version", builtin_version);
    interpreter.register_builtin("args", builtin_args);

    let env = Environment::global();
    if let Err(error) = interpreter.load_prelude(&env) {
        eprintln!("Failed to load the standard prelude: {error}");
        return 33;
    }

    match interpreter.eval_program(&program, &env) {
        error @ Value::Error(_) => {
            eprintln!("{}", error.inspect());
            1
        }
        _ => 0,
    }
}
