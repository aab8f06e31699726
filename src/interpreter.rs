//! Tree-walking interpreter.
//!
//! Execution pipeline:
//! `eval_program` -> `eval_statement` -> `eval_expression` -> `apply_function`
//! -> `eval_block` (function body). Every evaluation yields exactly one
//! [`Value`]; failures travel as error-sentinel values rather than `Err`s so
//! they can short-circuit through every construct unchanged.

mod builtins;
mod evaluator;

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use thiserror::Error;

use crate::ast::Program;
use crate::parser::{self, ParseError};
use crate::runtime::{Env, Value};
use crate::token::Token;

/// Host function callable from scripts. Receives the call-site token for
/// error locality, the current environment, and the evaluated arguments.
pub type BuiltinFn = fn(&mut Interpreter, &Token, &Env, Vec<Value>) -> Value;

/// Language-level helpers evaluated into the global environment at startup.
const PRELUDE: &str = include_str!("../data/prelude.howl");

#[derive(Debug, Error)]
pub enum PreludeError {
    #[error("parsing the prelude failed: {0}")]
    Parse(String),
    #[error("evaluating the prelude failed: {0}")]
    Eval(String),
}

enum Sink {
    Stdout,
    Capture(Vec<u8>),
}

pub struct Interpreter {
    builtins: HashMap<String, BuiltinFn>,
    pragmas: HashSet<String>,
    sink: Sink,
}

impl Interpreter {
    /// An interpreter with the default built-in registry, writing to stdout.
    pub fn new() -> Self {
        Self::with_sink(Sink::Stdout)
    }

    /// Like [`Interpreter::new`], but `puts`/`printf` output is collected
    /// for [`Interpreter::captured_output`] instead of being printed.
    pub fn with_capture() -> Self {
        Self::with_sink(Sink::Capture(Vec::new()))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            builtins: builtins::default_registry(),
            pragmas: HashSet::new(),
            sink,
        }
    }

    /// Everything written by the program so far, when capturing.
    pub fn captured_output(&self) -> String {
        match &self.sink {
            Sink::Stdout => String::new(),
            Sink::Capture(buffer) => String::from_utf8_lossy(buffer).into_owned(),
        }
    }

    /// Registers (or replaces) a built-in. The registry is meant to be
    /// complete before evaluation begins.
    pub fn register_builtin(&mut self, name: &str, func: BuiltinFn) {
        self.builtins.insert(name.to_string(), func);
    }

    pub(crate) fn builtin(&self, name: &str) -> Option<BuiltinFn> {
        self.builtins.get(name).copied()
    }

    pub(crate) fn has_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Flips the named interpreter option, returning its new state.
    pub fn toggle_pragma(&mut self, name: &str) -> bool {
        if self.pragmas.remove(name) {
            false
        } else {
            self.pragmas.insert(name.to_string());
            true
        }
    }

    pub fn pragma_enabled(&self, name: &str) -> bool {
        self.pragmas.contains(name)
    }

    pub(crate) fn write_str(&mut self, text: &str) {
        match &mut self.sink {
            Sink::Stdout => {
                let mut stdout = io::stdout();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            Sink::Capture(buffer) => buffer.extend_from_slice(text.as_bytes()),
        }
    }

    /// Parses and evaluates the bundled prelude into `env`. The host treats
    /// any failure here as fatal.
    pub fn load_prelude(&mut self, env: &Env) -> Result<(), PreludeError> {
        let program = parser::parse(PRELUDE).map_err(|errors| {
            let rendered: Vec<String> = errors.iter().map(ParseError::to_string).collect();
            PreludeError::Parse(rendered.join("; "))
        })?;
        match self.eval_program(&program, env) {
            Value::Error(error) => Err(PreludeError::Eval(error.message)),
            _ => Ok(()),
        }
    }

    /// Convenience entry: parse and evaluate a source string in `env`.
    pub fn eval_source(&mut self, source: &str, env: &Env) -> Result<Value, Vec<ParseError>> {
        let program = parser::parse(source)?;
        Ok(self.eval_program(&program, env))
    }

    /// Evaluates a parsed program. A top-level `return` is unwrapped; an
    /// error sentinel is returned as-is for the host to render.
    pub fn eval_program(&mut self, program: &Program, env: &Env) -> Value {
        evaluator::eval_program(self, program, env)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Environment;
    use indoc::indoc;

    /// Runs `source` against a fresh environment with the prelude loaded,
    /// returning the final value and everything the program printed.
    fn run(source: &str) -> (Value, String) {
        let mut interpreter = Interpreter::with_capture();
        let env = Environment::global();
        interpreter
            .load_prelude(&env)
            .expect("the bundled prelude must load");
        let program = match parser::parse(source) {
            Ok(program) => program,
            Err(errors) => panic!("parse failed for {source:?}: {errors:?}"),
        };
        let value = interpreter.eval_program(&program, &env);
        let output = interpreter.captured_output();
        (value, output)
    }

    fn eval(source: &str) -> Value {
        run(source).0
    }

    fn expect_error(source: &str) -> String {
        match eval(source) {
            Value::Error(error) => error.message,
            other => panic!("expected error for {source:?}, got {}", other.inspect()),
        }
    }

    #[test]
    fn integer_arithmetic_matches_host_semantics() {
        let cases = [
            ("5 + 5 * 2;", 15),
            ("(5 + 5) * 2;", 20),
            ("7 / 2;", 3),
            ("-7 / 2;", -3),
            ("7 % 3;", 1),
            ("2 ** 10;", 1024),
            ("5 - 10;", -5),
            ("0b101 + 0x0f;", 20),
            ("50 / 2 * 2 + 10;", 60),
        ];
        for (source, expected) in cases {
            assert_eq!(eval(source), Value::Integer(expected), "{source}");
        }
    }

    #[test]
    fn mixed_numeric_operands_promote_to_float() {
        assert_eq!(eval("1 / 2.0;"), Value::Float(0.5));
        assert_eq!(eval("2.5 + 1;"), Value::Float(3.5));
        assert_eq!(eval("1.5 * 2;"), Value::Float(3.0));
        assert_eq!(eval("2.0 ** 3;"), Value::Float(8.0));
    }

    #[test]
    fn arithmetic_failure_modes_are_errors() {
        assert_eq!(expect_error("1 / 0;"), "division by zero");
        assert_eq!(expect_error("1 % 0;"), "modulo by zero");
        assert_eq!(expect_error("2 ** -1;"), "negative exponent");
        assert!(expect_error("1 + true;").contains("type mismatch"));
        assert!(expect_error("true + true;").contains("unknown operator"));
    }

    #[test]
    fn string_operators() {
        assert_eq!(eval(r#""foo" + "bar";"#), Value::String("foobar".into()));
        assert_eq!(eval(r#""ab" * 3;"#), Value::String("ababab".into()));
        assert_eq!(eval(r#"3 * "ab";"#), Value::String("ababab".into()));
        assert_eq!(eval(r#""abc" < "abd";"#), Value::Boolean(true));
        assert_eq!(eval(r#""abc" == "abc";"#), Value::Boolean(true));
        assert_eq!(eval(r#""1" == 1;"#), Value::Boolean(false));
    }

    #[test]
    fn equality_promotes_numerics() {
        assert_eq!(eval("1 == 1.0;"), Value::Boolean(true));
        assert_eq!(eval("1 != 1.5;"), Value::Boolean(true));
        assert_eq!(eval("true == true;"), Value::Boolean(true));
    }

    #[test]
    fn logical_operators_return_the_deciding_operand() {
        assert_eq!(eval("false || 5;"), Value::Integer(5));
        assert_eq!(eval("1 || 2;"), Value::Integer(1));
        assert_eq!(eval("null && 2;"), Value::Null);
        assert_eq!(eval("0 && 2;"), Value::Integer(2)); // zero is truthy
        assert_eq!(eval("!true;"), Value::Boolean(false));
        assert_eq!(eval("!null;"), Value::Boolean(true));
        assert_eq!(eval("!0;"), Value::Boolean(false));
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        // The missing identifier would error if evaluated.
        assert_eq!(eval("true || boom;"), Value::Boolean(true));
        assert_eq!(eval("false && boom;"), Value::Boolean(false));
    }

    #[test]
    fn range_operator_materialises_inclusive_arrays() {
        assert_eq!(
            eval("1..4;"),
            Value::array(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4),
            ])
        );
        assert_eq!(eval("5..1;"), Value::array(vec![]));
        assert_eq!(eval("len(3..3);"), Value::Integer(1));
        assert!(expect_error("1.5..3;").contains("unknown operator"));
    }

    #[test]
    fn regex_operators_match_and_reject() {
        assert_eq!(eval(r#""Steve" ~= /steve/;"#), Value::Boolean(false));
        assert_eq!(eval(r#""Steve" ~= /(?i)steve/;"#), Value::Boolean(true));
        assert_eq!(eval(r#""Steve" !~ /steve/;"#), Value::Boolean(true));
        assert_eq!(eval(r#""abc" ~= "b";"#), Value::Boolean(true));
        assert!(expect_error(r#""abc" ~= "(";"#).contains("invalid regular expression"));
    }

    #[test]
    fn indexing_is_null_out_of_range() {
        assert_eq!(eval("[1, 2, 3][0];"), Value::Integer(1));
        assert_eq!(eval("[1, 2, 3][3];"), Value::Null);
        assert_eq!(eval("[1, 2, 3][-1];"), Value::Null);
        assert_eq!(eval(r#"{"a": 1}["a"];"#), Value::Integer(1));
        assert_eq!(eval(r#"{"a": 1}["b"];"#), Value::Null);
        assert_eq!(eval(r#""hello"[1];"#), Value::String("e".into()));
        assert_eq!(eval(r#""hello"[99];"#), Value::Null);
        assert!(expect_error("5[0];").contains("index operator not supported"));
        assert!(expect_error(r#"[1]["x"];"#).contains("must be an integer"));
    }

    #[test]
    fn hash_literals_evaluate_keys_and_reject_unhashable_ones() {
        assert_eq!(eval(r#"{1 + 1: "two"}[2];"#), Value::String("two".into()));
        assert_eq!(eval(r#"{1.5: "x"}[1.5];"#), Value::String("x".into()));
        assert_eq!(eval(r#"{true: 1}[true];"#), Value::Integer(1));
        assert!(expect_error("{[1]: 2};").contains("unusable as hash key"));
    }

    #[test]
    fn let_then_assign_updates_the_existing_binding() {
        assert_eq!(
            eval("let a = 1; let f = fn() { a = 2; }; f(); a;"),
            Value::Integer(2)
        );
    }

    #[test]
    fn bare_assignment_creates_in_the_global_frame() {
        assert_eq!(eval("x = 3; x;"), Value::Integer(3));
        assert_eq!(
            eval("let g = fn() { fresh = 9; }; g(); fresh;"),
            Value::Integer(9)
        );
    }

    #[test]
    fn const_reassignment_is_an_error() {
        assert_eq!(
            expect_error("const pi = 3; pi = 4;"),
            "cannot assign to constant pi"
        );
        assert_eq!(
            expect_error("const pi = 3; let pi = 4;"),
            "cannot redeclare constant pi"
        );
        // Shadowing in an inner scope is allowed.
        assert_eq!(
            eval("const pi = 3; let f = fn() { let pi = 4; pi; }; f();"),
            Value::Integer(4)
        );
    }

    #[test]
    fn compound_assignment_desugars() {
        assert_eq!(eval("let x = 10; x += 5; x;"), Value::Integer(15));
        assert_eq!(eval("let x = 10; x -= 5; x;"), Value::Integer(5));
        assert_eq!(eval("let x = 10; x *= 5; x;"), Value::Integer(50));
        assert_eq!(eval("let x = 10; x /= 5; x;"), Value::Integer(2));
        assert_eq!(
            eval(r#"let s = "ab"; s += "c"; s;"#),
            Value::String("abc".into())
        );
        assert!(expect_error("missing += 1;").contains("identifier not found"));
    }

    #[test]
    fn postfix_updates_in_place_and_yields_the_old_value() {
        assert_eq!(eval("let i = 0; i++; i;"), Value::Integer(1));
        assert_eq!(eval("let i = 5; i--; i;"), Value::Integer(4));
        assert_eq!(eval("let i = 5; i++;"), Value::Integer(5));
        assert!(expect_error("let s = \"x\"; s++;").contains("unknown operator"));
        assert_eq!(
            expect_error("const i = 1; i++;"),
            "cannot assign to constant i"
        );
    }

    #[test]
    fn if_expressions_yield_block_values() {
        assert_eq!(eval("if (true) { 10 };"), Value::Integer(10));
        assert_eq!(eval("if (false) { 10 };"), Value::Null);
        assert_eq!(eval("if (false) { 10 } else { 20 };"), Value::Integer(20));
        assert_eq!(eval("if (0) { 10 };"), Value::Integer(10));
        assert_eq!(eval("if (null) { 10 } else { 20 };"), Value::Integer(20));
    }

    #[test]
    fn ternary_expressions_choose_a_branch() {
        assert_eq!(eval("true ? 1 : 2;"), Value::Integer(1));
        assert_eq!(eval("1 < 2 ? \"yes\" : \"no\";"), Value::String("yes".into()));
    }

    #[test]
    fn for_loop_prints_and_returns_null() {
        let (value, output) = run("let x = 0; for (x < 3) { puts(x); x = x + 1 };");
        assert_eq!(output, "0\n1\n2\n");
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn recursive_fibonacci() {
        assert_eq!(
            eval("let fib = fn(n){ if (n<2){n} else {fib(n-1)+fib(n-2)} }; fib(10);"),
            Value::Integer(55)
        );
    }

    #[test]
    fn foreach_over_hash_binds_key_and_value() {
        assert_eq!(
            eval(r#"let h = {"a":1,"b":2}; let s = 0; foreach k, v in h { s = s + v }; s;"#),
            Value::Integer(3)
        );
        let (_, output) =
            run(r#"foreach k, v in {"b": 2, "a": 1} { printf("%s=%d\n", k, v); };"#);
        assert_eq!(output, "a=1\nb=2\n");
    }

    #[test]
    fn foreach_over_arrays_strings_and_ranges() {
        assert_eq!(
            eval("let s = 0; foreach i, v in [10, 20] { s = s + i + v }; s;"),
            Value::Integer(31)
        );
        assert_eq!(
            eval(r#"let out = ""; foreach c in "abc" { out = c + out }; out;"#),
            Value::String("cba".into())
        );
        assert_eq!(
            eval("let s = 0; foreach n in 1..4 { s = s + n }; s;"),
            Value::Integer(10)
        );
        assert!(expect_error("foreach x in 42 { x };").contains("foreach"));
    }

    #[test]
    fn foreach_variables_stay_local_to_the_loop() {
        assert_eq!(
            eval("let v = 99; foreach v in [1, 2, 3] { v; }; v;"),
            Value::Integer(99)
        );
    }

    #[test]
    fn switch_matches_arms_in_source_order() {
        let source = indoc! {r#"
            switch (2) {
                case 1 { "one" }
                case 2, 3 { "two-or-three" }
                default { "other" }
            };
        "#};
        assert_eq!(eval(source), Value::String("two-or-three".into()));

        assert_eq!(
            eval(r#"switch (9) { case 1 { "one" } default { "other" } };"#),
            Value::String("other".into())
        );
        assert_eq!(eval(r#"switch (9) { case 1 { "one" } };"#), Value::Null);
        assert_eq!(
            eval(r#"switch ("b") { case "a", "b" { 1 } };"#),
            Value::Integer(1)
        );
        // Numeric promotion applies to arm matching.
        assert_eq!(eval("switch (2.0) { case 2 { \"int\" } };"), Value::String("int".into()));
    }

    #[test]
    fn closures_capture_their_definition_environment() {
        assert_eq!(
            eval("let adder = fn(x) { fn(y) { x + y } }; let add2 = adder(2); add2(3);"),
            Value::Integer(5)
        );
        // The captured frame is shared, not copied.
        assert_eq!(
            eval(indoc! {"
                let counter = fn() {
                    let n = 0;
                    fn() { n = n + 1; n }
                };
                let tick = counter();
                tick(); tick(); tick();
            "}),
            Value::Integer(3)
        );
    }

    #[test]
    fn default_parameters_evaluate_in_declaration_order() {
        assert_eq!(
            eval("let add = fn(a, b = a + 1){ a + b }; add(10);"),
            Value::Integer(21)
        );
        assert_eq!(
            eval("let add = fn(a, b = a + 1){ a + b }; add(10, 1);"),
            Value::Integer(11)
        );
        assert_eq!(
            eval("let f = fn(a = 1, b = a * 2) { a + b }; f();"),
            Value::Integer(3)
        );
    }

    #[test]
    fn call_arity_errors() {
        assert!(expect_error("let f = fn(a) { a }; f(1, 2);").contains("too many arguments"));
        assert!(expect_error("let f = fn(a, b) { a }; f(1);").contains("missing argument: b"));
        assert!(expect_error("5(1);").contains("not a function"));
    }

    #[test]
    fn function_definitions_bind_their_name() {
        assert_eq!(
            eval("function double(x) { return x * 2; } double(21);"),
            Value::Integer(42)
        );
    }

    #[test]
    fn return_unwinds_to_the_function_boundary() {
        assert_eq!(
            eval("let f = fn() { return 1; 99; }; f();"),
            Value::Integer(1)
        );
        assert_eq!(
            eval(indoc! {"
                let f = fn(xs) {
                    foreach x in xs {
                        if (x > 1) { return x; }
                    }
                    0;
                };
                f([0, 1, 5, 7]);
            "}),
            Value::Integer(5)
        );
        // Top-level return yields the inner value to the host.
        assert_eq!(eval("return 7; 99;"), Value::Integer(7));
    }

    #[test]
    fn errors_short_circuit_everything() {
        assert!(expect_error("[1, 2 + null, boom];").contains("type mismatch"));
        assert!(expect_error("len(missing);").contains("identifier not found"));
        assert!(expect_error("let f = fn() { 1 / 0 }; f() + 1;").contains("division by zero"));
        let (_, output) = run("puts(\"before\"); 1 / 0; puts(\"after\");");
        assert_eq!(output, "before\n");
    }

    #[test]
    fn method_dispatch_prefers_the_type_handler() {
        assert_eq!(eval(r#""Steve".lower();"#), Value::String("steve".into()));
        assert_eq!(eval(r#""hello".len();"#), Value::Integer(5));
        assert_eq!(eval("[3, 1, 2].sort().first();"), Value::Integer(1));
        assert_eq!(eval("(1..3).last();"), Value::Integer(3));
        assert_eq!(eval(r#"{"a": 1}.keys();"#), Value::array(vec![Value::String("a".into())]));
        assert_eq!(eval("65.chr();"), Value::String("A".into()));
        assert_eq!(eval("3.5.to_s();"), Value::String("3.5".into()));
    }

    #[test]
    fn method_dispatch_falls_back_to_registered_type_functions() {
        // string.repeat and the array.* helpers come from the prelude.
        assert_eq!(eval(r#""ab".repeat(3);"#), Value::String("ababab".into()));
        assert_eq!(
            eval("[1, 2, 3].map(fn(x) { x * 2 });"),
            Value::array(vec![
                Value::Integer(2),
                Value::Integer(4),
                Value::Integer(6),
            ])
        );
        assert_eq!(
            eval("[1, 2, 3, 4].filter(fn(x) { x % 2 == 0 });"),
            Value::array(vec![Value::Integer(2), Value::Integer(4)])
        );
        assert_eq!(eval("[1, 2].contains(2);"), Value::Boolean(true));
        assert!(expect_error(r#""x".banana();"#).contains("failed to invoke method"));
    }

    #[test]
    fn methods_method_includes_registered_names() {
        let rendered = eval(r#""x".methods();"#).inspect();
        assert!(rendered.contains("upper"), "{rendered}");
        assert!(rendered.contains("repeat"), "{rendered}");

        let rendered = eval("fn() { 1 }.methods();").inspect();
        assert!(rendered.contains("methods"), "{rendered}");
    }

    #[test]
    fn conversion_and_inspection_builtins() {
        assert_eq!(eval("type(3);"), Value::String("integer".into()));
        assert_eq!(eval("type(null);"), Value::String("null".into()));
        assert_eq!(eval("type(type);"), Value::String("builtin".into()));
        assert_eq!(eval("int(\"42\");"), Value::Integer(42));
        assert_eq!(eval("int(3.9);"), Value::Integer(3));
        assert_eq!(eval("int(7);"), Value::Integer(7));
        assert!(expect_error("int(\"nope\");").contains("could not convert"));
        assert_eq!(eval("string(123);"), Value::String("123".into()));
        assert_eq!(eval("string([1, 2]);"), Value::String("[1, 2]".into()));
        assert_eq!(eval("len(\"héllo\");"), Value::Integer(5));
        assert_eq!(eval("len([1, 2, 3]);"), Value::Integer(3));
        assert!(expect_error("len(3);").contains("not supported"));
    }

    #[test]
    fn collection_builtins_are_functional() {
        let (value, _) = run(indoc! {r#"
            let xs = [1];
            let ys = push(xs, 2);
            len(xs) * 10 + len(ys);
        "#});
        assert_eq!(value, Value::Integer(12));

        assert_eq!(
            eval(r#"let h = {"a": 1}; let h2 = set(h, "b", 2); len(h) * 10 + len(h2);"#),
            Value::Integer(12)
        );
        assert_eq!(
            eval(r#"let h = {"a": 1, "b": 2}; len(delete(h, "a")) * 10 + len(h);"#),
            Value::Integer(12)
        );
        assert_eq!(
            eval(r#"keys({"b": 1, "a": 2});"#),
            Value::array(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }

    #[test]
    fn match_builtin_returns_groups_or_null() {
        assert_eq!(
            eval(r#"match("(a+)(b)?", "caaat");"#),
            Value::array(vec![
                Value::String("aaa".into()),
                Value::String("aaa".into()),
                Value::String(String::new()),
            ])
        );
        assert_eq!(eval(r#"match("z", "abc");"#), Value::Null);
        // A regexp literal carries its flags into the pattern string.
        assert_eq!(
            eval(r#"match(/(?i)STEVE/, "my name is steve")[0];"#),
            Value::String("steve".into())
        );
    }

    #[test]
    fn sprintf_and_printf_format_values() {
        assert_eq!(
            eval(r#"sprintf("%s is %d years old", "Ada", 36);"#),
            Value::String("Ada is 36 years old".into())
        );
        assert_eq!(
            eval(r#"sprintf("%.2f", 3.14159);"#),
            Value::String("3.14".into())
        );
        assert_eq!(
            eval(r#"sprintf("%d%%", 99);"#),
            Value::String("99%".into())
        );
        assert_eq!(
            eval(r#"sprintf("%t / %v", true, [1, 2]);"#),
            Value::String("true / [1, 2]".into())
        );
        assert!(expect_error(r#"sprintf("%d", "x");"#).contains("%d"));
        assert!(expect_error(r#"sprintf("%d %d", 1);"#).contains("too few arguments"));

        let (_, output) = run(r#"printf("%s:%d\n", "n", 1);"#);
        assert_eq!(output, "n:1\n");
    }

    #[test]
    fn puts_prints_one_line_per_argument() {
        let (_, output) = run(r#"puts("a", 1, [2, 3]);"#);
        assert_eq!(output, "a\n1\n[2, 3]\n");
    }

    #[test]
    fn eval_builtin_runs_in_the_current_environment() {
        assert_eq!(eval(r#"eval("let q = 9;"); q;"#), Value::Integer(9));
        assert_eq!(eval(r#"let x = 2; eval("x * 3");"#), Value::Integer(6));
        assert!(expect_error(r#"eval("let x = ;");"#).contains("eval"));
    }

    #[test]
    fn pragma_toggles_flags() {
        assert_eq!(eval(r#"pragma("strict");"#), Value::Boolean(true));
        assert_eq!(
            eval(r#"pragma("strict"); pragma("strict");"#),
            Value::Boolean(false)
        );
    }

    #[test]
    fn math_builtins() {
        assert_eq!(eval("math.abs(-3);"), Value::Integer(3));
        assert_eq!(eval("math.abs(-3.5);"), Value::Float(3.5));
        assert_eq!(eval("math.sqrt(9);"), Value::Float(3.0));
        let Value::Float(r) = eval("math.random();") else {
            panic!("math.random must produce a float")
        };
        assert!((0.0..1.0).contains(&r));
    }

    #[test]
    fn os_builtins_round_trip_environment_variables() {
        assert_eq!(
            eval(r#"os.setenv("HOWLER_TEST_VAR", "on"); os.getenv("HOWLER_TEST_VAR");"#),
            Value::String("on".into())
        );
        assert_eq!(eval(r#"os.getenv("HOWLER_UNSET_VAR");"#), Value::String(String::new()));
        let rendered = eval("os.environment();").inspect();
        assert!(rendered.contains("HOWLER_TEST_VAR"), "{rendered}");
    }

    #[test]
    fn file_and_filesystem_builtins_round_trip() {
        let path = std::env::temp_dir().join(format!("howler-io-{}.txt", std::process::id()));
        let path_str = path.to_str().expect("temp path is valid UTF-8");
        let dir = std::env::temp_dir().join(format!("howler-io-{}.d", std::process::id()));
        let dir_str = dir.to_str().expect("temp path is valid UTF-8");

        let source = format!(
            r#"
            let f = open("{path}", "w");
            f.write("alpha\nbeta\n");
            f.close();
            puts(chmod("{path}", 644));
            let r = open("{path}");
            puts(r.read());
            puts(r.read());
            puts(r.read());
            puts(stat("{path}")["size"]);
            puts(len(directory.glob("{path}")));
            puts(unlink("{path}"));
            puts(mkdir("{dir}"));
            puts(stat("{dir}")["type"]);
            "#,
            path = path_str,
            dir = dir_str,
        );
        let (value, output) = run(&source);
        std::fs::remove_dir(&dir).ok();
        assert!(!value.is_error(), "{}", value.inspect());
        assert_eq!(
            output,
            "true\nalpha\nbeta\nnull\n11\n1\ntrue\ntrue\ndirectory\n"
        );
    }

    #[test]
    fn backtick_runs_a_shell_command() {
        assert_eq!(
            eval("`echo hello`[\"stdout\"];"),
            Value::String("hello\n".into())
        );
    }

    #[test]
    fn prelude_helpers_are_available() {
        assert_eq!(eval("min(3, 2) + max(3, 2);"), Value::Integer(5));
        assert_eq!(expect_error("PI = 4;"), "cannot assign to constant PI");
        let (_, output) = run(r#"assert(true, "never printed"); puts("done");"#);
        assert_eq!(output, "done\n");
    }

    #[test]
    fn top_level_value_is_returned_to_the_embedder() {
        let mut interpreter = Interpreter::with_capture();
        let env = Environment::global();
        let value = interpreter
            .eval_source("let a = 20; a + 2;", &env)
            .expect("source parses");
        assert_eq!(value, Value::Integer(22));
    }

    #[test]
    fn host_registered_builtins_are_callable() {
        fn forty_two(
            _interpreter: &mut Interpreter,
            _token: &crate::token::Token,
            _env: &Env,
            _args: Vec<Value>,
        ) -> Value {
            Value::Integer(42)
        }
        let mut interpreter = Interpreter::with_capture();
        interpreter.register_builtin("answer", forty_two);
        let env = Environment::global();
        let value = interpreter
            .eval_source("answer();", &env)
            .expect("source parses");
        assert_eq!(value, Value::Integer(42));
    }
}
