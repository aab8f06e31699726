use criterion::{criterion_group, criterion_main, Criterion};

use howler::interpreter::Interpreter;
use howler::parser;
use howler::runtime::Environment;

const FIB: &str = "let fib = fn(n){ if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(15);";

fn bench_interpreter(c: &mut Criterion) {
    let program = parser::parse(FIB).expect("benchmark program parses");
    c.bench_function("interpreter_fib_15", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::with_capture();
            let env = Environment::global();
            interpreter.eval_program(&program, &env)
        })
    });

    c.bench_function("frontend_fib", |b| {
        b.iter(|| parser::parse(FIB).expect("benchmark program parses"))
    });
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
