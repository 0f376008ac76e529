use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use kinevm::{Code, Expr, Interpreter, OptLevel, Symbol, SymbolTable, compile, optimize};
use num_complex::Complex64;

/// k1 * s / (km + s) + k2 * s^2, a typical rate-law shape.
fn rate_law(s: &Symbol) -> Expr {
    Expr::add(
        Expr::div(
            Expr::mul(Expr::real(10.0), Expr::symbol(s)),
            Expr::add(Expr::real(2.0), Expr::symbol(s)),
        ),
        Expr::mul(
            Expr::real(0.5),
            Expr::pow(Expr::symbol(s), Expr::integer(2)),
        ),
    )
}

fn compiled(s: &Symbol, level: OptLevel) -> Code {
    let table = SymbolTable::from_ordered([s]);
    let mut code = compile(&rate_law(s), &table).expect("compile");
    optimize(&mut code, level).expect("optimize");
    code
}

fn bench_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation");
    let s = Symbol::new("s");
    let expr = rate_law(&s);
    let table = SymbolTable::from_ordered([&s]);

    group.bench_function("compile_rate_law", |b| {
        b.iter(|| compile(black_box(&expr), &table))
    });

    group.bench_function("compile_and_optimize_full", |b| {
        b.iter(|| {
            let mut code = compile(black_box(&expr), &table).expect("compile");
            optimize(&mut code, OptLevel::Full).expect("optimize");
            code
        })
    });

    group.finish();
}

fn bench_interpretation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpretation");
    let s = Symbol::new("s");

    for (name, level) in [
        ("rate_law_unoptimized", OptLevel::None),
        ("rate_law_folded", OptLevel::Fold),
        ("rate_law_full", OptLevel::Full),
    ] {
        let code = compiled(&s, level);
        let mut vm = Interpreter::new(&code);
        let mut out = [0.0_f64];
        group.bench_function(name, |b| {
            b.iter(|| {
                vm.run(black_box(&code), black_box(&[3.0]), &mut out);
                out[0]
            })
        });
    }

    let code = compiled(&s, OptLevel::Full);
    let mut vm = Interpreter::new(&code);
    let mut out = [Complex64::new(0.0, 0.0)];
    group.bench_function("rate_law_complex", |b| {
        b.iter(|| {
            vm.run(
                black_box(&code),
                black_box(&[Complex64::new(3.0, 0.1)]),
                &mut out,
            );
            out[0]
        })
    });

    group.finish();
}

fn bench_integration_sweep(c: &mut Criterion) {
    // The dominant production pattern: one block, many input vectors.
    let mut group = c.benchmark_group("integration_sweep");
    let s = Symbol::new("s");
    let code = compiled(&s, OptLevel::Full);
    let inputs: Vec<[f64; 1]> = (0..1000).map(|i| [f64::from(i) * 0.01]).collect();

    group.bench_function("sweep_1000_points", |b| {
        let mut vm = Interpreter::new(&code);
        let mut out = [0.0_f64];
        b.iter(|| {
            let mut acc = 0.0;
            for input in &inputs {
                vm.run(&code, black_box(input), &mut out);
                acc += out[0];
            }
            acc
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compilation,
    bench_interpretation,
    bench_integration_sweep
);
criterion_main!(benches);
