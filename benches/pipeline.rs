//! Benchmarks for SSA conversion, liveness and whole-method compilation.

extern crate tacscope;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tacscope::prelude::*;

/// A loop computing `s += i * 4` with a dead temporary per iteration.
fn accumulate() -> InstructionStream {
    let (i, s, t, dead) = (Var::logical(0), Var::logical(1), Var::logical(2), Var::logical(3));
    InstructionStream::new(vec![
        Instruction::label(0),
        Instruction::assign(i.clone(), Var::constant(0)),
        Instruction::assign(s.clone(), Var::constant(0)),
        Instruction::label(1),
        Instruction::binary(Opcode::Mul, t.clone(), i.clone(), Var::constant(4)),
        Instruction::binary(Opcode::Add, dead, t.clone(), Var::constant(1)),
        Instruction::binary(Opcode::Add, s.clone(), s.clone(), t),
        Instruction::binary(Opcode::Add, i.clone(), i.clone(), Var::constant(1)),
        Instruction::br_if(i, 1),
        Instruction::ret(s),
    ])
}

fn bench_ssa_conversion(c: &mut Criterion) {
    let ctx = AnalysisContext::analyze(Pass::Raw, accumulate()).unwrap();

    c.bench_function("ssa_convert_accumulate", |b| {
        b.iter(|| black_box(SsaConverter::convert(black_box(&ctx)).unwrap()));
    });
}

fn bench_liveness(c: &mut Criterion) {
    let ctx = AnalysisContext::analyze(Pass::Raw, accumulate()).unwrap();

    c.bench_function("liveness_accumulate", |b| {
        b.iter(|| black_box(Liveness::solve(black_box(&ctx))));
    });
}

fn bench_compile_methods(c: &mut Criterion) {
    let compiler = MethodCompiler::new(PipelineConfig::default().with_verification(false));
    let methods: Vec<Method> = (0..64)
        .map(|n| Method::new(format!("Method{n}"), accumulate()))
        .collect();

    c.bench_function("compile_single_method", |b| {
        b.iter(|| black_box(compiler.compile(black_box(&methods[0])).unwrap()));
    });

    c.bench_function("compile_all_64_methods", |b| {
        b.iter(|| black_box(compiler.compile_all(black_box(&methods))));
    });
}

criterion_group!(
    benches,
    bench_ssa_conversion,
    bench_liveness,
    bench_compile_methods,
);
criterion_main!(benches);
