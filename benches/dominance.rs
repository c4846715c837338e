//! Benchmarks for CFG construction and dominance.
//!
//! Streams are generated synthetically so the graph shape can be scaled:
//! - Chains of diamonds (wide, shallow dominator trees)
//! - Nested loops (deep back edges, many sweeps)

extern crate tacscope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use tacscope::prelude::*;

/// `count` diamonds in sequence, each assigning `v0` on both arms.
fn diamond_chain(count: u32) -> InstructionStream {
    let x = Var::logical(0);
    let mut instructions = vec![Instruction::label(0)];
    for i in 0..count {
        let (then, other, join) = (4 * i + 1, 4 * i + 2, 4 * i + 3);
        instructions.extend([
            Instruction::br_if(Var::logical(1), then),
            Instruction::br(other),
            Instruction::label(then),
            Instruction::assign(x.clone(), Var::constant(i64::from(i))),
            Instruction::br(join),
            Instruction::label(other),
            Instruction::assign(x.clone(), Var::constant(-i64::from(i))),
            Instruction::br(join),
            Instruction::label(join),
        ]);
    }
    instructions.push(Instruction::ret(x));
    InstructionStream::new(instructions)
}

/// `depth` loops nested inside each other, each counting its own variable.
fn nested_loops(depth: u32) -> InstructionStream {
    let mut instructions = vec![Instruction::label(0)];
    for level in 1..=depth {
        instructions.push(Instruction::assign(Var::logical(level), Var::constant(0)));
        instructions.push(Instruction::label(level));
    }
    for level in (1..=depth).rev() {
        let v = Var::logical(level);
        instructions.push(Instruction::binary(Opcode::Add, v.clone(), v.clone(), Var::constant(1)));
        instructions.push(Instruction::br_if(v, level));
    }
    instructions.push(Instruction::ret(Var::Null));
    InstructionStream::new(instructions)
}

fn bench_cfg_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cfg_build");
    for count in [16, 128] {
        let stream = diamond_chain(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &stream, |b, stream| {
            b.iter(|| black_box(Cfg::build(black_box(stream)).unwrap()));
        });
    }
    group.finish();
}

fn bench_dominance_diamonds(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance_diamonds");
    for count in [16, 128] {
        let cfg = Cfg::build(&diamond_chain(count)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &cfg, |b, cfg| {
            b.iter(|| black_box(Dominance::compute(black_box(cfg), 0).unwrap()));
        });
    }
    group.finish();
}

fn bench_dominance_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("dominance_loops");
    for depth in [4, 32] {
        let cfg = Cfg::build(&nested_loops(depth)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &cfg, |b, cfg| {
            b.iter(|| black_box(Dominance::compute(black_box(cfg), 0).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cfg_build,
    bench_dominance_diamonds,
    bench_dominance_loops,
);
criterion_main!(benches);
