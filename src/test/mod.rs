//! Shared instruction streams for unit tests.
//!
//! Every builder documents its stream with instruction indices, since tests assert on them.

use crate::{
    analysis::AnalysisContext,
    ir::{Instruction, InstructionStream, Opcode, Pass, Var},
};

/// The diamond from the SSA literature. `x` is `v0`, `y` is `v1`, the condition is `v2`.
///
/// ```text
///  0: label L0
///  1:     v0 = $1
///  2:     brif v2, L2
///  3:     br L3
///  4: label L2
///  5:     v0 = $2
///  6:     br L4
///  7: label L3
///  8:     v0 = $3
///  9:     br L4
/// 10: label L4
/// 11:     v1 = v0
/// 12:     ret v1
/// ```
pub fn diamond() -> InstructionStream {
    let (x, y, c) = (Var::logical(0), Var::logical(1), Var::logical(2));
    InstructionStream::new(vec![
        Instruction::label(0),
        Instruction::assign(x.clone(), Var::constant(1)),
        Instruction::br_if(c, 2),
        Instruction::br(3),
        Instruction::label(2),
        Instruction::assign(x.clone(), Var::constant(2)),
        Instruction::br(4),
        Instruction::label(3),
        Instruction::assign(x.clone(), Var::constant(3)),
        Instruction::br(4),
        Instruction::label(4),
        Instruction::assign(y.clone(), x),
        Instruction::ret(y),
    ])
}

/// One block, no branches.
///
/// ```text
///  0: label L0
///  1:     v0 = $1
///  2:     v1 = add v0, $2
///  3:     v2 = mul v1, v0
///  4:     ret v2
/// ```
pub fn straight_line() -> InstructionStream {
    let (a, b, c) = (Var::logical(0), Var::logical(1), Var::logical(2));
    InstructionStream::new(vec![
        Instruction::label(0),
        Instruction::assign(a.clone(), Var::constant(1)),
        Instruction::binary(Opcode::Add, b.clone(), a.clone(), Var::constant(2)),
        Instruction::binary(Opcode::Mul, c.clone(), b, a),
        Instruction::ret(c),
    ])
}

/// Two nested counting loops summing into `s`. `i` is `v0`, `s` is `v1`, `j` is `v2`, the
/// bound `n` is `v4` and is never assigned.
///
/// ```text
///  0: label L0
///  1:     v0 = $0
///  2:     v1 = $0
///  3: label L1
///  4:     v2 = $0
///  5: label L2
///  6:     v1 = add v1, v2
///  7:     v2 = add v2, $1
///  8:     v3 = cmp v2, v4
///  9:     brif v3, L2
/// 10:     v0 = add v0, $1
/// 11:     v5 = cmp v0, v4
/// 12:     brif v5, L1
/// 13:     ret v1
/// ```
pub fn nested_loops() -> InstructionStream {
    let (i, s, j, t, n, u) = (
        Var::logical(0),
        Var::logical(1),
        Var::logical(2),
        Var::logical(3),
        Var::logical(4),
        Var::logical(5),
    );
    InstructionStream::new(vec![
        Instruction::label(0),
        Instruction::assign(i.clone(), Var::constant(0)),
        Instruction::assign(s.clone(), Var::constant(0)),
        Instruction::label(1),
        Instruction::assign(j.clone(), Var::constant(0)),
        Instruction::label(2),
        Instruction::binary(Opcode::Add, s.clone(), s.clone(), j.clone()),
        Instruction::binary(Opcode::Add, j.clone(), j.clone(), Var::constant(1)),
        Instruction::binary(Opcode::Cmp, t.clone(), j, n.clone()),
        Instruction::br_if(t, 2),
        Instruction::binary(Opcode::Add, i.clone(), i.clone(), Var::constant(1)),
        Instruction::binary(Opcode::Cmp, u.clone(), i, n),
        Instruction::br_if(u, 1),
        Instruction::ret(s),
    ])
}

/// Analyses `stream` as a raw stream, panicking on malformed input.
pub fn analyze_raw(stream: InstructionStream) -> AnalysisContext {
    AnalysisContext::analyze(Pass::Raw, stream).unwrap()
}
