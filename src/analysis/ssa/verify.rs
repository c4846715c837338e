//! Structural checks for SSA streams.

use rustc_hash::FxHashMap;

use crate::{
    analysis::AnalysisContext,
    ir::{LogicalVar, Pass},
    Error, Result,
};

/// Checks that an SSA stream is well formed.
///
/// For every reachable instruction:
///
/// - each `(id, subscript)` with a non-zero subscript is defined exactly once, and no
///   definition keeps subscript `0`
/// - each non-phi use of a non-zero subscript is strictly dominated by its definition
/// - each phi has exactly one operand per predecessor block of its block, in predecessor
///   order, and the definition of every operand dominates every exit of the matching
///   predecessor that flows into the phi's label
///
/// Subscript `0` on a use denotes the value on entry to the method and has no definition.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPass`] if `ctx` is not an SSA context, or
/// [`Error::SsaViolation`] describing the first violation found.
pub fn verify_ssa(ctx: &AnalysisContext) -> Result<()> {
    if ctx.pass() != Pass::Ssa {
        return Err(Error::UnsupportedPass {
            pass: ctx.pass().to_string(),
            operation: "ssa verification",
        });
    }

    let stream = ctx.stream();
    let cfg = ctx.cfg();
    let defuse = ctx.defuse();
    let dominance = ctx.dominance();
    let reachable = |n: usize| dominance.is_reachable(n);

    let mut definitions: FxHashMap<LogicalVar, usize> = FxHashMap::default();
    for index in (0..stream.len()).filter(|&n| reachable(n)) {
        for &var in defuse.defs_at(index) {
            if var.ssa == 0 {
                return Err(Error::SsaViolation(format!(
                    "instruction {index} defines {var} without a subscript"
                )));
            }
            if let Some(first) = definitions.insert(var, index) {
                return Err(Error::SsaViolation(format!(
                    "{var} is defined at both {first} and {index}"
                )));
            }
        }
    }

    let definition = |var: LogicalVar, index: usize| {
        definitions.get(&var).copied().ok_or_else(|| {
            Error::SsaViolation(format!("{var} used at {index} has no definition"))
        })
    };

    for index in (0..stream.len()).filter(|&n| reachable(n)) {
        let instr = &stream[index];

        if !instr.is_phi() {
            for &var in defuse.uses_at(index) {
                if var.ssa == 0 {
                    continue;
                }
                let def = definition(var, index)?;
                if !dominance.strictly_dominates(def, index) {
                    return Err(Error::SsaViolation(format!(
                        "definition of {var} at {def} does not dominate its use at {index}"
                    )));
                }
            }
            continue;
        }

        let block = cfg.block_of(index).ok_or(Error::MissingBlock { index })?;
        let expected: Vec<_> = cfg
            .block_predecessors(block)
            .map(|preds| preds.iter().copied().collect())
            .unwrap_or_default();
        if instr.incoming() != expected.as_slice() || instr.extra().len() != expected.len() {
            return Err(Error::SsaViolation(format!(
                "phi at {index} has incoming {:?} with {} operands, block {block} has predecessors {expected:?}",
                instr.incoming(),
                instr.extra().len()
            )));
        }

        let label = cfg.block_start(block).unwrap_or(index);
        for (&from, operand) in instr.incoming().iter().zip(instr.extra()) {
            let Some(var) = operand.referenced() else {
                continue;
            };
            if var.ssa == 0 {
                continue;
            }

            let def = definition(var, index)?;
            let exits: Vec<usize> = cfg
                .predecessors(label)
                .iter()
                .copied()
                .filter(|&p| reachable(p) && cfg.block_of(p) == Some(from))
                .collect();
            if let Some(exit) = exits.iter().find(|&&p| !dominance.dominates(def, p)) {
                return Err(Error::SsaViolation(format!(
                    "phi operand {var} at {index} is not available at exit {exit} of block {from}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::SsaConverter,
        ir::{Instruction, InstructionStream, Var},
        test::{analyze_raw, diamond},
    };

    fn analyze_ssa(stream: InstructionStream) -> AnalysisContext {
        AnalysisContext::analyze(Pass::Ssa, stream).unwrap()
    }

    #[test]
    fn test_converted_stream_verifies() {
        let ssa = SsaConverter::convert(&analyze_raw(diamond())).unwrap();
        assert!(verify_ssa(&ssa).is_ok());
    }

    #[test]
    fn test_raw_context_is_rejected() {
        assert!(matches!(
            verify_ssa(&analyze_raw(diamond())),
            Err(Error::UnsupportedPass { .. })
        ));
    }

    #[test]
    fn test_double_definition() {
        let x = LogicalVar::new(0).with_ssa(1);
        let ctx = analyze_ssa(InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::assign(Var::Logical(x), Var::constant(1)),
            Instruction::assign(Var::Logical(x), Var::constant(2)),
            Instruction::ret(Var::Logical(x)),
        ]));
        assert!(matches!(verify_ssa(&ctx), Err(Error::SsaViolation(_))));
    }

    #[test]
    fn test_use_before_definition() {
        let x = LogicalVar::new(0).with_ssa(1);
        let ctx = analyze_ssa(InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::ret(Var::Logical(x)),
            Instruction::label(1),
            Instruction::assign(Var::Logical(x), Var::constant(1)),
            Instruction::br(0),
        ]));
        // The definition is unreachable, so the use has none
        assert!(matches!(verify_ssa(&ctx), Err(Error::SsaViolation(_))));
    }

    #[test]
    fn test_phi_arity_mismatch() {
        let ssa = SsaConverter::convert(&analyze_raw(diamond())).unwrap();
        let mut instructions = ssa.stream().instructions().to_vec();
        let phi = instructions.iter_mut().find(|i| i.is_phi()).unwrap();
        phi.extra.pop();
        phi.incoming.pop();

        let broken = analyze_ssa(InstructionStream::new(instructions));
        match verify_ssa(&broken) {
            Err(Error::SsaViolation(message)) => assert!(message.contains("predecessors")),
            other => panic!("expected SsaViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_operand_must_reach_every_exit() {
        // label 2 leaves for label 4 at 4, before x.2 is defined, and again at 6
        let c = Var::logical(2);
        let x = LogicalVar::new(0);
        let mut phi = Instruction::phi(x, vec![2]);
        phi.result = Var::Logical(x.with_ssa(3));
        phi.extra = vec![Var::Logical(x.with_ssa(2))];

        let ctx = analyze_ssa(InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::assign(Var::Logical(x.with_ssa(1)), Var::constant(1)),
            Instruction::br_if(c.clone(), 2),
            Instruction::label(2),
            Instruction::br_if(c, 4),
            Instruction::assign(Var::Logical(x.with_ssa(2)), Var::constant(5)),
            Instruction::br(4),
            Instruction::label(4),
            phi,
            Instruction::ret(Var::Logical(x.with_ssa(3))),
        ]));

        match verify_ssa(&ctx) {
            Err(Error::SsaViolation(message)) => assert!(message.contains("exit 4"), "{message}"),
            other => panic!("expected SsaViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_swapped_phi_operands() {
        let ssa = SsaConverter::convert(&analyze_raw(diamond())).unwrap();
        let mut instructions = ssa.stream().instructions().to_vec();
        let phi = instructions.iter_mut().find(|i| i.is_phi()).unwrap();
        phi.extra.swap(0, 1);

        let broken = analyze_ssa(InstructionStream::new(instructions));
        assert!(matches!(verify_ssa(&broken), Err(Error::SsaViolation(_))));
    }
}
