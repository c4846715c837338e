//! Phi placement with iterated dominance frontiers.
//!
//! For every logical variable, the instructions that define it seed a worklist. Each frontier
//! instruction of a worklist entry needs a phi for the variable; since that phi is itself a
//! definition, the frontier instruction joins the worklist unless it already defined the
//! variable. Every instruction is marked at most once per variable, so placement terminates.
//!
//! Phis are only meaningful at block entries. A frontier instruction that is not a label is
//! reported as [`Error::PhiAtNonLabel`]. A phi at the start label is rejected as
//! [`Error::MalformedCfg`]: control also enters it from outside the method, and that edge has
//! no predecessor block to carry an operand.

use std::collections::BTreeMap;

use tracing::trace;

use crate::{
    analysis::{Cfg, DefUse, Dominance},
    ir::{InstructionStream, LogicalVar},
    utils::BitSet,
    Error, Result,
};

/// The labels that need a phi, and for which variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhiPlacement {
    /// Label index to the base variables needing a phi there, ascending.
    sites: BTreeMap<usize, Vec<LogicalVar>>,
}

impl PhiPlacement {
    /// Computes phi sites for every variable defined in `stream`.
    ///
    /// Variables are grouped by logical id, so a stream that already carries subscripts is
    /// treated as if it did not.
    ///
    /// # Errors
    ///
    /// - [`Error::PhiAtNonLabel`] if a phi is required at an instruction that does not open a
    ///   block
    /// - [`Error::MalformedCfg`] if a phi is required at the start label, i.e. a loop branches
    ///   back to the method entry
    pub fn compute(
        stream: &InstructionStream,
        cfg: &Cfg,
        defuse: &DefUse,
        dominance: &Dominance,
    ) -> Result<Self> {
        let len = stream.len();
        let mut sites: BTreeMap<usize, Vec<LogicalVar>> = BTreeMap::new();

        for (var, defining) in defuse.definitions_by_variable() {
            let mut defines = BitSet::new(len);
            for &site in &defining {
                defines.insert(site);
            }

            let mut needs_phi = BitSet::new(len);
            let mut worklist: Vec<usize> = defining.into_iter().collect();
            while let Some(node) = worklist.pop() {
                if !dominance.is_reachable(node) {
                    continue;
                }
                for w in dominance.frontier(node).iter() {
                    if needs_phi.insert(w) && !defines.contains(w) {
                        worklist.push(w);
                    }
                }
            }

            for w in needs_phi.iter() {
                // The start label has no slot for the value on entry to the method
                if Some(w) == dominance.start() && stream[w].is_label() {
                    return Err(malformed_cfg!(
                        "phi for {} required at the start label {}, which is also a branch target",
                        var,
                        w
                    ));
                }
                if !stream[w].is_label() {
                    return Err(Error::PhiAtNonLabel {
                        index: w,
                        var,
                        block: cfg.block_of(w),
                    });
                }
                sites.entry(w).or_default().push(var);
            }

            if !needs_phi.is_empty() {
                trace!(%var, phis = needs_phi.count(), "placed phis");
            }
        }

        Ok(PhiPlacement { sites })
    }

    /// Returns the variables needing a phi at label `index`, ascending.
    #[must_use]
    pub fn at(&self, index: usize) -> &[LogicalVar] {
        self.sites.get(&index).map_or(&[], Vec::as_slice)
    }

    /// Returns the labels that need a phi for `var`, ascending.
    #[must_use]
    pub fn sites_of(&self, var: LogicalVar) -> Vec<usize> {
        let var = var.base();
        self.sites
            .iter()
            .filter(|(_, vars)| vars.contains(&var))
            .map(|(&index, _)| index)
            .collect()
    }

    /// Returns the total number of phis to insert.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sites.values().map(Vec::len).sum()
    }

    /// Returns `true` if no phi is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Instruction, Opcode, Var},
        test::{diamond, nested_loops, straight_line},
    };

    fn place(stream: &InstructionStream) -> Result<PhiPlacement> {
        let cfg = Cfg::build(stream)?;
        let defuse = DefUse::compute(stream);
        let dominance = Dominance::compute(&cfg, 0)?;
        PhiPlacement::compute(stream, &cfg, &defuse, &dominance)
    }

    #[test]
    fn test_diamond_single_phi() {
        let placement = place(&diamond()).unwrap();

        assert_eq!(placement.count(), 1);
        assert_eq!(placement.at(10), &[LogicalVar::new(0)]);
        assert_eq!(placement.sites_of(LogicalVar::new(0).with_ssa(3)), vec![10]);
        assert!(placement.sites_of(LogicalVar::new(1)).is_empty());
    }

    #[test]
    fn test_straight_line_needs_no_phi() {
        assert!(place(&straight_line()).unwrap().is_empty());
    }

    #[test]
    fn test_loop_headers_receive_phis() {
        let stream = nested_loops();
        let placement = place(&stream).unwrap();

        assert!(!placement.is_empty());
        for index in placement.sites.keys() {
            assert!(stream[*index].is_label());
        }
    }

    #[test]
    fn test_loop_back_to_start_label_is_rejected() {
        // label 0: x = x + 1; brif x, L0; ret x
        let x = Var::logical(0);
        let stream = InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::binary(Opcode::Add, x.clone(), x.clone(), Var::constant(1)),
            Instruction::br_if(x.clone(), 0),
            Instruction::ret(x),
        ]);

        match place(&stream) {
            Err(Error::MalformedCfg { message, .. }) => {
                assert!(message.contains("start label 0"), "{message}");
            }
            other => panic!("expected MalformedCfg, got {other:?}"),
        }
    }

    #[test]
    fn test_loop_back_to_start_without_definitions() {
        // label 0: brif c, L0; ret c
        let c = Var::logical(0);
        let stream = InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::br_if(c.clone(), 0),
            Instruction::ret(c),
        ]);
        assert!(place(&stream).unwrap().is_empty());
    }

    #[test]
    fn test_phi_at_non_label_is_rejected() {
        let stream = diamond();
        let cfg = Cfg::build(&stream).unwrap();
        let defuse = DefUse::compute(&stream);
        let mut dominance = Dominance::compute(&cfg, 0).unwrap();
        // x is defined at 5; pretend its frontier reaches the assignment at 11
        dominance.force_frontier(5, 11);

        match PhiPlacement::compute(&stream, &cfg, &defuse, &dominance) {
            Err(Error::PhiAtNonLabel { index, var, block }) => {
                assert_eq!(index, 11);
                assert_eq!(var, LogicalVar::new(0));
                assert_eq!(block, Some(4));
            }
            other => panic!("expected PhiAtNonLabel, got {other:?}"),
        }
    }
}
