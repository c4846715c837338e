//! Dominance, immediate dominators and dominance frontiers over the instruction-level CFG.
//!
//! # Theory
//!
//! An instruction `m` **dominates** an instruction `n` if every path from the start
//! instruction to `n` passes through `m`. The **immediate dominator** of `n` is the strict
//! dominator of `n` closest to it; making each instruction a child of its immediate dominator
//! yields the dominator tree. The **dominance frontier** of `n` is the set of instructions
//! where the region dominated by `n` ends: `w` is in `DF(n)` if `n` dominates a predecessor
//! of `w` but does not strictly dominate `w`.
//!
//! # Algorithm
//!
//! Dominator sets are solved with the classic iterative dataflow formulation
//! `Dom(n) = {n} ∪ ⋂ Dom(p)` over dense bit rows, which is simple and fast for method-sized
//! graphs. Dominator sets along a path from the start form a chain, so the immediate
//! dominator of `n` is the strict dominator whose own set is exactly one element smaller.
//! Frontiers are collected bottom-up over the dominator tree (Cytron et al.).
//!
//! Instructions that cannot be reached from the start have no immediate dominator, are
//! dominated only by themselves and have an empty frontier.

use tracing::debug;

use crate::{
    analysis::Cfg,
    utils::{BitMatrix, BitSet},
    Result,
};

/// Dominance facts for one instruction stream.
///
/// # Examples
///
/// ```rust
/// use tacscope::{analysis::{Cfg, Dominance}, ir::{Instruction, InstructionStream, Var}};
///
/// let stream = InstructionStream::new(vec![
///     Instruction::label(0),
///     Instruction::br_if(Var::logical(0), 1),
///     Instruction::nop(),
///     Instruction::label(1),
///     Instruction::ret(Var::Null),
/// ]);
/// let cfg = Cfg::build(&stream)?;
/// let dom = Dominance::compute(&cfg, 0)?;
///
/// assert!(dom.dominates(1, 4));
/// assert_eq!(dom.immediate_dominator(3), Some(1));
/// assert!(dom.frontier(2).contains(3));
/// # Ok::<(), tacscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dominance {
    start: usize,
    /// Row `n` holds `Dom(n)`.
    dominators: BitMatrix,
    idom: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    frontier: BitMatrix,
    reachable: BitSet,
    sweeps: usize,
}

impl Dominance {
    /// Computes dominance for every instruction of `cfg`, rooted at `start`.
    ///
    /// An empty graph yields empty facts regardless of `start`.
    ///
    /// # Arguments
    ///
    /// * `cfg` - The instruction-level control flow graph
    /// * `start` - Index of the distinguished start instruction
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedCfg`] if `start` is out of range, or if a reachable
    /// instruction ends up without an immediate dominator.
    pub fn compute(cfg: &Cfg, start: usize) -> Result<Self> {
        let len = cfg.len();
        if len > 0 && start >= len {
            return Err(malformed_cfg!(
                "start instruction {} outside of stream of length {}",
                start,
                len
            ));
        }

        let reachable = Self::reachable_from(cfg, start);
        let mut dominators = BitMatrix::new(len, len);
        for n in 0..len {
            if n != start && reachable.contains(n) {
                dominators.row_mut(n).fill();
            } else {
                dominators.insert(n, n);
            }
        }

        let mut sweeps = 0;
        if len > 0 {
            loop {
                sweeps += 1;
                let mut changed = false;

                for n in 0..len {
                    if n == start || !reachable.contains(n) {
                        continue;
                    }

                    let mut next = BitSet::full(len);
                    for &pred in cfg.predecessors(n) {
                        if reachable.contains(pred) {
                            next.intersect_with(dominators.row(pred));
                        }
                    }
                    next.insert(n);
                    changed |= dominators.set_row(n, next);
                }

                if !changed {
                    break;
                }
            }
        }

        let mut idom = vec![None; len];
        let mut children = vec![Vec::new(); len];
        for n in 0..len {
            if n == start || !reachable.contains(n) {
                continue;
            }

            let row = dominators.row(n);
            let closest = row.count() - 1;
            let parent = row
                .iter()
                .find(|&d| d != n && dominators.row(d).count() == closest)
                .ok_or_else(|| malformed_cfg!("instruction {} has no immediate dominator", n))?;

            idom[n] = Some(parent);
            children[parent].push(n);
        }

        let mut dominance = Dominance {
            start,
            dominators,
            idom,
            children,
            frontier: BitMatrix::new(len, len),
            reachable,
            sweeps,
        };
        dominance.compute_frontiers(cfg);

        debug!(
            instructions = len,
            reachable = dominance.reachable.count(),
            sweeps,
            "computed dominance"
        );

        Ok(dominance)
    }

    fn reachable_from(cfg: &Cfg, start: usize) -> BitSet {
        let mut reachable = BitSet::new(cfg.len());
        if cfg.is_empty() {
            return reachable;
        }

        let mut stack = vec![start];
        reachable.insert(start);
        while let Some(node) = stack.pop() {
            for &succ in cfg.successors(node) {
                if reachable.insert(succ) {
                    stack.push(succ);
                }
            }
        }
        reachable
    }

    /// Fills `DF(n)` for every reachable `n` with a post-order walk of the dominator tree, so
    /// each child's frontier is final before its parent absorbs it.
    fn compute_frontiers(&mut self, cfg: &Cfg) {
        if cfg.is_empty() {
            return;
        }

        let len = cfg.len();
        let mut stack = vec![(self.start, false)];
        while let Some((node, expanded)) = stack.pop() {
            if !expanded {
                stack.push((node, true));
                for &child in self.children[node].iter().rev() {
                    stack.push((child, false));
                }
                continue;
            }

            let mut df = BitSet::new(len);
            for &succ in cfg.successors(node) {
                if self.idom[succ] != Some(node) {
                    df.insert(succ);
                }
            }
            for &child in &self.children[node] {
                for w in self.frontier.row(child).iter() {
                    if !self.strictly_dominates(node, w) {
                        df.insert(w);
                    }
                }
            }
            self.frontier.set_row(node, df);
        }
    }

    /// Returns the start instruction, or `None` for an empty stream.
    #[must_use]
    pub fn start(&self) -> Option<usize> {
        (self.len() > 0).then_some(self.start)
    }

    /// Returns the number of instructions covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.idom.len()
    }

    /// Returns `true` if no instruction is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idom.is_empty()
    }

    /// Returns `true` if `m` dominates `n`. Every instruction dominates itself.
    #[must_use]
    pub fn dominates(&self, m: usize, n: usize) -> bool {
        self.dominators.contains(n, m)
    }

    /// Returns `true` if `m` dominates `n` and `m != n`.
    #[must_use]
    pub fn strictly_dominates(&self, m: usize, n: usize) -> bool {
        m != n && self.dominates(m, n)
    }

    /// Returns `Dom(n)`, the set of instructions dominating `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is out of range.
    #[must_use]
    pub fn dominators_of(&self, n: usize) -> &BitSet {
        self.dominators.row(n)
    }

    /// Returns the immediate dominator of `n`; `None` for the start instruction and for
    /// unreachable instructions.
    #[must_use]
    pub fn immediate_dominator(&self, n: usize) -> Option<usize> {
        self.idom.get(n).copied().flatten()
    }

    /// Returns the dominator tree children of `n`, ascending.
    #[must_use]
    pub fn children(&self, n: usize) -> &[usize] {
        self.children.get(n).map_or(&[], Vec::as_slice)
    }

    /// Returns the dominance frontier `DF(n)`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is out of range.
    #[must_use]
    pub fn frontier(&self, n: usize) -> &BitSet {
        self.frontier.row(n)
    }

    /// Returns `true` if `n` is reachable from the start instruction.
    #[must_use]
    pub fn is_reachable(&self, n: usize) -> bool {
        self.reachable.contains(n)
    }

    /// Returns the number of full sweeps the dominator fixed point took.
    #[must_use]
    pub const fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Returns the reachable instructions in dominator tree pre-order.
    #[must_use]
    pub fn preorder(&self) -> Vec<usize> {
        let Some(start) = self.start() else {
            return Vec::new();
        };

        let mut order = Vec::with_capacity(self.reachable.count());
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children[node].iter().rev());
        }
        order
    }

    /// Adds `w` to `DF(n)`. Only used to exercise placement on frontiers no real graph
    /// produces.
    #[cfg(test)]
    pub(crate) fn force_frontier(&mut self, n: usize, w: usize) {
        self.frontier.insert(n, w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{Instruction, InstructionStream, Var},
        test::{diamond, nested_loops, straight_line},
    };

    fn dominance_of(stream: &InstructionStream) -> (Cfg, Dominance) {
        let cfg = Cfg::build(stream).unwrap();
        let dom = Dominance::compute(&cfg, 0).unwrap();
        (cfg, dom)
    }

    #[test]
    fn test_dominator_diamond() {
        let (_, dom) = dominance_of(&diamond());

        // The branch dominates both arms and the join
        assert!(dom.dominates(2, 4));
        assert!(dom.dominates(2, 7));
        assert!(dom.dominates(2, 10));
        // Neither arm dominates the join
        assert!(!dom.dominates(4, 10));
        assert!(!dom.dominates(7, 10));

        assert_eq!(dom.immediate_dominator(0), None);
        assert_eq!(dom.immediate_dominator(10), Some(2));
        assert_eq!(dom.immediate_dominator(4), Some(2));
        assert_eq!(dom.immediate_dominator(7), Some(3));
        assert_eq!(dom.children(2), &[3, 4, 10]);
    }

    #[test]
    fn test_frontier_diamond() {
        let (_, dom) = dominance_of(&diamond());

        for arm in [4, 5, 6, 7, 8, 9] {
            assert_eq!(dom.frontier(arm).iter().collect::<Vec<_>>(), vec![10]);
        }
        assert!(dom.frontier(2).is_empty());
        assert!(dom.frontier(10).is_empty());
    }

    #[test]
    fn test_straight_line_has_empty_frontiers() {
        let (cfg, dom) = dominance_of(&straight_line());
        for n in 0..cfg.len() {
            assert!(dom.frontier(n).is_empty());
            if n > 0 {
                assert_eq!(dom.immediate_dominator(n), Some(n - 1));
            }
        }
    }

    #[test]
    fn test_loop_header_in_own_frontier() {
        // label 0; label 1; x = x + 1; brif x, L1; ret
        let x = Var::logical(0);
        let stream = InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::label(1),
            Instruction::binary(
                crate::ir::Opcode::Add,
                x.clone(),
                x.clone(),
                Var::constant(1),
            ),
            Instruction::br_if(x.clone(), 1),
            Instruction::ret(x),
        ]);
        let (_, dom) = dominance_of(&stream);

        assert!(dom.frontier(3).contains(1));
        assert!(dom.frontier(1).contains(1));
        assert!(!dom.frontier(0).contains(1));
    }

    #[test]
    fn test_dominance_properties() {
        let (cfg, dom) = dominance_of(&nested_loops());
        let n = cfg.len();

        for a in 0..n {
            assert!(dom.dominates(a, a));
            for b in 0..n {
                for c in 0..n {
                    if dom.dominates(a, b) && dom.dominates(b, c) {
                        assert!(dom.dominates(a, c), "{a} dom {b} dom {c}");
                    }
                }
            }
        }

        for node in 0..n {
            if let Some(parent) = dom.immediate_dominator(node) {
                assert!(dom.strictly_dominates(parent, node));
                for other in dom.dominators_of(node).iter() {
                    if other != node && other != parent {
                        assert!(!dom.strictly_dominates(parent, other));
                    }
                }
            }
            for w in dom.frontier(node).iter() {
                assert!(!dom.strictly_dominates(node, w));
            }
        }
    }

    #[test]
    fn test_unreachable_instructions() {
        let stream = InstructionStream::new(vec![
            Instruction::label(0),
            Instruction::ret(Var::Null),
            Instruction::assign(Var::logical(0), Var::constant(1)),
            Instruction::label(1),
            Instruction::ret(Var::Null),
        ]);
        let (_, dom) = dominance_of(&stream);

        assert!(!dom.is_reachable(2));
        assert_eq!(dom.immediate_dominator(2), None);
        assert!(dom.dominates(2, 2));
        assert!(!dom.dominates(0, 2));
        // The unreachable label is only entered from unreachable code
        assert_eq!(dom.immediate_dominator(3), None);
        assert_eq!(dom.preorder(), vec![0, 1]);
    }

    #[test]
    fn test_preorder_visits_parents_first() {
        let (_, dom) = dominance_of(&diamond());
        let order = dom.preorder();

        assert_eq!(order.len(), 13);
        for (pos, &node) in order.iter().enumerate() {
            if let Some(parent) = dom.immediate_dominator(node) {
                assert!(order[..pos].contains(&parent));
            }
        }
    }

    #[test]
    fn test_start_out_of_range() {
        let cfg = Cfg::build(&straight_line()).unwrap();
        assert!(Dominance::compute(&cfg, 100).is_err());
    }

    #[test]
    fn test_empty() {
        let cfg = Cfg::build(&InstructionStream::default()).unwrap();
        let dom = Dominance::compute(&cfg, 0).unwrap();
        assert!(dom.is_empty());
        assert_eq!(dom.start(), None);
        assert!(dom.preorder().is_empty());
    }
}
