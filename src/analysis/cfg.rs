//! Control flow graph construction over an instruction stream.
//!
//! Blocks are never materialized as separate objects. A block is the run of instructions from
//! a `label` up to (but excluding) the next `label`, and its identity is the [`BlockId`] the
//! label carries. The builder derives two views of the same control flow:
//!
//! - **Block level**: successor and predecessor sets per block, used for phi arity and
//!   operand ordering
//! - **Instruction level**: successor and predecessor lists per instruction index, used by
//!   dominance and liveness
//!
//! # Edges
//!
//! A branch adds an edge from the block it appears in to its target block. A label that is
//! entered by falling through from the previous instruction also receives an edge from the
//! previous block, so the block-level predecessors of a label always match the
//! instruction-level predecessors of that label.
//!
//! # Examples
//!
//! ```rust
//! use tacscope::{analysis::Cfg, ir::{Instruction, InstructionStream, Var}};
//!
//! let stream = InstructionStream::new(vec![
//!     Instruction::label(0),
//!     Instruction::br_if(Var::logical(0), 2),
//!     Instruction::label(1),
//!     Instruction::label(2),
//!     Instruction::ret(Var::Null),
//! ]);
//! let cfg = Cfg::build(&stream)?;
//!
//! assert_eq!(cfg.start_blocks(), &[0]);
//! assert_eq!(cfg.end_blocks(), &[2]);
//! assert_eq!(cfg.successors(1), &[2, 3]);
//! assert_eq!(cfg.block_of(4), Some(2));
//! # Ok::<(), tacscope::Error>(())
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
    ops::Range,
};

use tracing::debug;

use crate::{
    ir::{BlockId, InstructionStream},
    utils::escape_dot,
    Error, Result,
};

/// Block-level and instruction-level control flow of one instruction stream.
///
/// Block edge sets are ordered, and every block id that appears anywhere in the graph is a key
/// of both the successor and the predecessor map. Phi operands follow the iteration order of
/// [`Cfg::block_predecessors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    block_succs: BTreeMap<BlockId, BTreeSet<BlockId>>,
    block_preds: BTreeMap<BlockId, BTreeSet<BlockId>>,
    block_starts: BTreeMap<BlockId, usize>,
    start_blocks: Vec<BlockId>,
    end_blocks: Vec<BlockId>,
    block_of: Vec<Option<BlockId>>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl Cfg {
    /// Builds the control flow graph of `stream`.
    ///
    /// Instructions before the first label belong to no block. That is accepted for
    /// straight-line code, but a branch there has no source block and is rejected.
    ///
    /// # Arguments
    ///
    /// * `stream` - The instruction stream to partition
    ///
    /// # Errors
    ///
    /// - [`Error::UnlabeledBranchTarget`] if a branch targets a block no label declares
    /// - [`Error::MissingBlock`] if a branch appears before the first label
    /// - [`Error::MalformedCfg`] if the same block id is labeled twice
    pub fn build(stream: &InstructionStream) -> Result<Self> {
        let len = stream.len();
        let mut block_succs: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
        let mut block_starts = BTreeMap::new();
        let mut block_of = Vec::with_capacity(len);
        let mut branches = Vec::new();
        let mut current: Option<BlockId> = None;

        for (index, instr) in stream.iter().enumerate() {
            if let Some(block) = instr.label_block() {
                if let Some(first) = block_starts.insert(block, index) {
                    return Err(malformed_cfg!(
                        "block {} is labeled at both {} and {}",
                        block,
                        first,
                        index
                    ));
                }

                let falls_in = index
                    .checked_sub(1)
                    .and_then(|prev| stream.get(prev))
                    .is_some_and(|prev| prev.falls_through());
                if let (true, Some(prev_block)) = (falls_in, current) {
                    block_succs.entry(prev_block).or_default().insert(block);
                }

                block_succs.entry(block).or_default();
                current = Some(block);
            }

            if let Some(target) = instr.target() {
                let Some(source) = current else {
                    return Err(Error::MissingBlock { index });
                };
                block_succs.entry(source).or_default().insert(target);
                branches.push((index, target));
            }

            block_of.push(current);
        }

        if let Some(&(index, block)) = branches
            .iter()
            .find(|(_, target)| !block_starts.contains_key(target))
        {
            return Err(Error::UnlabeledBranchTarget { index, block });
        }

        let mut block_preds: BTreeMap<BlockId, BTreeSet<BlockId>> = block_succs
            .keys()
            .map(|&block| (block, BTreeSet::new()))
            .collect();
        for (&from, targets) in &block_succs {
            for &to in targets {
                block_preds.entry(to).or_default().insert(from);
            }
        }
        for &block in block_preds.keys() {
            block_succs.entry(block).or_default();
        }

        let start_blocks = block_preds
            .iter()
            .filter(|(_, preds)| preds.is_empty())
            .map(|(&block, _)| block)
            .collect();
        let end_blocks = block_succs
            .iter()
            .filter(|(_, succs)| succs.is_empty())
            .map(|(&block, _)| block)
            .collect();

        let mut successors = vec![Vec::new(); len];
        let mut predecessors = vec![Vec::new(); len];
        for (index, instr) in stream.iter().enumerate() {
            let succs: &mut Vec<usize> = &mut successors[index];
            if instr.falls_through() && index + 1 < len {
                succs.push(index + 1);
            }
            if let Some(target) = instr.target() {
                let start = block_starts
                    .get(&target)
                    .copied()
                    .ok_or(Error::UnlabeledBranchTarget {
                        index,
                        block: target,
                    })?;
                if !succs.contains(&start) {
                    succs.push(start);
                }
            }
            for &succ in succs.iter() {
                predecessors[succ].push(index);
            }
        }

        debug!(
            instructions = len,
            blocks = block_succs.len(),
            branches = branches.len(),
            "built control flow graph"
        );

        Ok(Cfg {
            block_succs,
            block_preds,
            block_starts,
            start_blocks,
            end_blocks,
            block_of,
            successors,
            predecessors,
        })
    }

    /// Returns the number of instructions in the underlying stream.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Returns `true` if the underlying stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Returns the instructions control can reach directly from `index`, in ascending order of
    /// discovery (fall-through first, then the branch target).
    #[must_use]
    pub fn successors(&self, index: usize) -> &[usize] {
        self.successors.get(index).map_or(&[], Vec::as_slice)
    }

    /// Returns the instructions that can transfer control directly to `index`, ascending.
    #[must_use]
    pub fn predecessors(&self, index: usize) -> &[usize] {
        self.predecessors.get(index).map_or(&[], Vec::as_slice)
    }

    /// Returns the block containing instruction `index`, or `None` for instructions that
    /// precede the first label.
    #[must_use]
    pub fn block_of(&self, index: usize) -> Option<BlockId> {
        self.block_of.get(index).copied().flatten()
    }

    /// Returns the index of the label that opens `block`.
    #[must_use]
    pub fn block_start(&self, block: BlockId) -> Option<usize> {
        self.block_starts.get(&block).copied()
    }

    /// Returns the instruction range covered by `block`, label included.
    #[must_use]
    pub fn block_range(&self, block: BlockId) -> Option<Range<usize>> {
        let start = self.block_start(block)?;
        let len = self.block_of[start..]
            .iter()
            .take_while(|b| **b == Some(block))
            .count();
        Some(start..start + len)
    }

    /// Returns the successor blocks of `block`.
    #[must_use]
    pub fn block_successors(&self, block: BlockId) -> Option<&BTreeSet<BlockId>> {
        self.block_succs.get(&block)
    }

    /// Returns the predecessor blocks of `block`, in the order phi operands use.
    #[must_use]
    pub fn block_predecessors(&self, block: BlockId) -> Option<&BTreeSet<BlockId>> {
        self.block_preds.get(&block)
    }

    /// Returns the block-level successor map.
    #[must_use]
    pub const fn successor_map(&self) -> &BTreeMap<BlockId, BTreeSet<BlockId>> {
        &self.block_succs
    }

    /// Returns the block-level predecessor map. Its keys are the keys of
    /// [`Cfg::successor_map`].
    #[must_use]
    pub const fn predecessor_map(&self) -> &BTreeMap<BlockId, BTreeSet<BlockId>> {
        &self.block_preds
    }

    /// Returns all block ids in ascending order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_succs.keys().copied()
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_succs.len()
    }

    /// Returns the blocks without predecessors, ascending.
    #[must_use]
    pub fn start_blocks(&self) -> &[BlockId] {
        &self.start_blocks
    }

    /// Returns the blocks without successors, ascending.
    #[must_use]
    pub fn end_blocks(&self) -> &[BlockId] {
        &self.end_blocks
    }

    /// Renders the block-level graph in Graphviz DOT format.
    ///
    /// Each node lists the instructions of its block. Start blocks are filled green and end
    /// blocks red, and edges follow [`Cfg::block_successors`].
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream this graph was built from, used for node labels
    /// * `title` - Optional graph title
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tacscope::{analysis::Cfg, ir::{Instruction, InstructionStream, Var}};
    ///
    /// let stream = InstructionStream::new(vec![
    ///     Instruction::label(0),
    ///     Instruction::br(1),
    ///     Instruction::label(1),
    ///     Instruction::ret(Var::Null),
    /// ]);
    /// let dot = Cfg::build(&stream)?.to_dot(&stream, Some("demo"));
    /// assert!(dot.contains("L0 -> L1;"));
    /// # Ok::<(), tacscope::Error>(())
    /// ```
    #[must_use]
    pub fn to_dot(&self, stream: &InstructionStream, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for block in self.blocks() {
            let is_start = self.start_blocks.contains(&block);
            let is_end = self.end_blocks.contains(&block);

            let mut label = format!("L{block}");
            if is_start {
                label.push_str(" (start)");
            }
            if is_end {
                label.push_str(" (end)");
            }
            label.push_str("\\l");

            for index in self.block_range(block).unwrap_or_default() {
                if let Some(instr) = stream.get(index) {
                    let _ = write!(label, "{index:4}: {}\\l", escape_dot(&instr.to_string()));
                }
            }

            let style = if is_start {
                ", style=filled, fillcolor=lightgreen"
            } else if is_end {
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };
            let _ = writeln!(dot, "    L{block} [label=\"{label}\"{style}];");
        }

        dot.push('\n');
        for (from, targets) in &self.block_succs {
            for to in targets {
                let _ = writeln!(dot, "    L{from} -> L{to};");
            }
        }
        dot.push_str("}\n");
        dot
    }
}
