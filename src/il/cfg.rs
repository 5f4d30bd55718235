use crate::compilation::Compilation;
use crate::il::block::BlockId;

/// The control-flow graph: normal and exception edges between blocks.
///
/// Edge lists may hold duplicates; a block reaching the same target through
/// two distinct exits contributes two edges, and splits must preserve that
/// total multiplicity.
#[derive(Debug, Default)]
pub struct Cfg {
    pub(crate) succs: Vec<Vec<BlockId>>,
    pub(crate) preds: Vec<Vec<BlockId>>,
    pub(crate) exc_succs: Vec<Vec<BlockId>>,
    pub(crate) exc_preds: Vec<Vec<BlockId>>,
    structure_valid: bool,
}

impl Cfg {
    pub fn new() -> Self {
        Self {
            succs: Vec::new(),
            preds: Vec::new(),
            exc_succs: Vec::new(),
            exc_preds: Vec::new(),
            structure_valid: true,
        }
    }

    pub(crate) fn add_block(&mut self) {
        self.succs.push(Vec::new());
        self.preds.push(Vec::new());
        self.exc_succs.push(Vec::new());
        self.exc_preds.push(Vec::new());
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.succs[from.0 as usize].push(to);
        self.preds[to.0 as usize].push(from);
    }

    /// Removes one edge occurrence; a parallel edge stays.
    pub fn remove_edge(&mut self, from: BlockId, to: BlockId) {
        if let Some(pos) = self.succs[from.0 as usize].iter().position(|s| *s == to) {
            self.succs[from.0 as usize].remove(pos);
        }
        if let Some(pos) = self.preds[to.0 as usize].iter().position(|p| *p == from) {
            self.preds[to.0 as usize].remove(pos);
        }
    }

    pub fn add_exception_edge(&mut self, from: BlockId, to: BlockId) {
        self.exc_succs[from.0 as usize].push(to);
        self.exc_preds[to.0 as usize].push(from);
    }

    pub fn succs(&self, b: BlockId) -> &[BlockId] {
        &self.succs[b.0 as usize]
    }

    pub fn preds(&self, b: BlockId) -> &[BlockId] {
        &self.preds[b.0 as usize]
    }

    /// Region/loop structure is a cache over the edge lists; any structural
    /// edit invalidates it and downstream passes must recompute.
    pub fn invalidate_structure(&mut self) {
        self.structure_valid = false;
    }

    pub fn structure_valid(&self) -> bool {
        self.structure_valid
    }
}

impl Compilation {
    /// Relocates a block's treetops to the end of the method body, splicing
    /// its old neighbours together. CFG edges are untouched: the block keeps
    /// its single incoming edge (the guard fallthrough kept from before the
    /// move) and its outgoing edge to the merge point.
    pub fn relocate_block_to_end(&mut self, block: BlockId) {
        let entry = self.block(block).entry;
        let exit = self.block(block).exit;
        let before = self.prev_tt(entry);
        let after = self.next_tt(exit);
        let last = self.last_treetop().expect("method body with no treetops");
        debug_assert_ne!(last, exit, "block is already at the end of the method");

        // Detach [entry..exit] and append it after the last treetop.
        match (before, after) {
            (Some(b), Some(a)) => self.join(b, a),
            (Some(b), None) => unreachable!("treetop after {b:?} must exist before the method end"),
            _ => unreachable!("relocated block cannot start the method"),
        }
        self.join(last, entry);
        let exit_tt = exit;
        let tt = &mut self.treetops[exit_tt.0 as usize];
        tt.next = None;
    }
}
