use std::collections::{HashMap, HashSet};

use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::node::{GlobalReg, NodeId};
use crate::il::opcode::Opcode;
use crate::il::treetop::TreeTopId;

/// Index of a block in the compilation's block arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// A maximal treetop run bounded by `BBStart`/`BBEnd` markers.
///
/// A block flagged as an extension of its physical predecessor has no
/// independent control-flow entry; it shares the predecessor's register
/// assignments, so values may stay commoned across the boundary.
#[derive(Debug, Clone)]
pub struct Block {
    pub number: u32,
    pub entry: TreeTopId,
    pub exit: TreeTopId,
    pub is_extension: bool,
}

/// How a register's value is provided at a split boundary.
enum LiveValue {
    /// Came into the extended region through its entry dependency list.
    EntryLoad(NodeId),
    /// Stored inside the region; the node is the stored value.
    Stored(NodeId),
}

impl Compilation {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0 as usize]
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Allocates a block with fresh, joined `BBStart`/`BBEnd` treetops. The
    /// block is not yet linked into the method body.
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let start = self.create(Opcode::BBStart, &[]);
        let end = self.create(Opcode::BBEnd, &[]);
        self.node_mut(start).block = Some(id);
        self.node_mut(end).block = Some(id);
        let entry = self.new_treetop(start);
        let exit = self.new_treetop(end);
        self.join(entry, exit);
        self.blocks.push(Block { number: id.0, entry, exit, is_extension: false });
        self.cfg.add_block();
        id
    }

    /// Appends a treetop for `node` just before the block's exit marker.
    pub fn append_to_block(&mut self, block: BlockId, node: NodeId) -> TreeTopId {
        let exit = self.block(block).exit;
        self.create_treetop_before(exit, node)
    }

    pub fn block_entry_deps(&self, block: BlockId) -> Option<NodeId> {
        let entry = self.node(self.tt_node(self.block(block).entry));
        entry.children().first().copied()
    }

    pub fn block_exit_deps(&self, block: BlockId) -> Option<NodeId> {
        let exit = self.node(self.tt_node(self.block(block).exit));
        exit.children().first().copied()
    }

    /// First block of the extended region `block` belongs to: walks back
    /// over extension-of-previous blocks to the block with a real entry.
    pub fn extended_region_head(&self, block: BlockId) -> Result<BlockId, LowerError> {
        let mut cur = block;
        while self.block(cur).is_extension {
            let entry = self.block(cur).entry;
            match self.prev_tt(entry) {
                Some(prev) => cur = self.enclosing_block(prev)?,
                None => break,
            }
        }
        Ok(cur)
    }

    /// Splits `block` at `at`: every treetop from `at` through the old exit
    /// moves into a new block that inherits the old exit marker (and any
    /// dependency list on it); `block` gets a fresh exit. The new block
    /// inherits the old block's successor edges and becomes its fallthrough,
    /// preserving total edge multiplicity.
    pub fn split(&mut self, block: BlockId, at: TreeTopId) -> BlockId {
        debug_assert_ne!(at, self.block(block).entry, "cannot split at a block entry");
        let old_exit = self.block(block).exit;
        let at_prev = self.prev_tt(at).expect("split point with no predecessor");

        let nb = BlockId(self.blocks.len() as u32);
        let end = self.create(Opcode::BBEnd, &[]);
        self.node_mut(end).block = Some(block);
        let new_exit = self.new_treetop(end);
        let start = self.create(Opcode::BBStart, &[]);
        self.node_mut(start).block = Some(nb);
        let new_entry = self.new_treetop(start);

        self.join(at_prev, new_exit);
        self.join(new_exit, new_entry);
        self.join(new_entry, at);

        self.block_mut(block).exit = new_exit;
        let old_exit_node = self.tt_node(old_exit);
        self.node_mut(old_exit_node).block = Some(nb);
        self.blocks.push(Block { number: nb.0, entry: new_entry, exit: old_exit, is_extension: false });
        self.cfg.add_block();

        // The treetops that could transfer control elsewhere moved into the
        // new block, so its normal successors are exactly the old block's.
        let succs = std::mem::take(&mut self.cfg.succs[block.0 as usize]);
        for s in &succs {
            let preds = &mut self.cfg.preds[s.0 as usize];
            if let Some(pos) = preds.iter().position(|p| *p == block) {
                preds[pos] = nb;
            }
        }
        self.cfg.succs[nb.0 as usize] = succs;
        // Checks may sit on either side of the split; keep every exception
        // target accounted for from both halves.
        let exc = self.cfg.exc_succs[block.0 as usize].clone();
        for e in exc {
            self.cfg.add_exception_edge(nb, e);
        }
        self.cfg.add_edge(block, nb);
        nb
    }

    /// Post-GRA split: [`Compilation::split`] plus un-commoning.
    ///
    /// Values evaluated in the extended region ending at `block` but still
    /// referenced after the split point are stored to global registers at
    /// the old block's new exit and re-entered through register loads. The
    /// new exit gets a `GlRegDeps` listing every live register (pass-through
    /// entries for values defined in the region, re-referenced register
    /// loads for values passing through); the new block's entry gets the
    /// matching register-load list. This is the allocator's merge contract:
    /// every predecessor of a block must supply a dependency list with the
    /// same arity and register identities its entry expects.
    pub fn split_post_gra(&mut self, block: BlockId, at: TreeTopId) -> Result<BlockId, LowerError> {
        let nb = self.split(block, at);

        let head = self.extended_region_head(block)?;

        // Registers live at the boundary, in discovery order.
        let mut live: Vec<(GlobalReg, LiveValue)> = Vec::new();
        if let Some(deps) = self.block_entry_deps(head) {
            let entries: Vec<NodeId> = self.node(deps).children().to_vec();
            for c in entries {
                let reg = self.node(c).reg.ok_or_else(|| {
                    LowerError::inconsistency_at("entry dependency without a register", c.0)
                })?;
                live.push((reg, LiveValue::EntryLoad(c)));
            }
        }

        // Everything evaluated in the region before the split point, plus
        // register stores that redefine a live register.
        let mut evaluated: HashSet<NodeId> = HashSet::new();
        let mut tt = self.next_tt(self.block(head).entry);
        let stop = self.block(block).exit;
        while let Some(cur) = tt {
            if cur == stop {
                break;
            }
            let root = self.tt_node(cur);
            let op = self.node(root).op;
            if op != Opcode::BBStart && op != Opcode::BBEnd {
                self.collect_tree(root, &mut evaluated);
                if op.is_reg_store() {
                    let reg = self.node(root).reg.ok_or_else(|| {
                        LowerError::inconsistency_at("register store without a register", root.0)
                    })?;
                    let value = self.node(root).child(0);
                    match live.iter_mut().find(|(r, _)| *r == reg) {
                        Some(slot) => slot.1 = LiveValue::Stored(value),
                        None => live.push((reg, LiveValue::Stored(value))),
                    }
                }
            }
            tt = self.next_tt(cur);
        }

        // Replace cross-boundary references in the new block with register
        // loads, storing each un-commoned value at the old exit.
        let mut replacements: HashMap<NodeId, NodeId> = HashMap::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut tt = Some(at);
        let last = self.block(nb).exit;
        while let Some(cur) = tt {
            let root = self.tt_node(cur);
            self.uncommon_tree(block, root, &evaluated, &mut replacements, &mut live, &mut visited);
            if cur == last {
                break;
            }
            tt = self.next_tt(cur);
        }

        if !live.is_empty() {
            let exit_deps = self.create(Opcode::GlRegDeps, &[]);
            let entry_deps = self.create(Opcode::GlRegDeps, &[]);
            let mut i = 0;
            while i < live.len() {
                let (reg, stored) = {
                    let (reg, ref kind) = live[i];
                    match *kind {
                        LiveValue::Stored(value) => {
                            let p = self.create(Opcode::PassThrough, &[value]);
                            self.node_mut(p).reg = Some(reg);
                            self.push_child(exit_deps, p);
                            (reg, Some(value))
                        }
                        LiveValue::EntryLoad(rl) => {
                            self.push_child(exit_deps, rl);
                            (reg, None)
                        }
                    }
                };
                let rl = match stored {
                    // Pass-through values re-enter through the commoned
                    // register load already listed at the region entry.
                    None => match live[i].1 {
                        LiveValue::EntryLoad(rl) => rl,
                        LiveValue::Stored(_) => unreachable!(),
                    },
                    // Values defined in the region enter the new block
                    // through the register load un-commoning produced, or a
                    // fresh one if nothing after the split uses the value.
                    Some(value) => match replacements.values().find(|&&r| self.node(r).reg == Some(reg)) {
                        Some(&rl) => rl,
                        None => self.reg_load_for(reg, Some(value)),
                    },
                };
                self.push_child(entry_deps, rl);
                i += 1;
            }
            let exit_node = self.tt_node(self.block(block).exit);
            self.push_child(exit_node, exit_deps);
            let entry_node = self.tt_node(self.block(nb).entry);
            self.push_child(entry_node, entry_deps);
        }

        Ok(nb)
    }

    fn collect_tree(&self, node: NodeId, out: &mut HashSet<NodeId>) {
        if !out.insert(node) {
            return;
        }
        for i in 0..self.node(node).num_children() {
            self.collect_tree(self.node(node).child(i), out);
        }
    }

    fn reg_load_for(&mut self, reg: GlobalReg, value: Option<NodeId>) -> NodeId {
        let op = match value {
            Some(v) if self.produces_address(v) => Opcode::ARegLoad,
            None => Opcode::ARegLoad,
            _ => Opcode::IRegLoad,
        };
        let rl = self.create(op, &[]);
        self.node_mut(rl).reg = Some(reg);
        rl
    }

    /// Walks one tree in the new block, replacing references to nodes
    /// evaluated before the split with register loads.
    fn uncommon_tree(
        &mut self,
        old_block: BlockId,
        node: NodeId,
        evaluated: &HashSet<NodeId>,
        replacements: &mut HashMap<NodeId, NodeId>,
        live: &mut Vec<(GlobalReg, LiveValue)>,
        visited: &mut HashSet<NodeId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for i in 0..self.node(node).num_children() {
            let child = self.node(node).child(i);
            if !evaluated.contains(&child) {
                self.uncommon_tree(old_block, child, evaluated, replacements, live, visited);
                continue;
            }
            if self.node(child).op.is_reg_load() {
                // Already anchored through a dependency list; safe to keep
                // referencing across the boundary.
                let reg = self.node(child).reg.expect("register load without a register");
                if !live.iter().any(|(r, _)| *r == reg) {
                    live.push((reg, LiveValue::EntryLoad(child)));
                }
                replacements.entry(child).or_insert(child);
                continue;
            }
            let rl = match replacements.get(&child) {
                Some(&rl) => rl,
                None => {
                    let reg = self.new_global_reg();
                    let store_op = if self.produces_address(child) {
                        Opcode::ARegStore
                    } else {
                        Opcode::IRegStore
                    };
                    let store = self.create(store_op, &[child]);
                    self.node_mut(store).reg = Some(reg);
                    let exit = self.block(old_block).exit;
                    self.create_treetop_before(exit, store);

                    let load_op = if store_op == Opcode::ARegStore {
                        Opcode::ARegLoad
                    } else {
                        Opcode::IRegLoad
                    };
                    let rl = self.create(load_op, &[]);
                    self.node_mut(rl).reg = Some(reg);
                    live.push((reg, LiveValue::Stored(child)));
                    replacements.insert(child, rl);
                    rl
                }
            };
            self.set_child(node, i, rl);
        }
    }
}
