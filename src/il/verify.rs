use std::collections::{HashMap, HashSet};

use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::block::BlockId;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;

impl Compilation {
    /// Structural audit of the method body.
    ///
    /// Checks that every node's reference count equals the number of tree
    /// positions referencing it, that check nodes are anchored as treetop
    /// roots, that block markers agree with the block arena, and that every
    /// branch lands on a `BBStart`. Run from tests and by the lowering
    /// driver in debug builds.
    pub fn verify(&self) -> Result<(), LowerError> {
        // A position is a treetop root slot or a (parent, child-slot) pair.
        // A commoned parent's slots count once no matter how many trees
        // reach it.
        let mut positions: HashMap<NodeId, u32> = HashMap::new();
        let mut root_positions: HashMap<NodeId, u32> = HashMap::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut tt = self.first_treetop();
        while let Some(cur) = tt {
            let root = self.tt_node(cur);
            *positions.entry(root).or_insert(0) += 1;
            *root_positions.entry(root).or_insert(0) += 1;
            self.count_slots(root, &mut positions, &mut seen);
            tt = self.next_tt(cur);
        }

        for (&n, &count) in &positions {
            let rc = self.node(n).ref_count();
            if rc != count {
                return Err(LowerError::inconsistency_at(
                    format!(
                        "node n{}n has {count} tree positions but reference count {rc}",
                        self.node(n).global_index
                    ),
                    n.0,
                ));
            }
        }

        // A check anchors a trap point in the statement list; one showing up
        // below another root has lost its ordering guarantee.
        for (&n, &count) in &positions {
            let node = self.node(n);
            if node.op.is_check() && root_positions.get(&n).copied().unwrap_or(0) != count {
                return Err(LowerError::inconsistency_at(
                    format!("check node n{}n appears below a root", node.global_index),
                    n.0,
                ));
            }
        }

        for b in 0..self.num_blocks() {
            let id = BlockId(b as u32);
            let block = self.block(id);
            let entry = self.node(self.tt_node(block.entry));
            let exit = self.node(self.tt_node(block.exit));
            if entry.op != Opcode::BBStart || exit.op != Opcode::BBEnd {
                return Err(LowerError::inconsistency(format!(
                    "block_{} has malformed boundary markers",
                    block.number
                )));
            }
            if entry.block != Some(id) || exit.block != Some(id) {
                return Err(LowerError::inconsistency(format!(
                    "block_{} markers point at the wrong block",
                    block.number
                )));
            }
        }

        for &n in positions.keys() {
            if let Some(target) = self.node(n).branch_target {
                if self.node(self.tt_node(target)).op != Opcode::BBStart {
                    return Err(LowerError::inconsistency_at(
                        "branch destination is not a block entry".to_string(),
                        n.0,
                    ));
                }
            }
        }

        Ok(())
    }

    fn count_slots(
        &self,
        node: NodeId,
        positions: &mut HashMap<NodeId, u32>,
        seen: &mut HashSet<NodeId>,
    ) {
        if !seen.insert(node) {
            return;
        }
        for &c in self.node(node).children() {
            *positions.entry(c).or_insert(0) += 1;
            self.count_slots(c, positions, seen);
        }
    }
}
