use crate::compilation::Compilation;
use crate::diagnostics::LowerError;
use crate::il::block::BlockId;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;

/// Index of a treetop in the compilation's treetop arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeTopId(pub u32);

/// A position in the sequential statement list of a method body.
///
/// Treetops form a doubly linked list; each owns exactly one root node,
/// possibly an entire expression tree. Arena indices stay stable across
/// splices, so a held `TreeTopId` survives block splits and relocation.
#[derive(Debug, Clone)]
pub struct TreeTop {
    pub node: NodeId,
    pub prev: Option<TreeTopId>,
    pub next: Option<TreeTopId>,
}

impl Compilation {
    pub fn tt(&self, id: TreeTopId) -> &TreeTop {
        &self.treetops[id.0 as usize]
    }

    fn tt_mut(&mut self, id: TreeTopId) -> &mut TreeTop {
        &mut self.treetops[id.0 as usize]
    }

    pub fn tt_node(&self, id: TreeTopId) -> NodeId {
        self.tt(id).node
    }

    pub fn next_tt(&self, id: TreeTopId) -> Option<TreeTopId> {
        self.tt(id).next
    }

    pub fn prev_tt(&self, id: TreeTopId) -> Option<TreeTopId> {
        self.tt(id).prev
    }

    pub fn first_treetop(&self) -> Option<TreeTopId> {
        self.first_tt
    }

    pub fn last_treetop(&self) -> Option<TreeTopId> {
        let mut cur = self.first_tt?;
        while let Some(next) = self.tt(cur).next {
            cur = next;
        }
        Some(cur)
    }

    /// Creates an unlinked treetop anchoring `node` (the root position
    /// counts as a reference).
    pub fn new_treetop(&mut self, node: NodeId) -> TreeTopId {
        self.inc_ref(node);
        let id = TreeTopId(self.treetops.len() as u32);
        self.treetops.push(TreeTop { node, prev: None, next: None });
        id
    }

    /// Creates a treetop for `node` and inserts it right after `at`.
    pub fn create_treetop_after(&mut self, at: TreeTopId, node: NodeId) -> TreeTopId {
        let tt = self.new_treetop(node);
        self.insert_after(at, tt);
        tt
    }

    /// Creates a treetop for `node` and inserts it right before `at`.
    pub fn create_treetop_before(&mut self, at: TreeTopId, node: NodeId) -> TreeTopId {
        let tt = self.new_treetop(node);
        self.insert_before(at, tt);
        tt
    }

    pub fn insert_after(&mut self, at: TreeTopId, tt: TreeTopId) {
        let after = self.tt(at).next;
        self.tt_mut(at).next = Some(tt);
        self.tt_mut(tt).prev = Some(at);
        self.tt_mut(tt).next = after;
        if let Some(a) = after {
            self.tt_mut(a).prev = Some(tt);
        }
    }

    pub fn insert_before(&mut self, at: TreeTopId, tt: TreeTopId) {
        match self.tt(at).prev {
            Some(before) => self.insert_after(before, tt),
            None => {
                self.tt_mut(tt).next = Some(at);
                self.tt_mut(tt).prev = None;
                self.tt_mut(at).prev = Some(tt);
                self.first_tt = Some(tt);
            }
        }
    }

    /// Splices a treetop out of the list without releasing its tree.
    pub fn unlink(&mut self, tt: TreeTopId) {
        let prev = self.tt(tt).prev;
        let next = self.tt(tt).next;
        if let Some(p) = prev {
            self.tt_mut(p).next = next;
        } else if self.first_tt == Some(tt) {
            self.first_tt = next;
        }
        if let Some(n) = next {
            self.tt_mut(n).prev = prev;
        }
        self.tt_mut(tt).prev = None;
        self.tt_mut(tt).next = None;
    }

    /// Makes `b` directly follow `a`, discarding whatever followed `a` or
    /// preceded `b`.
    pub fn join(&mut self, a: TreeTopId, b: TreeTopId) {
        self.tt_mut(a).next = Some(b);
        self.tt_mut(b).prev = Some(a);
    }

    /// Walks backwards to the `BBStart` marker owning this treetop. A list
    /// with no marker upstream is a malformed body, not a recoverable state.
    pub fn enclosing_block(&self, tt: TreeTopId) -> Result<BlockId, LowerError> {
        let mut cur = tt;
        loop {
            let node = self.node(self.tt(cur).node);
            if node.op == Opcode::BBStart {
                return node
                    .block
                    .ok_or_else(|| LowerError::inconsistency("BBStart marker without a block"));
            }
            match self.tt(cur).prev {
                Some(prev) => cur = prev,
                None => {
                    return Err(LowerError::inconsistency("treetop list reaches no BBStart"));
                }
            }
        }
    }
}
