use crate::compilation::Compilation;
use crate::il::opcode::Opcode;
use crate::il::symref::SymRefId;
use crate::il::treetop::TreeTopId;

/// Index of a node in the compilation's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A virtual global register number.
///
/// The engine runs after global register assignment, so values crossing
/// block boundaries live in named registers; fresh ones are handed out by
/// the compilation when splits un-common values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalReg(pub u16);

/// One IL node.
///
/// The reference count equals the number of distinct tree positions
/// (treetop roots and child slots) referencing this node. Commoning shares
/// one node across several positions instead of duplicating the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Opcode,
    pub(crate) children: Vec<NodeId>,
    pub symref: Option<SymRefId>,
    pub reg: Option<GlobalReg>,
    /// Constant payload (`IConst`/`LConst`/`AConst`), or the element stride
    /// for `ArrayLength`.
    pub value: i64,
    /// Byte-code index of the operation this node descends from.
    pub bci: u32,
    /// Stable ordinal, preserved across `recreate` so trace output and
    /// debug counters keep naming the same site.
    pub global_index: u32,
    pub(crate) ref_count: u32,
    /// Branch destination: the entry treetop of the target block.
    pub branch_target: Option<TreeTopId>,
    /// Value statically known not to be null.
    pub is_non_null: bool,
    /// Set on a check node once a value-type guard has been emitted for it,
    /// so the classifier never offers the same site twice.
    pub guarded: bool,
    /// Block owned by a `BBStart`/`BBEnd` marker.
    pub block: Option<super::block::BlockId>,
}

impl Node {
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, i: usize) -> NodeId {
        self.children[i]
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

impl Compilation {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    fn alloc_node(&mut self, op: Opcode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let global_index = self.next_global_index;
        self.next_global_index += 1;
        self.nodes.push(Node {
            op,
            children: Vec::new(),
            symref: None,
            reg: None,
            value: 0,
            bci: 0,
            global_index,
            ref_count: 0,
            branch_target: None,
            is_non_null: false,
            guarded: false,
            block: None,
        });
        id
    }

    /// Creates a node with the given children, incrementing each child's
    /// reference count for its new position.
    pub fn create(&mut self, op: Opcode, children: &[NodeId]) -> NodeId {
        let id = self.alloc_node(op);
        for &c in children {
            self.push_child(id, c);
        }
        id
    }

    pub fn create_with_symref(&mut self, op: Opcode, children: &[NodeId], symref: SymRefId) -> NodeId {
        let id = self.create(op, children);
        self.node_mut(id).symref = Some(symref);
        id
    }

    /// Creates a conditional branch node. The destination may be filled in
    /// later with [`Compilation::set_branch_destination`].
    pub fn create_if(
        &mut self,
        op: Opcode,
        lhs: NodeId,
        rhs: NodeId,
        target: Option<TreeTopId>,
    ) -> NodeId {
        debug_assert!(op.is_branch());
        let id = self.create(op, &[lhs, rhs]);
        self.node_mut(id).branch_target = target;
        id
    }

    pub fn set_branch_destination(&mut self, branch: NodeId, entry: TreeTopId) {
        self.node_mut(branch).branch_target = Some(entry);
    }

    pub fn iconst(&mut self, v: i64) -> NodeId {
        let id = self.alloc_node(Opcode::IConst);
        self.node_mut(id).value = v;
        id
    }

    pub fn lconst(&mut self, v: i64) -> NodeId {
        let id = self.alloc_node(Opcode::LConst);
        self.node_mut(id).value = v;
        id
    }

    pub fn aconst(&mut self, v: i64) -> NodeId {
        let id = self.alloc_node(Opcode::AConst);
        self.node_mut(id).value = v;
        if v != 0 {
            self.node_mut(id).is_non_null = true;
        }
        id
    }

    pub fn copy_byte_code_info(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(to).bci = self.node(from).bci;
    }

    // ---- child and reference-count management ----

    pub fn inc_ref(&mut self, id: NodeId) {
        self.node_mut(id).ref_count += 1;
    }

    /// Decrements the count for one released position. Reaching zero means
    /// the node is dead; its own children are released recursively.
    pub fn dec_ref(&mut self, id: NodeId) -> u32 {
        let n = self.node_mut(id);
        debug_assert!(n.ref_count > 0, "reference count underflow");
        n.ref_count -= 1;
        let rc = n.ref_count;
        if rc == 0 {
            let children = std::mem::take(&mut self.node_mut(id).children);
            for c in children {
                self.dec_ref(c);
            }
        }
        rc
    }

    /// Appends a child, incrementing its reference count.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.inc_ref(child);
        self.node_mut(parent).children.push(child);
    }

    /// Replaces the child at `i`, adjusting both counts.
    pub fn set_child(&mut self, parent: NodeId, i: usize, child: NodeId) {
        let old = self.node(parent).children[i];
        self.inc_ref(child);
        self.node_mut(parent).children[i] = child;
        self.dec_ref(old);
    }

    pub fn remove_child(&mut self, parent: NodeId, i: usize) {
        let old = self.node_mut(parent).children.remove(i);
        self.dec_ref(old);
    }

    /// Detaches all children, releasing one reference each.
    pub fn detach_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.node_mut(parent).children);
        for c in children {
            self.dec_ref(c);
        }
    }

    /// Rewrites a node in place: new opcode, children and symbol reference,
    /// same `NodeId` and global ordinal. Every position commoning this node
    /// observes the new, equivalent operation; the old argument edges are
    /// released.
    pub fn recreate(
        &mut self,
        id: NodeId,
        op: Opcode,
        children: &[NodeId],
        symref: Option<SymRefId>,
    ) {
        // Attach new children before releasing the old ones so a child kept
        // across the rewrite never transiently hits a zero count.
        let old = std::mem::take(&mut self.node_mut(id).children);
        for &c in children {
            self.push_child(id, c);
        }
        for c in old {
            self.dec_ref(c);
        }
        let n = self.node_mut(id);
        n.op = op;
        n.symref = symref;
        n.branch_target = None;
    }

    /// Fresh virtual global register.
    pub fn new_global_reg(&mut self) -> GlobalReg {
        let r = GlobalReg(self.next_reg);
        self.next_reg += 1;
        r
    }

    /// Builds the address tree for element `index` of `array`:
    /// `aladd(array, ladd(lshl(i2l(index), shift), header))`, with the
    /// stride (and so the shift) chosen by the reference-compression mode.
    pub fn calculate_element_address(&mut self, array: NodeId, index: NodeId) -> NodeId {
        let shift = if self.uses_compressed_refs { 2 } else { 3 };
        let widened = self.create(Opcode::I2L, &[index]);
        let shift_amount = self.iconst(shift);
        let scaled = self.create(Opcode::LShl, &[widened, shift_amount]);
        let header = self.lconst(super::ARRAY_HEADER_SIZE);
        let offset = self.create(Opcode::LAdd, &[scaled, header]);
        self.create(Opcode::ALAdd, &[array, offset])
    }

    /// Element stride in bytes for a reference array.
    pub fn element_stride(&self) -> i64 {
        if self.uses_compressed_refs { 4 } else { 8 }
    }

    /// True if evaluating this node yields an address.
    pub fn produces_address(&self, id: NodeId) -> bool {
        let n = self.node(id);
        if n.op == Opcode::Call {
            return n
                .symref
                .and_then(|sr| self.symrefs.known_symbol(sr))
                .is_some_and(|k| k.returns_address());
        }
        if n.op == Opcode::PassThrough {
            return self.produces_address(n.children[0]);
        }
        n.op.is_address_producer()
    }
}
