use crate::compilation::Compilation;
use crate::il::block::BlockId;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;
use crate::il::symref::{KnownSymbol, SymRefId};
use crate::il::treetop::TreeTopId;

/// Assembles an initial method body the way the front end would hand it to
/// the optimizer: one entry block, helper operations expressed as calls to
/// the recognized non-helper symbols.
///
/// This is the narrow stand-in for IL generation, which is outside the
/// engine proper; tests and embedders use it to construct inputs.
pub struct MethodBuilder {
    comp: Compilation,
    current: BlockId,
    next_bci: u32,
}

impl MethodBuilder {
    pub fn new(signature: &str) -> Self {
        let mut comp = Compilation::new(signature);
        let entry = comp.new_block();
        let start = comp.block(entry).entry;
        comp.first_tt = Some(start);
        Self { comp, current: entry, next_bci: 0 }
    }

    pub fn comp(&mut self) -> &mut Compilation {
        &mut self.comp
    }

    fn bump_bci(&mut self) -> u32 {
        let bci = self.next_bci;
        self.next_bci += 1;
        bci
    }

    /// Declares a parameter and returns a load of it.
    pub fn parm(&mut self, name: &str) -> NodeId {
        let sr = self.comp.symrefs.create_parm(name);
        self.load_parm(sr)
    }

    /// A parameter known at compile time to never be null.
    pub fn parm_non_null(&mut self, name: &str) -> NodeId {
        let n = self.parm(name);
        self.comp.node_mut(n).is_non_null = true;
        n
    }

    pub fn load_parm(&mut self, sr: SymRefId) -> NodeId {
        self.comp.create_with_symref(Opcode::ALoad, &[], sr)
    }

    /// Declares a 32-bit integer parameter and returns a load of it.
    pub fn iparm(&mut self, name: &str) -> NodeId {
        let sr = self.comp.symrefs.create_parm(name);
        self.comp.create_with_symref(Opcode::ILoad, &[], sr)
    }

    pub fn iconst(&mut self, v: i64) -> NodeId {
        self.comp.iconst(v)
    }

    /// Appends `treetop(node)` to the current block.
    pub fn anchor(&mut self, node: NodeId) -> TreeTopId {
        let bci = self.bump_bci();
        self.comp.node_mut(node).bci = bci;
        let tt_node = self.comp.create(Opcode::TreeTop, &[node]);
        self.comp.append_to_block(self.current, tt_node)
    }

    /// Builds a call to a recognized operation and anchors it under its own
    /// treetop, returning the call node.
    pub fn call_known(&mut self, target: KnownSymbol, args: &[NodeId]) -> NodeId {
        let sr = self.comp.symrefs.known(target);
        let call = self.comp.create_with_symref(Opcode::Call, args, sr);
        self.anchor(call);
        call
    }

    /// An element store expressed as the checked store tree the non-value-
    /// type-aware front end emits: `ArrayStoreCHK(astorei(aladd, value, array))`.
    pub fn checked_element_store(&mut self, array: NodeId, index: NodeId, value: NodeId) -> NodeId {
        let addr = self.comp.calculate_element_address(array, index);
        let shadow = self.comp.create_array_shadow();
        let store = self
            .comp
            .create_with_symref(Opcode::AStoreIndirect, &[addr, value, array], shadow);
        let chk_sr = self.comp.symrefs.known(KnownSymbol::TypeCheckArrayStore);
        let chk = self.comp.create_with_symref(Opcode::ArrayStoreChk, &[store], chk_sr);
        let bci = self.bump_bci();
        self.comp.node_mut(chk).bci = bci;
        self.comp.node_mut(store).bci = bci;
        self.comp.append_to_block(self.current, chk);
        chk
    }

    /// Appends `return(value)`.
    pub fn ret(&mut self, value: NodeId) -> TreeTopId {
        let r = self.comp.create(Opcode::Return, &[value]);
        let bci = self.bump_bci();
        self.comp.node_mut(r).bci = bci;
        self.comp.append_to_block(self.current, r)
    }

    /// Appends `return` with no value.
    pub fn ret_void(&mut self) -> TreeTopId {
        let r = self.comp.create(Opcode::Return, &[]);
        let bci = self.bump_bci();
        self.comp.node_mut(r).bci = bci;
        self.comp.append_to_block(self.current, r)
    }

    pub fn finish(self) -> Compilation {
        self.comp
    }
}
