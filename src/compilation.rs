use crate::counters::DebugCounters;
use crate::il::block::Block;
use crate::il::cfg::Cfg;
use crate::il::node::Node;
use crate::il::symref::SymRefTable;
use crate::il::treetop::{TreeTop, TreeTopId};

/// One method compilation: the arenas for nodes, treetops and blocks, the
/// CFG, interned symbol references, and compilation-wide flags.
///
/// The compilation exclusively owns its IR; the lowering engine mutates it
/// in place and nothing else observes it mid-pass. Multiple compilations in
/// the surrounding system run on separate threads over disjoint state, so
/// nothing here locks.
#[derive(Debug)]
pub struct Compilation {
    pub(crate) nodes: Vec<Node>,
    pub(crate) treetops: Vec<TreeTop>,
    pub(crate) blocks: Vec<Block>,
    pub cfg: Cfg,
    pub symrefs: SymRefTable,
    pub(crate) first_tt: Option<TreeTopId>,

    signature: String,

    /// Runtime stores references compressed to 32 bits in object fields and
    /// array elements.
    pub uses_compressed_refs: bool,
    /// The method statically promises no out-of-bounds element access.
    pub skip_bound_checks: bool,
    /// The method statically promises no array-store type violations.
    pub skip_store_checks: bool,
    /// Array layout requires discontiguous-spine checks, which this engine
    /// does not support.
    pub needs_spine_checks: bool,

    /// Alias sets must be revalidated before the next alias-sensitive pass;
    /// set whenever a new symbol reference is introduced.
    pub alias_info_stale: bool,

    pub counters: DebugCounters,

    pub(crate) next_global_index: u32,
    pub(crate) next_reg: u16,
}

impl Compilation {
    pub fn new(signature: &str) -> Self {
        Self {
            nodes: Vec::new(),
            treetops: Vec::new(),
            blocks: Vec::new(),
            cfg: Cfg::new(),
            symrefs: SymRefTable::new(),
            first_tt: None,
            signature: signature.to_string(),
            uses_compressed_refs: false,
            skip_bound_checks: false,
            skip_store_checks: false,
            needs_spine_checks: false,
            alias_info_stale: false,
            counters: DebugCounters::default(),
            next_global_index: 0,
            next_reg: 0,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Creates an array element shadow symbol and flags alias info stale.
    pub fn create_array_shadow(&mut self) -> crate::il::symref::SymRefId {
        self.alias_info_stale = true;
        self.symrefs.create_array_shadow()
    }
}
