//! The tree-and-block intermediate representation the lowering engine
//! operates on.
//!
//! A method body is a doubly linked list of [`treetop::TreeTop`]s, each
//! anchoring one expression tree of arena-owned [`node::Node`]s. Runs of
//! treetops bounded by `BBStart`/`BBEnd` markers form [`block::Block`]s,
//! connected by the [`cfg::Cfg`]. Nodes may be *commoned* (shared by several
//! tree positions); an explicit reference count on each node tracks sharers.

pub mod block;
pub mod build;
pub mod cfg;
pub mod node;
pub mod opcode;
pub mod symref;
pub mod treetop;
pub mod verify;
pub mod walk;

pub use block::{Block, BlockId};
pub use build::MethodBuilder;
pub use cfg::Cfg;
pub use node::{GlobalReg, Node, NodeId};
pub use opcode::Opcode;
pub use symref::{KnownSymbol, SymRefId, SymRefTable, SymbolRef};
pub use treetop::{TreeTop, TreeTopId};
pub use walk::PreorderWalk;

/// Bit set in a class's flags word when the class is a value-semantic type.
pub const VALUE_TYPE_CLASS_FLAG: i64 = 0x400;

/// Object header size in bytes; array elements start at this offset.
pub const ARRAY_HEADER_SIZE: i64 = 16;
