//! Trace-style printer for a method body.
//!
//! One line per tree position, indented by depth, nodes named by their
//! stable global ordinal. A reference to an already printed node renders as
//! `==>nXn`, making commoning visible; two dumps of structurally identical
//! method bodies compare equal as strings.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::compilation::Compilation;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;

pub fn dump(comp: &Compilation) -> String {
    let mut out = String::new();
    let mut printed: HashSet<NodeId> = HashSet::new();
    let mut tt = comp.first_treetop();
    while let Some(cur) = tt {
        print_tree(comp, comp.tt_node(cur), 0, &mut printed, &mut out);
        tt = comp.next_tt(cur);
    }
    out
}

fn print_tree(
    comp: &Compilation,
    node: NodeId,
    depth: usize,
    printed: &mut HashSet<NodeId>,
    out: &mut String,
) {
    let n = comp.node(node);
    let indent = "  ".repeat(depth);
    if !printed.insert(node) {
        let _ = writeln!(out, "{indent}==>n{}n", n.global_index);
        return;
    }
    let _ = write!(out, "{indent}n{}n {}", n.global_index, n.op.name());
    match n.op {
        Opcode::IConst | Opcode::LConst | Opcode::AConst => {
            let _ = write!(out, " {}", n.value);
        }
        Opcode::BBStart | Opcode::BBEnd => {
            if let Some(b) = n.block {
                let _ = write!(out, " <block_{}>", comp.block(b).number);
                if n.op == Opcode::BBStart && comp.block(b).is_extension {
                    let _ = write!(out, " (extension of previous block)");
                }
            }
        }
        Opcode::ArrayLength => {
            let _ = write!(out, " (stride {})", n.value);
        }
        _ => {}
    }
    if let Some(sr) = n.symref {
        let _ = write!(out, " {}", comp.symrefs.get(sr).name);
    }
    if let Some(reg) = n.reg {
        let _ = write!(out, " gr{}", reg.0);
    }
    if let Some(target) = n.branch_target {
        let tn = comp.node(comp.tt_node(target));
        if let Some(b) = tn.block {
            let _ = write!(out, " --> block_{}", comp.block(b).number);
        }
    }
    let _ = writeln!(out);
    for i in 0..n.num_children() {
        print_tree(comp, n.child(i), depth + 1, printed, out);
    }
}
