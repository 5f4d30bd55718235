use std::collections::HashSet;

use crate::compilation::Compilation;
use crate::il::node::NodeId;
use crate::il::treetop::TreeTopId;

/// Preorder iteration over every node in the method body, visiting each
/// node exactly once even when commoning makes it reachable from several
/// tree positions.
pub struct PreorderWalk<'a> {
    comp: &'a Compilation,
    next_tt: Option<TreeTopId>,
    cur_tt: Option<TreeTopId>,
    stack: Vec<NodeId>,
    visited: HashSet<NodeId>,
}

impl<'a> PreorderWalk<'a> {
    pub fn new(comp: &'a Compilation) -> Self {
        Self {
            comp,
            next_tt: comp.first_treetop(),
            cur_tt: None,
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }
}

impl Iterator for PreorderWalk<'_> {
    type Item = (TreeTopId, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.stack.pop() {
                let n = self.comp.node(node);
                for i in (0..n.num_children()).rev() {
                    let c = n.child(i);
                    if self.visited.insert(c) {
                        self.stack.push(c);
                    }
                }
                return Some((self.cur_tt.expect("node outside any treetop"), node));
            }
            let tt = self.next_tt?;
            self.next_tt = self.comp.next_tt(tt);
            self.cur_tt = Some(tt);
            let root = self.comp.tt_node(tt);
            if self.visited.insert(root) {
                self.stack.push(root);
            }
        }
    }
}
