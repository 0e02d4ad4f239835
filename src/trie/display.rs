//! Textual dump of the trie structure, for debugging. Not a serialization
//! format: unresolved references print as their bare hash.
use crate::trie::{
    node::{Child, Node},
    trie::Trie,
};
use alloy_primitives::B256;
use std::fmt;

fn abbrev(hash: &B256) -> String {
    let hex = hex::encode(hash);
    format!("{}..{}", &hex[..8], &hex[hex.len() - 4..])
}

fn fmt_node(f: &mut fmt::Formatter<'_>, node: &Node, indent: usize) -> fmt::Result {
    match node {
        Node::Leaf(leaf) => writeln!(
            f,
            "leaf {} suffix={} key={} value={}",
            abbrev(&leaf.hash()),
            leaf.prefix,
            hex::encode(leaf.key()),
            hex::encode(leaf.value()),
        ),
        Node::Branch(branch) => {
            writeln!(
                f,
                "branch {} prefix={:?} size={}",
                abbrev(&branch.hash()),
                branch.prefix.to_string(),
                branch.size,
            )?;
            for (slot, child) in branch.children.iter().enumerate() {
                match child {
                    Child::Empty => {}
                    Child::Node(child) => {
                        write!(f, "{}{slot:x}: ", " ".repeat(indent + 2))?;
                        fmt_node(f, child, indent + 2)?;
                    }
                    Child::Ref(hash) => {
                        writeln!(f, "{}{slot:x}: ref {}", " ".repeat(indent + 2), abbrev(hash))?;
                    }
                }
            }
            Ok(())
        }
    }
}

impl<S> fmt::Display for Trie<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            None => writeln!(f, "empty trie"),
            Some(root) => fmt_node(f, root, 0),
        }
    }
}
