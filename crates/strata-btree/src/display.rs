//! Tree rendering: depth-first dumps, Graphviz output, sorted key/value listing.

use std::io::Write;

use strata_common::{BlockCache, BlockId, Result, StrataError};

use crate::index::BTreeIndex;
use crate::node::{BTreeNode, NodeKind};

/// How [`BTreeIndex::display`] renders the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Depth-first dump, one node per line.
    Depth,
    /// The same traversal as a Graphviz digraph.
    DepthDot,
    /// In-order `(key,value)` lines, nothing else.
    SortedKeyVal,
}

impl<C: BlockCache> BTreeIndex<C> {
    /// Renders the tree to `out` in the requested mode.
    ///
    /// Key and value bytes are written verbatim.
    pub fn display<W: Write>(&self, out: &mut W, mode: DisplayMode) -> Result<()> {
        self.ensure_attached()?;

        if mode == DisplayMode::DepthDot {
            writeln!(out, "digraph tree {{")?;
        }
        self.display_rec(self.superblock.header.rootnode, out, mode)?;
        if mode == DisplayMode::DepthDot {
            writeln!(out, "}}")?;
        }
        Ok(())
    }

    fn display_rec<W: Write>(&self, block: BlockId, out: &mut W, mode: DisplayMode) -> Result<()> {
        let node = BTreeNode::unserialize(&self.cache, block)?;
        print_node(out, block, &node, mode)?;

        match node.header.kind {
            NodeKind::Root | NodeKind::Interior => {
                if node.header.numkeys > 0 {
                    for slot in 0..=node.header.numkeys {
                        let child = node.ptr(slot)?;
                        if mode == DisplayMode::DepthDot {
                            writeln!(out, "{block} -> {child};")?;
                        }
                        self.display_rec(child, out, mode)?;
                    }
                }
                Ok(())
            }
            NodeKind::Leaf => Ok(()),
            other => Err(StrataError::Insane(format!(
                "display reached a {} node at block {block}",
                other.name()
            ))),
        }
    }
}

fn print_node<W: Write>(
    out: &mut W,
    block: BlockId,
    node: &BTreeNode,
    mode: DisplayMode,
) -> Result<()> {
    match mode {
        DisplayMode::Depth => {
            write!(out, "{block}: ")?;
            print_contents(out, node)?;
            writeln!(out)?;
        }
        DisplayMode::DepthDot => {
            write!(out, "{block} [ label=\"{block}: ")?;
            print_contents(out, node)?;
            writeln!(out, "\" ];")?;
        }
        DisplayMode::SortedKeyVal => {
            if node.header.kind == NodeKind::Leaf {
                for slot in 0..node.header.numkeys {
                    write!(out, "(")?;
                    out.write_all(&node.key(slot)?)?;
                    write!(out, ",")?;
                    out.write_all(&node.value(slot)?)?;
                    writeln!(out, ")")?;
                }
            }
        }
    }
    Ok(())
}

fn print_contents<W: Write>(out: &mut W, node: &BTreeNode) -> Result<()> {
    match node.header.kind {
        NodeKind::Root | NodeKind::Interior => {
            write!(out, "Interior:")?;
            let numkeys = node.header.numkeys;
            if numkeys > 0 {
                for slot in 0..numkeys {
                    write!(out, " *{} ", node.ptr(slot)?)?;
                    out.write_all(&node.key(slot)?)?;
                }
                write!(out, " *{}", node.ptr(numkeys)?)?;
            }
        }
        NodeKind::Leaf => {
            write!(out, "Leaf:")?;
            for slot in 0..node.header.numkeys {
                write!(out, " (")?;
                out.write_all(&node.key(slot)?)?;
                write!(out, ",")?;
                out.write_all(&node.value(slot)?)?;
                write!(out, ")")?;
            }
        }
        other => {
            write!(out, "{}", other.name())?;
        }
    }
    Ok(())
}
