//! The B-Tree index engine.
//!
//! All state lives in the block image behind the cache; the only in-memory
//! state an attached index keeps is its working copy of the superblock.
//! Every operation re-materializes the nodes it touches and serializes every
//! mutation back through the cache before its frame returns.

use bytes::Bytes;
use tracing::{debug, trace};

use strata_common::{BlockCache, BlockId, IndexConfig, Result, StrataError};

use crate::node::{fill_threshold, BTreeNode, NodeKind};

/// Which half of the shared descent a search performs at the leaf.
enum SearchOp<'a> {
    Lookup,
    Update(&'a [u8]),
}

/// A disk-backed B-Tree index mapping fixed-width keys to fixed-width values.
///
/// The index is a value with an explicit lifecycle: construct it over a
/// cache, [`attach`](BTreeIndex::attach) it to the image (optionally
/// formatting a fresh one), operate, then [`detach`](BTreeIndex::detach) to
/// flush the superblock. Single-threaded; callers serialize externally if
/// they share an instance.
pub struct BTreeIndex<C: BlockCache> {
    /// The buffer cache holding the block image.
    pub(crate) cache: C,
    /// Block id the superblock was attached at (always 0).
    pub(crate) superblock_id: BlockId,
    /// Working copy of the superblock; authoritative while attached.
    pub(crate) superblock: BTreeNode,
    /// Whether attach has completed.
    attached: bool,
}

impl<C: BlockCache> BTreeIndex<C> {
    /// Creates an unattached index over `cache` with the given geometry.
    ///
    /// The key and value widths only matter when attaching with
    /// `create = true`; attaching to an existing image adopts the widths
    /// recorded in its superblock.
    pub fn new(cache: C, config: IndexConfig) -> Self {
        let blocksize = cache.block_size();
        let superblock = BTreeNode::new(
            NodeKind::Superblock,
            config.keysize,
            config.valuesize,
            blocksize,
        );

        Self {
            cache,
            superblock_id: 0,
            superblock,
            attached: false,
        }
    }

    /// Returns a reference to the underlying cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the key width in bytes.
    pub fn keysize(&self) -> usize {
        self.superblock.header.keysize
    }

    /// Returns the value width in bytes.
    pub fn valuesize(&self) -> usize {
        self.superblock.header.valuesize
    }

    /// Returns the total number of keys in the index.
    pub fn num_keys(&self) -> u64 {
        self.superblock.header.numkeys as u64
    }

    /// Returns the block id of the current root node.
    pub fn root_block(&self) -> BlockId {
        self.superblock.header.rootnode
    }

    /// Returns the head of the free-block chain (0 when exhausted).
    pub fn free_list_head(&self) -> BlockId {
        self.superblock.header.freelist
    }

    pub(crate) fn ensure_attached(&self) -> Result<()> {
        if self.attached {
            Ok(())
        } else {
            Err(StrataError::Insane("index is not attached".to_string()))
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Attaches the index to the image, optionally formatting a fresh one.
    ///
    /// `initblock` must be 0: the superblock always lives at the head of the
    /// image. With `create`, the image is initialized with a superblock at
    /// block 0, an empty root at block 1, and every remaining block threaded
    /// into the free list. Attach always finishes by loading the superblock
    /// from the image.
    pub fn attach(&mut self, initblock: BlockId, create: bool) -> Result<()> {
        if initblock != 0 {
            return Err(StrataError::Insane(format!(
                "superblock must live at block 0, not {initblock}"
            )));
        }
        self.superblock_id = initblock;

        if create {
            self.format()?;
        }

        let superblock = BTreeNode::unserialize(&self.cache, self.superblock_id)?;
        if superblock.header.kind != NodeKind::Superblock {
            return Err(StrataError::Insane(format!(
                "block 0 holds a {} node, not a superblock",
                superblock.header.kind.name()
            )));
        }
        self.superblock = superblock;
        self.attached = true;

        debug!(
            blocks = self.cache.num_blocks(),
            block_size = self.cache.block_size(),
            keysize = self.keysize(),
            valuesize = self.valuesize(),
            create,
            "attached index"
        );
        Ok(())
    }

    /// Flushes the superblock and detaches.
    ///
    /// Dirty tree nodes were already flushed by the operations that touched
    /// them, so the superblock is the only thing left to persist.
    pub fn detach(&mut self) -> Result<()> {
        self.ensure_attached()?;
        self.superblock
            .serialize(&self.cache, self.superblock_id)?;
        self.attached = false;
        debug!(keys = self.superblock.header.numkeys, "detached index");
        Ok(())
    }

    /// Writes a fresh image: superblock, empty root, free chain.
    fn format(&mut self) -> Result<()> {
        let keysize = self.superblock.header.keysize;
        let valuesize = self.superblock.header.valuesize;
        let blocksize = self.cache.block_size();
        let num_blocks = self.cache.num_blocks();

        if keysize == 0 || valuesize == 0 {
            return Err(StrataError::Insane(
                "key and value widths must be nonzero".to_string(),
            ));
        }
        if num_blocks < 2 {
            return Err(StrataError::Insane(format!(
                "image of {num_blocks} blocks cannot hold a superblock and a root"
            )));
        }

        let mut root = BTreeNode::new(NodeKind::Root, keysize, valuesize, blocksize);
        if root.slots_as_interior() < 2 || root.slots_as_leaf() < 2 {
            return Err(StrataError::Insane(format!(
                "block size {blocksize} is too small for {keysize}-byte keys and {valuesize}-byte values"
            )));
        }

        let free_head = if num_blocks > 2 { 2 } else { 0 };

        let mut superblock =
            BTreeNode::new(NodeKind::Superblock, keysize, valuesize, blocksize);
        superblock.header.rootnode = 1;
        superblock.header.freelist = free_head;
        self.cache.notify_allocate(0);
        superblock.serialize(&self.cache, 0)?;

        root.header.rootnode = 1;
        root.header.freelist = free_head;
        self.cache.notify_allocate(1);
        root.serialize(&self.cache, 1)?;

        for block in 2..num_blocks {
            let mut free = BTreeNode::new(NodeKind::Unallocated, keysize, valuesize, blocksize);
            free.header.rootnode = 1;
            free.header.freelist = if block + 1 == num_blocks { 0 } else { block + 1 };
            free.serialize(&self.cache, block)?;
        }

        Ok(())
    }

    // =========================================================================
    // Free-list allocator
    // =========================================================================

    /// Pops the free-list head for use as a tree node.
    ///
    /// The block's on-disk type is left `Unallocated`; the caller overwrites
    /// the whole block when it serializes the node it built.
    fn allocate_node(&mut self) -> Result<BlockId> {
        let block = self.superblock.header.freelist;
        if block == 0 {
            return Err(StrataError::NoSpace);
        }

        let node = BTreeNode::unserialize(&self.cache, block)?;
        if node.header.kind != NodeKind::Unallocated {
            return Err(StrataError::Insane(format!(
                "free-list block {block} holds a {} node",
                node.header.kind.name()
            )));
        }

        self.superblock.header.freelist = node.header.freelist;
        self.superblock
            .serialize(&self.cache, self.superblock_id)?;
        self.cache.notify_allocate(block);

        trace!(block, "allocated block");
        Ok(block)
    }

    /// Pushes `block` back onto the free list.
    fn deallocate_node(&mut self, block: BlockId) -> Result<()> {
        let mut node = BTreeNode::unserialize(&self.cache, block)?;
        if node.header.kind == NodeKind::Unallocated {
            return Err(StrataError::Insane(format!(
                "block {block} is already unallocated"
            )));
        }

        node.header.kind = NodeKind::Unallocated;
        node.header.freelist = self.superblock.header.freelist;
        node.serialize(&self.cache, block)?;

        self.superblock.header.freelist = block;
        self.superblock
            .serialize(&self.cache, self.superblock_id)?;
        self.cache.notify_deallocate(block);

        trace!(block, "deallocated block");
        Ok(())
    }

    // =========================================================================
    // Search engine
    // =========================================================================

    /// Looks up the value stored under `key`.
    pub fn lookup(&self, key: &[u8]) -> Result<Bytes> {
        self.ensure_attached()?;
        self.check_key_width(key)?;
        self.search_rec(self.superblock.header.rootnode, key, &SearchOp::Lookup)
    }

    /// Replaces the value stored under `key` in place.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_attached()?;
        self.check_key_width(key)?;
        self.check_value_width(value)?;
        self.search_rec(
            self.superblock.header.rootnode,
            key,
            &SearchOp::Update(value),
        )?;
        Ok(())
    }

    /// Shared recursive descent for lookup and update.
    ///
    /// Interior levels send `key <= testkey` into the pointer left of the
    /// slot; leaves scan for equality.
    fn search_rec(&self, block: BlockId, key: &[u8], op: &SearchOp<'_>) -> Result<Bytes> {
        let mut node = BTreeNode::unserialize(&self.cache, block)?;

        match node.header.kind {
            NodeKind::Root | NodeKind::Interior => {
                let numkeys = node.header.numkeys;
                if numkeys == 0 {
                    return Err(StrataError::NotFound);
                }
                for slot in 0..numkeys {
                    let testkey = node.key(slot)?;
                    if key <= testkey.as_ref() {
                        return self.search_rec(node.ptr(slot)?, key, op);
                    }
                }
                self.search_rec(node.ptr(numkeys)?, key, op)
            }
            NodeKind::Leaf => {
                for slot in 0..node.header.numkeys {
                    if node.key(slot)?.as_ref() == key {
                        return match op {
                            SearchOp::Lookup => node.value(slot),
                            SearchOp::Update(value) => {
                                node.set_value(slot, value)?;
                                node.serialize(&self.cache, block)?;
                                node.value(slot)
                            }
                        };
                    }
                }
                Err(StrataError::NotFound)
            }
            other => Err(StrataError::Insane(format!(
                "search reached a {} node at block {block}",
                other.name()
            ))),
        }
    }

    // =========================================================================
    // Insert engine
    // =========================================================================

    /// Inserts `(key, value)`. A key already present is a `Conflict`.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_attached()?;
        self.check_key_width(key)?;
        self.check_value_width(value)?;

        let root = self.superblock.header.rootnode;
        if let Some((promoted, new_child)) = self.insert_rec(root, key, value)? {
            self.grow_root(&promoted, new_child)?;
        }

        self.superblock.header.numkeys += 1;
        Ok(())
    }

    /// Recursive insert. Returns the `(key, child)` promotion when the node
    /// at `block` split, to be linked into the caller's level.
    fn insert_rec(
        &mut self,
        block: BlockId,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<(Bytes, BlockId)>> {
        let mut node = BTreeNode::unserialize(&self.cache, block)?;

        match node.header.kind {
            NodeKind::Root if node.header.numkeys == 0 => {
                self.populate_empty_root(node, block, key, value)
            }
            NodeKind::Root | NodeKind::Interior => {
                let numkeys = node.header.numkeys;
                let mut slot = numkeys;
                for candidate in 0..numkeys {
                    if key <= node.key(candidate)?.as_ref() {
                        slot = candidate;
                        break;
                    }
                }

                let child = node.ptr(slot)?;
                let promotion = self.insert_rec(child, key, value)?;

                let Some((promoted, new_child)) = promotion else {
                    return Ok(None);
                };

                node.interior_insert(slot, &promoted, new_child)?;
                node.serialize(&self.cache, block)?;

                if !node.overfull() {
                    return Ok(None);
                }

                let (promoted, mut right) = node.split_interior()?;
                let right_block = self.allocate_node()?;
                right.serialize(&self.cache, right_block)?;
                node.serialize(&self.cache, block)?;
                trace!(block, right_block, "split interior node");
                Ok(Some((promoted, right_block)))
            }
            NodeKind::Leaf => {
                let numkeys = node.header.numkeys;
                let mut slot = numkeys;
                for candidate in 0..numkeys {
                    let testkey = node.key(candidate)?;
                    if testkey.as_ref() == key {
                        return Err(StrataError::Conflict);
                    }
                    if key < testkey.as_ref() {
                        slot = candidate;
                        break;
                    }
                }

                node.leaf_insert(slot, key, value)?;
                node.serialize(&self.cache, block)?;

                if !node.overfull() {
                    return Ok(None);
                }

                let (promoted, mut right) = node.split_leaf()?;
                let right_block = self.allocate_node()?;
                right.serialize(&self.cache, right_block)?;
                node.serialize(&self.cache, block)?;
                trace!(block, right_block, "split leaf node");
                Ok(Some((promoted, right_block)))
            }
            other => Err(StrataError::Insane(format!(
                "insert reached a {} node at block {block}",
                other.name()
            ))),
        }
    }

    /// First insert into a fresh tree.
    ///
    /// The empty root becomes an interior-shaped node over two new leaves:
    /// the left one holds the pair, the right one starts empty. The descent
    /// rule sends `key <= key[0]` left, so the pair is reachable.
    fn populate_empty_root(
        &mut self,
        mut root: BTreeNode,
        block: BlockId,
        key: &[u8],
        value: &[u8],
    ) -> Result<Option<(Bytes, BlockId)>> {
        let header = root.header;
        let mut left = BTreeNode::new(
            NodeKind::Leaf,
            header.keysize,
            header.valuesize,
            header.blocksize,
        );
        let mut right = BTreeNode::new(
            NodeKind::Leaf,
            header.keysize,
            header.valuesize,
            header.blocksize,
        );
        left.header.rootnode = header.rootnode;
        right.header.rootnode = header.rootnode;
        left.leaf_insert(0, key, value)?;

        let left_block = self.allocate_node()?;
        let right_block = self.allocate_node()?;

        root.interior_insert(0, key, right_block)?;
        root.set_ptr(0, left_block)?;

        root.serialize(&self.cache, block)?;
        left.serialize(&self.cache, left_block)?;
        right.serialize(&self.cache, right_block)?;

        trace!(left_block, right_block, "populated empty root");
        Ok(None)
    }

    /// Handles a root split: the tree grows one level.
    ///
    /// A fresh root is allocated over the old root and the promoted sibling,
    /// the old root is re-typed interior, and the superblock's root pointer
    /// moves to the new block.
    fn grow_root(&mut self, promoted: &Bytes, new_child: BlockId) -> Result<()> {
        let old_root_block = self.superblock.header.rootnode;
        let mut old_root = BTreeNode::unserialize(&self.cache, old_root_block)?;

        let header = self.superblock.header;
        let mut new_root = BTreeNode::new(
            NodeKind::Root,
            header.keysize,
            header.valuesize,
            header.blocksize,
        );
        new_root.interior_insert(0, promoted, new_child)?;
        new_root.set_ptr(0, old_root_block)?;

        let new_root_block = self.allocate_node()?;
        new_root.header.rootnode = new_root_block;
        new_root.serialize(&self.cache, new_root_block)?;

        old_root.header.kind = NodeKind::Interior;
        old_root.serialize(&self.cache, old_root_block)?;

        self.superblock.header.rootnode = new_root_block;
        self.superblock
            .serialize(&self.cache, self.superblock_id)?;

        debug!(old_root_block, new_root_block, "root split, tree grew");
        Ok(())
    }

    /// Deletes `key`. Not implemented; rebalancing policy is open.
    pub fn delete(&mut self, _key: &[u8]) -> Result<()> {
        Err(StrataError::Unimplemented("delete"))
    }

    // =========================================================================
    // Integrity checker
    // =========================================================================

    /// Validates per-node invariants over the whole tree.
    ///
    /// Checks that keys are strictly ascending within every node, that no
    /// node has reached its fill ceiling, and that the leaf-key total equals
    /// the superblock's count.
    pub fn sanity_check(&self) -> Result<()> {
        self.ensure_attached()?;

        let mut leaf_keys: u64 = 0;
        self.check_rec(self.superblock.header.rootnode, &mut leaf_keys)?;

        let expected = self.superblock.header.numkeys as u64;
        if leaf_keys != expected {
            return Err(StrataError::Insane(format!(
                "leaves hold {leaf_keys} keys but the superblock counts {expected}"
            )));
        }
        Ok(())
    }

    fn check_rec(&self, block: BlockId, leaf_keys: &mut u64) -> Result<()> {
        let node = BTreeNode::unserialize(&self.cache, block)?;
        let numkeys = node.header.numkeys;

        match node.header.kind {
            NodeKind::Root | NodeKind::Interior => {
                let ceiling = fill_threshold(node.slots_as_interior());
                if numkeys >= ceiling {
                    return Err(StrataError::Insane(format!(
                        "interior block {block} holds {numkeys} keys, ceiling is {ceiling}"
                    )));
                }
                self.check_ascending(&node, block)?;
                if numkeys > 0 {
                    for slot in 0..=numkeys {
                        self.check_rec(node.ptr(slot)?, leaf_keys)?;
                    }
                }
                Ok(())
            }
            NodeKind::Leaf => {
                let ceiling = fill_threshold(node.slots_as_leaf());
                if numkeys >= ceiling {
                    return Err(StrataError::Insane(format!(
                        "leaf block {block} holds {numkeys} keys, ceiling is {ceiling}"
                    )));
                }
                self.check_ascending(&node, block)?;
                *leaf_keys += numkeys as u64;
                Ok(())
            }
            other => Err(StrataError::Insane(format!(
                "tree reaches a {} node at block {block}",
                other.name()
            ))),
        }
    }

    fn check_ascending(&self, node: &BTreeNode, block: BlockId) -> Result<()> {
        for slot in 1..node.header.numkeys {
            if node.key(slot - 1)? >= node.key(slot)? {
                return Err(StrataError::Insane(format!(
                    "keys out of order in block {block} at slot {slot}"
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Width checks
    // =========================================================================

    fn check_key_width(&self, key: &[u8]) -> Result<()> {
        let expected = self.superblock.header.keysize;
        if key.len() != expected {
            return Err(StrataError::WidthMismatch {
                field: "key",
                expected,
                actual: key.len(),
            });
        }
        Ok(())
    }

    fn check_value_width(&self, value: &[u8]) -> Result<()> {
        let expected = self.superblock.header.valuesize;
        if value.len() != expected {
            return Err(StrataError::WidthMismatch {
                field: "value",
                expected,
                actual: value.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_buffer::MemoryStore;
    use std::sync::Arc;

    const BLOCK_SIZE: usize = 256;

    fn attached_index(num_blocks: u64) -> (BTreeIndex<Arc<MemoryStore>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(BLOCK_SIZE, num_blocks));
        let mut index = BTreeIndex::new(Arc::clone(&store), IndexConfig::default());
        index.attach(0, true).unwrap();
        (index, store)
    }

    fn k(text: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn test_attach_rejects_nonzero_initblock() {
        let store = MemoryStore::new(BLOCK_SIZE, 8);
        let mut index = BTreeIndex::new(store, IndexConfig::default());
        let err = index.attach(1, true).unwrap_err();
        assert!(matches!(err, StrataError::Insane(_)));
    }

    #[test]
    fn test_attach_without_create_needs_superblock() {
        let store = MemoryStore::new(BLOCK_SIZE, 8);
        let mut index = BTreeIndex::new(store, IndexConfig::default());
        // Block 0 is zeroed, which parses as an unallocated node.
        let err = index.attach(0, false).unwrap_err();
        assert!(matches!(err, StrataError::Insane(_)));
    }

    #[test]
    fn test_attach_rejects_degenerate_geometry() {
        let store = MemoryStore::new(64, 8);
        let mut index = BTreeIndex::new(
            store,
            IndexConfig {
                keysize: 8,
                valuesize: 8,
            },
        );
        // (64 - 56) / 16 = 0 slots.
        let err = index.attach(0, true).unwrap_err();
        assert!(matches!(err, StrataError::Insane(_)));
    }

    #[test]
    fn test_operations_require_attach() {
        let store = MemoryStore::new(BLOCK_SIZE, 8);
        let index = BTreeIndex::new(store, IndexConfig::default());
        assert!(matches!(
            index.lookup(&k("a")),
            Err(StrataError::Insane(_))
        ));
    }

    #[test]
    fn test_allocate_pops_free_list_head() {
        let (mut index, store) = attached_index(8);
        assert_eq!(index.free_list_head(), 2);
        let allocations_after_attach = store.allocations();

        let block = index.allocate_node().unwrap();
        assert_eq!(block, 2);
        assert_eq!(index.free_list_head(), 3);
        assert_eq!(store.allocations(), allocations_after_attach + 1);

        let block = index.allocate_node().unwrap();
        assert_eq!(block, 3);
        assert_eq!(index.free_list_head(), 4);
    }

    #[test]
    fn test_allocate_exhaustion() {
        let (mut index, _store) = attached_index(4);
        index.allocate_node().unwrap();
        index.allocate_node().unwrap();
        assert_eq!(index.free_list_head(), 0);
        assert!(matches!(index.allocate_node(), Err(StrataError::NoSpace)));
    }

    #[test]
    fn test_deallocate_pushes_onto_free_list() {
        let (mut index, store) = attached_index(8);
        let block = index.allocate_node().unwrap();

        // Give the block a real type the way a caller would.
        let mut node = BTreeNode::new(NodeKind::Leaf, 8, 8, BLOCK_SIZE);
        node.serialize(&index.cache, block).unwrap();

        index.deallocate_node(block).unwrap();
        assert_eq!(index.free_list_head(), block);
        assert_eq!(store.deallocations(), 1);

        let node = BTreeNode::unserialize(&store, block).unwrap();
        assert_eq!(node.header.kind, NodeKind::Unallocated);
        assert_eq!(node.header.freelist, 3);
    }

    #[test]
    fn test_deallocate_twice_is_insane() {
        let (mut index, _store) = attached_index(8);
        let block = index.allocate_node().unwrap();

        let mut node = BTreeNode::new(NodeKind::Leaf, 8, 8, BLOCK_SIZE);
        node.serialize(&index.cache, block).unwrap();

        index.deallocate_node(block).unwrap();
        let err = index.deallocate_node(block).unwrap_err();
        assert!(matches!(err, StrataError::Insane(_)));
    }

    #[test]
    fn test_lookup_on_empty_tree() {
        let (index, _store) = attached_index(8);
        assert!(matches!(
            index.lookup(&k("apple")),
            Err(StrataError::NotFound)
        ));
    }

    #[test]
    fn test_insert_then_lookup() {
        let (mut index, _store) = attached_index(16);
        index.insert(&k("apple"), &k("red")).unwrap();

        assert_eq!(index.lookup(&k("apple")).unwrap(), k("red"));
        assert_eq!(index.num_keys(), 1);
        index.sanity_check().unwrap();
    }

    #[test]
    fn test_insert_duplicate_conflicts() {
        let (mut index, _store) = attached_index(16);
        index.insert(&k("apple"), &k("red")).unwrap();

        let err = index.insert(&k("apple"), &k("green")).unwrap_err();
        assert!(matches!(err, StrataError::Conflict));
        assert_eq!(index.lookup(&k("apple")).unwrap(), k("red"));
        assert_eq!(index.num_keys(), 1);
    }

    #[test]
    fn test_update_in_place() {
        let (mut index, _store) = attached_index(16);
        index.insert(&k("apple"), &k("red")).unwrap();

        index.update(&k("apple"), &k("green")).unwrap();
        assert_eq!(index.lookup(&k("apple")).unwrap(), k("green"));
        assert_eq!(index.num_keys(), 1);

        let err = index.update(&k("pear"), &k("green")).unwrap_err();
        assert!(matches!(err, StrataError::NotFound));
    }

    #[test]
    fn test_delete_unimplemented() {
        let (mut index, _store) = attached_index(16);
        assert!(matches!(
            index.delete(&k("apple")),
            Err(StrataError::Unimplemented("delete"))
        ));
    }

    #[test]
    fn test_width_checks() {
        let (mut index, _store) = attached_index(16);
        assert!(matches!(
            index.lookup(b"short"),
            Err(StrataError::WidthMismatch { field: "key", .. })
        ));
        assert!(matches!(
            index.insert(&k("apple"), b"toolongvalue"),
            Err(StrataError::WidthMismatch { field: "value", .. })
        ));
    }

    #[test]
    fn test_detach_persists_superblock() {
        let store = Arc::new(MemoryStore::new(BLOCK_SIZE, 16));
        {
            let mut index = BTreeIndex::new(Arc::clone(&store), IndexConfig::default());
            index.attach(0, true).unwrap();
            index.insert(&k("apple"), &k("red")).unwrap();
            index.insert(&k("pear"), &k("green")).unwrap();
            index.detach().unwrap();
        }

        let mut index = BTreeIndex::new(Arc::clone(&store), IndexConfig::default());
        index.attach(0, false).unwrap();
        assert_eq!(index.num_keys(), 2);
        assert_eq!(index.lookup(&k("apple")).unwrap(), k("red"));
        assert_eq!(index.lookup(&k("pear")).unwrap(), k("green"));
        index.sanity_check().unwrap();
    }

    #[test]
    fn test_sanity_check_detects_count_drift() {
        let (mut index, _store) = attached_index(16);
        index.insert(&k("apple"), &k("red")).unwrap();

        index.superblock.header.numkeys = 5;
        assert!(matches!(
            index.sanity_check(),
            Err(StrataError::Insane(_))
        ));
    }
}
