//! B+-tree over a single index file.
//!
//! Page 0 is the meta page; the tree starts as a single empty leaf on page 1,
//! which stays the leftmost leaf for the life of the index because a split
//! keeps the lower half in place.
//!
//! There are no parent pointers. Descent records the path it took in a
//! [`PathStack`] and split propagation pops it.

use std::cmp::Ordering;
use std::path::Path;

use log::{debug, trace, warn};

use crate::buffer::{BufferPoolManager, PageWriteGuard, StatsSnapshot};
use crate::common::config::IndexConfig;
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::PageType;
use crate::storage::DiskManager;

use super::internal::InternalNode;
use super::key::AttrType;
use super::leaf::{split_point, LeafEntry, LeafNode, Removal};
use super::meta::{IndexMeta, META_PAGE_ID};
use super::path::{PathEntry, PathStack};

/// Deeper than any tree a 32-bit page space can hold; anything past this
/// is a cycle.
const MAX_HEIGHT: usize = 32;

/// Where a descent ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafPosition {
    pub leaf: PageId,
    /// Slot of the key, or where it would be inserted.
    pub slot: usize,
    pub found: bool,
}

/// Page and entry counts reported by [`BTreeIndex::verify`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels including the leaf level.
    pub height: usize,
    pub internal_pages: usize,
    pub leaf_pages: usize,
    /// Distinct keys.
    pub keys: usize,
    /// (key, RID) pairs.
    pub entries: usize,
    /// Reclaimed cells waiting on leaf free lists.
    pub free_cells: usize,
}

/// An open B+-tree index.
///
/// Mutations take `&mut self`; reads and scans take `&self`.
pub struct BTreeIndex {
    bpm: BufferPoolManager,
    meta: IndexMeta,
}

impl BTreeIndex {
    /// Create a new index file holding an empty tree.
    ///
    /// # Errors
    /// - `Error::InvalidAttrLength` if `attr_len` is illegal for `attr_type`
    /// - `Error::InvalidConfig` if `config` is out of range
    /// - `Error::Io` if the file already exists or cannot be written
    pub fn create<P: AsRef<Path>>(
        path: P,
        attr_type: AttrType,
        attr_len: usize,
        config: &IndexConfig,
    ) -> Result<Self> {
        attr_type.validate_length(attr_len)?;
        config.validate()?;

        let path = path.as_ref();
        let disk = DiskManager::create(path)?;
        let bpm = BufferPoolManager::new(config.pool_size, disk, config.replacement_policy);

        match Self::format(bpm, attr_type, attr_len) {
            Ok(tree) => Ok(tree),
            Err(e) => {
                // A half-written file would fail to open later anyway
                if let Err(cleanup) = DiskManager::destroy(path) {
                    warn!("failed to remove {} after create error: {}", path.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    fn format(bpm: BufferPoolManager, attr_type: AttrType, attr_len: usize) -> Result<Self> {
        let meta = Self::format_pages(&bpm, attr_type, attr_len)?;
        bpm.flush_all_pages()?;
        Ok(Self { bpm, meta })
    }

    fn format_pages(
        bpm: &BufferPoolManager,
        attr_type: AttrType,
        attr_len: usize,
    ) -> Result<IndexMeta> {
        let mut meta_guard = bpm.new_page()?;
        debug_assert_eq!(meta_guard.page_id(), META_PAGE_ID);

        let mut leaf_guard = bpm.new_page()?;
        let leaf = leaf_guard.page_id();
        LeafNode::init(leaf, leaf_guard.as_mut_slice(), attr_len);

        let meta = IndexMeta {
            attr_type,
            attr_len,
            root: leaf,
            leftmost: leaf,
        };
        meta.encode(meta_guard.as_mut_slice());
        Ok(meta)
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened
    /// - `Error::Corrupted` or `Error::ChecksumMismatch` if the meta page is
    ///   damaged
    pub fn open<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        config.validate()?;

        let disk = DiskManager::open(path)?;
        let bpm = BufferPoolManager::new(config.pool_size, disk, config.replacement_policy);
        let meta = Self::read_meta(&bpm)?;

        Ok(Self { bpm, meta })
    }

    fn read_meta(bpm: &BufferPoolManager) -> Result<IndexMeta> {
        let guard = bpm.fetch_page_read(META_PAGE_ID)?;
        IndexMeta::decode(guard.as_slice())
    }

    fn write_meta(&self, meta: &IndexMeta) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(META_PAGE_ID)?;
        meta.encode(guard.as_mut_slice());
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn attr_type(&self) -> AttrType {
        self.meta.attr_type
    }

    pub fn attr_len(&self) -> usize {
        self.meta.attr_len
    }

    pub fn root(&self) -> PageId {
        self.meta.root
    }

    pub fn leftmost_leaf(&self) -> PageId {
        self.meta.leftmost
    }

    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.bpm
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.bpm.stats().snapshot()
    }

    /// Write every dirty page back to the file.
    pub fn flush(&self) -> Result<()> {
        self.bpm.flush_all_pages()
    }

    /// Fix a leaf for reading and hand its decoded view to `f`.
    pub(crate) fn with_leaf<T>(
        &self,
        page_id: PageId,
        f: impl FnOnce(&LeafNode<&[u8]>) -> Result<T>,
    ) -> Result<T> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        let leaf = LeafNode::open(page_id, guard.as_slice(), self.meta.attr_len)?;
        f(&leaf)
    }

    // ========================================================================
    // Descent
    // ========================================================================

    /// Walk from the root to the leaf where `key` is or would be, recording
    /// every internal page and the child slot taken in `path`.
    pub fn descend(&self, key: &[u8], path: &mut PathStack) -> Result<LeafPosition> {
        let attr_type = self.meta.attr_type;
        let attr_len = self.meta.attr_len;
        let mut page_id = self.meta.root;
        path.clear();

        loop {
            if path.len() >= MAX_HEIGHT {
                return Err(Error::corrupted(page_id.0, "descent does not reach a leaf"));
            }

            let guard = self.bpm.fetch_page_read(page_id)?;
            match guard.page_type() {
                PageType::BTreeInternal => {
                    let node = InternalNode::open(page_id, guard.as_slice(), attr_len)?;
                    let slot = node.find_child(key, attr_type);
                    let child = node.child(slot);
                    trace!("descend: page {} slot {} -> page {}", page_id, slot, child);
                    path.push(page_id, slot);
                    page_id = child;
                }
                PageType::BTreeLeaf => {
                    let leaf = LeafNode::open(page_id, guard.as_slice(), attr_len)?;
                    let (slot, found) = leaf.search(key, attr_type);
                    trace!("descend: leaf {} slot {} found={}", page_id, slot, found);
                    return Ok(LeafPosition {
                        leaf: page_id,
                        slot,
                        found,
                    });
                }
                other => {
                    return Err(Error::corrupted(
                        page_id.0,
                        format!("unexpected {:?} page in tree", other),
                    ));
                }
            }
        }
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Add `(key, rid)`. Duplicate keys, and duplicate pairs, are allowed.
    ///
    /// # Errors
    /// - `Error::InvalidValue` if `key` has the wrong length or is NaN
    /// - `Error::LeafOverflow` if one key's chain would fill a whole leaf
    /// - storage errors, unchanged
    pub fn insert(&mut self, key: &[u8], rid: RecordId) -> Result<()> {
        let attr_len = self.meta.attr_len;
        self.meta.attr_type.validate_key(attr_len, key)?;

        let mut path = PathStack::new();
        let pos = self.descend(key, &mut path)?;

        let split = {
            let mut guard = self.bpm.fetch_page_write(pos.leaf)?;
            let fits = LeafNode::open(pos.leaf, guard.as_slice(), attr_len)?.has_room(!pos.found);
            if fits {
                let mut leaf = LeafNode::open(pos.leaf, guard.as_mut_slice(), attr_len)?;
                let inserted = if pos.found {
                    leaf.insert_duplicate(pos.slot, rid)?
                } else {
                    leaf.insert_key(pos.slot, key, rid)?
                };
                if !inserted {
                    return Err(Error::corrupted(pos.leaf.0, "leaf refused an entry it had room for"));
                }
                None
            } else {
                Some(self.split_leaf(guard, &pos, key, rid)?)
            }
        };

        if let Some((separator, right)) = split {
            self.propagate(path, pos.leaf, separator, right)?;
        }
        Ok(())
    }

    /// Split a full leaf around the new entry. Returns the first key of the
    /// new right sibling and its page.
    fn split_leaf(
        &self,
        mut guard: PageWriteGuard<'_>,
        pos: &LeafPosition,
        key: &[u8],
        rid: RecordId,
    ) -> Result<(Vec<u8>, PageId)> {
        let attr_len = self.meta.attr_len;

        let leaf = LeafNode::open(pos.leaf, guard.as_slice(), attr_len)?;
        let mut entries = leaf.entries()?;
        let next_leaf = leaf.next_leaf();

        if pos.found {
            entries[pos.slot].rids.insert(0, rid);
        } else {
            entries.insert(
                pos.slot,
                LeafEntry {
                    key: key.to_vec(),
                    rids: vec![rid],
                },
            );
        }

        let at = split_point(&entries, attr_len).ok_or(Error::LeafOverflow { page: pos.leaf.0 })?;
        let upper = entries.split_off(at);
        let separator = upper[0].key.clone();

        let mut right_guard = self.bpm.new_page()?;
        let right = right_guard.page_id();
        LeafNode::build(right, right_guard.as_mut_slice(), attr_len, &upper, next_leaf)?;
        LeafNode::build(pos.leaf, guard.as_mut_slice(), attr_len, &entries, right)?;

        debug!(
            "split leaf {}: {} keys stay, {} keys move to leaf {}",
            pos.leaf,
            entries.len(),
            upper.len(),
            right
        );
        Ok((separator, right))
    }

    /// Post `(separator, right)` into the parents recorded in `path`,
    /// splitting internal pages as needed and growing a new root when the
    /// old one splits. `left` is the page that split.
    fn propagate(
        &mut self,
        mut path: PathStack,
        mut left: PageId,
        mut separator: Vec<u8>,
        mut right: PageId,
    ) -> Result<()> {
        let attr_len = self.meta.attr_len;

        while let Some(PathEntry { page, slot }) = path.pop() {
            let mut guard = self.bpm.fetch_page_write(page)?;

            let node = InternalNode::open(page, guard.as_slice(), attr_len)?;
            if !node.is_full() {
                let mut node = InternalNode::open(page, guard.as_mut_slice(), attr_len)?;
                if !node.insert(slot, &separator, right) {
                    return Err(Error::corrupted(page.0, "internal page refused a separator"));
                }
                return Ok(());
            }

            let (first_child, mut pairs) = node.pairs();
            pairs.insert(slot, (separator, right));

            // Lower half stays, the median moves up, upper half goes right
            let mid = pairs.len() / 2;
            let upper = pairs.split_off(mid + 1);
            let (median, upper_first) = pairs
                .pop()
                .ok_or_else(|| Error::corrupted(page.0, "split of an empty internal page"))?;

            let mut new_guard = self.bpm.new_page()?;
            let new_page = new_guard.page_id();
            InternalNode::build(new_guard.as_mut_slice(), attr_len, upper_first, &upper);
            InternalNode::build(guard.as_mut_slice(), attr_len, first_child, &pairs);

            debug!(
                "split internal {}: {} keys stay, {} keys move to {}",
                page,
                pairs.len(),
                upper.len(),
                new_page
            );

            left = page;
            separator = median;
            right = new_page;
        }

        self.grow_root(left, separator, right)
    }

    fn grow_root(&mut self, left: PageId, separator: Vec<u8>, right: PageId) -> Result<()> {
        let attr_len = self.meta.attr_len;
        let root = {
            let mut guard = self.bpm.new_page()?;
            let root = guard.page_id();
            InternalNode::build(guard.as_mut_slice(), attr_len, left, &[(separator, right)]);
            root
        };

        let meta = IndexMeta { root, ..self.meta };
        self.write_meta(&meta)?;
        self.meta = meta;

        debug!("new root {} over {} and {}", root, left, right);
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove one `(key, rid)` pair. Pages are never merged.
    ///
    /// # Errors
    /// - `Error::NotFound` if the key is absent or `rid` is not filed under it
    /// - `Error::InvalidValue` if `key` has the wrong length or is NaN
    pub fn delete(&mut self, key: &[u8], rid: RecordId) -> Result<()> {
        let attr_len = self.meta.attr_len;
        self.meta.attr_type.validate_key(attr_len, key)?;

        let mut path = PathStack::new();
        let pos = self.descend(key, &mut path)?;
        if !pos.found {
            return Err(Error::NotFound);
        }

        let mut guard = self.bpm.fetch_page_write(pos.leaf)?;
        if !LeafNode::open(pos.leaf, guard.as_slice(), attr_len)?.contains(pos.slot, rid)? {
            return Err(Error::NotFound);
        }

        let removal =
            LeafNode::open(pos.leaf, guard.as_mut_slice(), attr_len)?.remove(pos.slot, rid)?;
        if removal == Removal::KeyRemoved {
            trace!("delete: last entry of slot {} in leaf {}", pos.slot, pos.leaf);
        }
        Ok(())
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Walk the whole tree checking its structural invariants: keys ascend
    /// within every page, every key lies within the bounds its parent
    /// separators give it, all leaves sit at the same depth, and the leaf
    /// chain from the leftmost leaf visits every leaf in key order.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` naming the first page that breaks one.
    pub fn verify(&self) -> Result<TreeShape> {
        let mut walk = Walk::default();
        self.verify_page(self.meta.root, None, None, 1, &mut walk)?;

        let mut chained = Vec::with_capacity(walk.leaves.len());
        let mut page_id = self.meta.leftmost;
        while page_id.is_valid() {
            if chained.len() > walk.leaves.len() {
                return Err(Error::corrupted(page_id.0, "leaf chain does not end"));
            }
            chained.push(page_id);
            page_id = self.with_leaf(page_id, |leaf| Ok(leaf.next_leaf()))?;
        }
        if chained != walk.leaves {
            return Err(Error::corrupted(
                self.meta.leftmost.0,
                "leaf chain disagrees with tree order",
            ));
        }

        walk.shape.height = walk.leaf_depth.unwrap_or(0);
        Ok(walk.shape)
    }

    fn verify_page(
        &self,
        page_id: PageId,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<()> {
        if depth > MAX_HEIGHT {
            return Err(Error::corrupted(page_id.0, "tree deeper than possible"));
        }
        let attr_type = self.meta.attr_type;
        let attr_len = self.meta.attr_len;
        let in_bounds = |key: &[u8]| {
            lower.map_or(true, |lo| attr_type.compare(key, lo) != Ordering::Less)
                && upper.map_or(true, |hi| attr_type.compare(key, hi) == Ordering::Less)
        };

        let guard = self.bpm.fetch_page_read(page_id)?;
        match guard.page_type() {
            PageType::BTreeInternal => {
                let (first_child, pairs) =
                    InternalNode::open(page_id, guard.as_slice(), attr_len)?.pairs();
                drop(guard);
                walk.shape.internal_pages += 1;

                for (i, (key, _)) in pairs.iter().enumerate() {
                    if i > 0 && attr_type.compare(&pairs[i - 1].0, key) != Ordering::Less {
                        return Err(Error::corrupted(page_id.0, "separators out of order"));
                    }
                    if !in_bounds(key) {
                        return Err(Error::corrupted(page_id.0, "separator outside parent range"));
                    }
                }

                let children =
                    std::iter::once(first_child).chain(pairs.iter().map(|(_, child)| *child));
                for (i, child) in children.enumerate() {
                    let lo = if i == 0 {
                        lower
                    } else {
                        Some(pairs[i - 1].0.as_slice())
                    };
                    let hi = pairs.get(i).map(|(key, _)| key.as_slice()).or(upper);
                    self.verify_page(child, lo, hi, depth + 1, walk)?;
                }
            }
            PageType::BTreeLeaf => {
                let leaf = LeafNode::open(page_id, guard.as_slice(), attr_len)?;
                walk.shape.leaf_pages += 1;
                walk.shape.keys += leaf.num_keys();
                walk.shape.free_cells += leaf.free_list_len();

                for slot in 0..leaf.num_keys() {
                    let key = leaf.key(slot);
                    if slot > 0 && attr_type.compare(leaf.key(slot - 1), key) != Ordering::Less {
                        return Err(Error::corrupted(page_id.0, "leaf keys out of order"));
                    }
                    if !in_bounds(key) {
                        return Err(Error::corrupted(page_id.0, "leaf key outside parent range"));
                    }
                    walk.shape.entries += leaf.rids(slot)?.len();
                }

                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(Error::corrupted(page_id.0, "leaves at different depths"));
                    }
                    Some(_) => {}
                }
                walk.leaves.push(page_id);
            }
            other => {
                return Err(Error::corrupted(
                    page_id.0,
                    format!("unexpected {:?} page in tree", other),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    shape: TreeShape,
    leaves: Vec<PageId>,
    leaf_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn int(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    /// Zero-padded decimal so byte order matches numeric order.
    fn name(v: u32, len: usize) -> Vec<u8> {
        let mut key = format!("{:08}", v).into_bytes();
        key.resize(len, 0);
        key
    }

    fn int_tree(pool_size: usize) -> (BTreeIndex, TempDir) {
        let dir = tempdir().unwrap();
        let config = IndexConfig::default().with_pool_size(pool_size);
        let tree = BTreeIndex::create(dir.path().join("t.0"), AttrType::Int, 4, &config).unwrap();
        (tree, dir)
    }

    fn rids_under(tree: &BTreeIndex, key: &[u8]) -> Vec<RecordId> {
        let pos = tree.descend(key, &mut PathStack::new()).unwrap();
        if !pos.found {
            return Vec::new();
        }
        tree.with_leaf(pos.leaf, |leaf| leaf.rids(pos.slot)).unwrap()
    }

    #[test]
    fn test_create_lays_out_meta_and_root_leaf() {
        let (tree, _dir) = int_tree(10);

        assert_eq!(tree.root(), PageId::new(1));
        assert_eq!(tree.leftmost_leaf(), PageId::new(1));
        assert_eq!(tree.buffer_pool().disk_page_count(), 2);

        let shape = tree.verify().unwrap();
        assert_eq!(shape.height, 1);
        assert_eq!(shape.keys, 0);
    }

    #[test]
    fn test_create_rejects_bad_attr_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.0");
        let result = BTreeIndex::create(&path, AttrType::Int, 8, &IndexConfig::default());

        assert!(matches!(result, Err(Error::InvalidAttrLength(8))));
        assert!(!path.exists());
    }

    #[test]
    fn test_descend_finds_inserted_key() {
        let (mut tree, _dir) = int_tree(10);
        for v in [30, 10, 20] {
            tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
        }

        let mut path = PathStack::new();
        let pos = tree.descend(&int(20), &mut path).unwrap();
        assert!(path.is_empty());
        assert_eq!(pos.slot, 1);
        assert!(pos.found);

        let pos = tree.descend(&int(25), &mut path).unwrap();
        assert_eq!((pos.slot, pos.found), (2, false));
    }

    #[test]
    fn test_duplicates_share_a_key() {
        let (mut tree, _dir) = int_tree(10);
        for r in 1..=3 {
            tree.insert(&int(7), RecordId::new(r)).unwrap();
        }

        let mut rids = rids_under(&tree, &int(7));
        rids.sort();
        assert_eq!(rids, vec![RecordId::new(1), RecordId::new(2), RecordId::new(3)]);

        let shape = tree.verify().unwrap();
        assert_eq!((shape.keys, shape.entries), (1, 3));
    }

    #[test]
    fn test_leaf_split_grows_root() {
        let (mut tree, _dir) = int_tree(10);
        for v in 0..1000 {
            tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
        }

        let shape = tree.verify().unwrap();
        assert_eq!(shape.height, 2);
        assert!(shape.leaf_pages >= 3);
        assert_eq!(shape.entries, 1000);
        assert_ne!(tree.root(), PageId::new(1));
        assert_eq!(tree.leftmost_leaf(), PageId::new(1));

        // Smallest key still lives in the leftmost leaf
        let first = tree.with_leaf(tree.leftmost_leaf(), |leaf| Ok(leaf.key(0).to_vec()));
        assert_eq!(first.unwrap(), int(0).to_vec());
    }

    #[test]
    fn test_internal_splits_cascade() {
        // 255-byte keys give at most 15 keys per page, so 5000 keys need
        // at least 334 leaves and two internal levels under the root.
        let dir = tempdir().unwrap();
        let config = IndexConfig::default().with_pool_size(1024);
        let mut tree =
            BTreeIndex::create(dir.path().join("t.0"), AttrType::Char, 255, &config).unwrap();

        // Scattered order so splits happen all over the tree
        for v in (0..5000u32).map(|v| (v * 7919) % 5000) {
            tree.insert(&name(v, 255), RecordId::new(v)).unwrap();
        }

        let shape = tree.verify().unwrap();
        assert!(shape.height >= 4, "height {}", shape.height);
        assert_eq!(shape.keys, 5000);

        for v in [0, 1, 2500, 4999] {
            assert_eq!(rids_under(&tree, &name(v, 255)), vec![RecordId::new(v)]);
        }
    }

    #[test]
    fn test_tiny_pool_survives_splits() {
        let (mut tree, _dir) = int_tree(3);
        for v in (0..1000).rev() {
            tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
        }

        assert_eq!(tree.verify().unwrap().entries, 1000);
        assert!(tree.stats().evictions > 0);
        // Every guard was released
        assert_eq!(tree.buffer_pool().pin_count(tree.root()).unwrap_or(0), 0);
    }

    #[test]
    fn test_single_key_overflow_is_reported() {
        let (mut tree, _dir) = int_tree(10);

        let mut stored = 0u32;
        let err = loop {
            match tree.insert(&int(1), RecordId::new(stored)) {
                Ok(()) => stored += 1,
                Err(e) => break e,
            }
            assert!(stored < 5000, "chain never overflowed");
        };

        assert!(matches!(err, Error::LeafOverflow { .. }));
        assert!(stored > 600);
        // The failed insert left the tree as it was
        assert_eq!(tree.verify().unwrap().entries, stored as usize);
    }

    #[test]
    fn test_delete_errors_and_effects() {
        let (mut tree, _dir) = int_tree(10);
        tree.insert(&int(5), RecordId::new(50)).unwrap();
        tree.insert(&int(5), RecordId::new(51)).unwrap();

        assert!(matches!(
            tree.delete(&int(6), RecordId::new(50)),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            tree.delete(&int(5), RecordId::new(99)),
            Err(Error::NotFound)
        ));

        tree.delete(&int(5), RecordId::new(50)).unwrap();
        assert_eq!(rids_under(&tree, &int(5)), vec![RecordId::new(51)]);

        tree.delete(&int(5), RecordId::new(51)).unwrap();
        assert!(rids_under(&tree, &int(5)).is_empty());
        let shape = tree.verify().unwrap();
        assert_eq!(shape.keys, 0);
        assert_eq!(shape.free_cells, 2);
    }

    #[test]
    fn test_delete_then_reinsert_across_leaves() {
        let (mut tree, _dir) = int_tree(10);
        for v in 0..800 {
            tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
        }
        for v in (0..800).step_by(2) {
            tree.delete(&int(v), RecordId::new(v as u32)).unwrap();
        }
        for v in (0..800).step_by(4) {
            tree.insert(&int(v), RecordId::new(1000 + v as u32)).unwrap();
        }

        let shape = tree.verify().unwrap();
        assert_eq!(shape.entries, 400 + 200);
        assert_eq!(rids_under(&tree, &int(8)), vec![RecordId::new(1008)]);
        assert!(rids_under(&tree, &int(2)).is_empty());
    }

    #[test]
    fn test_insert_rejects_bad_keys() {
        let (mut tree, _dir) = int_tree(10);
        assert!(matches!(
            tree.insert(&[1, 2], RecordId::new(1)),
            Err(Error::InvalidValue(_))
        ));

        let dir = tempdir().unwrap();
        let mut floats = BTreeIndex::create(
            dir.path().join("f.0"),
            AttrType::Float,
            4,
            &IndexConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            floats.insert(&f32::NAN.to_le_bytes(), RecordId::new(1)),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_reopen_keeps_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.0");
        let config = IndexConfig::default();
        let root = {
            let mut tree = BTreeIndex::create(&path, AttrType::Int, 4, &config).unwrap();
            for v in 0..1000 {
                tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
            }
            tree.flush().unwrap();
            tree.root()
        };

        let tree = BTreeIndex::open(&path, &config).unwrap();
        assert_eq!(tree.root(), root);
        assert_eq!(tree.attr_type(), AttrType::Int);
        assert_eq!(tree.attr_len(), 4);
        assert_eq!(tree.verify().unwrap().entries, 1000);
    }
}
