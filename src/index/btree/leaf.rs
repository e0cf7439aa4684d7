//! Leaf page codec.
//!
//! ```text
//! +--------+------------------+-------------------+------------------+
//! | header | key slots ->     |    free space     |   <- chain cells |
//! +--------+------------------+-------------------+------------------+
//! 0        23              key_ptr           rec_id_ptr          4096
//! ```
//!
//! Header (after the common type + checksum bytes):
//!
//! | Offset | Size | Field              |
//! |--------|------|--------------------|
//! | 5      | 4    | next_leaf          |
//! | 9      | 2    | rec_id_ptr         |
//! | 11     | 2    | key_ptr            |
//! | 13     | 2    | free_list_ptr      |
//! | 15     | 2    | num_in_free_list   |
//! | 17     | 2    | attr_length        |
//! | 19     | 2    | num_keys           |
//! | 21     | 2    | max_keys           |
//!
//! A key slot is the key bytes followed by the u16 offset of its chain head.
//! A chain cell is a u32 record id followed by the u16 offset of the next
//! cell; offset 0 ends a chain. Released cells go on a free list threaded
//! through the same `next` field and are reused before the cell area grows.

use std::ops::{Deref, DerefMut};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::{PageHeader, PageType};

use super::key::AttrType;
use super::{read_page_id, read_rid, read_u16, write_page_id, write_rid, write_u16};

pub(crate) const LEAF_HEADER_SIZE: usize = 23;
pub(crate) const CELL_SIZE: usize = 6;
pub(crate) const NULL_CELL: u16 = 0;

/// Bytes available to slots and cells.
const LEAF_CAPACITY: usize = PAGE_SIZE - LEAF_HEADER_SIZE;

const OFFSET_NEXT_LEAF: usize = 5;
const OFFSET_REC_ID_PTR: usize = 9;
const OFFSET_KEY_PTR: usize = 11;
const OFFSET_FREE_LIST_PTR: usize = 13;
const OFFSET_NUM_IN_FREE_LIST: usize = 15;
const OFFSET_ATTR_LENGTH: usize = 17;
const OFFSET_NUM_KEYS: usize = 19;
const OFFSET_MAX_KEYS: usize = 21;

/// Most keys a leaf can hold, each with a single record id.
pub(crate) fn leaf_max_keys(attr_len: usize) -> usize {
    LEAF_CAPACITY / (attr_len + 2 + CELL_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LeafHeader {
    next_leaf: PageId,
    rec_id_ptr: u16,
    key_ptr: u16,
    free_list_ptr: u16,
    num_in_free_list: u16,
    attr_length: u16,
    num_keys: u16,
    max_keys: u16,
}

impl LeafHeader {
    fn empty(attr_len: usize) -> Self {
        Self {
            next_leaf: PageId::INVALID,
            rec_id_ptr: PAGE_SIZE as u16,
            key_ptr: LEAF_HEADER_SIZE as u16,
            free_list_ptr: NULL_CELL,
            num_in_free_list: 0,
            attr_length: attr_len as u16,
            num_keys: 0,
            max_keys: leaf_max_keys(attr_len) as u16,
        }
    }

    fn decode(page_id: PageId, data: &[u8], attr_len: usize) -> Result<Self> {
        let bad = |reason: String| Error::corrupted(page_id.0, reason);

        let page_type = PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE]);
        if page_type != PageType::BTreeLeaf {
            return Err(bad(format!("expected a leaf page, found {:?}", page_type)));
        }

        let header = Self {
            next_leaf: read_page_id(data, OFFSET_NEXT_LEAF),
            rec_id_ptr: read_u16(data, OFFSET_REC_ID_PTR),
            key_ptr: read_u16(data, OFFSET_KEY_PTR),
            free_list_ptr: read_u16(data, OFFSET_FREE_LIST_PTR),
            num_in_free_list: read_u16(data, OFFSET_NUM_IN_FREE_LIST),
            attr_length: read_u16(data, OFFSET_ATTR_LENGTH),
            num_keys: read_u16(data, OFFSET_NUM_KEYS),
            max_keys: read_u16(data, OFFSET_MAX_KEYS),
        };

        if header.attr_length as usize != attr_len {
            return Err(bad(format!(
                "attribute length {} does not match index ({})",
                header.attr_length, attr_len
            )));
        }
        if header.max_keys as usize != leaf_max_keys(attr_len) {
            return Err(bad(format!("bad max_keys {}", header.max_keys)));
        }
        if header.num_keys > header.max_keys {
            return Err(bad(format!(
                "{} keys exceed capacity {}",
                header.num_keys, header.max_keys
            )));
        }
        let expected_key_ptr = LEAF_HEADER_SIZE + header.num_keys as usize * (attr_len + 2);
        if header.key_ptr as usize != expected_key_ptr {
            return Err(bad(format!(
                "key_ptr {} should be {}",
                header.key_ptr, expected_key_ptr
            )));
        }
        if header.rec_id_ptr < header.key_ptr || header.rec_id_ptr as usize > PAGE_SIZE {
            return Err(bad(format!("rec_id_ptr {} out of range", header.rec_id_ptr)));
        }
        if header.free_list_ptr != NULL_CELL && !header.cell_in_bounds(header.free_list_ptr) {
            return Err(bad(format!(
                "free_list_ptr {} out of range",
                header.free_list_ptr
            )));
        }
        Ok(header)
    }

    fn encode(&self, data: &mut [u8]) {
        write_page_id(data, OFFSET_NEXT_LEAF, self.next_leaf);
        write_u16(data, OFFSET_REC_ID_PTR, self.rec_id_ptr);
        write_u16(data, OFFSET_KEY_PTR, self.key_ptr);
        write_u16(data, OFFSET_FREE_LIST_PTR, self.free_list_ptr);
        write_u16(data, OFFSET_NUM_IN_FREE_LIST, self.num_in_free_list);
        write_u16(data, OFFSET_ATTR_LENGTH, self.attr_length);
        write_u16(data, OFFSET_NUM_KEYS, self.num_keys);
        write_u16(data, OFFSET_MAX_KEYS, self.max_keys);
    }

    fn cell_in_bounds(&self, offset: u16) -> bool {
        offset >= self.rec_id_ptr && offset as usize + CELL_SIZE <= PAGE_SIZE
    }
}

/// One key and every record id filed under it, head of the chain first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeafEntry {
    pub key: Vec<u8>,
    pub rids: Vec<RecordId>,
}

/// What [`LeafNode::remove`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// The record id is not filed under the key.
    Absent,
    /// The record id was unlinked; the key still has others.
    Removed,
    /// The last record id was unlinked and the key slot removed.
    KeyRemoved,
}

/// A leaf page viewed through its bytes.
///
/// `B` is `&[u8]` for a read-only view and `&mut [u8]` for one that can
/// mutate. The header is validated on open and cached.
pub(crate) struct LeafNode<B> {
    page_id: PageId,
    data: B,
    header: LeafHeader,
}

impl<B: Deref<Target = [u8]>> LeafNode<B> {
    /// Validate the header and wrap the page.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the page is not a well-formed leaf of
    /// this attribute length.
    pub(crate) fn open(page_id: PageId, data: B, attr_len: usize) -> Result<Self> {
        let header = LeafHeader::decode(page_id, &data, attr_len)?;
        Ok(Self {
            page_id,
            data,
            header,
        })
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn num_keys(&self) -> usize {
        self.header.num_keys as usize
    }

    pub(crate) fn max_keys(&self) -> usize {
        self.header.max_keys as usize
    }

    pub(crate) fn next_leaf(&self) -> PageId {
        self.header.next_leaf
    }

    pub(crate) fn free_list_len(&self) -> usize {
        self.header.num_in_free_list as usize
    }

    /// Unused bytes between the slot array and the cell area.
    pub(crate) fn free_bytes(&self) -> usize {
        (self.header.rec_id_ptr - self.header.key_ptr) as usize
    }

    fn attr_len(&self) -> usize {
        self.header.attr_length as usize
    }

    fn slot_size(&self) -> usize {
        self.attr_len() + 2
    }

    fn slot_offset(&self, slot: usize) -> usize {
        LEAF_HEADER_SIZE + slot * self.slot_size()
    }

    /// Upper bound on the number of cells the page can hold right now.
    fn cell_capacity(&self) -> usize {
        (PAGE_SIZE - self.header.rec_id_ptr as usize) / CELL_SIZE
    }

    pub(crate) fn key(&self, slot: usize) -> &[u8] {
        let offset = self.slot_offset(slot);
        &self.bytes()[offset..offset + self.attr_len()]
    }

    pub(crate) fn chain_head(&self, slot: usize) -> u16 {
        read_u16(self.bytes(), self.slot_offset(slot) + self.attr_len())
    }

    /// Read the cell at `offset` as `(rid, next)`.
    pub(crate) fn cell(&self, offset: u16) -> Result<(RecordId, u16)> {
        if !self.header.cell_in_bounds(offset) {
            return Err(Error::corrupted(
                self.page_id.0,
                format!("cell offset {} out of range", offset),
            ));
        }
        let offset = offset as usize;
        let rid = read_rid(self.bytes(), offset);
        let next = read_u16(self.bytes(), offset + 4);
        Ok((rid, next))
    }

    /// Binary search for `key`: `(slot, true)` on an exact match, otherwise
    /// `(slot, false)` where `slot` is the insertion point.
    pub(crate) fn search(&self, key: &[u8], attr_type: AttrType) -> (usize, bool) {
        let (mut lo, mut hi) = (0, self.num_keys());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match attr_type.compare(self.key(mid), key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return (mid, true),
            }
        }
        (lo, false)
    }

    /// Record ids under `slot`, head of the chain first.
    pub(crate) fn rids(&self, slot: usize) -> Result<Vec<RecordId>> {
        let limit = self.cell_capacity();
        let mut rids = Vec::new();
        let mut offset = self.chain_head(slot);
        while offset != NULL_CELL {
            if rids.len() >= limit {
                return Err(Error::corrupted(
                    self.page_id.0,
                    format!("cycle in chain of slot {}", slot),
                ));
            }
            let (rid, next) = self.cell(offset)?;
            rids.push(rid);
            offset = next;
        }
        if rids.is_empty() {
            return Err(Error::corrupted(
                self.page_id.0,
                format!("slot {} has an empty chain", slot),
            ));
        }
        Ok(rids)
    }

    pub(crate) fn contains(&self, slot: usize, rid: RecordId) -> Result<bool> {
        Ok(self.rids(slot)?.contains(&rid))
    }

    /// Whether one more entry fits without splitting. `new_key` is true when
    /// the entry needs a fresh slot, false when it joins an existing chain.
    pub(crate) fn has_room(&self, new_key: bool) -> bool {
        let cell_bytes = if self.header.free_list_ptr != NULL_CELL {
            0
        } else {
            CELL_SIZE
        };
        if new_key {
            self.num_keys() < self.max_keys() && self.free_bytes() >= self.slot_size() + cell_bytes
        } else {
            self.free_bytes() >= cell_bytes
        }
    }

    pub(crate) fn entries(&self) -> Result<Vec<LeafEntry>> {
        (0..self.num_keys())
            .map(|slot| {
                Ok(LeafEntry {
                    key: self.key(slot).to_vec(),
                    rids: self.rids(slot)?,
                })
            })
            .collect()
    }
}

impl<B: DerefMut<Target = [u8]>> LeafNode<B> {
    /// Format `data` as an empty leaf with no successor.
    pub(crate) fn init(page_id: PageId, data: B, attr_len: usize) -> Self {
        let mut node = Self {
            page_id,
            data,
            header: LeafHeader::empty(attr_len),
        };
        node.bytes_mut().fill(0);
        PageHeader::new(PageType::BTreeLeaf).write_to(node.bytes_mut());
        node.write_header();
        node
    }

    /// Format `data` as a compact leaf holding `entries` in order.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the entries do not fit one page.
    pub(crate) fn build(
        page_id: PageId,
        data: B,
        attr_len: usize,
        entries: &[LeafEntry],
        next_leaf: PageId,
    ) -> Result<Self> {
        let mut node = Self::init(page_id, data, attr_len);
        node.set_next_leaf(next_leaf);

        for entry in entries {
            let Some((last, rest)) = entry.rids.split_last() else {
                continue;
            };
            let slot = node.num_keys();
            if !node.insert_key(slot, &entry.key, *last)? {
                return Err(Error::corrupted(page_id.0, "entries overflow the leaf"));
            }
            // Pushing at the head in reverse keeps the chain order
            for rid in rest.iter().rev() {
                if !node.insert_duplicate(slot, *rid)? {
                    return Err(Error::corrupted(page_id.0, "entries overflow the leaf"));
                }
            }
        }
        Ok(node)
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn write_header(&mut self) {
        let header = self.header;
        header.encode(self.bytes_mut());
    }

    fn write_cell(&mut self, offset: u16, rid: RecordId, next: u16) {
        let offset = offset as usize;
        write_rid(self.bytes_mut(), offset, rid);
        write_u16(self.bytes_mut(), offset + 4, next);
    }

    fn set_cell_next(&mut self, offset: u16, next: u16) {
        write_u16(self.bytes_mut(), offset as usize + 4, next);
    }

    fn set_chain_head(&mut self, slot: usize, head: u16) {
        let offset = self.slot_offset(slot) + self.attr_len();
        write_u16(self.bytes_mut(), offset, head);
    }

    pub(crate) fn set_next_leaf(&mut self, next: PageId) {
        self.header.next_leaf = next;
        self.write_header();
    }

    /// Take a cell from the free list, or grow the cell area downward.
    fn alloc_cell(&mut self) -> Result<u16> {
        if self.header.free_list_ptr != NULL_CELL {
            let cell = self.header.free_list_ptr;
            let (_, next) = self.cell(cell)?;
            self.header.free_list_ptr = next;
            self.header.num_in_free_list = self.header.num_in_free_list.saturating_sub(1);
            Ok(cell)
        } else {
            self.header.rec_id_ptr -= CELL_SIZE as u16;
            Ok(self.header.rec_id_ptr)
        }
    }

    fn free_cell(&mut self, offset: u16) {
        let head = self.header.free_list_ptr;
        self.set_cell_next(offset, head);
        self.header.free_list_ptr = offset;
        self.header.num_in_free_list += 1;
    }

    /// Insert `key` at `slot` with a single-element chain.
    ///
    /// Returns `Ok(false)` without touching the page if there is no room.
    pub(crate) fn insert_key(&mut self, slot: usize, key: &[u8], rid: RecordId) -> Result<bool> {
        debug_assert!(slot <= self.num_keys());
        if !self.has_room(true) {
            return Ok(false);
        }

        let cell = self.alloc_cell()?;
        self.write_cell(cell, rid, NULL_CELL);

        let attr_len = self.attr_len();
        let size = self.slot_size();
        let start = self.slot_offset(slot);
        let end = self.header.key_ptr as usize;
        let data = self.bytes_mut();
        data.copy_within(start..end, start + size);
        data[start..start + attr_len].copy_from_slice(key);
        write_u16(data, start + attr_len, cell);

        self.header.num_keys += 1;
        self.header.key_ptr += size as u16;
        self.write_header();
        Ok(true)
    }

    /// Link `rid` at the head of the chain under `slot`.
    ///
    /// Returns `Ok(false)` without touching the page if there is no room.
    pub(crate) fn insert_duplicate(&mut self, slot: usize, rid: RecordId) -> Result<bool> {
        if !self.has_room(false) {
            return Ok(false);
        }
        let head = self.chain_head(slot);
        let cell = self.alloc_cell()?;
        self.write_cell(cell, rid, head);
        self.set_chain_head(slot, cell);
        self.write_header();
        Ok(true)
    }

    /// Unlink `rid` from the chain under `slot`, dropping the slot if the
    /// chain empties.
    pub(crate) fn remove(&mut self, slot: usize, rid: RecordId) -> Result<Removal> {
        let limit = self.cell_capacity();
        let mut prev: Option<u16> = None;
        let mut offset = self.chain_head(slot);
        let mut steps = 0;

        while offset != NULL_CELL {
            steps += 1;
            if steps > limit {
                return Err(Error::corrupted(
                    self.page_id.0,
                    format!("cycle in chain of slot {}", slot),
                ));
            }
            let (current, next) = self.cell(offset)?;
            if current == rid {
                match prev {
                    None => self.set_chain_head(slot, next),
                    Some(prev) => self.set_cell_next(prev, next),
                }
                self.free_cell(offset);

                let removal = if self.chain_head(slot) == NULL_CELL {
                    self.remove_slot(slot);
                    Removal::KeyRemoved
                } else {
                    Removal::Removed
                };
                self.write_header();
                return Ok(removal);
            }
            prev = Some(offset);
            offset = next;
        }
        Ok(Removal::Absent)
    }

    fn remove_slot(&mut self, slot: usize) {
        let size = self.slot_size();
        let start = self.slot_offset(slot);
        let end = self.header.key_ptr as usize;
        let data = self.bytes_mut();
        data.copy_within(start + size..end, start);
        data[end - size..end].fill(0);

        self.header.num_keys -= 1;
        self.header.key_ptr -= size as u16;
    }
}

/// Pick where to cut an overfull run of entries: the first `k` stay left.
///
/// Both halves must be non-empty and fit a page; among those cuts the one
/// balancing bytes best wins. `None` means no legal cut exists, which only
/// happens when one key's chain alone fills a page.
pub(crate) fn split_point(entries: &[LeafEntry], attr_len: usize) -> Option<usize> {
    let max_keys = leaf_max_keys(attr_len);
    let sizes: Vec<usize> = entries
        .iter()
        .map(|e| attr_len + 2 + e.rids.len() * CELL_SIZE)
        .collect();
    let total: usize = sizes.iter().sum();

    let mut best: Option<(usize, usize)> = None;
    let mut left = 0;
    for k in 1..entries.len() {
        left += sizes[k - 1];
        let right = total - left;
        let fits = left <= LEAF_CAPACITY
            && right <= LEAF_CAPACITY
            && k <= max_keys
            && entries.len() - k <= max_keys;
        if !fits {
            continue;
        }
        let heavier = left.max(right);
        if best.map_or(true, |(_, b)| heavier < b) {
            best = Some((k, heavier));
        }
    }
    best.map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::Page;

    fn key(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    fn rid(v: u32) -> RecordId {
        RecordId::new(v)
    }

    #[test]
    fn test_empty_leaf_layout() {
        let mut page = Page::new();
        let leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);

        assert_eq!(leaf.num_keys(), 0);
        assert_eq!(leaf.max_keys(), (4096 - 23) / 12);
        assert!(!leaf.next_leaf().is_valid());
        assert_eq!(leaf.free_bytes(), 4096 - 23);

        let data = page.as_slice();
        assert_eq!(PageType::from_u8(data[0]), PageType::BTreeLeaf);
        assert_eq!(read_u16(data, OFFSET_REC_ID_PTR), 4096);
        assert_eq!(read_u16(data, OFFSET_KEY_PTR), 23);
        assert_eq!(read_u16(data, OFFSET_ATTR_LENGTH), 4);
    }

    #[test]
    fn test_insert_keeps_slots_sorted() {
        let mut page = Page::new();
        let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);

        for v in [50, 10, 30, 20, 40] {
            let (slot, found) = leaf.search(&key(v), AttrType::Int);
            assert!(!found);
            assert!(leaf.insert_key(slot, &key(v), rid(v as u32)).unwrap());
        }

        let keys: Vec<_> = (0..leaf.num_keys()).map(|s| leaf.key(s).to_vec()).collect();
        let expected: Vec<_> = [10, 20, 30, 40, 50].iter().map(|v| key(*v).to_vec()).collect();
        assert_eq!(keys, expected);
        assert_eq!(leaf.search(&key(30), AttrType::Int), (2, true));
        assert_eq!(leaf.search(&key(35), AttrType::Int), (3, false));
        assert_eq!(leaf.search(&key(99), AttrType::Int), (5, false));
    }

    #[test]
    fn test_duplicates_link_at_head() {
        let mut page = Page::new();
        let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);

        leaf.insert_key(0, &key(7), rid(1)).unwrap();
        leaf.insert_duplicate(0, rid(2)).unwrap();
        leaf.insert_duplicate(0, rid(3)).unwrap();

        assert_eq!(leaf.num_keys(), 1);
        assert_eq!(leaf.rids(0).unwrap(), vec![rid(3), rid(2), rid(1)]);
    }

    #[test]
    fn test_remove_reuses_cells() {
        let mut page = Page::new();
        let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);

        leaf.insert_key(0, &key(7), rid(1)).unwrap();
        leaf.insert_duplicate(0, rid(2)).unwrap();
        let free_before = leaf.free_bytes();

        assert_eq!(leaf.remove(0, rid(1)).unwrap(), Removal::Removed);
        assert_eq!(leaf.free_list_len(), 1);
        assert_eq!(leaf.rids(0).unwrap(), vec![rid(2)]);

        // Reinsert takes the freed cell rather than growing the cell area
        leaf.insert_duplicate(0, rid(9)).unwrap();
        assert_eq!(leaf.free_list_len(), 0);
        assert_eq!(leaf.free_bytes(), free_before);
    }

    #[test]
    fn test_remove_last_rid_drops_slot() {
        let mut page = Page::new();
        let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
        for (slot, v) in [1, 2, 3].into_iter().enumerate() {
            leaf.insert_key(slot, &key(v), rid(v as u32)).unwrap();
        }

        assert_eq!(leaf.remove(1, rid(99)).unwrap(), Removal::Absent);
        assert_eq!(leaf.remove(1, rid(2)).unwrap(), Removal::KeyRemoved);

        assert_eq!(leaf.num_keys(), 2);
        assert_eq!(leaf.key(0), key(1));
        assert_eq!(leaf.key(1), key(3));
        assert_eq!(leaf.rids(1).unwrap(), vec![rid(3)]);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut page = Page::new();
        let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
        let max = leaf.max_keys();

        for v in 0..max {
            assert!(leaf.insert_key(v, &key(v as i32), rid(v as u32)).unwrap());
        }
        assert!(!leaf.has_room(true));
        assert!(!leaf.insert_key(max, &key(max as i32), rid(0)).unwrap());
        assert_eq!(leaf.num_keys(), max);
    }

    #[test]
    fn test_refused_insert_leaves_page_untouched() {
        let mut page = Page::new();
        {
            let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
            for v in 0..leaf.max_keys() {
                leaf.insert_key(v, &key(v as i32), rid(v as u32)).unwrap();
            }
        }
        let before = page.as_slice().to_vec();

        let mut leaf = LeafNode::open(PageId::new(1), page.as_mut_slice(), 4).unwrap();
        // 5 bytes left: not enough for another cell
        assert!(!leaf.insert_duplicate(0, rid(9999)).unwrap());
        assert!(!leaf.insert_key(0, &key(-1), rid(9999)).unwrap());
        assert_eq!(page.as_slice(), before.as_slice());
    }

    #[test]
    fn test_open_rejects_count_above_capacity() {
        let mut page = Page::new();
        LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
        write_u16(page.as_mut_slice(), OFFSET_NUM_KEYS, 5000);
        assert!(matches!(
            LeafNode::open(PageId::new(1), page.as_slice(), 4),
            Err(Error::Corrupted { page: 1, .. })
        ));

        write_u16(page.as_mut_slice(), OFFSET_NUM_KEYS, leaf_max_keys(4) as u16 + 1);
        assert!(LeafNode::open(PageId::new(1), page.as_slice(), 4).is_err());
    }

    #[test]
    fn test_reopen_from_bytes() {
        let mut page = Page::new();
        {
            let mut leaf = LeafNode::init(PageId::new(4), page.as_mut_slice(), 4);
            leaf.insert_key(0, &key(5), rid(50)).unwrap();
            leaf.set_next_leaf(PageId::new(9));
        }

        let leaf = LeafNode::open(PageId::new(4), page.as_slice(), 4).unwrap();
        assert_eq!(leaf.num_keys(), 1);
        assert_eq!(leaf.next_leaf(), PageId::new(9));
        assert_eq!(leaf.rids(0).unwrap(), vec![rid(50)]);
    }

    #[test]
    fn test_open_rejects_bad_pages() {
        let page = Page::new();
        assert!(matches!(
            LeafNode::open(PageId::new(1), page.as_slice(), 4),
            Err(Error::Corrupted { page: 1, .. })
        ));

        let mut page = Page::new();
        LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
        assert!(LeafNode::open(PageId::new(1), page.as_slice(), 8).is_err());

        write_u16(page.as_mut_slice(), OFFSET_KEY_PTR, 100);
        assert!(LeafNode::open(PageId::new(1), page.as_slice(), 4).is_err());
    }

    #[test]
    fn test_chain_cycle_is_detected() {
        let mut page = Page::new();
        {
            let mut leaf = LeafNode::init(PageId::new(1), page.as_mut_slice(), 4);
            leaf.insert_key(0, &key(1), rid(1)).unwrap();
        }
        // Point the only cell at itself
        let cell = read_u16(page.as_slice(), LEAF_HEADER_SIZE + 4);
        write_u16(page.as_mut_slice(), cell as usize + 4, cell);

        let leaf = LeafNode::open(PageId::new(1), page.as_slice(), 4).unwrap();
        assert!(matches!(leaf.rids(0), Err(Error::Corrupted { .. })));
    }

    #[test]
    fn test_build_preserves_entries() {
        let entries = vec![
            LeafEntry {
                key: key(1).to_vec(),
                rids: vec![rid(3), rid(2), rid(1)],
            },
            LeafEntry {
                key: key(4).to_vec(),
                rids: vec![rid(4)],
            },
        ];
        let mut page = Page::new();
        let leaf =
            LeafNode::build(PageId::new(2), page.as_mut_slice(), 4, &entries, PageId::new(7))
                .unwrap();

        assert_eq!(leaf.entries().unwrap(), entries);
        assert_eq!(leaf.next_leaf(), PageId::new(7));
        assert_eq!(leaf.free_list_len(), 0);
    }

    #[test]
    fn test_split_point_balances_bytes() {
        let mut entries: Vec<LeafEntry> = (0..10)
            .map(|v| LeafEntry {
                key: key(v).to_vec(),
                rids: vec![rid(v as u32)],
            })
            .collect();
        assert_eq!(split_point(&entries, 4), Some(5));

        // A heavy first key pulls the cut toward the front
        entries[0].rids = (0..40).map(rid).collect();
        assert_eq!(split_point(&entries, 4), Some(1));
    }

    #[test]
    fn test_split_point_single_key_has_no_cut() {
        let entries = vec![LeafEntry {
            key: key(1).to_vec(),
            rids: (0..700).map(rid).collect(),
        }];
        assert_eq!(split_point(&entries, 4), None);
    }
}
