//! Internal (non-leaf) page codec.
//!
//! ```text
//! +--------+--------+------+--------+------+--------+-----+
//! | header | child0 | key0 | child1 | key1 | child2 | ... |
//! +--------+--------+------+--------+------+--------+-----+
//! 0        11       15
//! ```
//!
//! Header: type and checksum, then `num_keys` (u16 @5), `max_keys` (u16 @7)
//! and `attr_length` (u16 @9). Child `i` holds keys `k` with
//! `key[i-1] <= k < key[i]`.

use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{PageHeader, PageType};

use super::key::AttrType;
use super::{read_page_id, read_u16, write_page_id, write_u16};

pub(crate) const INTERNAL_HEADER_SIZE: usize = 11;

const OFFSET_NUM_KEYS: usize = 5;
const OFFSET_MAX_KEYS: usize = 7;
const OFFSET_ATTR_LENGTH: usize = 9;
const OFFSET_FIRST_CHILD: usize = INTERNAL_HEADER_SIZE;
const OFFSET_PAIRS: usize = INTERNAL_HEADER_SIZE + 4;

pub(crate) fn internal_max_keys(attr_len: usize) -> usize {
    (PAGE_SIZE - OFFSET_PAIRS) / (attr_len + 4)
}

/// A separator and the child to its right.
pub(crate) type Pair = (Vec<u8>, PageId);

/// An internal page viewed through its bytes; see [`LeafNode`] for the
/// `B` convention.
///
/// [`LeafNode`]: super::leaf::LeafNode
pub(crate) struct InternalNode<B> {
    data: B,
    num_keys: usize,
    attr_len: usize,
}

impl<B: Deref<Target = [u8]>> InternalNode<B> {
    /// # Errors
    /// Returns `Error::Corrupted` if the page is not a well-formed internal
    /// page of this attribute length.
    pub(crate) fn open(page_id: PageId, data: B, attr_len: usize) -> Result<Self> {
        let bad = |reason: String| Error::corrupted(page_id.0, reason);

        let page_type = PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE]);
        if page_type != PageType::BTreeInternal {
            return Err(bad(format!(
                "expected an internal page, found {:?}",
                page_type
            )));
        }

        let num_keys = read_u16(&data, OFFSET_NUM_KEYS) as usize;
        let max_keys = read_u16(&data, OFFSET_MAX_KEYS) as usize;
        let stored_attr_len = read_u16(&data, OFFSET_ATTR_LENGTH) as usize;

        if stored_attr_len != attr_len {
            return Err(bad(format!(
                "attribute length {} does not match index ({})",
                stored_attr_len, attr_len
            )));
        }
        if max_keys != internal_max_keys(attr_len) {
            return Err(bad(format!("bad max_keys {}", max_keys)));
        }
        if num_keys == 0 || num_keys > max_keys {
            return Err(bad(format!("bad key count {}", num_keys)));
        }

        Ok(Self {
            data,
            num_keys,
            attr_len,
        })
    }

    #[cfg(test)]
    pub(crate) fn num_keys(&self) -> usize {
        self.num_keys
    }

    pub(crate) fn is_full(&self) -> bool {
        self.num_keys >= internal_max_keys(self.attr_len)
    }

    fn pair_size(&self) -> usize {
        self.attr_len + 4
    }

    fn key_offset(&self, index: usize) -> usize {
        OFFSET_PAIRS + index * self.pair_size()
    }

    fn child_offset(&self, index: usize) -> usize {
        if index == 0 {
            OFFSET_FIRST_CHILD
        } else {
            self.key_offset(index - 1) + self.attr_len
        }
    }

    pub(crate) fn key(&self, index: usize) -> &[u8] {
        let offset = self.key_offset(index);
        &self.data[offset..offset + self.attr_len]
    }

    pub(crate) fn child(&self, index: usize) -> PageId {
        read_page_id(&self.data, self.child_offset(index))
    }

    /// Index of the child covering `key`: the number of separators `<= key`.
    pub(crate) fn find_child(&self, key: &[u8], attr_type: AttrType) -> usize {
        let (mut lo, mut hi) = (0, self.num_keys);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if attr_type.compare(self.key(mid), key) == Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// First child and every separator/child pair.
    pub(crate) fn pairs(&self) -> (PageId, Vec<Pair>) {
        let pairs = (0..self.num_keys)
            .map(|i| (self.key(i).to_vec(), self.child(i + 1)))
            .collect();
        (self.child(0), pairs)
    }
}

impl<B: DerefMut<Target = [u8]>> InternalNode<B> {
    /// Format `data` as an internal page.
    pub(crate) fn build(
        mut data: B,
        attr_len: usize,
        first_child: PageId,
        pairs: &[Pair],
    ) -> Self {
        debug_assert!(!pairs.is_empty() && pairs.len() <= internal_max_keys(attr_len));

        data.fill(0);
        PageHeader::new(PageType::BTreeInternal).write_to(&mut data);
        write_u16(&mut data, OFFSET_NUM_KEYS, pairs.len() as u16);
        write_u16(&mut data, OFFSET_MAX_KEYS, internal_max_keys(attr_len) as u16);
        write_u16(&mut data, OFFSET_ATTR_LENGTH, attr_len as u16);
        write_page_id(&mut data, OFFSET_FIRST_CHILD, first_child);

        let mut offset = OFFSET_PAIRS;
        for (key, child) in pairs {
            data[offset..offset + attr_len].copy_from_slice(key);
            write_page_id(&mut data, offset + attr_len, *child);
            offset += attr_len + 4;
        }

        Self {
            data,
            num_keys: pairs.len(),
            attr_len,
        }
    }

    /// Insert `key` at `index` with `child` to its right, shifting later
    /// pairs. Returns `false` without touching the page if it is full.
    pub(crate) fn insert(&mut self, index: usize, key: &[u8], child: PageId) -> bool {
        debug_assert!(index <= self.num_keys);
        if self.is_full() {
            return false;
        }

        let size = self.pair_size();
        let start = self.key_offset(index);
        let end = self.key_offset(self.num_keys);
        let attr_len = self.attr_len;

        self.data.copy_within(start..end, start + size);
        self.data[start..start + attr_len].copy_from_slice(key);
        write_page_id(&mut self.data, start + attr_len, child);

        self.num_keys += 1;
        write_u16(&mut self.data, OFFSET_NUM_KEYS, self.num_keys as u16);
        true
    }
}
