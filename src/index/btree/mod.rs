//! Disk-backed B+-tree.
//!
//! - [`key`] - attribute types and the comparator
//! - `leaf`, `internal`, `meta` - page codecs over raw page bytes
//! - [`path`] - the descent path used for split propagation
//! - [`tree`] - descent, insert with splits, delete
//!
//! Codecs never do I/O; the tree fixes pages through the buffer pool and
//! hands their bytes to the codecs.

mod internal;
pub mod key;
mod leaf;
mod meta;
pub mod path;
pub mod tree;

pub use key::{AttrType, AttrValue};
pub use path::{PathEntry, PathStack};
pub use tree::{BTreeIndex, LeafPosition, TreeShape};

pub(crate) use leaf::{LeafNode, NULL_CELL};

use crate::common::{PageId, RecordId};

// Little-endian field access shared by the codecs.

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_bytes4(data: &[u8], offset: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    bytes
}

fn read_page_id(data: &[u8], offset: usize) -> PageId {
    PageId::from_le_bytes(read_bytes4(data, offset))
}

fn write_page_id(data: &mut [u8], offset: usize, page_id: PageId) {
    data[offset..offset + 4].copy_from_slice(&page_id.to_le_bytes());
}

fn read_rid(data: &[u8], offset: usize) -> RecordId {
    RecordId::from_le_bytes(read_bytes4(data, offset))
}

fn write_rid(data: &mut [u8], offset: usize, rid: RecordId) {
    data[offset..offset + 4].copy_from_slice(&rid.to_le_bytes());
}
