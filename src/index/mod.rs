//! Access method: B+-tree indexes and scans over them.
//!
//! - [`btree`] - page codecs, descent, insert and delete
//! - [`scan`] - scan operators and the scan table
//! - [`manager`] - [`IndexManager`], the entry point for callers

pub mod btree;
pub mod manager;
pub mod scan;

pub use btree::{AttrType, AttrValue, BTreeIndex, LeafPosition, PathStack, TreeShape};
pub use manager::{IndexId, IndexManager, ScanId};
pub use scan::{ScanOp, ScanState};
