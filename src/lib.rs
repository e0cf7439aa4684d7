//! amindex - a disk-backed B+-tree access method.
//!
//! Maps fixed-length typed keys to record identifiers, with duplicate keys,
//! page splits that propagate up to a new root, and seven-operator scans.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            amindex                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Access Method (index/)                      │   │
//! │  │   IndexManager → BTreeIndex → leaf / internal codecs     │   │
//! │  │   ScanTable → ScanDesc (=, <, >, <=, >=, <>, *)          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)  [one per open index]       │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │       Replacement Policies: LRU | MRU           │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │   BufferPoolManager + Frame + page guards + Statistics  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskManager + Page + PageHeader (CRC32)           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`buffer`] - Buffer pool management and replacement policies
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - The B+-tree, scans and the index manager
//!
//! # Quick Start
//! ```no_run
//! use amindex::index::{AttrType, AttrValue, IndexManager, ScanOp};
//! use amindex::{IndexConfig, RecordId};
//!
//! let mut am = IndexManager::new(IndexConfig::default()).unwrap();
//! am.create_index("employees", 0, AttrType::Int, 4).unwrap();
//! let index = am.open_index("employees", 0).unwrap();
//!
//! let key = AttrValue::Int(42).to_key(4).unwrap();
//! am.insert_entry(index, AttrType::Int, 4, &key, RecordId::new(7)).unwrap();
//!
//! let scan = am
//!     .open_scan(index, AttrType::Int, 4, ScanOp::GreaterThanEqual, Some(&key))
//!     .unwrap();
//! while let Some(rid) = am.find_next_entry(scan).unwrap() {
//!     println!("{}", rid);
//! }
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{IndexConfig, PAGE_SIZE};
pub use common::{Error, FrameId, PageId, RecordId, Result};

pub use buffer::replacer::ReplacementPolicy;
pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use index::{AttrType, AttrValue, IndexId, IndexManager, ScanId, ScanOp};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
