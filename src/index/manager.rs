//! Index manager - the public face of the access method.
//!
//! Owns the table of open indexes and the scan table. Index `n` of base
//! file `rel` lives in the file `rel.n`.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::buffer::StatsSnapshot;
use crate::common::config::IndexConfig;
use crate::common::{Error, RecordId, Result};
use crate::storage::DiskManager;

use super::btree::{AttrType, BTreeIndex};
use super::scan::{ScanDesc, ScanOp, ScanState, ScanTable};

/// Handle of an open index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId(pub usize);

/// Handle of an open scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(pub usize);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.0)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scan({})", self.0)
    }
}

struct OpenIndex {
    path: PathBuf,
    tree: BTreeIndex,
}

/// Creates, opens and scans B+-tree indexes.
///
/// # Example
/// ```
/// use amindex::index::{AttrType, AttrValue, IndexManager, ScanOp};
/// use amindex::{IndexConfig, RecordId};
///
/// # fn main() -> amindex::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let base = dir.path().join("emp");
/// let mut am = IndexManager::new(IndexConfig::default())?;
///
/// am.create_index(&base, 0, AttrType::Int, 4)?;
/// let index = am.open_index(&base, 0)?;
/// for (age, rid) in [(31, 1), (27, 2), (31, 3)] {
///     let key = AttrValue::Int(age).to_key(4)?;
///     am.insert_entry(index, AttrType::Int, 4, &key, RecordId::new(rid))?;
/// }
///
/// let key = AttrValue::Int(31).to_key(4)?;
/// let scan = am.open_scan(index, AttrType::Int, 4, ScanOp::Equal, Some(&key))?;
/// let mut found = Vec::new();
/// while let Some(rid) = am.find_next_entry(scan)? {
///     found.push(rid.0);
/// }
/// found.sort();
/// assert_eq!(found, vec![1, 3]);
///
/// am.close_scan(scan)?;
/// am.close_index(index)?;
/// am.destroy_index(&base, 0)?;
/// # Ok(())
/// # }
/// ```
pub struct IndexManager {
    config: IndexConfig,
    indexes: Vec<Option<OpenIndex>>,
    scans: ScanTable,
}

impl IndexManager {
    /// # Errors
    /// Returns `Error::InvalidConfig` if `config` does not validate.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            indexes: Vec::new(),
            scans: ScanTable::new(config.max_scans),
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// File holding index `index_no` of `base`: `"{base}.{index_no}"`.
    pub fn index_path<P: AsRef<Path>>(base: P, index_no: u32) -> PathBuf {
        let mut name = OsString::from(base.as_ref().as_os_str());
        name.push(format!(".{}", index_no));
        PathBuf::from(name)
    }

    fn is_open(&self, path: &Path) -> bool {
        self.indexes.iter().flatten().any(|open| open.path == path)
    }

    // ========================================================================
    // Index lifecycle
    // ========================================================================

    /// Create an empty index file.
    ///
    /// # Errors
    /// - `Error::InvalidAttrLength` if `attr_len` is illegal for `attr_type`
    /// - `Error::Io` if the file already exists or cannot be written
    pub fn create_index<P: AsRef<Path>>(
        &self,
        base: P,
        index_no: u32,
        attr_type: AttrType,
        attr_len: usize,
    ) -> Result<()> {
        let path = Self::index_path(base, index_no);
        let tree = BTreeIndex::create(&path, attr_type, attr_len, &self.config)?;
        tree.flush()?;
        info!(
            "created index {} ({:?}, {} bytes)",
            path.display(),
            attr_type,
            attr_len
        );
        Ok(())
    }

    /// Delete an index file.
    ///
    /// # Errors
    /// - `Error::IndexInUse` if the index is open
    /// - `Error::Io` if the file does not exist or cannot be removed
    pub fn destroy_index<P: AsRef<Path>>(&self, base: P, index_no: u32) -> Result<()> {
        let path = Self::index_path(base, index_no);
        if self.is_open(&path) {
            return Err(Error::IndexInUse(path));
        }
        DiskManager::destroy(&path)?;
        info!("destroyed index {}", path.display());
        Ok(())
    }

    /// Open an index file with its own buffer pool.
    ///
    /// # Errors
    /// - `Error::IndexInUse` if the index is already open
    /// - `Error::Io`, `Error::Corrupted`, `Error::ChecksumMismatch` if the
    ///   file cannot be read as an index
    pub fn open_index<P: AsRef<Path>>(&mut self, base: P, index_no: u32) -> Result<IndexId> {
        let path = Self::index_path(base, index_no);
        if self.is_open(&path) {
            return Err(Error::IndexInUse(path));
        }

        let tree = BTreeIndex::open(&path, &self.config)?;
        info!(
            "opened index {} ({:?}, {} bytes, root {})",
            path.display(),
            tree.attr_type(),
            tree.attr_len(),
            tree.root()
        );

        let open = OpenIndex { path, tree };
        let id = match self.indexes.iter().position(Option::is_none) {
            Some(slot) => {
                self.indexes[slot] = Some(open);
                slot
            }
            None => {
                self.indexes.push(Some(open));
                self.indexes.len() - 1
            }
        };
        Ok(IndexId(id))
    }

    /// Flush and close an open index. Scans still open on it fail with
    /// `Error::InvalidIndexHandle` from then on.
    ///
    /// # Errors
    /// - `Error::InvalidIndexHandle` if `id` is not open
    /// - storage errors from the flush; the index stays open
    pub fn close_index(&mut self, id: IndexId) -> Result<()> {
        self.index(id)?.flush()?;

        let open = self
            .indexes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidIndexHandle(id.0))?;
        let orphaned = self.scans.detach_index(id);

        info!(
            "closed index {} ({} open scans detached): {}",
            open.path.display(),
            orphaned,
            open.tree.stats()
        );
        Ok(())
    }

    /// The tree behind an open index.
    ///
    /// # Errors
    /// Returns `Error::InvalidIndexHandle` if `id` is not open.
    pub fn index(&self, id: IndexId) -> Result<&BTreeIndex> {
        self.indexes
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|open| &open.tree)
            .ok_or(Error::InvalidIndexHandle(id.0))
    }

    fn index_mut(&mut self, id: IndexId) -> Result<&mut BTreeIndex> {
        self.indexes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|open| &mut open.tree)
            .ok_or(Error::InvalidIndexHandle(id.0))
    }

    /// Buffer pool counters of an open index.
    pub fn index_stats(&self, id: IndexId) -> Result<StatsSnapshot> {
        Ok(self.index(id)?.stats())
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Add `(value, rid)` to an open index.
    ///
    /// All RIDs of one key live in a single leaf, so a key holds at most
    /// `(4096 - 23 - (attr_len + 2)) / 6` of them: 677 for a 4-byte key,
    /// 636 for a 255-byte one. Past that the insert fails with
    /// `Error::LeafOverflow` and the index is left as it was.
    ///
    /// # Errors
    /// - `Error::InvalidIndexHandle` if `id` is not open
    /// - `Error::InvalidAttrType` / `Error::InvalidAttrLength` if they differ
    ///   from the index's
    /// - `Error::LeafOverflow` if `value` already has the most RIDs a leaf
    ///   can hold
    /// - anything else [`BTreeIndex::insert`] returns
    pub fn insert_entry(
        &mut self,
        id: IndexId,
        attr_type: AttrType,
        attr_len: usize,
        value: &[u8],
        rid: RecordId,
    ) -> Result<()> {
        let tree = self.index_mut(id)?;
        check_attr(tree, attr_type, attr_len)?;
        tree.insert(value, rid)
    }

    /// Remove `(value, rid)` from an open index.
    ///
    /// # Errors
    /// As [`insert_entry`](Self::insert_entry), plus `Error::NotFound`.
    pub fn delete_entry(
        &mut self,
        id: IndexId,
        attr_type: AttrType,
        attr_len: usize,
        value: &[u8],
        rid: RecordId,
    ) -> Result<()> {
        let tree = self.index_mut(id)?;
        check_attr(tree, attr_type, attr_len)?;
        tree.delete(value, rid)
    }

    // ========================================================================
    // Scans
    // ========================================================================

    /// Open a scan returning the RIDs whose key satisfies `key op value`.
    /// `value` may be `None` only for [`ScanOp::All`].
    ///
    /// # Errors
    /// - `Error::InvalidIndexHandle` if `id` is not open
    /// - `Error::InvalidAttrType` / `Error::InvalidAttrLength` on mismatch
    /// - `Error::InvalidValue` if the value is missing or unusable
    /// - `Error::ScanTableFull` if every scan slot is taken
    pub fn open_scan(
        &mut self,
        id: IndexId,
        attr_type: AttrType,
        attr_len: usize,
        op: ScanOp,
        value: Option<&[u8]>,
    ) -> Result<ScanId> {
        let tree = self.index(id)?;
        check_attr(tree, attr_type, attr_len)?;

        let desc = ScanDesc::open(id, tree, op, value)?;
        let scan = self.scans.insert(desc)?;
        debug!(
            "opened {} on {} with operator {} ({}/{} slots in use)",
            scan,
            id,
            op,
            self.scans.open_count(),
            self.scans.capacity()
        );
        Ok(scan)
    }

    /// Next RID of a scan, or `None` once the scan is over.
    ///
    /// # Errors
    /// - `Error::InvalidScanDesc` if `scan` is not open
    /// - `Error::InvalidIndexHandle` if its index has been closed
    pub fn find_next_entry(&mut self, scan: ScanId) -> Result<Option<RecordId>> {
        let desc = self.scans.get_mut(scan)?;
        let index = desc.index();
        let tree = match self.indexes.get(index.0) {
            Some(Some(open)) if !desc.is_detached() => &open.tree,
            _ => return Err(Error::InvalidIndexHandle(index.0)),
        };
        desc.next(tree)
    }

    /// Where a scan is in its lifecycle.
    pub fn scan_state(&mut self, scan: ScanId) -> Result<ScanState> {
        Ok(self.scans.get_mut(scan)?.state())
    }

    /// Release a scan's slot.
    ///
    /// # Errors
    /// Returns `Error::InvalidScanDesc` if `scan` is not open.
    pub fn close_scan(&mut self, scan: ScanId) -> Result<()> {
        self.scans.remove(scan)?;
        debug!("closed {}", scan);
        Ok(())
    }

    pub fn open_scan_count(&self) -> usize {
        self.scans.open_count()
    }
}

impl Drop for IndexManager {
    fn drop(&mut self) {
        for open in self.indexes.iter().flatten() {
            if let Err(e) = open.tree.flush() {
                warn!("failed to flush {} on drop: {}", open.path.display(), e);
            }
        }
    }
}

fn check_attr(tree: &BTreeIndex, attr_type: AttrType, attr_len: usize) -> Result<()> {
    if attr_type != tree.attr_type() {
        return Err(Error::InvalidAttrType(attr_type.tag() as char));
    }
    if attr_len != tree.attr_len() {
        return Err(Error::InvalidAttrLength(attr_len));
    }
    Ok(())
}
