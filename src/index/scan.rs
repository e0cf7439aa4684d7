//! Index scans.
//!
//! A scan walks leaves left to right through the next-leaf links, draining
//! each key's duplicate chain before moving to the next slot. It holds no
//! page between calls: every [`ScanDesc::next`] re-fixes the current leaf by
//! page number.

use std::fmt;

use crate::common::{Error, PageId, RecordId, Result};

use super::btree::{AttrType, BTreeIndex, LeafNode, PathStack, NULL_CELL};
use super::manager::{IndexId, ScanId};

/// Comparison applied by a scan. Discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScanOp {
    All = 0,
    Equal = 1,
    LessThan = 2,
    GreaterThan = 3,
    LessThanEqual = 4,
    GreaterThanEqual = 5,
    NotEqual = 6,
}

impl ScanOp {
    /// # Errors
    /// Returns `Error::InvalidScanOp` for codes above 6.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ScanOp::All),
            1 => Ok(ScanOp::Equal),
            2 => Ok(ScanOp::LessThan),
            3 => Ok(ScanOp::GreaterThan),
            4 => Ok(ScanOp::LessThanEqual),
            5 => Ok(ScanOp::GreaterThanEqual),
            6 => Ok(ScanOp::NotEqual),
            other => Err(Error::InvalidScanOp(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the scan positions itself by descending to the value rather
    /// than starting at the leftmost leaf.
    fn seeks(self) -> bool {
        matches!(
            self,
            ScanOp::Equal | ScanOp::GreaterThan | ScanOp::GreaterThanEqual
        )
    }
}

impl fmt::Display for ScanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ScanOp::All => "*",
            ScanOp::Equal => "=",
            ScanOp::LessThan => "<",
            ScanOp::GreaterThan => ">",
            ScanOp::LessThanEqual => "<=",
            ScanOp::GreaterThanEqual => ">=",
            ScanOp::NotEqual => "<>",
        };
        f.write_str(symbol)
    }
}

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Opened, nothing returned yet.
    First,
    /// At least one RID returned.
    Busy,
    /// End of scan reached; stays here.
    Over,
}

/// What to do with the key under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Emit,
    Skip,
    Stop,
}

/// Outcome of working through one leaf.
enum Advance {
    Found(RecordId),
    NextLeaf(PageId),
    Done,
}

/// An open scan: operator, bound, and cursor position.
#[derive(Debug)]
pub(crate) struct ScanDesc {
    index: IndexId,
    detached: bool,
    op: ScanOp,
    value: Option<Vec<u8>>,
    attr_type: AttrType,
    page: PageId,
    slot: usize,
    /// Next cell of the current key's chain, once the key has qualified.
    cursor: Option<u16>,
    state: ScanState,
}

impl ScanDesc {
    /// Position a new scan on `tree`.
    ///
    /// # Errors
    /// - `Error::InvalidValue` if an operator other than `All` has no value,
    ///   or the value does not fit the index
    /// - storage errors from the descent
    pub(crate) fn open(
        index: IndexId,
        tree: &BTreeIndex,
        op: ScanOp,
        value: Option<&[u8]>,
    ) -> Result<Self> {
        let value = match (op, value) {
            (ScanOp::All, _) => None,
            (_, Some(v)) => {
                tree.attr_type().validate_key(tree.attr_len(), v)?;
                Some(v.to_vec())
            }
            (_, None) => {
                return Err(Error::InvalidValue(format!(
                    "scan with operator {} needs a value",
                    op
                )))
            }
        };

        let (page, slot) = match &value {
            Some(v) if op.seeks() => {
                let pos = tree.descend(v, &mut PathStack::new())?;
                (pos.leaf, pos.slot)
            }
            _ => (tree.leftmost_leaf(), 0),
        };

        Ok(Self {
            index,
            detached: false,
            op,
            value,
            attr_type: tree.attr_type(),
            page,
            slot,
            cursor: None,
            state: ScanState::First,
        })
    }

    pub(crate) fn index(&self) -> IndexId {
        self.index
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached
    }

    /// Mark the scan as outliving its index.
    pub(crate) fn detach(&mut self) {
        self.detached = true;
    }

    pub(crate) fn state(&self) -> ScanState {
        self.state
    }

    /// Next matching RID, or `None` at end of scan.
    pub(crate) fn next(&mut self, tree: &BTreeIndex) -> Result<Option<RecordId>> {
        loop {
            if self.state == ScanState::Over {
                return Ok(None);
            }

            match tree.with_leaf(self.page, |leaf| self.advance(leaf))? {
                Advance::Found(rid) => {
                    self.state = ScanState::Busy;
                    return Ok(Some(rid));
                }
                Advance::NextLeaf(next) => {
                    self.page = next;
                    self.slot = 0;
                    self.cursor = None;
                }
                Advance::Done => {
                    self.state = ScanState::Over;
                    return Ok(None);
                }
            }
        }
    }

    fn advance(&mut self, leaf: &LeafNode<&[u8]>) -> Result<Advance> {
        loop {
            if let Some(offset) = self.cursor {
                if offset != NULL_CELL {
                    let (rid, next) = leaf.cell(offset)?;
                    self.cursor = Some(next);
                    return Ok(Advance::Found(rid));
                }
                self.cursor = None;
                self.slot += 1;
                continue;
            }

            if self.slot >= leaf.num_keys() {
                let next = leaf.next_leaf();
                return Ok(if next.is_valid() {
                    Advance::NextLeaf(next)
                } else {
                    Advance::Done
                });
            }

            match self.judge(leaf.key(self.slot)) {
                Verdict::Emit => self.cursor = Some(leaf.chain_head(self.slot)),
                Verdict::Skip => self.slot += 1,
                Verdict::Stop => return Ok(Advance::Done),
            }
        }
    }

    fn judge(&self, key: &[u8]) -> Verdict {
        use std::cmp::Ordering::*;

        let Some(value) = &self.value else {
            return Verdict::Emit;
        };
        let ord = self.attr_type.compare(key, value);
        match (self.op, ord) {
            (ScanOp::All, _) => Verdict::Emit,
            (ScanOp::Equal, Less) => Verdict::Skip,
            (ScanOp::Equal, Equal) => Verdict::Emit,
            (ScanOp::Equal, Greater) => Verdict::Stop,
            (ScanOp::LessThan, Less) => Verdict::Emit,
            (ScanOp::LessThan, _) => Verdict::Stop,
            (ScanOp::LessThanEqual, Greater) => Verdict::Stop,
            (ScanOp::LessThanEqual, _) => Verdict::Emit,
            (ScanOp::GreaterThan, Greater) => Verdict::Emit,
            (ScanOp::GreaterThan, _) => Verdict::Skip,
            (ScanOp::GreaterThanEqual, Less) => Verdict::Skip,
            (ScanOp::GreaterThanEqual, _) => Verdict::Emit,
            (ScanOp::NotEqual, Equal) => Verdict::Skip,
            (ScanOp::NotEqual, _) => Verdict::Emit,
        }
    }
}

/// Fixed-capacity table of open scans.
pub(crate) struct ScanTable {
    slots: Vec<Option<ScanDesc>>,
}

impl ScanTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// # Errors
    /// Returns `Error::ScanTableFull` if every slot is taken.
    pub(crate) fn insert(&mut self, desc: ScanDesc) -> Result<ScanId> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::ScanTableFull)?;
        self.slots[slot] = Some(desc);
        Ok(ScanId(slot))
    }

    /// # Errors
    /// Returns `Error::InvalidScanDesc` if `id` is not an open scan.
    pub(crate) fn get_mut(&mut self, id: ScanId) -> Result<&mut ScanDesc> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidScanDesc(id.0))
    }

    /// # Errors
    /// Returns `Error::InvalidScanDesc` if `id` is not an open scan.
    pub(crate) fn remove(&mut self, id: ScanId) -> Result<ScanDesc> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(Error::InvalidScanDesc(id.0))
    }

    /// Detach every scan on `index`. Returns how many there were.
    pub(crate) fn detach_index(&mut self, index: IndexId) -> usize {
        let mut count = 0;
        for desc in self.slots.iter_mut().flatten() {
            if desc.index() == index && !desc.is_detached() {
                desc.detach();
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::IndexConfig;
    use tempfile::{tempdir, TempDir};

    fn int(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    /// Keys {1, 3, 5, 7, 9}, each with RID = key * 10.
    fn odd_tree() -> (BTreeIndex, TempDir) {
        let dir = tempdir().unwrap();
        let mut tree = BTreeIndex::create(
            dir.path().join("odd.0"),
            AttrType::Int,
            4,
            &IndexConfig::default(),
        )
        .unwrap();
        for v in [5, 1, 9, 3, 7] {
            tree.insert(&int(v), RecordId::new(v as u32 * 10)).unwrap();
        }
        (tree, dir)
    }

    fn run(tree: &BTreeIndex, op: ScanOp, value: Option<i32>) -> Vec<u32> {
        let value = value.map(int);
        let mut desc = ScanDesc::open(IndexId(0), tree, op, value.as_ref().map(|v| &v[..])).unwrap();
        let mut out = Vec::new();
        while let Some(rid) = desc.next(tree).unwrap() {
            out.push(rid.0 / 10);
        }
        out
    }

    #[test]
    fn test_op_codes() {
        for code in 0..=6 {
            assert_eq!(ScanOp::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(ScanOp::from_code(7), Err(Error::InvalidScanOp(7))));
        assert_eq!(ScanOp::GreaterThanEqual.to_string(), ">=");
    }

    #[test]
    fn test_operator_boundaries() {
        let (tree, _dir) = odd_tree();

        assert_eq!(run(&tree, ScanOp::All, None), vec![1, 3, 5, 7, 9]);
        assert_eq!(run(&tree, ScanOp::Equal, Some(5)), vec![5]);
        assert_eq!(run(&tree, ScanOp::Equal, Some(4)), Vec::<u32>::new());
        assert_eq!(run(&tree, ScanOp::LessThan, Some(5)), vec![1, 3]);
        assert_eq!(run(&tree, ScanOp::LessThanEqual, Some(5)), vec![1, 3, 5]);
        assert_eq!(run(&tree, ScanOp::GreaterThan, Some(5)), vec![7, 9]);
        assert_eq!(run(&tree, ScanOp::GreaterThanEqual, Some(5)), vec![5, 7, 9]);
        assert_eq!(run(&tree, ScanOp::NotEqual, Some(5)), vec![1, 3, 7, 9]);
    }

    #[test]
    fn test_bounds_outside_key_range() {
        let (tree, _dir) = odd_tree();

        assert_eq!(run(&tree, ScanOp::GreaterThan, Some(9)), Vec::<u32>::new());
        assert_eq!(run(&tree, ScanOp::GreaterThanEqual, Some(0)), vec![1, 3, 5, 7, 9]);
        assert_eq!(run(&tree, ScanOp::LessThan, Some(1)), Vec::<u32>::new());
        assert_eq!(run(&tree, ScanOp::LessThanEqual, Some(100)), vec![1, 3, 5, 7, 9]);
        assert_eq!(run(&tree, ScanOp::NotEqual, Some(4)), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_scan_stays_over() {
        let (tree, _dir) = odd_tree();
        let key = int(9);
        let mut desc = ScanDesc::open(IndexId(0), &tree, ScanOp::Equal, Some(&key)).unwrap();
        assert_eq!(desc.state(), ScanState::First);

        assert_eq!(desc.next(&tree).unwrap(), Some(RecordId::new(90)));
        assert_eq!(desc.state(), ScanState::Busy);
        assert_eq!(desc.next(&tree).unwrap(), None);
        assert_eq!(desc.state(), ScanState::Over);
        assert_eq!(desc.next(&tree).unwrap(), None);
    }

    #[test]
    fn test_scan_needs_value() {
        let (tree, _dir) = odd_tree();
        assert!(matches!(
            ScanDesc::open(IndexId(0), &tree, ScanOp::Equal, None),
            Err(Error::InvalidValue(_))
        ));
        assert!(ScanDesc::open(IndexId(0), &tree, ScanOp::All, None).is_ok());
        assert!(ScanDesc::open(IndexId(0), &tree, ScanOp::LessThan, Some(&[1, 2])).is_err());
    }

    #[test]
    fn test_scan_crosses_leaves_and_chains() {
        let dir = tempdir().unwrap();
        let mut tree = BTreeIndex::create(
            dir.path().join("dup.0"),
            AttrType::Int,
            4,
            &IndexConfig::default(),
        )
        .unwrap();
        for v in 0..1000 {
            tree.insert(&int(v), RecordId::new(v as u32)).unwrap();
        }
        for r in 0..5 {
            tree.insert(&int(500), RecordId::new(10_000 + r)).unwrap();
        }
        assert!(tree.verify().unwrap().leaf_pages > 1);

        let all = run(&tree, ScanOp::All, None);
        assert_eq!(all.len(), 1005);

        let key = int(500);
        let mut desc = ScanDesc::open(IndexId(0), &tree, ScanOp::Equal, Some(&key)).unwrap();
        let mut rids = Vec::new();
        while let Some(rid) = desc.next(&tree).unwrap() {
            rids.push(rid.0);
        }
        rids.sort_unstable();
        assert_eq!(rids, vec![500, 10_000, 10_001, 10_002, 10_003, 10_004]);
    }

    #[test]
    fn test_scan_table_capacity_and_reuse() {
        let (tree, _dir) = odd_tree();
        let mut table = ScanTable::new(2);
        let open = |table: &mut ScanTable| {
            table.insert(ScanDesc::open(IndexId(0), &tree, ScanOp::All, None).unwrap())
        };

        let a = open(&mut table).unwrap();
        let b = open(&mut table).unwrap();
        assert_eq!((a, b), (ScanId(0), ScanId(1)));
        assert!(matches!(open(&mut table), Err(Error::ScanTableFull)));

        table.remove(a).unwrap();
        assert_eq!(table.open_count(), 1);
        assert_eq!(open(&mut table).unwrap(), ScanId(0));

        assert!(matches!(table.remove(ScanId(5)), Err(Error::InvalidScanDesc(5))));
        table.remove(b).unwrap();
        assert!(matches!(table.get_mut(b), Err(Error::InvalidScanDesc(1))));
    }

    #[test]
    fn test_detach_marks_only_that_index() {
        let (tree, _dir) = odd_tree();
        let mut table = ScanTable::new(4);
        let a = table
            .insert(ScanDesc::open(IndexId(0), &tree, ScanOp::All, None).unwrap())
            .unwrap();
        let b = table
            .insert(ScanDesc::open(IndexId(1), &tree, ScanOp::All, None).unwrap())
            .unwrap();

        assert_eq!(table.detach_index(IndexId(0)), 1);
        assert!(table.get_mut(a).unwrap().is_detached());
        assert!(!table.get_mut(b).unwrap().is_detached());
    }
}
