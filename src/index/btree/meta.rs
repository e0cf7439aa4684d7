//! Index meta page (page 0).
//!
//! | Offset | Size | Field          |
//! |--------|------|----------------|
//! | 0      | 1    | page type      |
//! | 1      | 4    | checksum       |
//! | 5      | 4    | magic `AMIX`   |
//! | 9      | 1    | attr type tag  |
//! | 10     | 2    | attr length    |
//! | 12     | 4    | root page      |
//! | 16     | 4    | leftmost leaf  |

use crate::common::{Error, PageId, Result};
use crate::storage::page::{PageHeader, PageType};

use super::key::AttrType;
use super::{read_page_id, read_u16, write_page_id, write_u16};

/// Page holding the index meta data.
pub(crate) const META_PAGE_ID: PageId = PageId(0);

const MAGIC: &[u8; 4] = b"AMIX";

const OFFSET_MAGIC: usize = 5;
const OFFSET_ATTR_TYPE: usize = 9;
const OFFSET_ATTR_LENGTH: usize = 10;
const OFFSET_ROOT: usize = 12;
const OFFSET_LEFTMOST: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexMeta {
    pub attr_type: AttrType,
    pub attr_len: usize,
    pub root: PageId,
    pub leftmost: PageId,
}

impl IndexMeta {
    pub(crate) fn decode(data: &[u8]) -> Result<Self> {
        let bad = |reason: &str| Error::corrupted(META_PAGE_ID.0, reason);

        if PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE]) != PageType::IndexMeta {
            return Err(bad("not an index meta page"));
        }
        if &data[OFFSET_MAGIC..OFFSET_MAGIC + 4] != MAGIC {
            return Err(bad("bad magic"));
        }

        let attr_type = AttrType::from_tag(data[OFFSET_ATTR_TYPE])
            .map_err(|_| bad("unknown attribute type"))?;
        let attr_len = read_u16(data, OFFSET_ATTR_LENGTH) as usize;
        attr_type
            .validate_length(attr_len)
            .map_err(|_| bad("attribute length out of range"))?;

        let meta = Self {
            attr_type,
            attr_len,
            root: read_page_id(data, OFFSET_ROOT),
            leftmost: read_page_id(data, OFFSET_LEFTMOST),
        };
        if !meta.root.is_valid() || !meta.leftmost.is_valid() {
            return Err(bad("root or leftmost leaf is unset"));
        }
        Ok(meta)
    }

    pub(crate) fn encode(&self, data: &mut [u8]) {
        PageHeader::new(PageType::IndexMeta).write_to(data);
        data[OFFSET_MAGIC..OFFSET_MAGIC + 4].copy_from_slice(MAGIC);
        data[OFFSET_ATTR_TYPE] = self.attr_type.tag();
        write_u16(data, OFFSET_ATTR_LENGTH, self.attr_len as u16);
        write_page_id(data, OFFSET_ROOT, self.root);
        write_page_id(data, OFFSET_LEFTMOST, self.leftmost);
    }
}
