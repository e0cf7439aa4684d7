//! Error types for the access-method layer.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index and the storage beneath it.
///
/// Storage failures (`Io`, `PageNotFound`, `NoFreeFrames`, `ChecksumMismatch`)
/// travel through the index untouched. End-of-scan is not an error: scans
/// report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// A page read from disk does not match its stored checksum.
    #[error("Checksum mismatch on page {0}")]
    ChecksumMismatch(u32),

    /// Attribute length is out of range or does not match the index.
    #[error("Invalid attribute length: {0}")]
    InvalidAttrLength(usize),

    /// Attribute type tag is unknown or does not match the index.
    #[error("Invalid attribute type: {0:?}")]
    InvalidAttrType(char),

    /// Key, or (key, RID) pair, is not in the index.
    #[error("Key not found in index")]
    NotFound,

    /// A page failed structural validation.
    #[error("Corrupted page {page}: {reason}")]
    Corrupted { page: u32, reason: String },

    /// Scan handle does not refer to an open scan.
    #[error("Invalid scan descriptor: {0}")]
    InvalidScanDesc(usize),

    /// Scan operator code is unknown.
    #[error("Invalid operator to scan: {0}")]
    InvalidScanOp(u8),

    /// Every slot in the scan table is taken.
    #[error("Scan table is full")]
    ScanTableFull,

    /// Index handle does not refer to an open index.
    #[error("Invalid index handle: {0}")]
    InvalidIndexHandle(usize),

    /// Key value cannot be used (missing, wrong size, NaN).
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The index file is open and cannot be opened again or destroyed.
    #[error("Index file {} is in use", .0.display())]
    IndexInUse(PathBuf),

    /// A single key's duplicate chain fills a whole leaf.
    #[error("Leaf page {page} cannot hold another entry for one key")]
    LeafOverflow { page: u32 },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Shorthand for a codec validation failure.
    pub(crate) fn corrupted(page: u32, reason: impl Into<String>) -> Self {
        Error::Corrupted {
            page,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::corrupted(7, "numKeys 90 exceeds maxKeys 81");
        assert_eq!(
            format!("{}", err),
            "Corrupted page 7: numKeys 90 exceeds maxKeys 81"
        );

        let err = Error::InvalidAttrType('x');
        assert_eq!(format!("{}", err), "Invalid attribute type: 'x'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::ScanTableFull.source().is_none());
    }
}
