//! Record identifier type.

use std::fmt;

/// Opaque reference to a record in an external heap file.
///
/// The index stores and returns RIDs but never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u32);

impl RecordId {
    /// Size of a RID inside a duplicate-chain cell.
    pub const SIZE: usize = 4;

    #[inline]
    pub fn new(id: u32) -> Self {
        RecordId(id)
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        RecordId(u32::from_le_bytes(bytes))
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        RecordId(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_roundtrip_bytes() {
        let rid = RecordId::new(17_815);
        assert_eq!(RecordId::from_le_bytes(rid.to_le_bytes()), rid);
        assert_eq!(format!("{}", rid), "Rid(17815)");
    }
}
