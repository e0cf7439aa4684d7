//! Attribute types and the key comparator.
//!
//! Keys are fixed-length byte strings. How two keys compare depends only on
//! the attribute type declared when the index was created:
//!
//! | Type  | Tag   | Length | Order                        |
//! |-------|-------|--------|------------------------------|
//! | Int   | `'i'` | 4      | `i32`, little-endian         |
//! | Float | `'f'` | 4      | `f32`, little-endian         |
//! | Char  | `'c'` | 1..=255| byte-wise lexicographic      |

use std::cmp::Ordering;

use crate::common::config::MAX_ATTR_LENGTH;
use crate::common::{Error, Result};

/// Attribute type of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Float,
    Char,
}

impl AttrType {
    /// One-byte tag stored in the meta page.
    pub fn tag(self) -> u8 {
        match self {
            AttrType::Int => b'i',
            AttrType::Float => b'f',
            AttrType::Char => b'c',
        }
    }

    /// Parse a tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidAttrType` for anything but `i`, `f`, `c`.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'i' => Ok(AttrType::Int),
            b'f' => Ok(AttrType::Float),
            b'c' => Ok(AttrType::Char),
            other => Err(Error::InvalidAttrType(other as char)),
        }
    }

    /// Check that `attr_len` is legal for this type.
    ///
    /// # Errors
    /// Returns `Error::InvalidAttrLength` if numeric types are not 4 bytes or
    /// character keys are outside `1..=MAX_ATTR_LENGTH`.
    pub fn validate_length(self, attr_len: usize) -> Result<()> {
        let ok = match self {
            AttrType::Int | AttrType::Float => attr_len == 4,
            AttrType::Char => (1..=MAX_ATTR_LENGTH).contains(&attr_len),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidAttrLength(attr_len))
        }
    }

    /// Check that `value` can be stored as a key of this type.
    ///
    /// # Errors
    /// Returns `Error::InvalidValue` if the length differs from `attr_len`
    /// or a float key is NaN.
    pub fn validate_key(self, attr_len: usize, value: &[u8]) -> Result<()> {
        if value.len() != attr_len {
            return Err(Error::InvalidValue(format!(
                "key is {} bytes, index expects {}",
                value.len(),
                attr_len
            )));
        }
        if self == AttrType::Float && read_f32(value).is_nan() {
            return Err(Error::InvalidValue("NaN is not an orderable key".into()));
        }
        Ok(())
    }

    /// Compare two keys of this type.
    ///
    /// Both slices must hold at least the attribute length; character keys
    /// compare over their full length with no trimming.
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            AttrType::Int => read_i32(a).cmp(&read_i32(b)),
            AttrType::Float => read_f32(a)
                .partial_cmp(&read_f32(b))
                .unwrap_or(Ordering::Equal),
            AttrType::Char => a.cmp(b),
        }
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(buf)
}

fn read_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    f32::from_le_bytes(buf)
}

/// A typed key value, for callers that don't want to hand-encode bytes.
///
/// # Example
/// ```
/// use amindex::index::{AttrType, AttrValue};
///
/// let key = AttrValue::Int(-7).to_key(4).unwrap();
/// assert_eq!(key, (-7i32).to_le_bytes().to_vec());
///
/// let name = AttrValue::Char(b"ada").to_key(8).unwrap();
/// assert_eq!(name.len(), 8);
/// assert_eq!(AttrValue::Char(b"ada").attr_type(), AttrType::Char);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue<'a> {
    Int(i32),
    Float(f32),
    Char(&'a [u8]),
}

impl AttrValue<'_> {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Int(_) => AttrType::Int,
            AttrValue::Float(_) => AttrType::Float,
            AttrValue::Char(_) => AttrType::Char,
        }
    }

    /// Encode as an `attr_len`-byte key. Character values shorter than
    /// `attr_len` are padded with zero bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidAttrLength` if `attr_len` is illegal for the
    /// type, or `Error::InvalidValue` if a character value is too long or a
    /// float is NaN.
    pub fn to_key(&self, attr_len: usize) -> Result<Vec<u8>> {
        let attr_type = self.attr_type();
        attr_type.validate_length(attr_len)?;

        let key = match *self {
            AttrValue::Int(v) => v.to_le_bytes().to_vec(),
            AttrValue::Float(v) => v.to_le_bytes().to_vec(),
            AttrValue::Char(bytes) => {
                if bytes.len() > attr_len {
                    return Err(Error::InvalidValue(format!(
                        "{} bytes do not fit a {}-byte key",
                        bytes.len(),
                        attr_len
                    )));
                }
                let mut key = bytes.to_vec();
                key.resize(attr_len, 0);
                key
            }
        };

        attr_type.validate_key(attr_len, &key)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    fn float(v: f32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn test_int_compare_is_numeric() {
        // Little-endian bytes of -1 sort after 1 lexicographically
        assert_eq!(AttrType::Int.compare(&int(-1), &int(1)), Ordering::Less);
        assert_eq!(AttrType::Int.compare(&int(256), &int(1)), Ordering::Greater);
        assert_eq!(AttrType::Int.compare(&int(42), &int(42)), Ordering::Equal);
    }

    #[test]
    fn test_float_compare_is_numeric() {
        assert_eq!(
            AttrType::Float.compare(&float(-2.5), &float(0.25)),
            Ordering::Less
        );
        assert_eq!(
            AttrType::Float.compare(&float(1e10), &float(3.0)),
            Ordering::Greater
        );
        assert_eq!(
            AttrType::Float.compare(&float(-0.0), &float(0.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_char_compare_uses_all_bytes() {
        assert_eq!(AttrType::Char.compare(b"abc ", b"abd "), Ordering::Less);
        // No trimming: trailing space is significant
        assert_eq!(AttrType::Char.compare(b"ab  ", b"ab\0\0"), Ordering::Greater);
        assert_eq!(AttrType::Char.compare(b"zz", b"zz"), Ordering::Equal);
    }

    #[test]
    fn test_tags_roundtrip() {
        for t in [AttrType::Int, AttrType::Float, AttrType::Char] {
            assert_eq!(AttrType::from_tag(t.tag()).unwrap(), t);
        }
        assert!(matches!(
            AttrType::from_tag(b'x'),
            Err(Error::InvalidAttrType('x'))
        ));
    }

    #[test]
    fn test_validate_length() {
        assert!(AttrType::Int.validate_length(4).is_ok());
        assert!(AttrType::Float.validate_length(8).is_err());
        assert!(AttrType::Char.validate_length(1).is_ok());
        assert!(AttrType::Char.validate_length(255).is_ok());
        assert!(matches!(
            AttrType::Char.validate_length(0),
            Err(Error::InvalidAttrLength(0))
        ));
        assert!(AttrType::Char.validate_length(256).is_err());
    }

    #[test]
    fn test_validate_key_rejects_nan_and_bad_length() {
        assert!(AttrType::Float
            .validate_key(4, &float(f32::NAN))
            .is_err());
        assert!(AttrType::Int.validate_key(4, &[1, 2, 3]).is_err());
        assert!(AttrType::Char.validate_key(3, b"abc").is_ok());
    }

    #[test]
    fn test_attr_value_encoding() {
        assert_eq!(AttrValue::Float(1.5).to_key(4).unwrap(), float(1.5).to_vec());
        assert_eq!(AttrValue::Char(b"hi").to_key(4).unwrap(), b"hi\0\0".to_vec());
        assert!(AttrValue::Char(b"toolong").to_key(4).is_err());
        assert!(AttrValue::Int(1).to_key(8).is_err());
        assert!(AttrValue::Float(f32::NAN).to_key(4).is_err());
    }
}
