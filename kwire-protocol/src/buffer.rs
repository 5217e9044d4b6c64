//! Growable byte storage with a hard size ceiling

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EncodeError;

/// Default ceiling for a single store: 1 GiB.
pub const DEFAULT_MAX_SIZE: usize = 1 << 30;

/// Append-mostly byte storage underneath a [`Writer`](crate::Writer).
///
/// Growth past `max_size` is refused with [`EncodeError::BufferOverflow`];
/// it is never a trigger to grow further.
#[derive(Debug, Clone)]
pub struct ByteStore {
    buf: BytesMut,
    max_size: usize,
}

impl Default for ByteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStore {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn check(&self, new_len: Option<usize>) -> Result<usize, EncodeError> {
        match new_len {
            Some(n) if n <= self.max_size => Ok(n),
            Some(n) => Err(EncodeError::BufferOverflow {
                requested: n,
                limit: self.max_size,
            }),
            None => Err(EncodeError::BufferOverflow {
                requested: usize::MAX,
                limit: self.max_size,
            }),
        }
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.check(self.buf.len().checked_add(data.len()))?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Grows with zeroes or truncates to `n` bytes.
    pub fn resize(&mut self, n: usize) -> Result<(), EncodeError> {
        self.check(Some(n))?;
        self.buf.resize(n, 0);
        Ok(())
    }

    /// Overwrites `data.len()` bytes at `pos`. The range must already exist.
    pub fn replace(&mut self, pos: usize, data: &[u8]) -> Result<(), EncodeError> {
        let end = pos
            .checked_add(data.len())
            .filter(|end| *end <= self.buf.len())
            .ok_or(EncodeError::BufferOverflow {
                requested: pos.saturating_add(data.len()),
                limit: self.buf.len(),
            })?;
        self.buf[pos..end].copy_from_slice(data);
        Ok(())
    }

    /// Makes room for `additional` more bytes without changing the length.
    pub fn reserve(&mut self, additional: usize) -> Result<(), EncodeError> {
        self.check(self.buf.len().checked_add(additional))?;
        self.buf.reserve(additional);
        Ok(())
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_replace() {
        let mut store = ByteStore::new();
        store.append(b"hello world").unwrap();
        store.replace(6, b"WORLD").unwrap();
        assert_eq!(store.as_slice(), b"hello WORLD");
    }

    #[test]
    fn test_ceiling_is_enforced() {
        let mut store = ByteStore::with_max_size(8);
        store.append(b"12345678").unwrap();
        let err = store.append(b"9").unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferOverflow {
                requested: 9,
                limit: 8
            }
        );
        assert!(store.resize(9).is_err());
        assert!(store.reserve(1).is_err());
        // A failed append leaves the store untouched.
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn test_replace_out_of_range() {
        let mut store = ByteStore::new();
        store.append(b"abc").unwrap();
        assert!(store.replace(2, b"xy").is_err());
        assert_eq!(store.as_slice(), b"abc");
    }

    #[test]
    fn test_resize_zero_fills() {
        let mut store = ByteStore::new();
        store.append(b"ab").unwrap();
        store.resize(4).unwrap();
        assert_eq!(store.as_slice(), b"ab\0\0");
        store.resize(1).unwrap();
        assert_eq!(store.as_slice(), b"a");
    }
}
