//! Forward-only read cursor over a borrowed byte slice

use std::str;

use crate::error::DecodeError;

macro_rules! pop_int {
    ($($name:ident => $t:ty),*) => {
        $(
            #[inline]
            pub fn $name(&mut self) -> Result<$t, DecodeError> {
                const N: usize = std::mem::size_of::<$t>();
                let bytes = self.take(N)?;
                let mut raw = [0u8; N];
                raw.copy_from_slice(bytes);
                Ok(<$t>::from_be_bytes(raw))
            }
        )*
    };
}

/// Zero-copy decoder over `&'a [u8]`.
///
/// The cursor only moves forward. Slices and strings it hands out borrow from
/// the input, never from the reader itself.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bytes not consumed yet
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    fn underrun(&self, needed: usize) -> DecodeError {
        DecodeError::Underrun {
            needed,
            remaining: self.data.len(),
        }
    }

    /// Consumes exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.data.len() < n {
            return Err(self.underrun(n));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    pop_int!(
        pop_i8 => i8,
        pop_i16 => i16,
        pop_i32 => i32,
        pop_i64 => i64,
        pop_u8 => u8,
        pop_u16 => u16,
        pop_u32 => u32,
        pop_u64 => u64
    );

    /// Reads the next i32 without consuming it.
    pub fn peek_i32(&self) -> Result<i32, DecodeError> {
        let head = self.data.get(..4).ok_or_else(|| self.underrun(4))?;
        Ok(i32::from_be_bytes([head[0], head[1], head[2], head[3]]))
    }

    /// 2-byte length then that many UTF-8 bytes. A length of zero or less
    /// reads as the empty string.
    pub fn pop_str(&mut self) -> Result<&'a str, DecodeError> {
        let len = self.pop_i16()?;
        if len <= 0 {
            return Ok("");
        }
        let bytes = self.take(len as usize)?;
        Ok(str::from_utf8(bytes)?)
    }

    pub fn pop_string(&mut self) -> Result<String, DecodeError> {
        self.pop_str().map(str::to_owned)
    }

    /// 4-byte length then that many bytes. A length of zero or less reads as
    /// an empty slice.
    pub fn pop_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.pop_i32()?;
        if len <= 0 {
            return Ok(&[]);
        }
        self.take(len as usize)
    }

    /// 4-byte length then that many bytes. A negative length reads as `None`.
    pub fn pop_nullable_bytes(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        let len = self.pop_i32()?;
        if len < 0 {
            return Ok(None);
        }
        self.take(len as usize).map(Some)
    }

    /// Splits off a reader bounded to the next `n` bytes and moves this
    /// cursor past them.
    pub fn sub_reader(&mut self, n: usize) -> Result<Reader<'a>, DecodeError> {
        self.take(n).map(Reader::new)
    }

    /// Reads a self-describing block: an i32 size, then a reader over exactly
    /// that many bytes. Sizes of zero or less give an empty reader.
    pub fn sized_block(&mut self) -> Result<Reader<'a>, DecodeError> {
        let size = self.pop_i32()?;
        if size <= 0 {
            return Ok(Reader::new(&[]));
        }
        self.sub_reader(size as usize)
    }

    /// Reads an i32 element count, rejecting negative values.
    pub fn pop_count(&mut self) -> Result<usize, DecodeError> {
        let count = self.pop_i32()?;
        usize::try_from(count).map_err(|_| DecodeError::InvalidLength(count))
    }

    /// Fails with [`DecodeError::TrailingData`] if anything is left.
    pub fn require_exhausted(&self) -> Result<(), DecodeError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingData(self.data.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_integers() {
        let data = [0xff, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 4];
        let mut r = Reader::new(&data);
        assert_eq!(r.pop_i8().unwrap(), -1);
        assert_eq!(r.pop_i16().unwrap(), 2);
        assert_eq!(r.pop_i32().unwrap(), 3);
        assert_eq!(r.pop_i64().unwrap(), 4);
        assert!(r.is_empty());
    }

    #[test]
    fn test_underrun_does_not_advance() {
        let data = [0, 1, 2];
        let mut r = Reader::new(&data);
        assert_eq!(
            r.pop_i32(),
            Err(DecodeError::Underrun {
                needed: 4,
                remaining: 3
            })
        );
        assert_eq!(r.remaining(), 3);
        assert_eq!(r.pop_i16().unwrap(), 1);
    }

    #[test]
    fn test_peek_is_non_consuming() {
        let data = [0, 0, 0, 9, 1];
        let mut r = Reader::new(&data);
        assert_eq!(r.peek_i32().unwrap(), 9);
        assert_eq!(r.remaining(), 5);
        assert_eq!(r.pop_i32().unwrap(), 9);
        assert!(r.peek_i32().is_err());
    }

    #[test]
    fn test_non_positive_lengths_are_empty() {
        let data = [0xff, 0xff, 0, 0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0];
        let mut r = Reader::new(&data);
        assert_eq!(r.pop_str().unwrap(), "");
        assert_eq!(r.pop_str().unwrap(), "");
        assert_eq!(r.pop_bytes().unwrap(), b"");
        assert_eq!(r.pop_bytes().unwrap(), b"");
        r.require_exhausted().unwrap();
    }

    #[test]
    fn test_nullable_bytes_keep_null_apart_from_empty() {
        let data = [0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 1, 7];
        let mut r = Reader::new(&data);
        assert_eq!(r.pop_nullable_bytes().unwrap(), None);
        assert_eq!(r.pop_nullable_bytes().unwrap(), Some(&b""[..]));
        assert_eq!(r.pop_nullable_bytes().unwrap(), Some(&[7u8][..]));
        r.require_exhausted().unwrap();
    }

    #[test]
    fn test_string_underrun() {
        let data = [0, 5, b'a', b'b'];
        let mut r = Reader::new(&data);
        assert!(matches!(
            r.pop_string(),
            Err(DecodeError::Underrun { needed: 5, .. })
        ));
    }

    #[test]
    fn test_sub_reader_bounds_and_skips() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut outer = Reader::new(&data);
        let mut inner = outer.sub_reader(4).unwrap();
        assert_eq!(outer.remaining(), 2);
        assert_eq!(inner.pop_i16().unwrap(), 0x0102);
        assert!(inner.pop_i32().is_err());
        assert_eq!(outer.pop_i16().unwrap(), 0x0506);
    }

    #[test]
    fn test_sized_block_can_be_skipped_unread() {
        let data = [0, 0, 0, 3, 9, 9, 9, 0, 7];
        let mut r = Reader::new(&data);
        let _ignored = r.sized_block().unwrap();
        assert_eq!(r.pop_i16().unwrap(), 7);
    }

    #[test]
    fn test_negative_count_is_rejected() {
        let data = (-1i32).to_be_bytes();
        let mut r = Reader::new(&data);
        assert_eq!(r.pop_count(), Err(DecodeError::InvalidLength(-1)));
    }

    #[test]
    fn test_trailing_data() {
        let data = [0, 1, 2];
        let mut r = Reader::new(&data);
        r.pop_i16().unwrap();
        assert_eq!(r.require_exhausted(), Err(DecodeError::TrailingData(1)));
    }
}
