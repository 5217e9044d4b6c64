//! Write cursor over a [`ByteStore`]

use crc32fast::Hasher;

use crate::buffer::ByteStore;
use crate::error::EncodeError;

/// Returned by [`ChecksumScope::finish`] when the CRC equals the algorithm's
/// initial value, i.e. the checksummed span was empty.
pub const CRC_SENTINEL: i32 = -1;

const LENGTH_SLOT: usize = 4;

macro_rules! push_int {
    ($($name:ident => $t:ty),*) => {
        $(
            #[inline]
            pub fn $name(&mut self, value: $t) -> Result<(), EncodeError> {
                self.push_raw(&value.to_be_bytes())
            }
        )*
    };
}

/// Sequential big-endian encoder appending to a borrowed [`ByteStore`].
///
/// Whatever the store held before the writer was created is left alone:
/// [`Writer::len`] and [`Writer::as_slice`] only cover bytes written since.
/// Positions handed out by [`Writer::reserve_length_slot`] are absolute store
/// offsets.
#[derive(Debug)]
pub struct Writer<'a> {
    store: &'a mut ByteStore,
    start: usize,
}

impl<'a> Writer<'a> {
    pub fn new(store: &'a mut ByteStore) -> Self {
        let start = store.len();
        Self { store, start }
    }

    /// Bytes written through this writer
    pub fn len(&self) -> usize {
        self.store.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute offset of the next byte to be written
    pub fn position(&self) -> usize {
        self.store.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.store.as_slice()[self.start..]
    }

    pub fn push_raw(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.store.append(data)
    }

    push_int!(
        push_i8 => i8,
        push_i16 => i16,
        push_i32 => i32,
        push_i64 => i64,
        push_u8 => u8,
        push_u16 => u16,
        push_u32 => u32,
        push_u64 => u64
    );

    /// 2-byte length followed by the UTF-8 bytes of `s`.
    pub fn push_string(&mut self, s: &str) -> Result<(), EncodeError> {
        let len = u16::try_from(s.len()).map_err(|_| EncodeError::StringTooLong(s.len()))?;
        self.push_u16(len)?;
        self.push_raw(s.as_bytes())
    }

    /// 4-byte length followed by `data`.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let len = u32::try_from(data.len()).map_err(|_| EncodeError::BytesTooLong(data.len()))?;
        self.push_u32(len)?;
        self.push_raw(data)
    }

    /// Like [`push_bytes`](Self::push_bytes), but `None` writes length `-1`.
    pub fn push_nullable_bytes(&mut self, data: Option<&[u8]>) -> Result<(), EncodeError> {
        match data {
            Some(data) => self.push_bytes(data),
            None => self.push_i32(-1),
        }
    }

    /// Appends a zeroed 4-byte placeholder and returns its position.
    pub fn reserve_length_slot(&mut self) -> Result<usize, EncodeError> {
        let pos = self.position();
        self.push_raw(&[0; LENGTH_SLOT])?;
        Ok(pos)
    }

    /// Overwrites the 4 bytes at `position` with `value`.
    pub fn patch_length(&mut self, position: usize, value: i32) -> Result<(), EncodeError> {
        self.store.replace(position, &value.to_be_bytes())
    }

    /// Number of bytes written after the slot reserved at `slot`.
    pub fn written_since(&self, slot: usize) -> Result<i32, EncodeError> {
        let len = self.position() - (slot + LENGTH_SLOT);
        i32::try_from(len).map_err(|_| EncodeError::SpanTooLong(len))
    }

    /// Writes a self-describing block: a 4-byte size followed by whatever `f`
    /// encodes, with the size patched in afterwards.
    pub fn length_prefixed<F>(&mut self, f: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Self) -> Result<(), EncodeError>,
    {
        let slot = self.reserve_length_slot()?;
        f(self)?;
        let len = self.written_since(slot)?;
        self.patch_length(slot, len)
    }

    /// Reserves a CRC slot and opens a checksum scope over everything written
    /// through the scope. The writer stays borrowed until the scope ends, so
    /// scopes cannot nest.
    pub fn begin_checksum(&mut self) -> Result<ChecksumScope<'_, 'a>, EncodeError> {
        let slot = self.reserve_length_slot()?;
        Ok(ChecksumScope {
            crc_start: slot + LENGTH_SLOT,
            writer: self,
            finished: false,
        })
    }
}

/// An open CRC32 scope on a [`Writer`].
///
/// The checksum covers the bytes from the end of the CRC slot up to the write
/// position when the scope ends. Dropping the scope without calling
/// [`ChecksumScope::finish`] still backpatches the slot.
#[derive(Debug)]
pub struct ChecksumScope<'w, 'a> {
    writer: &'w mut Writer<'a>,
    crc_start: usize,
    finished: bool,
}

macro_rules! scope_push_int {
    ($($name:ident => $t:ty),*) => {
        $(
            #[inline]
            pub fn $name(&mut self, value: $t) -> Result<(), EncodeError> {
                self.writer.$name(value)
            }
        )*
    };
}

impl ChecksumScope<'_, '_> {
    scope_push_int!(
        push_i8 => i8,
        push_i16 => i16,
        push_i32 => i32,
        push_i64 => i64
    );

    pub fn push_raw(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.writer.push_raw(data)
    }

    pub fn push_string(&mut self, s: &str) -> Result<(), EncodeError> {
        self.writer.push_string(s)
    }

    pub fn push_bytes(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.writer.push_bytes(data)
    }

    pub fn push_nullable_bytes(&mut self, data: Option<&[u8]>) -> Result<(), EncodeError> {
        self.writer.push_nullable_bytes(data)
    }

    /// Bytes covered by the checksum so far
    pub fn covered(&self) -> usize {
        self.writer.position() - self.crc_start
    }

    /// Computes the CRC, patches the slot and returns the signed value, or
    /// [`CRC_SENTINEL`] for a degenerate span.
    pub fn finish(mut self) -> Result<i32, EncodeError> {
        self.finished = true;
        self.seal()
    }

    fn seal(&mut self) -> Result<i32, EncodeError> {
        let initial = Hasher::new().finalize();
        let mut hasher = Hasher::new();
        hasher.update(&self.writer.store.as_slice()[self.crc_start..]);
        let crc = hasher.finalize();
        if crc == initial {
            return Ok(CRC_SENTINEL);
        }
        let signed = crc as i32;
        self.writer.patch_length(self.crc_start - LENGTH_SLOT, signed)?;
        Ok(signed)
    }
}

impl Drop for ChecksumScope<'_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            // A failure while sealing on drop is ignored.
            let _ = self.seal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_integers() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        w.push_i8(-1).unwrap();
        w.push_i16(0x0102).unwrap();
        w.push_i32(0x0304_0506).unwrap();
        w.push_i64(0x0708_090a_0b0c_0d0e).unwrap();
        assert_eq!(
            w.as_slice(),
            &[0xff, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]
        );
    }

    #[test]
    fn test_earlier_content_is_inert() {
        let mut store = ByteStore::new();
        store.append(b"prefix").unwrap();
        let mut w = Writer::new(&mut store);
        w.push_i16(7).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.as_slice(), &[0, 7]);
        assert_eq!(w.position(), 8);
    }

    #[test]
    fn test_string_length_boundary() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        let max = "x".repeat(0xFFFF);
        w.push_string(&max).unwrap();
        assert_eq!(w.len(), 2 + 0xFFFF);

        let too_long = "x".repeat(0x10000);
        assert_eq!(
            w.push_string(&too_long),
            Err(EncodeError::StringTooLong(0x10000))
        );
    }

    #[test]
    fn test_length_slot_backpatch() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        let slot = w.reserve_length_slot().unwrap();
        w.push_string("abc").unwrap();
        let len = w.written_since(slot).unwrap();
        w.patch_length(slot, len).unwrap();
        assert_eq!(w.as_slice(), &[0, 0, 0, 5, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_length_prefixed_block() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        w.length_prefixed(|w| w.push_i64(1)).unwrap();
        assert_eq!(&w.as_slice()[..4], &[0, 0, 0, 8]);
        assert_eq!(w.len(), 12);
    }

    #[test]
    fn test_checksum_scope() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        let mut scope = w.begin_checksum().unwrap();
        scope.push_i8(1).unwrap();
        scope.push_bytes(b"payload").unwrap();
        assert_eq!(scope.covered(), 12);
        let crc = scope.finish().unwrap();

        let expected = crc32fast::hash(&w.as_slice()[4..]) as i32;
        assert_eq!(crc, expected);
        assert_eq!(&w.as_slice()[..4], &expected.to_be_bytes());
    }

    #[test]
    fn test_checksum_of_empty_span_is_sentinel() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        let scope = w.begin_checksum().unwrap();
        assert_eq!(scope.finish().unwrap(), CRC_SENTINEL);
        assert_eq!(w.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_dropped_scope_still_patches() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        {
            let mut scope = w.begin_checksum().unwrap();
            scope.push_string("early exit").unwrap();
        }
        let expected = crc32fast::hash(&w.as_slice()[4..]) as i32;
        assert_eq!(&w.as_slice()[..4], &expected.to_be_bytes());
    }

    #[test]
    fn test_null_bytes_write_negative_length() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        w.push_nullable_bytes(None).unwrap();
        w.push_nullable_bytes(Some(&b""[..])).unwrap();
        assert_eq!(w.as_slice(), &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0]);
    }

    #[test]
    fn test_overflow_surfaces_as_error() {
        let mut store = ByteStore::with_max_size(6);
        let mut w = Writer::new(&mut store);
        w.push_i32(1).unwrap();
        assert!(matches!(
            w.push_i32(2),
            Err(EncodeError::BufferOverflow { limit: 6, .. })
        ));
    }
}
