//! Log records in the v0/v1 message format and the length-bounded sets that
//! carry them in produce and fetch payloads.

use bytes::Bytes;
use tracing::trace;

use crate::buffer::ByteStore;
use crate::codec::{Decodable, Encodable};
use crate::compression::{CompressionType, COMPRESSION_MASK};
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

pub const MAGIC_V0: i8 = 0;
pub const MAGIC_V1: i8 = 1;

/// Attribute bit 3: 0 for create time, 1 for log append time
pub const TIMESTAMP_TYPE_MASK: i8 = 0x08;

/// `offset:i64` plus `size:i32`, which `size` itself does not count
const LOG_OVERHEAD: usize = 8 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampType {
    CreateTime,
    LogAppendTime,
}

/// One broker-log record.
///
/// `crc` covers every byte from `format_version` through `value`. The
/// timestamp only exists on the wire for format version 1 and above; v0
/// records carry `-1` here. A `None` key or value is the null blob (length
/// `-1`), which brokers send for keyless records; it is not the same bytes as
/// an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub offset: i64,
    /// Byte count of everything after `offset` and `size`
    pub size: i32,
    pub crc: i32,
    pub format_version: i8,
    pub attributes: i8,
    pub timestamp: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            offset: 0,
            size: 0,
            crc: 0,
            format_version: MAGIC_V1,
            attributes: 0,
            timestamp: -1,
            key: None,
            value: None,
        }
    }
}

impl Message {
    /// A record with both key and value present. `size` saturates at
    /// `i32::MAX`; encoding a record that large fails.
    pub fn new(
        format_version: i8,
        attributes: i8,
        timestamp: i64,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        let mut msg = Self {
            offset: 0,
            size: 0,
            crc: 0,
            format_version,
            attributes,
            timestamp: if format_version >= MAGIC_V1 { timestamp } else { -1 },
            key: Some(key.into()),
            value: Some(value.into()),
        };
        msg.size = i32::try_from(msg.body_len()).unwrap_or(i32::MAX);
        msg
    }

    /// A record with a null key.
    pub fn keyless(
        format_version: i8,
        attributes: i8,
        timestamp: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        let mut msg = Self::new(format_version, attributes, timestamp, Bytes::new(), value);
        msg.key = None;
        msg.size = i32::try_from(msg.body_len()).unwrap_or(i32::MAX);
        msg
    }

    /// The key bytes, empty when the key is null
    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_deref().unwrap_or_default()
    }

    /// The value bytes, empty when the value is null
    pub fn value_bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or_default()
    }

    fn has_timestamp(&self) -> bool {
        self.format_version >= MAGIC_V1
    }

    /// Size of the record after the offset and size fields
    pub fn body_len(&self) -> usize {
        let timestamp = if self.has_timestamp() { 8 } else { 0 };
        4 + 1 + 1 + timestamp + 4 + self.key_bytes().len() + 4 + self.value_bytes().len()
    }

    /// Size of the whole record on the wire
    pub fn encoded_len(&self) -> usize {
        LOG_OVERHEAD + self.body_len()
    }

    pub fn compression(&self) -> Result<CompressionType, DecodeError> {
        CompressionType::from_attributes(self.attributes)
    }

    pub fn set_compression(&mut self, codec: CompressionType) {
        self.attributes = (self.attributes & !COMPRESSION_MASK) | (codec as i8 & COMPRESSION_MASK);
    }

    pub fn timestamp_type(&self) -> TimestampType {
        if self.attributes & TIMESTAMP_TYPE_MASK != 0 {
            TimestampType::LogAppendTime
        } else {
            TimestampType::CreateTime
        }
    }

    fn encode_checksummed(&self, w: &mut Writer<'_>) -> Result<i32, EncodeError> {
        let mut scope = w.begin_checksum()?;
        scope.push_i8(self.format_version)?;
        scope.push_i8(self.attributes)?;
        if self.has_timestamp() {
            scope.push_i64(self.timestamp)?;
        }
        scope.push_nullable_bytes(self.key.as_deref())?;
        scope.push_nullable_bytes(self.value.as_deref())?;
        scope.finish()
    }

    /// The CRC field as encoding the record now would write it
    pub fn compute_crc(&self) -> Result<i32, EncodeError> {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        self.encode_checksummed(&mut w)?;
        let slot = w.as_slice();
        Ok(i32::from_be_bytes([slot[0], slot[1], slot[2], slot[3]]))
    }

    /// Whether the stored `crc` matches the record's contents
    pub fn verify_crc(&self) -> Result<bool, EncodeError> {
        Ok(self.compute_crc()? == self.crc)
    }

    /// Builds a wrapper record whose value is `inner` encoded as a message
    /// set and compressed with `codec`.
    pub fn wrap_compressed(
        codec: CompressionType,
        format_version: i8,
        timestamp: i64,
        inner: &[Message],
    ) -> Result<Self, EncodeError> {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        for msg in inner {
            msg.encode(&mut w)?;
        }
        let value = codec.compress(w.as_slice())?;
        let mut wrapper = Message::keyless(format_version, 0, timestamp, value);
        wrapper.set_compression(codec);
        Ok(wrapper)
    }

    /// Expands a compressed wrapper record into the records it carries. An
    /// uncompressed record expands to itself.
    pub fn unwrap_compressed(&self) -> Result<Vec<Message>, DecodeError> {
        let codec = self.compression()?;
        if codec == CompressionType::None {
            return Ok(vec![self.clone()]);
        }
        let raw = codec.decompress(self.value_bytes())?;
        MessageSet::decode_records(&mut Reader::new(&raw))
    }
}

impl Encodable for Message {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.push_i64(self.offset)?;
        let slot = w.reserve_length_slot()?;
        self.encode_checksummed(w)?;
        let len = w.written_since(slot)?;
        w.patch_length(slot, len)
    }
}

impl Decodable for Message {
    /// Fails with [`DecodeError::IncompleteRecord`] when the record is cut
    /// short by the end of the reader.
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.remaining() < LOG_OVERHEAD {
            return Err(DecodeError::IncompleteRecord {
                declared: LOG_OVERHEAD,
                available: r.remaining(),
            });
        }
        let offset = r.pop_i64()?;
        let size = r.pop_i32()?;
        let declared = usize::try_from(size).map_err(|_| DecodeError::InvalidLength(size))?;
        if r.remaining() < declared {
            return Err(DecodeError::IncompleteRecord {
                declared,
                available: r.remaining(),
            });
        }

        let mut body = r.sub_reader(declared)?;
        let crc = body.pop_i32()?;
        let format_version = body.pop_i8()?;
        let attributes = body.pop_i8()?;
        let timestamp = if format_version >= MAGIC_V1 {
            body.pop_i64()?
        } else {
            -1
        };
        let key = body.pop_nullable_bytes()?.map(Bytes::copy_from_slice);
        let value = body.pop_nullable_bytes()?.map(Bytes::copy_from_slice);

        Ok(Self {
            offset,
            size,
            crc,
            format_version,
            attributes,
            timestamp,
            key,
            value,
        })
    }
}

/// A size-prefixed run of records.
///
/// Decoding always consumes exactly the declared size from the outer stream.
/// Brokers cut fetch responses at a byte limit, so a partial record at the
/// end of the span is dropped rather than reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSet {
    /// Declared byte size of the records
    pub size: i32,
    pub messages: Vec<Message>,
}

impl MessageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `msg`, growing `size` by its encoded length.
    pub fn push(&mut self, msg: Message) -> Result<(), EncodeError> {
        let len = msg.encoded_len();
        self.size = i32::try_from(len)
            .ok()
            .and_then(|len| self.size.checked_add(len))
            .ok_or(EncodeError::SpanTooLong(len))?;
        self.messages.push(msg);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Decodes records until `r` is exhausted or the next record is
    /// incomplete.
    pub fn decode_records(r: &mut Reader<'_>) -> Result<Vec<Message>, DecodeError> {
        let mut messages = Vec::new();
        while !r.is_empty() {
            match Message::decode(r) {
                Ok(msg) => messages.push(msg),
                Err(DecodeError::IncompleteRecord {
                    declared,
                    available,
                }) => {
                    trace!(
                        declared,
                        available,
                        decoded = messages.len(),
                        "dropping truncated record at end of message set"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(messages)
    }

    /// Expands every compressed wrapper record, keeping plain ones as is.
    pub fn flatten(&self) -> Result<Vec<Message>, DecodeError> {
        let mut out = Vec::with_capacity(self.messages.len());
        for msg in &self.messages {
            out.extend(msg.unwrap_compressed()?);
        }
        Ok(out)
    }
}

impl Encodable for MessageSet {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.length_prefixed(|w| {
            for msg in &self.messages {
                msg.encode(w)?;
            }
            Ok(())
        })
    }
}

impl Decodable for MessageSet {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let size = r.pop_i32()?;
        let mut span = r.sub_reader(size.max(0) as usize)?;
        let messages = Self::decode_records(&mut span)?;
        Ok(Self { size, messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Encodable>(value: &T) -> Vec<u8> {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        value.encode(&mut w).unwrap();
        w.as_slice().to_vec()
    }

    #[test]
    fn test_size_field_matches_body() {
        let msg = Message::new(MAGIC_V1, 0, 1000, "k", "value");
        let bytes = encode(&msg);
        assert_eq!(bytes.len(), msg.encoded_len());
        let size = i32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert_eq!(size, msg.size);
        assert_eq!(size as usize, bytes.len() - 12);
    }

    #[test]
    fn test_v0_has_no_timestamp() {
        let v0 = Message::new(MAGIC_V0, 0, 1234, "", "x");
        let v1 = Message::new(MAGIC_V1, 0, 1234, "", "x");
        assert_eq!(encode(&v1).len() - encode(&v0).len(), 8);

        let decoded = Message::decode(&mut Reader::new(&encode(&v0))).unwrap();
        assert_eq!(decoded.timestamp, -1);
        let decoded = Message::decode(&mut Reader::new(&encode(&v1))).unwrap();
        assert_eq!(decoded.timestamp, 1234);
    }

    #[test]
    fn test_crc_verifies_after_decode() {
        let msg = Message::new(MAGIC_V1, 0, 5, "key", "value");
        let decoded = Message::decode(&mut Reader::new(&encode(&msg))).unwrap();
        assert!(decoded.verify_crc().unwrap());

        let mut tampered = decoded.clone();
        tampered.value = Some(Bytes::from_static(b"other"));
        assert!(!tampered.verify_crc().unwrap());
    }

    #[test]
    fn test_truncated_header_is_incomplete() {
        let bytes = encode(&Message::new(MAGIC_V0, 0, 0, "", "v"));
        let err = Message::decode(&mut Reader::new(&bytes[..10])).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompleteRecord {
                declared: 12,
                available: 10
            }
        );
    }

    #[test]
    fn test_compression_attribute_bits() {
        let mut msg = Message::new(MAGIC_V1, TIMESTAMP_TYPE_MASK, 0, "", "");
        msg.set_compression(CompressionType::Snappy);
        assert_eq!(msg.compression().unwrap(), CompressionType::Snappy);
        assert_eq!(msg.timestamp_type(), TimestampType::LogAppendTime);
        msg.set_compression(CompressionType::None);
        assert_eq!(msg.attributes, TIMESTAMP_TYPE_MASK);
    }

    #[test]
    fn test_gzip_wrapper_round_trip() {
        let inner = vec![
            Message::new(MAGIC_V1, 0, 1, "a", "first"),
            Message::new(MAGIC_V1, 0, 2, "b", "second"),
        ];
        let wrapper = Message::wrap_compressed(CompressionType::Gzip, MAGIC_V1, 2, &inner).unwrap();
        assert_eq!(wrapper.compression().unwrap(), CompressionType::Gzip);

        let decoded = Message::decode(&mut Reader::new(&encode(&wrapper))).unwrap();
        let expanded = decoded.unwrap_compressed().unwrap();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[1].value_bytes(), b"second");
        assert_eq!(decoded.key, None);
        assert!(expanded.iter().all(|m| m.verify_crc().unwrap()));
    }

    #[test]
    fn test_push_tracks_declared_size() {
        let mut set = MessageSet::new();
        set.push(Message::new(MAGIC_V0, 0, 0, "k", "v")).unwrap();
        set.push(Message::keyless(MAGIC_V1, 0, 0, "vv")).unwrap();
        let bytes = encode(&set);
        assert_eq!(set.size as usize, bytes.len() - 4);
    }

    #[test]
    fn test_push_rejects_size_past_i32() {
        let mut set = MessageSet::new();
        set.size = i32::MAX - 4;
        let msg = Message::new(MAGIC_V0, 0, 0, "", "");
        let len = msg.encoded_len();
        assert_eq!(set.push(msg), Err(EncodeError::SpanTooLong(len)));
        assert!(set.is_empty());
        assert_eq!(set.size, i32::MAX - 4);
    }

    /// A keyless v1 record laid out by hand the way a broker writes it.
    fn broker_keyless_record() -> Vec<u8> {
        let mut body = vec![MAGIC_V1 as u8, 0];
        body.extend_from_slice(&1_700_000_000_000i64.to_be_bytes());
        body.extend_from_slice(&(-1i32).to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.push(b'v');
        let crc = crc32fast::hash(&body);

        let mut record = 42i64.to_be_bytes().to_vec();
        record.extend_from_slice(&(4 + body.len() as i32).to_be_bytes());
        record.extend_from_slice(&crc.to_be_bytes());
        record.extend_from_slice(&body);
        record
    }

    #[test]
    fn test_null_key_record_verifies_and_reencodes_unchanged() {
        let wire = broker_keyless_record();
        let decoded = Message::decode(&mut Reader::new(&wire)).unwrap();
        assert_eq!(decoded.offset, 42);
        assert_eq!(decoded.key, None);
        assert_eq!(decoded.value_bytes(), b"v");
        assert!(decoded.verify_crc().unwrap());
        assert_eq!(encode(&decoded), wire);
        assert_eq!(decoded.encoded_len(), wire.len());
    }

    #[test]
    fn test_empty_key_differs_from_null_key() {
        let empty = Message::new(MAGIC_V1, 0, 3, "", "v");
        let null = Message::keyless(MAGIC_V1, 0, 3, "v");
        assert_eq!(encode(&empty).len(), encode(&null).len());
        assert_ne!(empty.compute_crc().unwrap(), null.compute_crc().unwrap());
    }
}
