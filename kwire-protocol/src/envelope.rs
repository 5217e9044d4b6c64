//! Request and response framing
//!
//! A request frame is `length:i32 api_key:i16 api_version:i16
//! correlation_id:i32 client_id:string body...`, where `length` counts every
//! byte after itself. A response frame is `length:i32 correlation_id:i32
//! body...`; responses do not echo the key or version.

use bytes::Bytes;

use crate::api_keys::ApiKey;
use crate::buffer::{ByteStore, DEFAULT_MAX_SIZE};
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

/// Absolute offset of the correlation id inside an encoded request frame:
/// after the length prefix, API key and API version.
pub const CORRELATION_ID_OFFSET: usize = 4 + 2 + 2;

/// A Kafka protocol request header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestHeader {
    /// The API key of this request
    pub api_key: ApiKey,
    /// The API version of this request
    pub api_version: i16,
    /// The correlation ID of this request
    pub correlation_id: i32,
    /// The client ID string
    pub client_id: String,
}

impl Encodable for RequestHeader {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.api_key.encode(w)?;
        self.api_version.encode(w)?;
        self.correlation_id.encode(w)?;
        self.client_id.encode(w)
    }
}

impl Decodable for RequestHeader {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let api_key = ApiKey::decode(r)?;
        let api_version = i16::decode(r)?;
        let correlation_id = i32::decode(r)?;
        let client_id = String::decode(r)?;
        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

/// A fully encoded request frame, length prefix included.
///
/// The body is encoded once; only the correlation id can change afterwards,
/// in place, so a request can be resent under a new id.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    header: RequestHeader,
    store: ByteStore,
}

impl RequestEnvelope {
    pub fn new<B>(header: RequestHeader, body: &B, max_size: usize) -> Result<Self, EncodeError>
    where
        B: Encodable + ?Sized,
    {
        let mut store = ByteStore::with_max_size(max_size);
        let mut w = Writer::new(&mut store);
        let slot = w.reserve_length_slot()?;
        header.encode(&mut w)?;
        body.encode(&mut w)?;
        let len = w.written_since(slot)?;
        w.patch_length(slot, len)?;
        Ok(Self { header, store })
    }

    /// Builds the envelope for a catalog request, taking the key and version
    /// from its type.
    pub fn for_request<R: ApiRequest>(
        correlation_id: i32,
        client_id: &str,
        request: &R,
    ) -> Result<Self, EncodeError> {
        let header = RequestHeader {
            api_key: R::API_KEY,
            api_version: R::API_VERSION,
            correlation_id,
            client_id: client_id.to_string(),
        };
        Self::new(header, request, DEFAULT_MAX_SIZE)
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn correlation_id(&self) -> i32 {
        self.header.correlation_id
    }

    /// Rewrites the correlation id without re-encoding the body.
    pub fn set_correlation_id(&mut self, correlation_id: i32) -> Result<(), EncodeError> {
        self.store
            .replace(CORRELATION_ID_OFFSET, &correlation_id.to_be_bytes())?;
        self.header.correlation_id = correlation_id;
        Ok(())
    }

    /// The whole frame as it goes on the wire
    pub fn as_bytes(&self) -> &[u8] {
        self.store.as_slice()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// The fixed prefix of a response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResponseHeader {
    /// Byte count of everything after the length field
    pub length: i32,
    /// The correlation ID of this response
    pub correlation_id: i32,
}

impl ResponseHeader {
    /// Parses the header from the front of a full response frame and returns
    /// a reader positioned at the body.
    pub fn parse(frame: &[u8]) -> Result<(Self, Reader<'_>), DecodeError> {
        let mut r = Reader::new(frame);
        let header = Self::decode(&mut r)?;
        Ok((header, r))
    }
}

impl Decodable for ResponseHeader {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let length = i32::decode(r)?;
        let correlation_id = i32::decode(r)?;
        Ok(Self {
            length,
            correlation_id,
        })
    }
}

/// Encodes a complete response frame. Brokers do this; the client only
/// needs it to stand in for one.
pub fn encode_response<B>(correlation_id: i32, body: &B) -> Result<Bytes, EncodeError>
where
    B: Encodable + ?Sized,
{
    let mut store = ByteStore::new();
    let mut w = Writer::new(&mut store);
    let slot = w.reserve_length_slot()?;
    correlation_id.encode(&mut w)?;
    body.encode(&mut w)?;
    let len = w.written_since(slot)?;
    w.patch_length(slot, len)?;
    Ok(store.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(correlation_id: i32) -> RequestHeader {
        RequestHeader {
            api_key: ApiKey::Heartbeat,
            api_version: 0,
            correlation_id,
            client_id: "tester".to_string(),
        }
    }

    #[test]
    fn test_length_prefix_covers_rest_of_frame() {
        let env = RequestEnvelope::new(header(1), &7i32, DEFAULT_MAX_SIZE).unwrap();
        let bytes = env.as_bytes();
        let length = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(length as usize, bytes.len() - 4);
        // 2 + 2 + 4 + (2 + 6) + 4
        assert_eq!(length, 20);
    }

    #[test]
    fn test_header_round_trip() {
        let env = RequestEnvelope::new(header(99), &(), DEFAULT_MAX_SIZE).unwrap();
        let mut r = Reader::new(&env.as_bytes()[4..]);
        let decoded = RequestHeader::decode(&mut r).unwrap();
        assert_eq!(decoded, header(99));
        r.require_exhausted().unwrap();
    }

    #[test]
    fn test_correlation_id_rewrite_in_place() {
        let mut env = RequestEnvelope::new(header(1), &"body".to_string(), DEFAULT_MAX_SIZE)
            .unwrap();
        let before = env.as_bytes().to_vec();
        env.set_correlation_id(0x0a0b0c0d).unwrap();
        let after = env.as_bytes();

        assert_eq!(env.correlation_id(), 0x0a0b0c0d);
        assert_eq!(&after[8..12], &[0x0a, 0x0b, 0x0c, 0x0d]);
        assert_eq!(&after[..8], &before[..8]);
        assert_eq!(&after[12..], &before[12..]);
    }

    #[test]
    fn test_request_over_ceiling_fails() {
        let big = "x".repeat(100);
        let err = RequestEnvelope::new(header(1), &big, 64).unwrap_err();
        assert!(matches!(err, EncodeError::BufferOverflow { limit: 64, .. }));
    }

    #[test]
    fn test_response_parse() {
        let frame = encode_response(42, &5i16).unwrap();
        let (header, mut body) = ResponseHeader::parse(&frame).unwrap();
        assert_eq!(header.length, 6);
        assert_eq!(header.correlation_id, 42);
        assert_eq!(i16::decode(&mut body).unwrap(), 5);
        body.require_exhausted().unwrap();
    }
}
