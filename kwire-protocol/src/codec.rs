//! Traits for encoding and decoding protocol values, and their
//! implementations for the wire primitives

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::api_keys::ApiKey;
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

/// A type that can be written to a [`Writer`].
pub trait Encodable {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError>;
}

/// A type that can be read from a [`Reader`].
pub trait Decodable: Sized {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError>;
}

/// A request body with a fixed place in the API surface.
///
/// The key/version pair is part of the type; it is never carried as a
/// runtime field. `Response` names the decoder the caller has to use, since
/// responses do not echo the key or version.
pub trait ApiRequest: Encodable {
    const API_KEY: ApiKey;
    const API_VERSION: i16;
    type Response: Decodable;
}

/// Decodes a whole buffer as one `T`, failing if bytes are left over.
pub fn decode_exact<T: Decodable>(data: &[u8]) -> Result<T, DecodeError> {
    let mut r = Reader::new(data);
    let value = T::decode(&mut r)?;
    r.require_exhausted()?;
    Ok(value)
}

macro_rules! impl_codec_for_int {
    ($($t:ty => $push:ident, $pop:ident);*) => {
        $(
            impl Encodable for $t {
                fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
                    w.$push(*self)
                }
            }

            impl Decodable for $t {
                fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
                    r.$pop()
                }
            }
        )*
    };
}

impl_codec_for_int!(
    i8 => push_i8, pop_i8;
    i16 => push_i16, pop_i16;
    i32 => push_i32, pop_i32;
    i64 => push_i64, pop_i64;
    u8 => push_u8, pop_u8;
    u16 => push_u16, pop_u16;
    u32 => push_u32, pop_u32;
    u64 => push_u64, pop_u64
);

// --- empty body ---

impl Encodable for () {
    fn encode(&self, _w: &mut Writer<'_>) -> Result<(), EncodeError> {
        Ok(())
    }
}

impl Decodable for () {
    fn decode(_r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(())
    }
}

// --- string ---

impl Encodable for String {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.push_string(self)
    }
}

impl Encodable for str {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.push_string(self)
    }
}

impl Decodable for String {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        r.pop_string()
    }
}

// --- bytes (4-byte length blob) ---

impl Encodable for Bytes {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.push_bytes(self)
    }
}

impl Decodable for Bytes {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        r.pop_bytes().map(Bytes::copy_from_slice)
    }
}

// --- sequence ---

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let count =
            i32::try_from(self.len()).map_err(|_| EncodeError::TooManyElements(self.len()))?;
        w.push_i32(count)?;
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let count = r.pop_count()?;
        // Every element takes at least one byte, so the count cannot
        // legitimately exceed what is left.
        let mut items = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            items.push(T::decode(r)?);
        }
        Ok(items)
    }
}

// --- associative: count, then (key, value) pairs ---

impl<V: Encodable> Encodable for BTreeMap<String, V> {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let count =
            i32::try_from(self.len()).map_err(|_| EncodeError::TooManyElements(self.len()))?;
        w.push_i32(count)?;
        for (key, value) in self {
            w.push_string(key)?;
            value.encode(w)?;
        }
        Ok(())
    }
}

impl<V: Decodable> Decodable for BTreeMap<String, V> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let count = r.pop_count()?;
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = r.pop_string()?;
            let value = V::decode(r)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
