//! Request and response bodies for the supported APIs
//!
//! Every request type implements [`ApiRequest`](crate::codec::ApiRequest),
//! which fixes its API key and version and names the response type. Both
//! directions implement `Encodable` and `Decodable` so a broker stand-in can
//! be built from the same types.

mod commit;
mod fetch;
mod group;
mod metadata;
mod offsets;
mod produce;

pub use commit::*;
pub use fetch::*;
pub use group::*;
pub use metadata::*;
pub use offsets::*;
pub use produce::*;

use crate::codec::{Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

/// A topic name followed by a sequence of per-partition entries, the shape
/// most request and response bodies nest their data in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicBlock<T> {
    pub topic: String,
    pub partitions: Vec<T>,
}

impl<T> TopicBlock<T> {
    pub fn new(topic: impl Into<String>, partitions: Vec<T>) -> Self {
        Self {
            topic: topic.into(),
            partitions,
        }
    }
}

impl<T: Encodable> Encodable for TopicBlock<T> {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topic.encode(w)?;
        self.partitions.encode(w)
    }
}

impl<T: Decodable> Decodable for TopicBlock<T> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topic = String::decode(r)?;
        let partitions = Vec::<T>::decode(r)?;
        Ok(Self { topic, partitions })
    }
}

/// A topic and a plain list of partition ids
pub type TopicPartitions = TopicBlock<i32>;

/// `count:i16` used by the consumer subscription encoding
pub(crate) fn push_short_count(w: &mut Writer<'_>, len: usize) -> Result<(), EncodeError> {
    let count = i16::try_from(len).map_err(|_| EncodeError::TooManyElements(len))?;
    w.push_i16(count)
}

pub(crate) fn pop_short_count(r: &mut Reader<'_>) -> Result<usize, DecodeError> {
    let count = r.pop_i16()?;
    usize::try_from(count).map_err(|_| DecodeError::InvalidLength(count as i32))
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::buffer::ByteStore;
    use crate::codec::{decode_exact, Decodable, Encodable};
    use crate::writer::Writer;

    pub fn encode<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        value.encode(&mut w).unwrap();
        w.as_slice().to_vec()
    }

    pub fn round_trip<T: Encodable + Decodable>(value: &T) -> T {
        decode_exact(&encode(value)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteStore;

    #[test]
    fn test_short_count_overflow_is_element_error() {
        let mut store = ByteStore::new();
        let mut w = Writer::new(&mut store);
        assert_eq!(
            push_short_count(&mut w, 40_000),
            Err(EncodeError::TooManyElements(40_000))
        );
        assert!(w.as_slice().is_empty());
    }
}
