use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::message_set::MessageSet;
use crate::messages::TopicBlock;
use crate::reader::Reader;
use crate::writer::Writer;

/// Fetch request. v0, v1 and v2 share the request layout; they differ in
/// the response, which gains a leading throttle time from v1 on, and in the
/// message format the broker may return (v2 can carry v1 messages).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchRequest<const V: i16> {
    /// -1 for ordinary consumers
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub topics: Vec<TopicBlock<FetchPartition>>,
}

pub type FetchRequestV0 = FetchRequest<0>;
pub type FetchRequestV1 = FetchRequest<1>;
pub type FetchRequestV2 = FetchRequest<2>;

impl<const V: i16> ApiRequest for FetchRequest<V> {
    const API_KEY: ApiKey = ApiKey::Fetch;
    const API_VERSION: i16 = V;
    type Response = FetchResponse<V>;
}

impl<const V: i16> Encodable for FetchRequest<V> {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.replica_id.encode(w)?;
        self.max_wait_ms.encode(w)?;
        self.min_bytes.encode(w)?;
        self.topics.encode(w)
    }
}

impl<const V: i16> Decodable for FetchRequest<V> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let replica_id = i32::decode(r)?;
        let max_wait_ms = i32::decode(r)?;
        let min_bytes = i32::decode(r)?;
        let topics = Vec::decode(r)?;
        Ok(Self {
            replica_id,
            max_wait_ms,
            min_bytes,
            topics,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchPartition {
    pub partition: i32,
    pub fetch_offset: i64,
    pub max_bytes: i32,
}

impl Encodable for FetchPartition {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.fetch_offset.encode(w)?;
        self.max_bytes.encode(w)
    }
}

impl Decodable for FetchPartition {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let fetch_offset = i64::decode(r)?;
        let max_bytes = i32::decode(r)?;
        Ok(Self {
            partition,
            fetch_offset,
            max_bytes,
        })
    }
}

/// Fetch response matching `FetchRequest<V>`. `throttle_time_ms` is only on
/// the wire for V >= 1 and reads as 0 for v0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse<const V: i16> {
    pub throttle_time_ms: i32,
    pub topics: Vec<TopicBlock<FetchPartitionResponse>>,
}

pub type FetchResponseV0 = FetchResponse<0>;
pub type FetchResponseV1 = FetchResponse<1>;
pub type FetchResponseV2 = FetchResponse<2>;

impl<const V: i16> Encodable for FetchResponse<V> {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if V >= 1 {
            self.throttle_time_ms.encode(w)?;
        }
        self.topics.encode(w)
    }
}

impl<const V: i16> Decodable for FetchResponse<V> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let throttle_time_ms = if V >= 1 { i32::decode(r)? } else { 0 };
        let topics = Vec::decode(r)?;
        Ok(Self {
            throttle_time_ms,
            topics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchPartitionResponse {
    pub partition: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    /// Possibly cut short by the broker's byte limit; a partial trailing
    /// record is dropped during decode.
    pub message_set: MessageSet,
}

impl Encodable for FetchPartitionResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.error_code.encode(w)?;
        self.high_watermark.encode(w)?;
        self.message_set.encode(w)
    }
}

impl Decodable for FetchPartitionResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let error_code = i16::decode(r)?;
        let high_watermark = i64::decode(r)?;
        let message_set = MessageSet::decode(r)?;
        Ok(Self {
            partition,
            error_code,
            high_watermark,
            message_set,
        })
    }
}
