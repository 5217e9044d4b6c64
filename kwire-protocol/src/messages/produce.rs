use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::message_set::MessageSet;
use crate::messages::TopicBlock;
use crate::reader::Reader;
use crate::writer::Writer;

/// Produce request (v2)
///
/// `acks` is 0 for no response, 1 to wait for the leader's local write and
/// -1 to wait for the full in-sync replica set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceRequest {
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<TopicBlock<ProducePartition>>,
}

impl ApiRequest for ProduceRequest {
    const API_KEY: ApiKey = ApiKey::Produce;
    const API_VERSION: i16 = 2;
    type Response = ProduceResponse;
}

impl Encodable for ProduceRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.acks.encode(w)?;
        self.timeout_ms.encode(w)?;
        self.topics.encode(w)
    }
}

impl Decodable for ProduceRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let acks = i16::decode(r)?;
        let timeout_ms = i32::decode(r)?;
        let topics = Vec::decode(r)?;
        Ok(Self {
            acks,
            timeout_ms,
            topics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProducePartition {
    pub partition: i32,
    pub message_set: MessageSet,
}

impl Encodable for ProducePartition {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.message_set.encode(w)
    }
}

impl Decodable for ProducePartition {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let message_set = MessageSet::decode(r)?;
        Ok(Self {
            partition,
            message_set,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResponse {
    pub topics: Vec<TopicBlock<ProducePartitionResponse>>,
    pub throttle_time_ms: i32,
}

impl Encodable for ProduceResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topics.encode(w)?;
        self.throttle_time_ms.encode(w)
    }
}

impl Decodable for ProduceResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topics = Vec::decode(r)?;
        let throttle_time_ms = i32::decode(r)?;
        Ok(Self {
            topics,
            throttle_time_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProducePartitionResponse {
    pub partition: i32,
    pub error_code: i16,
    pub base_offset: i64,
    /// Broker append time of the first message when the topic uses
    /// log-append timestamps, otherwise -1
    pub log_append_time: i64,
}

impl Encodable for ProducePartitionResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.error_code.encode(w)?;
        self.base_offset.encode(w)?;
        self.log_append_time.encode(w)
    }
}

impl Decodable for ProducePartitionResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let error_code = i16::decode(r)?;
        let base_offset = i64::decode(r)?;
        let log_append_time = i64::decode(r)?;
        Ok(Self {
            partition,
            error_code,
            base_offset,
            log_append_time,
        })
    }
}
