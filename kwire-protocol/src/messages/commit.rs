//! Committing and reading back consumer-group offsets

use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::messages::{TopicBlock, TopicPartitions};
use crate::reader::Reader;
use crate::writer::Writer;

/// Lets the broker apply its configured offset retention.
pub const DEFAULT_RETENTION_TIME: i64 = -1;

/// OffsetCommit request (v2)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub retention_time_ms: i64,
    pub topics: Vec<TopicBlock<PartitionOffsetCommit>>,
}

impl ApiRequest for OffsetCommitRequest {
    const API_KEY: ApiKey = ApiKey::OffsetCommit;
    const API_VERSION: i16 = 2;
    type Response = OffsetCommitResponse;
}

impl Encodable for OffsetCommitRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.generation_id.encode(w)?;
        self.member_id.encode(w)?;
        self.retention_time_ms.encode(w)?;
        self.topics.encode(w)
    }
}

impl Decodable for OffsetCommitRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let generation_id = i32::decode(r)?;
        let member_id = String::decode(r)?;
        let retention_time_ms = i64::decode(r)?;
        let topics = Vec::decode(r)?;
        Ok(Self {
            group_id,
            generation_id,
            member_id,
            retention_time_ms,
            topics,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionOffsetCommit {
    pub partition: i32,
    pub offset: i64,
    pub metadata: String,
}

impl Encodable for PartitionOffsetCommit {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.offset.encode(w)?;
        self.metadata.encode(w)
    }
}

impl Decodable for PartitionOffsetCommit {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let offset = i64::decode(r)?;
        let metadata = String::decode(r)?;
        Ok(Self {
            partition,
            offset,
            metadata,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetCommitResponse {
    pub topics: Vec<TopicBlock<PartitionError>>,
}

impl Encodable for OffsetCommitResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topics.encode(w)
    }
}

impl Decodable for OffsetCommitResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topics = Vec::decode(r)?;
        Ok(Self { topics })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionError {
    pub partition: i32,
    pub error_code: i16,
}

impl Encodable for PartitionError {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.error_code.encode(w)
    }
}

impl Decodable for PartitionError {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let error_code = i16::decode(r)?;
        Ok(Self {
            partition,
            error_code,
        })
    }
}

/// OffsetFetch request (v1): the group's committed offsets for the listed
/// partitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchRequest {
    pub group_id: String,
    pub topics: Vec<TopicPartitions>,
}

impl ApiRequest for OffsetFetchRequest {
    const API_KEY: ApiKey = ApiKey::OffsetFetch;
    const API_VERSION: i16 = 1;
    type Response = OffsetFetchResponse;
}

impl Encodable for OffsetFetchRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.topics.encode(w)
    }
}

impl Decodable for OffsetFetchRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let topics = Vec::decode(r)?;
        Ok(Self { group_id, topics })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetFetchResponse {
    pub topics: Vec<TopicBlock<PartitionOffsetMetadata>>,
}

impl Encodable for OffsetFetchResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topics.encode(w)
    }
}

impl Decodable for OffsetFetchResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topics = Vec::decode(r)?;
        Ok(Self { topics })
    }
}

/// A committed offset; -1 when the group has none for the partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionOffsetMetadata {
    pub partition: i32,
    pub offset: i64,
    pub metadata: String,
    pub error_code: i16,
}

impl Encodable for PartitionOffsetMetadata {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.offset.encode(w)?;
        self.metadata.encode(w)?;
        self.error_code.encode(w)
    }
}

impl Decodable for PartitionOffsetMetadata {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let offset = i64::decode(r)?;
        let metadata = String::decode(r)?;
        let error_code = i16::decode(r)?;
        Ok(Self {
            partition,
            offset,
            metadata,
            error_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::test_util::round_trip;

    #[test]
    fn test_commit_round_trip() {
        let req = OffsetCommitRequest {
            group_id: "billing".to_string(),
            generation_id: 3,
            member_id: "member-1".to_string(),
            retention_time_ms: DEFAULT_RETENTION_TIME,
            topics: vec![TopicBlock::new(
                "orders",
                vec![PartitionOffsetCommit {
                    partition: 0,
                    offset: 120,
                    metadata: String::new(),
                }],
            )],
        };
        assert_eq!(round_trip(&req), req);
    }

    #[test]
    fn test_offset_fetch_round_trip() {
        let req = OffsetFetchRequest {
            group_id: "billing".to_string(),
            topics: vec![TopicPartitions::new("orders", vec![0, 1])],
        };
        assert_eq!(round_trip(&req), req);

        let resp = OffsetFetchResponse {
            topics: vec![TopicBlock::new(
                "orders",
                vec![PartitionOffsetMetadata {
                    partition: 1,
                    offset: -1,
                    metadata: "".to_string(),
                    error_code: 0,
                }],
            )],
        };
        assert_eq!(round_trip(&resp), resp);
    }
}
