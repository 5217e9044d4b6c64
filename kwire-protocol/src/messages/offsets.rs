use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::messages::TopicBlock;
use crate::reader::Reader;
use crate::writer::Writer;

/// Asks for the offset of the next message to be written.
pub const LATEST_TIMESTAMP: i64 = -1;
/// Asks for the oldest offset still in the log.
pub const EARLIEST_TIMESTAMP: i64 = -2;

/// ListOffsets request (v1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOffsetsRequest {
    pub replica_id: i32,
    pub topics: Vec<TopicBlock<ListOffsetsPartition>>,
}

impl ApiRequest for ListOffsetsRequest {
    const API_KEY: ApiKey = ApiKey::ListOffsets;
    const API_VERSION: i16 = 1;
    type Response = ListOffsetsResponse;
}

impl Encodable for ListOffsetsRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.replica_id.encode(w)?;
        self.topics.encode(w)
    }
}

impl Decodable for ListOffsetsRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let replica_id = i32::decode(r)?;
        let topics = Vec::decode(r)?;
        Ok(Self { replica_id, topics })
    }
}

/// `timestamp` selects the first offset at or after that time in
/// milliseconds, or one of [`LATEST_TIMESTAMP`] / [`EARLIEST_TIMESTAMP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOffsetsPartition {
    pub partition: i32,
    pub timestamp: i64,
}

impl Encodable for ListOffsetsPartition {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.timestamp.encode(w)
    }
}

impl Decodable for ListOffsetsPartition {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let timestamp = i64::decode(r)?;
        Ok(Self {
            partition,
            timestamp,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOffsetsResponse {
    pub topics: Vec<TopicBlock<PartitionOffset>>,
}

impl ListOffsetsResponse {
    pub fn find(&self, topic: &str, partition: i32) -> Option<&PartitionOffset> {
        self.topics
            .iter()
            .filter(|t| t.topic == topic)
            .flat_map(|t| t.partitions.iter())
            .find(|p| p.partition == partition)
    }
}

impl Encodable for ListOffsetsResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topics.encode(w)
    }
}

impl Decodable for ListOffsetsResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topics = Vec::decode(r)?;
        Ok(Self { topics })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionOffset {
    pub partition: i32,
    pub error_code: i16,
    pub timestamp: i64,
    pub offset: i64,
}

impl Encodable for PartitionOffset {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.partition.encode(w)?;
        self.error_code.encode(w)?;
        self.timestamp.encode(w)?;
        self.offset.encode(w)
    }
}

impl Decodable for PartitionOffset {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let partition = i32::decode(r)?;
        let error_code = i16::decode(r)?;
        let timestamp = i64::decode(r)?;
        let offset = i64::decode(r)?;
        Ok(Self {
            partition,
            error_code,
            timestamp,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::test_util::{encode, round_trip};

    #[test]
    fn test_request_layout() {
        let req = ListOffsetsRequest {
            replica_id: -1,
            topics: vec![TopicBlock::new(
                "t",
                vec![ListOffsetsPartition {
                    partition: 2,
                    timestamp: EARLIEST_TIMESTAMP,
                }],
            )],
        };
        let mut expected = Vec::new();
        expected.extend_from_slice(&(-1i32).to_be_bytes());
        expected.extend_from_slice(&1i32.to_be_bytes());
        expected.extend_from_slice(&[0, 1, b't']);
        expected.extend_from_slice(&1i32.to_be_bytes());
        expected.extend_from_slice(&2i32.to_be_bytes());
        expected.extend_from_slice(&(-2i64).to_be_bytes());
        assert_eq!(encode(&req), expected);
    }

    #[test]
    fn test_find_partition() {
        let resp = ListOffsetsResponse {
            topics: vec![TopicBlock::new(
                "orders",
                vec![
                    PartitionOffset {
                        partition: 0,
                        error_code: 0,
                        timestamp: -1,
                        offset: 17,
                    },
                    PartitionOffset {
                        partition: 1,
                        error_code: 0,
                        timestamp: -1,
                        offset: 4,
                    },
                ],
            )],
        };
        let decoded = round_trip(&resp);
        assert_eq!(decoded.find("orders", 1).map(|p| p.offset), Some(4));
        assert!(decoded.find("orders", 9).is_none());
        assert!(decoded.find("other", 0).is_none());
    }
}
