use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

/// Metadata request (v0). An empty topic list asks for every topic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRequest {
    pub topics: Vec<String>,
}

impl ApiRequest for MetadataRequest {
    const API_KEY: ApiKey = ApiKey::Metadata;
    const API_VERSION: i16 = 0;
    type Response = MetadataResponse;
}

impl Encodable for MetadataRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.topics.encode(w)
    }
}

impl Decodable for MetadataRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let topics = Vec::<String>::decode(r)?;
        Ok(Self { topics })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataResponse {
    pub brokers: Vec<Broker>,
    pub topics: Vec<TopicMetadata>,
}

impl MetadataResponse {
    pub fn broker(&self, node_id: i32) -> Option<&Broker> {
        self.brokers.iter().find(|b| b.node_id == node_id)
    }
}

impl Encodable for MetadataResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.brokers.encode(w)?;
        self.topics.encode(w)
    }
}

impl Decodable for MetadataResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let brokers = Vec::<Broker>::decode(r)?;
        let topics = Vec::<TopicMetadata>::decode(r)?;
        Ok(Self { brokers, topics })
    }
}

/// Broker information
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Broker {
    /// The broker ID.
    pub node_id: i32,
    /// The broker hostname.
    pub host: String,
    /// The broker port.
    pub port: i32,
}

impl Encodable for Broker {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.node_id.encode(w)?;
        self.host.encode(w)?;
        self.port.encode(w)
    }
}

impl Decodable for Broker {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let node_id = i32::decode(r)?;
        let host = String::decode(r)?;
        let port = i32::decode(r)?;
        Ok(Self {
            node_id,
            host,
            port,
        })
    }
}

/// Topic metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopicMetadata {
    pub error_code: i16,
    pub topic: String,
    pub partitions: Vec<PartitionMetadata>,
}

impl Encodable for TopicMetadata {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.topic.encode(w)?;
        self.partitions.encode(w)
    }
}

impl Decodable for TopicMetadata {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let topic = String::decode(r)?;
        let partitions = Vec::<PartitionMetadata>::decode(r)?;
        Ok(Self {
            error_code,
            topic,
            partitions,
        })
    }
}

/// Partition metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionMetadata {
    pub error_code: i16,
    /// The partition index.
    pub partition: i32,
    /// The ID of the leader broker, -1 while an election is running.
    pub leader: i32,
    /// The set of all nodes that host this partition.
    pub replicas: Vec<i32>,
    /// The set of nodes that are in sync with the leader.
    pub isr: Vec<i32>,
}

impl Encodable for PartitionMetadata {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.partition.encode(w)?;
        self.leader.encode(w)?;
        self.replicas.encode(w)?;
        self.isr.encode(w)
    }
}

impl Decodable for PartitionMetadata {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let partition = i32::decode(r)?;
        let leader = i32::decode(r)?;
        let replicas = Vec::<i32>::decode(r)?;
        let isr = Vec::<i32>::decode(r)?;
        Ok(Self {
            error_code,
            partition,
            leader,
            replicas,
            isr,
        })
    }
}
