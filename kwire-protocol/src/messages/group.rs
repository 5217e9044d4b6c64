//! Consumer-group coordination messages
//!
//! These are the wire shapes only. Deciding when to join, how to split
//! partitions between members and when to rejoin after a heartbeat error is
//! left to the caller.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;

use crate::api_keys::ApiKey;
use crate::codec::{ApiRequest, Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::messages::{pop_short_count, push_short_count, TopicPartitions};
use crate::reader::Reader;
use crate::writer::Writer;

/// Protocol type used by consumers joining a group.
pub const CONSUMER_PROTOCOL_TYPE: &str = "consumer";

/// GroupCoordinator request (v0)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupCoordinatorRequest {
    pub group_id: String,
}

impl ApiRequest for GroupCoordinatorRequest {
    const API_KEY: ApiKey = ApiKey::GroupCoordinator;
    const API_VERSION: i16 = 0;
    type Response = GroupCoordinatorResponse;
}

impl Encodable for GroupCoordinatorRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)
    }
}

impl Decodable for GroupCoordinatorRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        Ok(Self { group_id })
    }
}

/// The broker currently coordinating a group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupCoordinatorResponse {
    pub error_code: i16,
    pub coordinator_id: i32,
    pub host: String,
    pub port: i32,
}

impl Encodable for GroupCoordinatorResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.coordinator_id.encode(w)?;
        self.host.encode(w)?;
        self.port.encode(w)
    }
}

impl Decodable for GroupCoordinatorResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let coordinator_id = i32::decode(r)?;
        let host = String::decode(r)?;
        let port = i32::decode(r)?;
        Ok(Self {
            error_code,
            coordinator_id,
            host,
            port,
        })
    }
}

/// Partitions a member already owns, keyed by topic.
///
/// Encoded as a self-describing block: `size:i32 count:i16 (topic:string
/// partitions:i16 partition:i32...)...`. A size of zero or less decodes as
/// an empty subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberSubscription {
    pub partitions: BTreeMap<String, BTreeSet<i32>>,
}

impl MemberSubscription {
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl Encodable for MemberSubscription {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.length_prefixed(|w| {
            push_short_count(w, self.partitions.len())?;
            for (topic, partitions) in &self.partitions {
                w.push_string(topic)?;
                push_short_count(w, partitions.len())?;
                for partition in partitions {
                    w.push_i32(*partition)?;
                }
            }
            Ok(())
        })
    }
}

impl Decodable for MemberSubscription {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let size = r.pop_i32()?;
        if size <= 0 {
            return Ok(Self::default());
        }
        let mut inner = r.sub_reader(size as usize)?;
        let mut partitions = BTreeMap::new();
        for _ in 0..pop_short_count(&mut inner)? {
            let topic = inner.pop_string()?;
            let set: &mut BTreeSet<i32> = partitions.entry(topic).or_default();
            for _ in 0..pop_short_count(&mut inner)? {
                set.insert(inner.pop_i32()?);
            }
        }
        Ok(Self { partitions })
    }
}

/// Member metadata sent with a join: the topics the member wants and the
/// partitions it currently holds.
///
/// The whole structure is size-prefixed, so members that do not understand
/// a newer version can still step over it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtocolMetadata {
    pub version: i16,
    pub topics: Vec<String>,
    pub owned: MemberSubscription,
}

impl Encodable for ProtocolMetadata {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.length_prefixed(|w| {
            self.version.encode(w)?;
            self.topics.encode(w)?;
            self.owned.encode(w)
        })
    }
}

impl Decodable for ProtocolMetadata {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let mut inner = r.sized_block()?;
        if inner.is_empty() {
            return Ok(Self::default());
        }
        let version = i16::decode(&mut inner)?;
        let topics = Vec::<String>::decode(&mut inner)?;
        let owned = if inner.is_empty() {
            MemberSubscription::default()
        } else {
            MemberSubscription::decode(&mut inner)?
        };
        Ok(Self {
            version,
            topics,
            owned,
        })
    }
}

/// One assignment strategy offered by a joining member
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupProtocol {
    pub name: String,
    pub metadata: ProtocolMetadata,
}

impl Encodable for GroupProtocol {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.name.encode(w)?;
        self.metadata.encode(w)
    }
}

impl Decodable for GroupProtocol {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let name = String::decode(r)?;
        let metadata = ProtocolMetadata::decode(r)?;
        Ok(Self { name, metadata })
    }
}

/// JoinGroup request (v0). `member_id` is empty on the first join.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinGroupRequest {
    pub group_id: String,
    pub session_timeout_ms: i32,
    pub member_id: String,
    pub protocol_type: String,
    pub protocols: Vec<GroupProtocol>,
}

impl ApiRequest for JoinGroupRequest {
    const API_KEY: ApiKey = ApiKey::JoinGroup;
    const API_VERSION: i16 = 0;
    type Response = JoinGroupResponse;
}

impl Encodable for JoinGroupRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.session_timeout_ms.encode(w)?;
        self.member_id.encode(w)?;
        self.protocol_type.encode(w)?;
        self.protocols.encode(w)
    }
}

impl Decodable for JoinGroupRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let session_timeout_ms = i32::decode(r)?;
        let member_id = String::decode(r)?;
        let protocol_type = String::decode(r)?;
        let protocols = Vec::decode(r)?;
        Ok(Self {
            group_id,
            session_timeout_ms,
            member_id,
            protocol_type,
            protocols,
        })
    }
}

/// `members` is only filled in for the group leader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinGroupResponse {
    pub error_code: i16,
    pub generation_id: i32,
    pub protocol: String,
    pub leader_id: String,
    pub member_id: String,
    pub members: Vec<JoinGroupMember>,
}

impl JoinGroupResponse {
    pub fn is_leader(&self) -> bool {
        !self.member_id.is_empty() && self.member_id == self.leader_id
    }
}

impl Encodable for JoinGroupResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.generation_id.encode(w)?;
        self.protocol.encode(w)?;
        self.leader_id.encode(w)?;
        self.member_id.encode(w)?;
        self.members.encode(w)
    }
}

impl Decodable for JoinGroupResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let generation_id = i32::decode(r)?;
        let protocol = String::decode(r)?;
        let leader_id = String::decode(r)?;
        let member_id = String::decode(r)?;
        let members = Vec::decode(r)?;
        Ok(Self {
            error_code,
            generation_id,
            protocol,
            leader_id,
            member_id,
            members,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinGroupMember {
    pub member_id: String,
    pub metadata: ProtocolMetadata,
}

impl Encodable for JoinGroupMember {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.member_id.encode(w)?;
        self.metadata.encode(w)
    }
}

impl Decodable for JoinGroupMember {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let member_id = String::decode(r)?;
        let metadata = ProtocolMetadata::decode(r)?;
        Ok(Self {
            member_id,
            metadata,
        })
    }
}

/// Partitions handed to one member, as a size-prefixed block. A size of
/// zero or less decodes as an empty assignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberAssignment {
    pub version: i16,
    pub topics: Vec<TopicPartitions>,
    pub user_data: Bytes,
}

impl Encodable for MemberAssignment {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.length_prefixed(|w| {
            self.version.encode(w)?;
            self.topics.encode(w)?;
            self.user_data.encode(w)
        })
    }
}

impl Decodable for MemberAssignment {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let size = r.pop_i32()?;
        if size <= 0 {
            return Ok(Self::default());
        }
        let mut inner = r.sub_reader(size as usize)?;
        let version = i16::decode(&mut inner)?;
        let topics = Vec::decode(&mut inner)?;
        let user_data = Bytes::decode(&mut inner)?;
        Ok(Self {
            version,
            topics,
            user_data,
        })
    }
}

/// SyncGroup request (v0). Only the leader sends assignments; followers
/// send an empty map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncGroupRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub assignments: BTreeMap<String, MemberAssignment>,
}

impl ApiRequest for SyncGroupRequest {
    const API_KEY: ApiKey = ApiKey::SyncGroup;
    const API_VERSION: i16 = 0;
    type Response = SyncGroupResponse;
}

impl Encodable for SyncGroupRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.generation_id.encode(w)?;
        self.member_id.encode(w)?;
        self.assignments.encode(w)
    }
}

impl Decodable for SyncGroupRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let generation_id = i32::decode(r)?;
        let member_id = String::decode(r)?;
        let assignments = BTreeMap::decode(r)?;
        Ok(Self {
            group_id,
            generation_id,
            member_id,
            assignments,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncGroupResponse {
    pub error_code: i16,
    pub assignment: MemberAssignment,
}

impl Encodable for SyncGroupResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.assignment.encode(w)
    }
}

impl Decodable for SyncGroupResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let assignment = MemberAssignment::decode(r)?;
        Ok(Self {
            error_code,
            assignment,
        })
    }
}

/// Heartbeat request (v0)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeartbeatRequest {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
}

impl ApiRequest for HeartbeatRequest {
    const API_KEY: ApiKey = ApiKey::Heartbeat;
    const API_VERSION: i16 = 0;
    type Response = ErrorOnlyResponse;
}

impl Encodable for HeartbeatRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.generation_id.encode(w)?;
        self.member_id.encode(w)
    }
}

impl Decodable for HeartbeatRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let generation_id = i32::decode(r)?;
        let member_id = String::decode(r)?;
        Ok(Self {
            group_id,
            generation_id,
            member_id,
        })
    }
}

/// LeaveGroup request (v0)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaveGroupRequest {
    pub group_id: String,
    pub member_id: String,
}

impl ApiRequest for LeaveGroupRequest {
    const API_KEY: ApiKey = ApiKey::LeaveGroup;
    const API_VERSION: i16 = 0;
    type Response = ErrorOnlyResponse;
}

impl Encodable for LeaveGroupRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.member_id.encode(w)
    }
}

impl Decodable for LeaveGroupRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let member_id = String::decode(r)?;
        Ok(Self {
            group_id,
            member_id,
        })
    }
}

/// Body of the heartbeat and leave-group responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorOnlyResponse {
    pub error_code: i16,
}

pub type HeartbeatResponse = ErrorOnlyResponse;
pub type LeaveGroupResponse = ErrorOnlyResponse;

impl Encodable for ErrorOnlyResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)
    }
}

impl Decodable for ErrorOnlyResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        Ok(Self { error_code })
    }
}

/// ListGroups request (v0); the body is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListGroupsRequest;

impl ApiRequest for ListGroupsRequest {
    const API_KEY: ApiKey = ApiKey::ListGroups;
    const API_VERSION: i16 = 0;
    type Response = ListGroupsResponse;
}

impl Encodable for ListGroupsRequest {
    fn encode(&self, _w: &mut Writer<'_>) -> Result<(), EncodeError> {
        Ok(())
    }
}

impl Decodable for ListGroupsRequest {
    fn decode(_r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListGroupsResponse {
    pub error_code: i16,
    pub groups: Vec<ListedGroup>,
}

impl Encodable for ListGroupsResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.groups.encode(w)
    }
}

impl Decodable for ListGroupsResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let groups = Vec::decode(r)?;
        Ok(Self { error_code, groups })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListedGroup {
    pub group_id: String,
    pub protocol_type: String,
}

impl Encodable for ListedGroup {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.protocol_type.encode(w)
    }
}

impl Decodable for ListedGroup {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_id = String::decode(r)?;
        let protocol_type = String::decode(r)?;
        Ok(Self {
            group_id,
            protocol_type,
        })
    }
}

/// DescribeGroups request (v0)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeGroupsRequest {
    pub group_ids: Vec<String>,
}

impl ApiRequest for DescribeGroupsRequest {
    const API_KEY: ApiKey = ApiKey::DescribeGroups;
    const API_VERSION: i16 = 0;
    type Response = DescribeGroupsResponse;
}

impl Encodable for DescribeGroupsRequest {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.group_ids.encode(w)
    }
}

impl Decodable for DescribeGroupsRequest {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let group_ids = Vec::decode(r)?;
        Ok(Self { group_ids })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeGroupsResponse {
    pub groups: Vec<GroupDescription>,
}

impl Encodable for DescribeGroupsResponse {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.groups.encode(w)
    }
}

impl Decodable for DescribeGroupsResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let groups = Vec::decode(r)?;
        Ok(Self { groups })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupDescription {
    pub error_code: i16,
    pub group_id: String,
    /// e.g. `Stable`, `PreparingRebalance`, `Dead`
    pub state: String,
    pub protocol_type: String,
    pub protocol: String,
    pub members: Vec<GroupMember>,
}

impl Encodable for GroupDescription {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.error_code.encode(w)?;
        self.group_id.encode(w)?;
        self.state.encode(w)?;
        self.protocol_type.encode(w)?;
        self.protocol.encode(w)?;
        self.members.encode(w)
    }
}

impl Decodable for GroupDescription {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let error_code = i16::decode(r)?;
        let group_id = String::decode(r)?;
        let state = String::decode(r)?;
        let protocol_type = String::decode(r)?;
        let protocol = String::decode(r)?;
        let members = Vec::decode(r)?;
        Ok(Self {
            error_code,
            group_id,
            state,
            protocol_type,
            protocol,
            members,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupMember {
    pub member_id: String,
    pub client_id: String,
    pub client_host: String,
    pub metadata: ProtocolMetadata,
    pub assignment: MemberAssignment,
}

impl Encodable for GroupMember {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.member_id.encode(w)?;
        self.client_id.encode(w)?;
        self.client_host.encode(w)?;
        self.metadata.encode(w)?;
        self.assignment.encode(w)
    }
}

impl Decodable for GroupMember {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let member_id = String::decode(r)?;
        let client_id = String::decode(r)?;
        let client_host = String::decode(r)?;
        let metadata = ProtocolMetadata::decode(r)?;
        let assignment = MemberAssignment::decode(r)?;
        Ok(Self {
            member_id,
            client_id,
            client_host,
            metadata,
            assignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_exact;
    use crate::messages::test_util::{encode, round_trip};

    fn metadata() -> ProtocolMetadata {
        let mut owned = MemberSubscription::default();
        owned
            .partitions
            .insert("orders".to_string(), BTreeSet::from([2, 0, 1]));
        ProtocolMetadata {
            version: 0,
            topics: vec!["orders".to_string(), "refunds".to_string()],
            owned,
        }
    }

    #[test]
    fn test_protocol_metadata_size_prefix() {
        let bytes = encode(&metadata());
        let size = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(size as usize, bytes.len() - 4);
        assert_eq!(round_trip(&metadata()), metadata());
    }

    #[test]
    fn test_subscription_uses_short_counts() {
        let mut sub = MemberSubscription::default();
        sub.partitions.insert("t".to_string(), BTreeSet::from([5]));
        let expected = [
            0, 0, 0, 11, // size
            0, 1, // topic count
            0, 1, b't', // topic
            0, 1, // partition count
            0, 0, 0, 5,
        ];
        assert_eq!(encode(&sub), expected);
        assert_eq!(round_trip(&sub), sub);
    }

    #[test]
    fn test_metadata_from_newer_member_is_skipped_past() {
        // a newer member appends fields we do not know after the owned block
        let mut block = encode(&metadata())[4..].to_vec();
        block.extend_from_slice(&[9, 9, 9]);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0, 2, b'm', b'1']);
        bytes.extend_from_slice(&(block.len() as i32).to_be_bytes());
        bytes.extend_from_slice(&block);

        let member: JoinGroupMember = decode_exact(&bytes).unwrap();
        assert_eq!(member.member_id, "m1");
        assert_eq!(member.metadata, metadata());
    }

    #[test]
    fn test_empty_assignment_decodes_to_default() {
        // error_code 0, assignment size 0
        let bytes = [0u8, 0, 0, 0, 0, 0];
        let resp: SyncGroupResponse = decode_exact(&bytes).unwrap();
        assert_eq!(resp.error_code, 0);
        assert_eq!(resp.assignment, MemberAssignment::default());
    }

    #[test]
    fn test_sync_group_round_trip() {
        let mut assignments = BTreeMap::new();
        assignments.insert(
            "member-1".to_string(),
            MemberAssignment {
                version: 0,
                topics: vec![TopicPartitions::new("orders", vec![0, 1])],
                user_data: Bytes::from_static(b"ud"),
            },
        );
        assignments.insert("member-2".to_string(), MemberAssignment::default());
        let req = SyncGroupRequest {
            group_id: "billing".to_string(),
            generation_id: 4,
            member_id: "member-1".to_string(),
            assignments,
        };
        assert_eq!(round_trip(&req), req);
    }

    #[test]
    fn test_describe_groups_round_trip() {
        let resp = DescribeGroupsResponse {
            groups: vec![GroupDescription {
                error_code: 0,
                group_id: "billing".to_string(),
                state: "Stable".to_string(),
                protocol_type: CONSUMER_PROTOCOL_TYPE.to_string(),
                protocol: "range".to_string(),
                members: vec![GroupMember {
                    member_id: "member-1".to_string(),
                    client_id: "kwire".to_string(),
                    client_host: "/10.0.0.1".to_string(),
                    metadata: metadata(),
                    assignment: MemberAssignment {
                        version: 0,
                        topics: vec![TopicPartitions::new("orders", vec![0])],
                        user_data: Bytes::new(),
                    },
                }],
            }],
        };
        assert_eq!(round_trip(&resp), resp);
    }

    #[test]
    fn test_join_leader() {
        let resp = JoinGroupResponse {
            leader_id: "a".to_string(),
            member_id: "a".to_string(),
            ..Default::default()
        };
        assert!(resp.is_leader());
        assert!(!JoinGroupResponse::default().is_leader());
    }

    #[test]
    fn test_list_groups_has_empty_body() {
        assert!(encode(&ListGroupsRequest).is_empty());
    }
}
