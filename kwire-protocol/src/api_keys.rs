use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::codec::{Decodable, Encodable};
use crate::error::{DecodeError, EncodeError};
use crate::reader::Reader;
use crate::writer::Writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    LeaderAndIsr = 4,
    StopReplica = 5,
    OffsetCommit = 8,
    OffsetFetch = 9,
    GroupCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
}

impl ApiKey {
    pub fn from_i16(key: i16) -> Option<Self> {
        <Self as FromPrimitive>::from_i16(key)
    }
}

impl Encodable for ApiKey {
    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.push_i16(*self as i16)
    }
}

impl Decodable for ApiKey {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let key = r.pop_i16()?;
        ApiKey::from_i16(key).ok_or(DecodeError::UnknownApiKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(ApiKey::Produce as i16, 0);
        assert_eq!(ApiKey::Metadata as i16, 3);
        assert_eq!(ApiKey::OffsetCommit as i16, 8);
        assert_eq!(ApiKey::ListGroups as i16, 16);
    }

    #[test]
    fn test_from_i16() {
        assert_eq!(ApiKey::from_i16(10), Some(ApiKey::GroupCoordinator));
        assert_eq!(ApiKey::from_i16(6), None);
        assert_eq!(ApiKey::from_i16(17), None);
    }
}
