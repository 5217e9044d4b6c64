//! Broker error codes carried in response bodies

use std::fmt;

/// Lowest code with a catalog entry.
pub const MIN_ERROR_CODE: i16 = -1;
/// Highest code with a catalog entry.
pub const MAX_ERROR_CODE: i16 = 31;

const INVALID_ERROR_CODE: &str = "invalid error code";

/// Error codes a broker may place in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ErrorCode {
    /// The server hit an error it could not map to a code
    UnknownServerError = -1,
    /// No error
    None = 0,
    /// The requested offset is outside the range kept by the server
    OffsetOutOfRange = 1,
    /// The message failed its CRC check or is otherwise corrupt
    CorruptMessage = 2,
    /// This server does not host this topic-partition
    UnknownTopicOrPartition = 3,
    /// The message has a negative size
    InvalidMessageSize = 4,
    /// A leadership election is in progress for this partition
    LeaderNotAvailable = 5,
    /// This server is not the leader for the partition
    NotLeaderForPartition = 6,
    /// The request exceeded its server-side timeout
    RequestTimedOut = 7,
    /// The broker is not available
    BrokerNotAvailable = 8,
    /// The replica is not available for the partition
    ReplicaNotAvailable = 9,
    /// The message is larger than the server accepts
    MessageSizeTooLarge = 10,
    /// The controller moved to another broker
    StaleControllerEpoch = 11,
    /// The committed offset metadata is too large
    OffsetMetadataTooLarge = 12,
    /// The server disconnected before a response was received
    NetworkException = 13,
    /// The coordinator is still loading group state
    GroupLoadInProgress = 14,
    /// The group coordinator is not available
    GroupCoordinatorNotAvailable = 15,
    /// This broker is not the coordinator for the group
    NotCoordinatorForGroup = 16,
    /// The topic name is invalid or the topic is internal
    InvalidTopic = 17,
    /// The record list exceeds the segment size
    RecordListTooLarge = 18,
    /// Fewer in-sync replicas than required
    NotEnoughReplicas = 19,
    /// Written, but to fewer in-sync replicas than required
    NotEnoughReplicasAfterAppend = 20,
    /// The requested acks value is invalid
    InvalidRequiredAcks = 21,
    /// The generation id is not the current one
    IllegalGeneration = 22,
    /// The member's protocols do not match the group's
    InconsistentGroupProtocol = 23,
    /// The group id is empty or invalid
    InvalidGroupId = 24,
    /// The coordinator does not know this member id
    UnknownMemberId = 25,
    /// The session timeout is outside the allowed range
    InvalidSessionTimeout = 26,
    /// The group is rebalancing and the member must rejoin
    RebalanceInProgress = 27,
    /// The committed offset entry is too large
    InvalidCommitOffsetSize = 28,
    /// Not authorized to access the topic
    TopicAuthorizationFailed = 29,
    /// Not authorized to access the group
    GroupAuthorizationFailed = 30,
    /// Not authorized for the cluster operation
    ClusterAuthorizationFailed = 31,
}

impl ErrorCode {
    /// Maps a wire code onto the catalog, `None` when outside `-1..=31`.
    pub fn from_i16(code: i16) -> Option<Self> {
        use ErrorCode::*;
        let known = match code {
            -1 => UnknownServerError,
            0 => None,
            1 => OffsetOutOfRange,
            2 => CorruptMessage,
            3 => UnknownTopicOrPartition,
            4 => InvalidMessageSize,
            5 => LeaderNotAvailable,
            6 => NotLeaderForPartition,
            7 => RequestTimedOut,
            8 => BrokerNotAvailable,
            9 => ReplicaNotAvailable,
            10 => MessageSizeTooLarge,
            11 => StaleControllerEpoch,
            12 => OffsetMetadataTooLarge,
            13 => NetworkException,
            14 => GroupLoadInProgress,
            15 => GroupCoordinatorNotAvailable,
            16 => NotCoordinatorForGroup,
            17 => InvalidTopic,
            18 => RecordListTooLarge,
            19 => NotEnoughReplicas,
            20 => NotEnoughReplicasAfterAppend,
            21 => InvalidRequiredAcks,
            22 => IllegalGeneration,
            23 => InconsistentGroupProtocol,
            24 => InvalidGroupId,
            25 => UnknownMemberId,
            26 => InvalidSessionTimeout,
            27 => RebalanceInProgress,
            28 => InvalidCommitOffsetSize,
            29 => TopicAuthorizationFailed,
            30 => GroupAuthorizationFailed,
            31 => ClusterAuthorizationFailed,
            _ => return Option::None,
        };
        Some(known)
    }

    /// The wire value of this code
    pub fn to_i16(self) -> i16 {
        self as i16
    }

    /// `true` for every code other than [`ErrorCode::None`]
    pub fn is_error(self) -> bool {
        self != ErrorCode::None
    }

    /// Fixed text for this code
    pub fn description(self) -> &'static str {
        use ErrorCode::*;
        match self {
            UnknownServerError => "unknown server error",
            None => "no error",
            OffsetOutOfRange => "offset out of range",
            CorruptMessage => "invalid message",
            UnknownTopicOrPartition => "unknown topic or partition",
            InvalidMessageSize => "invalid message size",
            LeaderNotAvailable => "leader not available",
            NotLeaderForPartition => "not leader for partition",
            RequestTimedOut => "request timed out",
            BrokerNotAvailable => "broker not available",
            ReplicaNotAvailable => "replica not available",
            MessageSizeTooLarge => "message size too large",
            StaleControllerEpoch => "stale controller epoch",
            OffsetMetadataTooLarge => "offset metadata too large",
            NetworkException => "network exception",
            GroupLoadInProgress => "group load in progress",
            GroupCoordinatorNotAvailable => "group coordinator not available",
            NotCoordinatorForGroup => "broker is not coordinator",
            InvalidTopic => "invalid topic",
            RecordListTooLarge => "record list too large",
            NotEnoughReplicas => "not enough replicas",
            NotEnoughReplicasAfterAppend => "not enough replicas after append",
            InvalidRequiredAcks => "invalid required acks",
            IllegalGeneration => "illegal generation id",
            InconsistentGroupProtocol => "inconsistent group protocol",
            InvalidGroupId => "invalid group id",
            UnknownMemberId => "unknown member id",
            InvalidSessionTimeout => "invalid session timeout value",
            RebalanceInProgress => "group rebalance in progress",
            InvalidCommitOffsetSize => "invalid commit offset size",
            TopicAuthorizationFailed => "topic authorization failed",
            GroupAuthorizationFailed => "group authorization failed",
            ClusterAuthorizationFailed => "cluster authorization failed",
        }
    }
}

/// Text for a raw wire code. Codes outside `-1..=31` get a fixed
/// "invalid error code" text rather than a lookup failure.
pub fn error_string(code: i16) -> &'static str {
    ErrorCode::from_i16(code)
        .map(ErrorCode::description)
        .unwrap_or(INVALID_ERROR_CODE)
}

impl std::error::Error for ErrorCode {}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.to_i16())
    }
}

impl TryFrom<i16> for ErrorCode {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::from_i16(value).ok_or_else(|| format!("Unknown error code: {}", value))
    }
}

impl From<ErrorCode> for i16 {
    fn from(code: ErrorCode) -> Self {
        code as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_code_round_trips() {
        for code in MIN_ERROR_CODE..=MAX_ERROR_CODE {
            let known = ErrorCode::from_i16(code).unwrap();
            assert_eq!(known.to_i16(), code);
            assert_ne!(error_string(code), INVALID_ERROR_CODE);
        }
    }

    #[test]
    fn test_out_of_range_codes() {
        assert_eq!(error_string(-2), "invalid error code");
        assert_eq!(error_string(32), "invalid error code");
        assert_eq!(error_string(i16::MAX), "invalid error code");
        assert!(ErrorCode::try_from(77).is_err());
    }

    #[test]
    fn test_unknown_server_error_text() {
        assert_eq!(error_string(-1), "unknown server error");
        assert_eq!(error_string(0), "no error");
        assert!(!ErrorCode::None.is_error());
        assert!(ErrorCode::RebalanceInProgress.is_error());
    }

    #[test]
    fn test_display_includes_code() {
        let text = ErrorCode::NotCoordinatorForGroup.to_string();
        assert!(text.contains("coordinator"));
        assert!(text.contains("16"));
    }
}
