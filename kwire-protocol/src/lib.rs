//! Kafka wire protocol: byte cursors, request/response framing, message sets
//! and the typed message catalog.

pub mod api_keys;
pub mod buffer;
pub mod codec;
pub mod compression;
pub mod envelope;
pub mod error;
pub mod message_set;
pub mod messages;
pub mod reader;
pub mod writer;


pub use api_keys::*;
pub use buffer::{ByteStore, DEFAULT_MAX_SIZE};
pub use codec::*;
pub use compression::CompressionType;
pub use envelope::{encode_response, RequestEnvelope, RequestHeader, ResponseHeader};
pub use error::{DecodeError, EncodeError};
pub use message_set::{Message, MessageSet, TimestampType};
pub use messages::*;
pub use reader::Reader;
pub use writer::{ChecksumScope, Writer};

pub use kwire_common::{error_string, ErrorCode};
