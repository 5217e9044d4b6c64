//! Blocking client for the Kafka wire protocol.

pub mod config;
pub mod connection;
pub mod error;

pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{ClientError, ClientResult};
pub use kwire_protocol as protocol;
