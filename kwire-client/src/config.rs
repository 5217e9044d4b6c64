use std::time::Duration;

use kwire_protocol::DEFAULT_MAX_SIZE;

/// Configuration for a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Sent in every request header.
    pub client_id: String,
    /// How long to wait for a complete response once the request is written.
    pub response_timeout: Duration,
    /// How long the broker may hold a produce waiting for acks, or a fetch
    /// waiting for data.
    pub broker_wait: Duration,
    /// Ceiling on an encoded request frame.
    pub max_request_size: usize,
    /// Ceiling on a response frame announced by the broker.
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "kwire-client".to_string(),
            response_timeout: Duration::from_secs(5),
            broker_wait: Duration::from_secs(1),
            max_request_size: DEFAULT_MAX_SIZE,
            max_response_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl ClientConfig {
    /// `broker_wait` as the i32 milliseconds the wire carries.
    pub fn broker_wait_ms(&self) -> i32 {
        i32::try_from(self.broker_wait.as_millis()).unwrap_or(i32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.client_id, "kwire-client");
        assert_eq!(config.response_timeout, Duration::from_secs(5));
        assert_eq!(config.max_response_size, 1 << 30);
        assert_eq!(config.broker_wait_ms(), 1000);
    }

    #[test]
    fn test_broker_wait_saturates() {
        let config = ClientConfig {
            broker_wait: Duration::from_secs(u64::MAX / 2),
            ..Default::default()
        };
        assert_eq!(config.broker_wait_ms(), i32::MAX);
    }
}
