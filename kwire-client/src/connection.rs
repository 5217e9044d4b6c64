//! Blocking broker connection
//!
//! One request is in flight at a time: `send_request` writes a whole frame,
//! then blocks until the whole response frame has arrived or the response
//! timeout runs out. Any transport failure closes the socket so a stream that
//! may be mid-frame is never reused.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

use kwire_protocol::messages::*;
use kwire_protocol::{
    ApiKey, ApiRequest, Decodable, Encodable, Message, MessageSet, RequestEnvelope,
    RequestHeader, ResponseHeader,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// A response must at least carry its correlation id.
const MIN_RESPONSE_LENGTH: i32 = 4;

/// A blocking connection to a single broker.
///
/// # Example
///
/// ```ignore
/// use kwire_client::{ClientConfig, Connection};
///
/// let mut conn = Connection::open("127.0.0.1", 9092, ClientConfig::default())?;
/// let metadata = conn.metadata(&["orders"])?;
/// ```
#[derive(Debug)]
pub struct Connection {
    stream: Option<TcpStream>,
    config: ClientConfig,
    next_correlation_id: i32,
}

impl Connection {
    /// Creates a disconnected connection.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            stream: None,
            config,
            next_correlation_id: 0,
        }
    }

    /// Creates a connection and connects it to `host:port`.
    pub fn open(host: &str, port: u16, config: ClientConfig) -> ClientResult<Self> {
        let mut conn = Self::new(config);
        conn.connect(host, port)?;
        Ok(conn)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connects to `host:port`, dropping any socket already open. `host` may
    /// be a name or a numeric address.
    pub fn connect(&mut self, host: &str, port: u16) -> ClientResult<()> {
        self.close();
        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect((host, port)).map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
        stream
            .set_nodelay(true)
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;
        info!(broker = %addr, "Connected to broker");
        self.stream = Some(stream);
        Ok(())
    }

    /// Closes the socket. Does nothing when already disconnected.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!("Connection closed");
        }
    }

    fn next_correlation_id(&mut self) -> i32 {
        let id = self.next_correlation_id;
        self.next_correlation_id = self.next_correlation_id.wrapping_add(1);
        id
    }

    fn prepare<B>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &B,
    ) -> ClientResult<RequestEnvelope>
    where
        B: Encodable + ?Sized,
    {
        if self.stream.is_none() {
            return Err(ClientError::NotConnected);
        }
        let correlation_id = self.next_correlation_id();
        let header = RequestHeader {
            api_key,
            api_version,
            correlation_id,
            client_id: self.config.client_id.clone(),
        };
        let envelope = RequestEnvelope::new(header, request, self.config.max_request_size)?;
        debug!(
            ?api_key,
            api_version,
            correlation_id,
            bytes = envelope.len(),
            "Sending request"
        );
        Ok(envelope)
    }

    fn close_on_transport_error<T>(
        &mut self,
        api_key: ApiKey,
        correlation_id: i32,
        result: ClientResult<T>,
    ) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_transport() {
                warn!(?api_key, correlation_id, error = %e, "Request failed, closing connection");
                self.close();
            }
        }
        result
    }

    /// Sends `request` under the given key and version and decodes the
    /// response body as `T`. The body must be consumed exactly.
    pub fn send_request<B, T>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &B,
    ) -> ClientResult<T>
    where
        B: Encodable + ?Sized,
        T: Decodable,
    {
        let envelope = self.prepare(api_key, api_version, request)?;
        let correlation_id = envelope.correlation_id();
        let result = self
            .round_trip(&envelope)
            .and_then(|frame| decode_response(correlation_id, &frame));
        self.close_on_transport_error(api_key, correlation_id, result)
    }

    /// Writes `request` and returns once the frame is on the socket. For
    /// requests the broker never answers, such as a produce with `acks = 0`.
    pub fn send_request_no_response<B>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &B,
    ) -> ClientResult<()>
    where
        B: Encodable + ?Sized,
    {
        let envelope = self.prepare(api_key, api_version, request)?;
        let correlation_id = envelope.correlation_id();
        let result = match self.stream.as_mut() {
            Some(stream) => write_full(stream, envelope.as_bytes()),
            None => Err(ClientError::NotConnected),
        };
        self.close_on_transport_error(api_key, correlation_id, result)
    }

    /// Sends a catalog request; the key, version and response type come from
    /// `R`.
    pub fn send<R: ApiRequest>(&mut self, request: &R) -> ClientResult<R::Response> {
        self.send_request(R::API_KEY, R::API_VERSION, request)
    }

    fn round_trip(&mut self, envelope: &RequestEnvelope) -> ClientResult<Vec<u8>> {
        let timeout = self.config.response_timeout;
        let max_response_size = self.config.max_response_size;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        write_full(stream, envelope.as_bytes())?;

        let deadline = Instant::now() + timeout;
        let mut prefix = [0u8; 4];
        read_full(stream, &mut prefix, deadline, timeout)?;
        let length = i32::from_be_bytes(prefix);
        if length < MIN_RESPONSE_LENGTH || length as usize > max_response_size {
            return Err(ClientError::InvalidFrameLength(length));
        }

        let mut frame = vec![0u8; length as usize + prefix.len()];
        frame[..prefix.len()].copy_from_slice(&prefix);
        read_full(stream, &mut frame[prefix.len()..], deadline, timeout)?;
        Ok(frame)
    }

    pub fn metadata(&mut self, topics: &[&str]) -> ClientResult<MetadataResponse> {
        let request = MetadataRequest {
            topics: topics.iter().map(|t| t.to_string()).collect(),
        };
        self.send(&request)
    }

    /// Produces `messages` to one partition.
    ///
    /// A broker sends nothing back for `acks == 0`, so in that case the frame
    /// is only written and `None` is returned.
    pub fn produce(
        &mut self,
        topic: &str,
        partition: i32,
        acks: i16,
        messages: Vec<Message>,
    ) -> ClientResult<Option<ProduceResponse>> {
        let mut message_set = MessageSet::new();
        for msg in messages {
            message_set.push(msg)?;
        }
        let request = ProduceRequest {
            acks,
            timeout_ms: self.config.broker_wait_ms(),
            topics: vec![TopicBlock::new(
                topic,
                vec![ProducePartition {
                    partition,
                    message_set,
                }],
            )],
        };
        if acks == 0 {
            self.send_request_no_response(
                ProduceRequest::API_KEY,
                ProduceRequest::API_VERSION,
                &request,
            )?;
            return Ok(None);
        }
        self.send(&request).map(Some)
    }

    /// Fetches from one partition starting at `offset`.
    pub fn fetch(
        &mut self,
        topic: &str,
        partition: i32,
        offset: i64,
        max_bytes: i32,
    ) -> ClientResult<FetchResponseV2> {
        let request = FetchRequestV2 {
            replica_id: -1,
            max_wait_ms: self.config.broker_wait_ms(),
            min_bytes: 1,
            topics: vec![TopicBlock::new(
                topic,
                vec![FetchPartition {
                    partition,
                    fetch_offset: offset,
                    max_bytes,
                }],
            )],
        };
        self.send(&request)
    }

    /// Looks up the offset for `timestamp`, or one of `LATEST_TIMESTAMP` /
    /// `EARLIEST_TIMESTAMP`.
    pub fn list_offsets(
        &mut self,
        topic: &str,
        partition: i32,
        timestamp: i64,
    ) -> ClientResult<ListOffsetsResponse> {
        let request = ListOffsetsRequest {
            replica_id: -1,
            topics: vec![TopicBlock::new(
                topic,
                vec![ListOffsetsPartition {
                    partition,
                    timestamp,
                }],
            )],
        };
        self.send(&request)
    }

    pub fn group_coordinator(&mut self, group_id: &str) -> ClientResult<GroupCoordinatorResponse> {
        self.send(&GroupCoordinatorRequest {
            group_id: group_id.to_string(),
        })
    }

    pub fn list_groups(&mut self) -> ClientResult<ListGroupsResponse> {
        self.send(&ListGroupsRequest)
    }

    pub fn describe_groups(&mut self, group_ids: &[&str]) -> ClientResult<DescribeGroupsResponse> {
        self.send(&DescribeGroupsRequest {
            group_ids: group_ids.iter().map(|g| g.to_string()).collect(),
        })
    }

    pub fn offset_fetch(
        &mut self,
        group_id: &str,
        topic: &str,
        partitions: &[i32],
    ) -> ClientResult<OffsetFetchResponse> {
        self.send(&OffsetFetchRequest {
            group_id: group_id.to_string(),
            topics: vec![TopicPartitions::new(topic, partitions.to_vec())],
        })
    }

    /// Commits `(partition, offset)` pairs for one topic with the broker's
    /// default retention.
    pub fn offset_commit(
        &mut self,
        group_id: &str,
        generation_id: i32,
        member_id: &str,
        topic: &str,
        offsets: &[(i32, i64)],
    ) -> ClientResult<OffsetCommitResponse> {
        let partitions = offsets
            .iter()
            .map(|&(partition, offset)| PartitionOffsetCommit {
                partition,
                offset,
                metadata: String::new(),
            })
            .collect();
        self.send(&OffsetCommitRequest {
            group_id: group_id.to_string(),
            generation_id,
            member_id: member_id.to_string(),
            retention_time_ms: DEFAULT_RETENTION_TIME,
            topics: vec![TopicBlock::new(topic, partitions)],
        })
    }

    pub fn join_group(
        &mut self,
        group_id: &str,
        member_id: &str,
        session_timeout: Duration,
        protocols: Vec<GroupProtocol>,
    ) -> ClientResult<JoinGroupResponse> {
        self.send(&JoinGroupRequest {
            group_id: group_id.to_string(),
            session_timeout_ms: i32::try_from(session_timeout.as_millis()).unwrap_or(i32::MAX),
            member_id: member_id.to_string(),
            protocol_type: CONSUMER_PROTOCOL_TYPE.to_string(),
            protocols,
        })
    }

    pub fn sync_group(
        &mut self,
        group_id: &str,
        generation_id: i32,
        member_id: &str,
        assignments: BTreeMap<String, MemberAssignment>,
    ) -> ClientResult<SyncGroupResponse> {
        self.send(&SyncGroupRequest {
            group_id: group_id.to_string(),
            generation_id,
            member_id: member_id.to_string(),
            assignments,
        })
    }

    pub fn heartbeat(
        &mut self,
        group_id: &str,
        generation_id: i32,
        member_id: &str,
    ) -> ClientResult<HeartbeatResponse> {
        self.send(&HeartbeatRequest {
            group_id: group_id.to_string(),
            generation_id,
            member_id: member_id.to_string(),
        })
    }

    pub fn leave_group(
        &mut self,
        group_id: &str,
        member_id: &str,
    ) -> ClientResult<LeaveGroupResponse> {
        self.send(&LeaveGroupRequest {
            group_id: group_id.to_string(),
            member_id: member_id.to_string(),
        })
    }
}

fn decode_response<T: Decodable>(expected: i32, frame: &[u8]) -> ClientResult<T> {
    let (header, mut body) = ResponseHeader::parse(frame)?;
    if header.correlation_id != expected {
        return Err(ClientError::CorrelationMismatch {
            expected,
            received: header.correlation_id,
        });
    }
    let response = T::decode(&mut body)?;
    body.require_exhausted()?;
    debug!(correlation_id = expected, bytes = frame.len(), "Received response");
    Ok(response)
}

/// Writes all of `buf`, retrying on interrupts and would-block.
fn write_full(stream: &mut TcpStream, mut buf: &[u8]) -> ClientResult<()> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => {
                return Err(ClientError::Write(io::Error::new(
                    ErrorKind::WriteZero,
                    "socket accepted no bytes",
                )))
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(e) => return Err(ClientError::Write(e)),
        }
    }
    Ok(())
}

/// Fills `buf` from the socket before `deadline`.
///
/// Socket read timeouts surface as `WouldBlock` on Unix and `TimedOut` on
/// Windows; both just send the loop back to the deadline check.
fn read_full(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Instant,
    timeout: Duration,
) -> ClientResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let left = deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or(ClientError::Timeout(timeout))?;
        stream.set_read_timeout(Some(left)).map_err(ClientError::Read)?;
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(ClientError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(ClientError::Read(e)),
        }
    }
    Ok(())
}
