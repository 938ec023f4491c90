//! Redis Streams backend.
//!
//! Each partition is a stream named `{topic}:{n}` carrying `key` and `value`
//! fields. Consumer groups give shared, acknowledged consumption.

use async_trait::async_trait;
use notes_core::Message;
use parking_lot::Mutex;
use redis::{AsyncCommands, AsyncConnectionConfig};
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{
    BackendError, ReadRequest, StreamBackend, StreamConnection, TopicLayout, TopicStatus,
};

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
const KEY_FIELD: &str = "key";
const VALUE_FIELD: &str = "value";

/// Dials the first reachable address of a Redis deployment.
pub struct RedisStreamBackend {
    clients: Vec<(String, redis::Client)>,
}

impl RedisStreamBackend {
    pub fn new(addresses: &[String]) -> Result<Self, BackendError> {
        if addresses.is_empty() {
            return Err(BackendError::new("open", "no broker addresses configured"));
        }
        let clients = addresses
            .iter()
            .map(|address| {
                redis::Client::open(address.as_str())
                    .map(|client| (address.clone(), client))
                    .map_err(|e| BackendError::new("open", format!("{address}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { clients })
    }

    async fn dial_one(client: &redis::Client) -> Result<MultiplexedConnection, String> {
        let connect = async {
            // XREADGROUP blocks server-side for the whole read window, so the
            // client-side response timeout must not cut it short.
            let config = AsyncConnectionConfig::new().set_response_timeout(None);
            let mut conn = client
                .get_multiplexed_async_connection_with_config(&config)
                .await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };
        match tokio::time::timeout(DIAL_TIMEOUT, connect).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {}ms", DIAL_TIMEOUT.as_millis())),
        }
    }
}

#[async_trait]
impl StreamBackend for RedisStreamBackend {
    type Connection = RedisStreamConnection;

    async fn dial(&self) -> Result<RedisStreamConnection, BackendError> {
        let mut failures = Vec::with_capacity(self.clients.len());
        for (address, client) in &self.clients {
            match Self::dial_one(client).await {
                Ok(conn) => {
                    debug!(address = %address, "Connected to broker");
                    return Ok(RedisStreamConnection::new(conn));
                }
                Err(e) => failures.push(format!("{address}: {e}")),
            }
        }
        Err(BackendError::new("dial", failures.join("; ")))
    }
}

pub struct RedisStreamConnection {
    conn: Mutex<Option<MultiplexedConnection>>,
    // Entries read together with the one returned, already acknowledged.
    buffered: Mutex<VecDeque<Message>>,
}

impl RedisStreamConnection {
    fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            buffered: Mutex::new(VecDeque::new()),
        }
    }

    fn connection(&self, operation: &'static str) -> Result<MultiplexedConnection, BackendError> {
        self.conn
            .lock()
            .clone()
            .ok_or_else(|| BackendError::new(operation, "connection closed"))
    }

    async fn check_replicas(
        conn: &mut MultiplexedConnection,
        replication_factor: u32,
    ) -> Result<(), BackendError> {
        if replication_factor <= 1 {
            return Ok(());
        }
        let info: String = redis::cmd("INFO")
            .arg("replication")
            .query_async(conn)
            .await
            .map_err(|e| BackendError::new("ensure topic", e))?;

        let replicas = connected_replicas(&info);
        if replicas + 1 < replication_factor {
            return Err(BackendError::new(
                "ensure topic",
                format!(
                    "replication factor {replication_factor} needs {} replicas, found {replicas}",
                    replication_factor - 1
                ),
            ));
        }
        Ok(())
    }
}

/// Parses `connected_slaves` out of an `INFO replication` reply.
fn connected_replicas(info: &str) -> u32 {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("connected_slaves:"))
        .and_then(|count| count.trim().parse().ok())
        .unwrap_or(0)
}

fn field_bytes(map: &std::collections::HashMap<String, redis::Value>, field: &str) -> Option<Vec<u8>> {
    match map.get(field)? {
        redis::Value::BulkString(bytes) => Some(bytes.clone()),
        other => redis::from_redis_value::<Vec<u8>>(other.clone()).ok(),
    }
}

#[async_trait]
impl StreamConnection for RedisStreamConnection {
    async fn ensure_topic(&self, layout: &TopicLayout) -> Result<TopicStatus, BackendError> {
        let mut conn = self.connection("ensure topic")?;
        Self::check_replicas(&mut conn, layout.replication_factor).await?;

        let mut created = 0usize;
        for stream in crate::partition::stream_names(&layout.name, layout.partitions) {
            let result: redis::RedisResult<()> =
                conn.xgroup_create_mkstream(&stream, &layout.group, "$").await;
            match result {
                Ok(()) => created += 1,
                Err(e) if e.code() == Some("BUSYGROUP") => {}
                Err(e) => return Err(BackendError::new("ensure topic", format!("{stream}: {e}"))),
            }
        }

        if created == 0 {
            Ok(TopicStatus::AlreadyExists)
        } else {
            Ok(TopicStatus::Created)
        }
    }

    async fn append(&self, stream: &str, message: &Message) -> Result<(), BackendError> {
        let mut conn = self.connection("append")?;
        let _: String = conn
            .xadd(
                stream,
                "*",
                &[(KEY_FIELD, message.key.as_slice()), (VALUE_FIELD, message.value.as_slice())],
            )
            .await
            .map_err(|e| BackendError::new("append", e))?;
        Ok(())
    }

    async fn read(&self, request: &ReadRequest) -> Result<Option<Message>, BackendError> {
        if let Some(message) = self.buffered.lock().pop_front() {
            return Ok(Some(message));
        }

        let mut conn = self.connection("read")?;
        let block_ms = usize::try_from(request.block.as_millis()).unwrap_or(usize::MAX);
        let options = StreamReadOptions::default()
            .group(&request.group, &request.consumer)
            .count(1)
            .block(block_ms);
        let ids = vec![">"; request.streams.len()];

        let reply: Option<StreamReadReply> = conn
            .xread_options(&request.streams, &ids, &options)
            .await
            .map_err(|e| BackendError::new("read", e))?;
        let Some(reply) = reply else {
            return Ok(None);
        };

        let mut received = VecDeque::new();
        let mut ack_failure = None;
        'reply: for stream in reply.keys {
            for entry in stream.ids {
                let acked: redis::RedisResult<i64> =
                    conn.xack(&stream.key, &request.group, &[&entry.id]).await;
                if let Err(e) = acked {
                    ack_failure = Some(BackendError::new("acknowledge", e));
                    break 'reply;
                }

                match (field_bytes(&entry.map, KEY_FIELD), field_bytes(&entry.map, VALUE_FIELD)) {
                    (Some(key), Some(value)) => received.push_back(Message::new(key, value)),
                    _ => warn!(stream = %stream.key, entry_id = %entry.id, "Skipping malformed stream entry"),
                }
            }
        }

        // Entries acknowledged before a failed ack are still handed out.
        let first = received.pop_front();
        self.buffered.lock().extend(received);
        match (first, ack_failure) {
            (None, Some(e)) => Err(e),
            (first, Some(e)) => {
                warn!(error = %e, "Stream entry left unacknowledged");
                Ok(first)
            }
            (first, None) => Ok(first),
        }
    }

    async fn close(&self) -> Result<(), BackendError> {
        // Dropping the last handle tears the multiplexed connection down.
        self.conn.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_replicas() {
        let info = "# Replication\r\nrole:master\r\nconnected_slaves:2\r\nmaster_repl_offset:0\r\n";
        assert_eq!(connected_replicas(info), 2);
        assert_eq!(connected_replicas("# Replication\r\nrole:master\r\n"), 0);
    }

    #[test]
    fn test_new_rejects_empty_addresses() {
        assert!(RedisStreamBackend::new(&[]).is_err());
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let err = RedisStreamBackend::new(&["not a url".to_string()])
            .err()
            .expect("invalid url must be rejected");
        assert_eq!(err.operation, "open");
    }

    #[test]
    fn test_field_bytes() {
        let mut map = std::collections::HashMap::new();
        map.insert("key".to_string(), redis::Value::BulkString(b"7".to_vec()));
        assert_eq!(field_bytes(&map, "key"), Some(b"7".to_vec()));
        assert_eq!(field_bytes(&map, "value"), None);
    }
}
