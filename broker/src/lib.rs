//! # Broker
//!
//! Message broker client for reminder delivery. The client bootstraps
//! lazily on first use: it dials with linear backoff, creates the topic once
//! and then registers a writer or reader. Redis Streams is the shipped
//! backend; anything implementing [`StreamBackend`] can stand in for it.

pub mod backend;
pub mod client;
pub mod partition;
pub mod redis_streams;

pub use backend::{
    BackendError, ReadRequest, StreamBackend, StreamConnection, TopicLayout, TopicStatus,
};
pub use client::{BrokerClient, BrokerSettings};
pub use partition::{partition_for, stream_name, stream_names};
pub use redis_streams::{RedisStreamBackend, RedisStreamConnection};

/// Broker client over Redis Streams.
pub type RedisBroker = BrokerClient<RedisStreamBackend>;
