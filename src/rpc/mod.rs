//! JSON-RPC access over the resilient layer.
//!
//! # Responsibilities
//! - transport.rs: one request to one endpoint
//! - client.rs: cache + failover + tracking around the transport
//! - types.rs: wire types and transport errors

pub mod client;
pub mod transport;
pub mod types;

pub use client::RpcClient;
pub use transport::JsonRpcTransport;
pub use types::TransportError;
