//! xctl: thin client for the administrative gRPC control plane of a running
//! Xray-core server.
//!
//! The server exposes three command services over one plaintext gRPC
//! channel: statistics query, inbound/outbound handler mutation, and logger
//! control. [`ControlClient`] wraps all three behind typed methods, each a
//! single unary call. There is no retry, pooling, caching, or auth layer.
//!
//! Every operation comes in two forms: a `try_*` method that returns the
//! real failure, and a fire-and-forget wrapper that logs the failure and
//! returns a zero value, matching how the upstream tooling treats the
//! control plane.
//!
//! # Example
//!
//! ```rust,no_run
//! use xctl::ControlClient;
//!
//! # async fn example() -> Result<(), xctl::ClientError> {
//! let client = ControlClient::connect("127.0.0.1", 10085).await?;
//!
//! for (name, value) in client.query_stats("rand", false).await {
//!     println!("{name} -> {value}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{generate_uuid, ControlClient};
pub use error::ClientError;
