//! linkrelay SDK - Rust Client Library
//!
//! Producers push links to a token's queue; consumers drain it.
//!
//! # Example
//!
//! ```no_run
//! use linkrelay_sdk::LinkRelayClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LinkRelayClient::new()?;
//!     let base = "http://127.0.0.1:3000";
//!
//!     let queued = client.enqueue(base, "A2B3C4D5OTL6E7F8", &["example.com"]).await?;
//!     println!("{}", queued.message);
//!
//!     let batch = client.poll(base, "A2B3C4D5OTL6E7F8").await?;
//!     for link in batch.links {
//!         println!("{}", link);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{LinkRelayClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{Result, SdkError};
pub use types::{Docs, EnqueueRequest, EnqueueResponse, ErrorResponse, PollResponse};
