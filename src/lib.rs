//! Tollgate - authenticated HTTP gateway library
//!
//! This library provides a client-side gateway that authenticates outbound
//! API calls, refreshes expired credentials transparently, and normalizes
//! heterogeneous backend responses into a stable shape.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `http`: request/response types, transport, interceptors, URL versioning,
//!   and response/error normalization
//! - `auth`: token lifecycle (login, refresh, expiry, logout) and client context
//! - `store`: token persistence backends (keyring, file, memory)
//! - `api`: caller-facing client running the authenticated pipeline
//! - `identity`: identity claim retrieval
//! - `gateway`: the context that wires everything together from `Config`
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use tollgate::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let gateway = Gateway::from_config(&config)?;
//!     gateway.tokens().login("alice", "secret", "device-1").await?;
//!     let widgets = gateway.api().get("/api/widgets", None, None).await?;
//!     println!("{}", widgets.to_value());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;
pub mod store;

// Re-export commonly used types
pub use api::ApiClient;
pub use auth::{TokenLifecycleManager, TokenSource};
pub use config::Config;
pub use error::{AuthFailure, GatewayError, Result};
pub use gateway::Gateway;
pub use http::{HttpClient, NormalizedResponse, RequestConfig};
pub use store::TokenStore;
