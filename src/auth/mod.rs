//! Token lifecycle and client context
//!
//! - [`lifecycle`] -- login, refresh, expiry, logout against a token store
//! - [`token`] -- persisted token record and token endpoint wire types
//! - [`client_identity`] -- active client context
//! - [`source`] -- the [`TokenSource`] capability consumed by the pipeline

pub mod client_identity;
pub mod lifecycle;
pub mod source;
pub mod token;

pub use client_identity::{client_id_from_value, ClientIdentity};
pub use lifecycle::{LifecycleSettings, TokenLifecycleManager};
pub use source::TokenSource;
pub use token::{LoginGrant, RefreshedToken, Token};
