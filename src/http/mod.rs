//! Authenticated HTTP pipeline
//!
//! This module contains the request description, the transport abstraction,
//! the interceptors that attach credentials and recover from 401s, and the
//! response/error normalizers.

pub mod auth_interceptor;
pub mod client;
pub mod normalize;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod url_version;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_interceptor::{inject_client_id, is_falsy, RequestAuthInterceptor};
pub use client::{HttpClient, HttpClientBuilder, RequestInterceptor, ResponseInterceptor};
pub use normalize::{
    normalize_error, normalize_response, NormalizedError, NormalizedResponse,
    LEGACY_ERROR_STATUS_CODES, NO_BODY_STATUS_CODES, NO_CONTENT_MESSAGE,
};
pub use request::{RequestBody, RequestConfig, AUTHORIZATION};
pub use response::HttpResponse;
pub use retry::{AuthRetryInterceptor, RetryState};
pub use transport::{combine_url, ReqwestTransport, Transport};
pub use url_version::{NamespaceEntry, UrlVersionResolver};
