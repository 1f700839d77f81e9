//! The capability the HTTP pipeline needs from the token lifecycle

use crate::auth::token::RefreshedToken;
use crate::error::Result;

/// Supplies credentials and tenant context to the interceptors.
///
/// The pipeline depends on this trait rather than on
/// [`crate::auth::TokenLifecycleManager`] so that the two can be built and
/// tested independently.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Current access token, `None` when not logged in.
    async fn access_token(&self) -> Result<Option<String>>;

    /// Exchanges the refresh token for a new access token and persists it.
    async fn refresh(&self) -> Result<RefreshedToken>;

    /// Active client id, `None` when no client is selected.
    async fn client_id(&self) -> Result<Option<i64>>;
}
