//! Conversion status source trait

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;
use crate::types::Credentials;

/// Fetches raw conversion-status documents from controllers.
///
/// The payload is returned as-is; parsing stays in the monitor so the
/// transport can be swapped for canned documents in tests.
#[async_trait]
pub trait ConvertStatusSource: Send + Sync {
    /// Fetch the current conversion status of the controller at `address`
    async fn fetch_convert_status(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Value, FetchError>;
}
