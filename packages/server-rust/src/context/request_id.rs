//! Request identity resolution.

use http::header::{HeaderMap, HeaderName};
use uuid::Uuid;

/// Header carrying a caller-supplied correlation id.
pub static TRANSACTION_ID_HEADER: HeaderName = HeaderName::from_static("x-global-transaction-id");

/// Returns the request's correlation id.
///
/// Uses the first `X-Global-Transaction-Id` value when it is non-empty
/// visible ASCII; otherwise generates a fresh UUID v4. Never fails and
/// never touches the headers.
#[must_use]
pub fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(&TRANSACTION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}
