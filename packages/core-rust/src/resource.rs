//! Shared resource envelope, references and error body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant scoping for stored resources.
///
/// An empty tenant means the single-tenant default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenant(pub String);

impl Tenant {
    /// Returns the tenant identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reference to another resource by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub id: String,
}

/// Hyperlink to a resource or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HRef {
    pub href: String,
}

/// JSON error body returned for every failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Fields common to every stored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Server-assigned identifier.
    pub id: String,
    /// Owning tenant.
    #[serde(default)]
    pub tenant: Tenant,
    /// Creation time (RFC 3339 on the wire).
    pub created_at: DateTime<Utc>,
    /// Last modification time (RFC 3339 on the wire).
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Creates a resource envelope stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, tenant: Tenant) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
