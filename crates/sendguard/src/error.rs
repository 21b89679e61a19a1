//! Error types for remote message lookups.

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;

/// Failure reported by a [`MessageLookup`](crate::MessageLookup) implementation.
///
/// The recorder treats every variant the same way: the remote state is
/// unknown and sending is allowed. The variants exist so lookup
/// implementations can report what went wrong and so logs stay useful.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The remote message does not exist (never created or deleted).
    #[error("Message not found: {0}")]
    NotFound(String),

    /// The message store could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The message store answered with a temporary failure.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Any other failure.
    #[error("Lookup failed: {0}")]
    Other(String),
}

impl LookupError {
    /// Creates a not-found error for the given remote identifier.
    #[must_use]
    pub fn not_found(remote_id: impl Into<String>) -> Self {
        Self::NotFound(remote_id.into())
    }

    /// Returns true if the remote message does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if retrying the lookup later could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Transient(_))
    }
}
