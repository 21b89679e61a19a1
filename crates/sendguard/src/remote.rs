//! Remote message state and the lookup capability.
//!
//! After a message is accepted for delivery, the message store assigns it
//! an identifier. [`MessageLookup`] fetches the store's current view of
//! that message so the recorder can tell whether a send is still in
//! progress or already completed.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::LookupError;

/// Classification of a message as reported by the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteState {
    /// Not yet confirmed as transmitted.
    Draft,
    /// Transmitted.
    Sent,
    /// Transmitted and also received, because the sender is a recipient.
    SentToSelf,
    /// Anything else (e.g. a received message).
    Other,
}

impl RemoteState {
    /// Returns true if the store confirms the message was transmitted.
    #[must_use]
    pub const fn is_sent(self) -> bool {
        matches!(self, Self::Sent | Self::SentToSelf)
    }
}

/// A message as seen by the message store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    /// Current classification.
    pub state: RemoteState,
    /// Creation or submission time.
    pub time: DateTime<Utc>,
}

impl RemoteMessage {
    /// Creates a remote message.
    #[must_use]
    pub const fn new(state: RemoteState, time: DateTime<Utc>) -> Self {
        Self { state, time }
    }

    /// Creates a remote message from a Unix timestamp in seconds.
    ///
    /// Out-of-range timestamps are clamped to the Unix epoch.
    #[must_use]
    pub fn from_unix(state: RemoteState, secs: i64) -> Self {
        Self {
            state,
            time: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
        }
    }
}

/// Capability to fetch a remote message by identifier.
///
/// Any timeout must be enforced by the implementation; the recorder waits
/// for the returned future to complete.
pub trait MessageLookup: Send + Sync {
    /// Fetches the current state of the remote message `remote_id`.
    fn fetch(
        &self,
        remote_id: &str,
    ) -> impl Future<Output = Result<RemoteMessage, LookupError>> + Send;
}

impl<T: MessageLookup + ?Sized> MessageLookup for &T {
    fn fetch(
        &self,
        remote_id: &str,
    ) -> impl Future<Output = Result<RemoteMessage, LookupError>> + Send {
        (**self).fetch(remote_id)
    }
}

impl<T: MessageLookup + ?Sized> MessageLookup for Arc<T> {
    fn fetch(
        &self,
        remote_id: &str,
    ) -> impl Future<Output = Result<RemoteMessage, LookupError>> + Send {
        self.as_ref().fetch(remote_id)
    }
}

/// Whether a message is currently being sent or was already sent.
///
/// The default value (`{false, false}`) means "unknown": the caller
/// should go ahead and send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SendStatus {
    /// A send of the same message is still in flight.
    pub is_sending: bool,
    /// The same message has already been delivered.
    pub was_sent: bool,
}

impl SendStatus {
    /// Nothing known; sending may proceed.
    pub const NOT_SENT: Self = Self {
        is_sending: false,
        was_sent: false,
    };

    /// An identical send is still in progress.
    pub const SEND_IN_PROGRESS: Self = Self {
        is_sending: true,
        was_sent: false,
    };

    /// An identical message was already delivered.
    pub const ALREADY_SENT: Self = Self {
        is_sending: false,
        was_sent: true,
    };

    /// Returns true if the caller should submit the message.
    #[must_use]
    pub const fn should_send(self) -> bool {
        !self.is_sending && !self.was_sent
    }
}

/// Outcome of resolving a recorded send against the message store.
///
/// Kept richer than [`SendStatus`] so logs and tests can tell the
/// "allow sending" cases apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// No record for the fingerprint.
    Unknown,
    /// The lookup failed.
    LookupFailed,
    /// Draft younger than the stuck threshold.
    Sending,
    /// Draft older than the stuck threshold; presumed abandoned.
    StuckDraft,
    /// Sent, or sent to self.
    Sent,
    /// Any other remote state.
    Unclassified,
}

impl From<Resolution> for SendStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Sending => Self::SEND_IN_PROGRESS,
            Resolution::Sent => Self::ALREADY_SENT,
            Resolution::Unknown
            | Resolution::LookupFailed
            | Resolution::StuckDraft
            | Resolution::Unclassified => Self::NOT_SENT,
        }
    }
}
