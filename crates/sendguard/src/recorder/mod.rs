//! Send recorder.
//!
//! Remembers which fingerprints were recently accepted for delivery,
//! together with the identifier the message store assigned, and answers
//! whether an identical message is still being sent or was already sent.
//!
//! Records older than the expiry window are evicted lazily at the start of
//! every operation; there is no background sweeper.
//!
//! # Example
//!
//! ```ignore
//! use sendguard::{OutgoingMessage, SendRecorder};
//!
//! let recorder = SendRecorder::new();
//! let message = OutgoingMessage::new("addr-1", "Hello", "Hi Bob").to("bob@example.com");
//!
//! let (fingerprint, status) = recorder.check_message(&store, &message).await;
//! if status.should_send() {
//!     let remote_id = submit(&message).await?;
//!     recorder.record(fingerprint, remote_id);
//! }
//! ```

mod config;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

pub use config::{
    DEFAULT_DRAFT_STUCK_THRESHOLD, DEFAULT_EXPIRY_WINDOW, RecorderConfig, RecorderConfigBuilder,
};

use crate::fingerprint::Fingerprint;
use crate::message::OutgoingMessage;
use crate::remote::{MessageLookup, RemoteMessage, RemoteState, Resolution, SendStatus};
use crate::time::{Clock, SystemClock};

/// A remembered send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    /// Identifier assigned by the message store.
    pub remote_id: String,
    /// When the send was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl SendRecord {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.recorded_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Fingerprint to send-record cache shared by all senders of a process.
///
/// A single mutex guards the map. It is held only while the map is swept
/// and read or written, never across a remote lookup.
#[derive(Debug)]
pub struct SendRecorder<C = SystemClock> {
    config: RecorderConfig,
    clock: C,
    records: Mutex<HashMap<Fingerprint, SendRecord>>,
}

impl Default for SendRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SendRecorder {
    /// Creates a recorder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default())
    }

    /// Creates a recorder with the given configuration.
    #[must_use]
    pub fn with_config(config: RecorderConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SendRecorder<C> {
    /// Creates a recorder that reads time from `clock`.
    #[must_use]
    pub fn with_clock(config: RecorderConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Records that the message with `fingerprint` was accepted as `remote_id`.
    ///
    /// Replaces any existing record for the same fingerprint.
    pub fn record(&self, fingerprint: Fingerprint, remote_id: impl Into<String>) {
        let remote_id = remote_id.into();
        let now = self.clock.now();
        let mut records = self.lock();
        self.evict_expired(&mut records, now);

        debug!(fingerprint = fingerprint.short(), %remote_id, "Recording send");
        records.insert(
            fingerprint,
            SendRecord {
                remote_id,
                recorded_at: now,
            },
        );
    }

    /// Returns whether a message with `fingerprint` is being sent or was sent.
    ///
    /// Unknown fingerprints return immediately without calling `lookup`.
    /// A failed lookup, a draft older than the stuck threshold, or any
    /// remote state other than draft/sent yields [`SendStatus::NOT_SENT`].
    pub async fn query_status<L>(&self, lookup: &L, fingerprint: &Fingerprint) -> SendStatus
    where
        L: MessageLookup + ?Sized,
    {
        self.resolve(lookup, fingerprint).await.into()
    }

    /// Fingerprints `message` and queries its status in one step.
    ///
    /// The returned fingerprint is meant to be passed to
    /// [`record`](Self::record) once the message has been accepted.
    pub async fn check_message<L>(
        &self,
        lookup: &L,
        message: &OutgoingMessage,
    ) -> (Fingerprint, SendStatus)
    where
        L: MessageLookup + ?Sized,
    {
        let fingerprint = message.fingerprint();
        let status = self.query_status(lookup, &fingerprint).await;
        (fingerprint, status)
    }

    /// Returns the live record for `fingerprint`, if any.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<SendRecord> {
        let now = self.clock.now();
        let mut records = self.lock();
        self.evict_expired(&mut records, now);
        records.get(fingerprint).cloned()
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();
        self.evict_expired(&mut records, now);
        records.len()
    }

    /// Returns true if no live records remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn resolve<L>(&self, lookup: &L, fingerprint: &Fingerprint) -> Resolution
    where
        L: MessageLookup + ?Sized,
    {
        let Some(record) = self.get(fingerprint) else {
            trace!(fingerprint = fingerprint.short(), "No send recorded");
            return Resolution::Unknown;
        };

        let resolution = match lookup.fetch(&record.remote_id).await {
            Ok(remote) => self.classify(&remote),
            Err(error) => {
                warn!(
                    fingerprint = fingerprint.short(),
                    remote_id = %record.remote_id,
                    ?error,
                    "Remote lookup failed, assuming not sent"
                );
                Resolution::LookupFailed
            }
        };

        debug!(
            fingerprint = fingerprint.short(),
            remote_id = %record.remote_id,
            ?resolution,
            "Resolved send status"
        );
        resolution
    }

    fn classify(&self, remote: &RemoteMessage) -> Resolution {
        match remote.state {
            RemoteState::Draft => {
                let age = self.clock.age_of(remote.time);
                if age > self.config.draft_stuck_threshold {
                    info!(age_secs = age.as_secs(), "Draft looks abandoned");
                    Resolution::StuckDraft
                } else {
                    Resolution::Sending
                }
            }
            RemoteState::Sent | RemoteState::SentToSelf => Resolution::Sent,
            RemoteState::Other => Resolution::Unclassified,
        }
    }

    fn evict_expired(&self, records: &mut HashMap<Fingerprint, SendRecord>, now: DateTime<Utc>) {
        let before = records.len();
        records.retain(|_, record| record.age(now) <= self.config.expiry_window);

        let evicted = before - records.len();
        if evicted > 0 {
            debug!(evicted, remaining = records.len(), "Evicted expired send records");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, SendRecord>> {
        // Every mutation is a single map call, so a poisoned map is still consistent.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
