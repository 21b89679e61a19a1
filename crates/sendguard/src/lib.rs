//! # sendguard
//!
//! Send-deduplication cache for outbound mail.
//!
//! Client retries, flaky connectivity, or a draft submitted twice can
//! cause the same message to be transmitted more than once. This crate
//! fingerprints an outgoing message, remembers the fingerprint with the
//! identifier the message store assigned once the message was accepted,
//! and lets the caller ask whether that exact message is currently being
//! sent or was already sent before submitting it again.
//!
//! ## Features
//!
//! - **Content fingerprints**: SHA-256 over sender, recipients, subject,
//!   body and attachment metadata
//! - **Lazy expiry**: records older than the expiry window (30 minutes by
//!   default) are dropped on the next access
//! - **Remote confirmation**: recorded sends are checked against the
//!   message store through the [`MessageLookup`] capability
//! - **Fail-open**: lookup failures never block sending
//!
//! ## Quick Start
//!
//! ```ignore
//! use sendguard::{OutgoingMessage, SendRecorder};
//!
//! let recorder = SendRecorder::new();
//!
//! let message = OutgoingMessage::new("addr-1", "Weekly report", "See attached.")
//!     .to("team@example.com");
//! let fingerprint = message.fingerprint();
//!
//! let status = recorder.query_status(&store, &fingerprint).await;
//! if status.should_send() {
//!     let remote_id = submit(&message).await?;
//!     recorder.record(fingerprint, remote_id);
//! }
//! ```
//!
//! ## Status Resolution
//!
//! ```text
//! no record ──────────────────────────────→ {sending: false, sent: false}
//! lookup error ───────────────────────────→ {sending: false, sent: false}
//! draft, younger than stuck threshold ────→ {sending: true,  sent: false}
//! draft, older than stuck threshold ──────→ {sending: false, sent: false}
//! sent / sent to self ────────────────────→ {sending: false, sent: true}
//! anything else ──────────────────────────→ {sending: false, sent: false}
//! ```
//!
//! ## Modules
//!
//! - [`fingerprint`]: Message fingerprints
//! - [`message`]: Outgoing message model
//! - [`recorder`]: The send recorder and its configuration
//! - [`remote`]: Remote message state and the lookup capability
//! - [`time`]: Clock abstraction

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod fingerprint;
pub mod message;
pub mod recorder;
pub mod remote;
pub mod time;

pub use error::{LookupError, Result};
pub use fingerprint::Fingerprint;
pub use message::{Attachment, OutgoingMessage};
pub use recorder::{RecorderConfig, RecorderConfigBuilder, SendRecord, SendRecorder};
pub use remote::{MessageLookup, RemoteMessage, RemoteState, SendStatus};
