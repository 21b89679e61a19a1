//! Content fingerprints for outgoing messages.
//!
//! A fingerprint is the SHA-256 digest of the fields that make two send
//! attempts "the same message". Fields are hashed in a fixed order and
//! recipient lists keep their given order, so `To: a, b` and `To: b, a`
//! produce different fingerprints. Headers that are not part of
//! [`OutgoingMessage`] do not contribute.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::message::OutgoingMessage;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

const SHORT_LEN: usize = 12;

/// Hex-encoded SHA-256 identity of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of a message.
    ///
    /// Feeds the hash with, in order: address ID and subject, the sender
    /// address if present, every To, Cc and Bcc address, the body, and
    /// for each attachment its name, MIME type and decimal size.
    #[must_use]
    pub fn compute(message: &OutgoingMessage) -> Self {
        let mut hasher = Sha256::new();

        hasher.update(message.address_id.as_bytes());
        hasher.update(message.subject.as_bytes());
        if let Some(sender) = &message.sender {
            hasher.update(sender.as_bytes());
        }
        for address in message.all_recipients() {
            hasher.update(address.as_bytes());
        }
        hasher.update(message.body.as_bytes());
        for attachment in &message.attachments {
            hasher.update(attachment.name.as_bytes());
            hasher.update(attachment.mime_type.as_bytes());
            hasher.update(attachment.size.to_string().as_bytes());
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Parses a previously rendered fingerprint.
    ///
    /// Returns `None` unless `hex` is exactly 64 lowercase hex characters.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = hex.len() == FINGERPRINT_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex.to_string()))
    }

    /// Returns the full hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short prefix for log output.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
