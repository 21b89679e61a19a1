//! Recorder configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a send record is kept before it is evicted.
pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(30 * 60);

/// How old a remote draft may get before it is presumed abandoned.
pub const DEFAULT_DRAFT_STUCK_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Send recorder configuration.
///
/// Durations are (de)serialized as whole seconds. Missing fields take
/// their default values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Maximum age of a record before eviction.
    #[serde(rename = "expiry_window_secs", with = "duration_secs")]
    pub expiry_window: Duration,
    /// Age after which a remote draft no longer counts as "sending".
    #[serde(rename = "draft_stuck_threshold_secs", with = "duration_secs")]
    pub draft_stuck_threshold: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderConfig {
    /// Creates a configuration with the default windows (30 and 10 minutes).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expiry_window: DEFAULT_EXPIRY_WINDOW,
            draft_stuck_threshold: DEFAULT_DRAFT_STUCK_THRESHOLD,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> RecorderConfigBuilder {
        RecorderConfigBuilder::new()
    }
}

/// Builder for recorder configuration.
#[derive(Debug, Clone, Copy)]
pub struct RecorderConfigBuilder {
    expiry_window: Duration,
    draft_stuck_threshold: Duration,
}

impl Default for RecorderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expiry_window: DEFAULT_EXPIRY_WINDOW,
            draft_stuck_threshold: DEFAULT_DRAFT_STUCK_THRESHOLD,
        }
    }

    /// Sets the expiry window.
    #[must_use]
    pub const fn expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }

    /// Sets the stuck-draft threshold.
    #[must_use]
    pub const fn draft_stuck_threshold(mut self, threshold: Duration) -> Self {
        self.draft_stuck_threshold = threshold;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> RecorderConfig {
        RecorderConfig {
            expiry_window: self.expiry_window,
            draft_stuck_threshold: self.draft_stuck_threshold,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
