//! Runtime configuration for a connection context.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gate::DangerousSqlPolicy;
use crate::preview::DEFAULT_SAMPLE_SIZE;
use crate::synth::InListMode;

/// Phrase the user must type before dangerous free-text SQL runs.
pub const DEFAULT_CONFIRMATION_PHRASE: &str = "I UNDERSTAND THE RISK";

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Settings shared by every operation on a [`ConnectionContext`](crate::ConnectionContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Rows in a preview sample.
    pub preview_sample_size: usize,
    pub in_list_mode: InListMode,
    pub confirmation_phrase: String,
    /// Default rows per page when browsing.
    pub page_size: u64,
    pub free_text_policy: DangerousSqlPolicy,
    /// Emit `dbdesk.sql` events for every statement.
    pub log_sql: bool,
    /// Per-statement timeout.
    #[serde(with = "opt_duration_ms")]
    pub query_timeout: Option<Duration>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            preview_sample_size: DEFAULT_SAMPLE_SIZE,
            in_list_mode: InListMode::default(),
            confirmation_phrase: DEFAULT_CONFIRMATION_PHRASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            free_text_policy: DangerousSqlPolicy::default(),
            log_sql: true,
            query_timeout: None,
        }
    }
}

impl AdminConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview_sample_size(mut self, size: usize) -> Self {
        self.preview_sample_size = size;
        self
    }

    pub fn with_in_list_mode(mut self, mode: InListMode) -> Self {
        self.in_list_mode = mode;
        self
    }

    pub fn with_confirmation_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.confirmation_phrase = phrase.into();
        self
    }

    /// Default browse page size, clamped to `1..=1000`.
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_free_text_policy(mut self, policy: DangerousSqlPolicy) -> Self {
        self.free_text_policy = policy;
        self
    }

    pub fn with_log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

mod opt_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
