//! Output formats for the audit log.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How audit events are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, carrying the enclosing skill audit span.
    #[default]
    Json,
    /// One line per event.
    Compact,
    /// Multi-line events with span context, for reading a single audit.
    Pretty,
}

impl LogFormat {
    /// Returns `true` when events are meant for log ingestion rather than a
    /// terminal, so colour codes must never be emitted.
    #[must_use]
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
