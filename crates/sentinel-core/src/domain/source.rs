//! Stable identities for the two analysis sources.

use serde::{Deserialize, Serialize};

/// Which backend an analysis came from.
///
/// Results are always addressed by this identity, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Locally hosted model (e.g. Ollama).
    Local,
    /// Cloud-hosted model.
    Cloud,
}

impl SourceId {
    pub const ALL: [SourceId; 2] = [SourceId::Local, SourceId::Cloud];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Local => "local",
            SourceId::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
