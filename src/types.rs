//! Core domain types shared across the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Corpus category. Each content type has its own vector index built from
/// an independent artifact directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Song,
    Sfx,
}

impl ContentType {
    /// All known content types, in tie-break priority order.
    ///
    /// Auto-detection iterates this array and keeps the first type on an
    /// exact score tie, so `Song` must stay first.
    pub const ALL: [ContentType; 2] = [ContentType::Song, ContentType::Sfx];

    /// Stable lowercase name, used for artifact subdirectories and the
    /// wire format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Song => "song",
            Self::Sfx => "sfx",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "song" => Ok(Self::Song),
            "sfx" => Ok(Self::Sfx),
            other => Err(format!(
                "unknown content type '{other}', expected 'song' or 'sfx'"
            )),
        }
    }
}

/// Human-readable quality bucket derived from the normalized similarity
/// score. Boundaries are inclusive at the lower bound and partition [0, 1]
/// completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Excellent,
    Good,
    Fair,
    Low,
}

impl MatchTier {
    /// Assigns a tier from a normalized similarity in [0, 1].
    #[must_use]
    pub fn from_similarity(similarity: f32) -> Self {
        if similarity >= 0.90 {
            Self::Excellent
        } else if similarity >= 0.75 {
            Self::Good
        } else if similarity >= 0.60 {
            Self::Fair
        } else {
            Self::Low
        }
    }

    /// UI label for this tier.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent Match",
            Self::Good => "Good Match",
            Self::Fair => "Fair Match",
            Self::Low => "Low Match",
        }
    }
}
