//! Booking sources: the configured origins of calendar feeds.
//!
//! A [`Source`] is owned by whatever configuration layer sits on top of the
//! engine. The engine only reads it and copies its id and display name onto
//! every event it parses, so merged events stay valid after the source is
//! removed from configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable source identifier, generated once when the source is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }

    /// Generate a fresh random id for a newly configured source.
    pub fn generate() -> Self {
        SourceId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel a source belongs to. Only used for default labeling and colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Airbnb,
    Vrbo,
    Booking,
    Manual,
    #[default]
    Other,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Airbnb,
        SourceKind::Vrbo,
        SourceKind::Booking,
        SourceKind::Manual,
        SourceKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Airbnb => "airbnb",
            SourceKind::Vrbo => "vrbo",
            SourceKind::Booking => "booking",
            SourceKind::Manual => "manual",
            SourceKind::Other => "other",
        }
    }

    /// Human-readable channel name.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Airbnb => "Airbnb",
            SourceKind::Vrbo => "Vrbo",
            SourceKind::Booking => "Booking.com",
            SourceKind::Manual => "Manual upload",
            SourceKind::Other => "Other",
        }
    }

    /// Default color tag (hex) for events of this channel.
    pub fn default_color(&self) -> &'static str {
        match self {
            SourceKind::Airbnb => "#ff5a5f",
            SourceKind::Vrbo => "#245abc",
            SourceKind::Booking => "#003580",
            SourceKind::Manual => "#6b7280",
            SourceKind::Other => "#10b981",
        }
    }

    /// Parse a kind tag; unknown tags fall into the catch-all.
    pub fn from_tag(tag: &str) -> Self {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(tag.trim()))
            .unwrap_or(SourceKind::Other)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A configured origin of bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    /// URL of the feed, or None for uploaded files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Overrides the kind's default color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Source {
    pub fn new(id: SourceId, name: impl Into<String>, kind: SourceKind) -> Self {
        Source {
            id,
            name: name.into(),
            kind,
            locator: None,
            color: None,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Color tag stamped onto this source's events.
    pub fn color_tag(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.kind.default_color())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}
