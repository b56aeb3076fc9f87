use std::fmt;

use crate::foundation::error::{ArtstreamError, ArtstreamResult};

/// Renderable artifact kind declared by an output marker.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Free-form prose document. Also the fallback for unknown or missing kinds.
    #[default]
    Document,
    /// Source code.
    Code,
    /// Markdown text.
    Markdown,
    /// HTML markup.
    Html,
    /// JSON data.
    Json,
    /// Plain text.
    Text,
    /// Diagram source (ASCII or textual diagram languages).
    Diagram,
    /// Tabular data.
    Table,
}

impl BlockKind {
    /// All kinds, in declaration order.
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Document,
        BlockKind::Code,
        BlockKind::Markdown,
        BlockKind::Html,
        BlockKind::Json,
        BlockKind::Text,
        BlockKind::Diagram,
        BlockKind::Table,
    ];

    /// Canonical lowercase name, as written in the `type` marker attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Document => "document",
            BlockKind::Code => "code",
            BlockKind::Markdown => "markdown",
            BlockKind::Html => "html",
            BlockKind::Json => "json",
            BlockKind::Text => "text",
            BlockKind::Diagram => "diagram",
            BlockKind::Table => "table",
        }
    }

    /// Parse a `type` attribute value, case-insensitively and ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-based frame position within a generation.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameIndex(pub u64);

/// Rational frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator.
    pub num: u32,
    /// Denominator.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Build a frame rate, rejecting zero numerator or denominator.
    pub fn new(num: u32, den: u32) -> ArtstreamResult<Self> {
        if den == 0 {
            return Err(ArtstreamError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ArtstreamError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Duration of `frames` frames in seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }
}

/// Generation plan reported by the backend once a job has been planned.
///
/// Every field is optional; backends report whatever subset they know.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GenerationPlan {
    /// Playback rate in whole frames per second.
    pub fps: Option<u32>,
    /// Frame width in character cells.
    pub width: Option<u32>,
    /// Frame height in character cells.
    pub height: Option<u32>,
    /// Free-form style hint chosen by the planner.
    pub style: Option<String>,
}

impl GenerationPlan {
    /// Plan frame rate, if the backend reported a usable one.
    pub fn frame_rate(&self) -> Option<Fps> {
        self.fps.and_then(|n| Fps::new(n, 1).ok())
    }

    /// Playback duration of `total_frames` at the plan's frame rate.
    pub fn duration_secs(&self, total_frames: u64) -> Option<f64> {
        self.frame_rate().map(|fps| fps.frames_to_secs(total_frames))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
