use crate::foundation::core::BlockKind;

/// Title given to blocks whose marker declares none.
pub const DEFAULT_TITLE: &str = "Generated Output";

/// A delimited region of model output destined for the side panel.
///
/// Offsets are byte offsets into the cumulative text the block was extracted from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputBlock {
    /// Stable identity: the marker's `id` attribute, or a hash of where the block was declared.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Declared artifact kind.
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Content captured so far. Grows while the block is streaming.
    pub content: String,
    /// Whether the end marker has been seen (or the block was force-finalized).
    pub is_complete: bool,
    /// Offset of the start marker.
    pub start_index: usize,
    /// Offset just past the end marker, or the text length while streaming.
    pub end_index: usize,
    /// Message the block was streamed in.
    pub message_id: String,
    /// Conversation the block belongs to. Filled in by the registry.
    pub chat_id: Option<String>,
}

impl OutputBlock {
    /// Whether any user-visible field differs from `other`.
    pub fn differs_visibly(&self, other: &OutputBlock) -> bool {
        self.content != other.content
            || self.is_complete != other.is_complete
            || self.title != other.title
    }

    /// Number of lines in the captured content.
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}
