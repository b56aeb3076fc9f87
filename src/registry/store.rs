use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::extract::block::OutputBlock;
use crate::foundation::core::BlockKind;
use crate::foundation::error::{ArtstreamError, ArtstreamResult};

/// Descriptive metadata stored alongside a finalized block.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockMetadata {
    /// Message the block was streamed in.
    pub message_id: String,
    /// Conversation the block belongs to.
    pub chat_id: Option<String>,
    /// Content length in characters.
    pub char_count: usize,
    /// Content length in lines.
    pub line_count: usize,
    /// True when the block was finalized without seeing its end marker (aborted or torn down).
    pub forced: bool,
}

/// Payload handed to a [`BlockStore`] when a block is finalized.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FinalizedBlock {
    /// Block id.
    pub id: String,
    /// Block title.
    pub title: String,
    /// Block kind.
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Final content.
    pub content: String,
    /// Descriptive metadata.
    pub metadata: BlockMetadata,
}

impl FinalizedBlock {
    /// Snapshot `block` for persistence.
    pub fn from_block(block: &OutputBlock, forced: bool) -> Self {
        Self {
            id: block.id.clone(),
            title: block.title.clone(),
            kind: block.kind,
            content: block.content.clone(),
            metadata: BlockMetadata {
                message_id: block.message_id.clone(),
                chat_id: block.chat_id.clone(),
                char_count: block.content.chars().count(),
                line_count: block.line_count(),
                forced,
            },
        }
    }
}

/// Acknowledgement returned by a successful save.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SavedBlock {
    /// Id the store recorded the block under.
    pub id: String,
}

/// Persistence contract for finalized blocks.
///
/// Called once per finalized block id. Each call is an independent write; there is no read path.
pub trait BlockStore {
    /// Persist one finalized block.
    fn save(&mut self, block: &FinalizedBlock) -> ArtstreamResult<SavedBlock>;
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn save(&mut self, block: &FinalizedBlock) -> ArtstreamResult<SavedBlock> {
        (**self).save(block)
    }
}

/// In-memory store for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    saved: Vec<FinalizedBlock>,
}

impl InMemoryBlockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks saved so far, in save order.
    pub fn saved(&self) -> &[FinalizedBlock] {
        &self.saved
    }
}

impl BlockStore for InMemoryBlockStore {
    fn save(&mut self, block: &FinalizedBlock) -> ArtstreamResult<SavedBlock> {
        self.saved.push(block.clone());
        Ok(SavedBlock {
            id: block.id.clone(),
        })
    }
}

/// Appends one JSON object per finalized block to a file.
#[derive(Debug)]
pub struct JsonlBlockStore {
    path: PathBuf,
    out: BufWriter<File>,
}

impl JsonlBlockStore {
    /// Open `path` for appending, creating it (and its parent directory) if needed.
    pub fn open(path: impl Into<PathBuf>) -> ArtstreamResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArtstreamError::persistence(format!(
                    "create store dir '{}': {e}",
                    parent.display()
                ))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ArtstreamError::persistence(format!("open store '{}': {e}", path.display()))
            })?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockStore for JsonlBlockStore {
    fn save(&mut self, block: &FinalizedBlock) -> ArtstreamResult<SavedBlock> {
        serde_json::to_writer(&mut self.out, block)?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(|e| {
                ArtstreamError::persistence(format!("write store '{}': {e}", self.path.display()))
            })?;
        Ok(SavedBlock {
            id: block.id.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/registry/store.rs"]
mod tests;
