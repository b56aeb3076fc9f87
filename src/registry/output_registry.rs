use std::collections::HashSet;

use crate::extract::block::OutputBlock;
use crate::extract::extractor::extract;
use crate::registry::store::{BlockStore, FinalizedBlock};

/// Options controlling registry side effects.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RegistryOpts {
    /// Open the display panel when a new block is discovered.
    pub auto_open_panel: bool,
    /// Make a newly discovered block the selected block.
    pub select_new_blocks: bool,
    /// Persist blocks that were force-completed by an abort or message teardown.
    pub persist_forced: bool,
}

impl Default for RegistryOpts {
    fn default() -> Self {
        Self {
            auto_open_panel: true,
            select_new_blocks: true,
            persist_forced: true,
        }
    }
}

/// Display-side state driven by the registry. Nothing here renders; callers read it.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DisplaySurface {
    /// Whether the side panel is open.
    pub panel_open: bool,
    /// Block currently shown in the panel.
    pub selected_block_id: Option<String>,
}

/// What one registry call changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegistryUpdate {
    /// Ids inserted into the working set, in discovery order.
    pub inserted: Vec<String>,
    /// Ids of known blocks whose content, completeness or title changed.
    pub updated: Vec<String>,
    /// Ids finalized by this call.
    pub finalized: Vec<String>,
    /// Set when the selection changed to a newly discovered block.
    pub selected: Option<String>,
}

impl RegistryUpdate {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.finalized.is_empty()
            && self.selected.is_none()
    }
}

/// Working set of output blocks for one conversation.
///
/// Feed it the cumulative text of the streaming message after every chunk; it re-extracts,
/// diffs against known blocks, finalizes completed blocks exactly once and drives the
/// [`DisplaySurface`]. Blocks from earlier messages stay addressable for the life of the registry.
pub struct OutputRegistry<S> {
    opts: RegistryOpts,
    store: S,
    blocks: Vec<OutputBlock>,
    streaming_id: Option<String>,
    message_id: Option<String>,
    // Per message: ids that already triggered a selection change.
    signaled: HashSet<String>,
    // Per conversation: ids already handed to the store.
    finalized: HashSet<String>,
    display: DisplaySurface,
}

impl<S: BlockStore> OutputRegistry<S> {
    /// Create an empty registry persisting into `store`.
    pub fn new(store: S, opts: RegistryOpts) -> Self {
        Self {
            opts,
            store,
            blocks: Vec::new(),
            streaming_id: None,
            message_id: None,
            signaled: HashSet::new(),
            finalized: HashSet::new(),
            display: DisplaySurface::default(),
        }
    }

    /// Process the latest cumulative text of `message_id`.
    ///
    /// Safe to call repeatedly with unchanged text: a repeat call returns an empty update.
    /// Switching to a new `message_id` tears down the previous message first.
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn on_text_update(
        &mut self,
        text: &str,
        message_id: &str,
        chat_id: &str,
    ) -> RegistryUpdate {
        let mut update = RegistryUpdate::default();
        if self.message_id.as_deref() != Some(message_id) {
            self.begin_message(message_id, &mut update);
        }

        for mut block in last_per_id(extract(text, message_id).blocks) {
            block.chat_id = Some(chat_id.to_string());
            match self.position(&block.id) {
                Some(i) => self.merge(i, block, &mut update),
                None => self.insert(block, &mut update),
            }
        }
        update
    }

    /// Force-complete every block still streaming, keeping whatever content was captured.
    pub fn abort(&mut self) -> RegistryUpdate {
        let mut update = RegistryUpdate::default();
        self.force_complete(|_| true, &mut update);
        if !update.finalized.is_empty() {
            tracing::info!(count = update.finalized.len(), "aborted streaming blocks");
        }
        update
    }

    /// Mark the current message finished. Unterminated blocks are force-completed.
    pub fn end_message(&mut self) -> RegistryUpdate {
        let mut update = RegistryUpdate::default();
        if let Some(prev) = self.message_id.take() {
            self.teardown(&prev, &mut update);
        }
        self.signaled.clear();
        update
    }

    /// Select an existing block and open the panel. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.display.selected_block_id = Some(id.to_string());
        self.display.panel_open = true;
        true
    }

    /// Close the display panel, keeping the selection.
    pub fn close_panel(&mut self) {
        self.display.panel_open = false;
    }

    /// All known blocks, in discovery order.
    pub fn blocks(&self) -> &[OutputBlock] {
        &self.blocks
    }

    /// Look up a block by id.
    pub fn block(&self, id: &str) -> Option<&OutputBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Blocks streamed in `message_id`.
    pub fn blocks_for_message<'a>(
        &'a self,
        message_id: &'a str,
    ) -> impl Iterator<Item = &'a OutputBlock> + 'a {
        self.blocks.iter().filter(move |b| b.message_id == message_id)
    }

    /// Id of the block currently streaming, if any.
    pub fn streaming_block_id(&self) -> Option<&str> {
        self.streaming_id.as_deref()
    }

    /// Message currently streaming, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Display-side state.
    pub fn display(&self) -> &DisplaySurface {
        &self.display
    }

    /// Options this registry was built with.
    pub fn opts(&self) -> &RegistryOpts {
        &self.opts
    }

    /// Borrow the persistence collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the registry, returning its store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    fn begin_message(&mut self, message_id: &str, update: &mut RegistryUpdate) {
        if let Some(prev) = self.message_id.take() {
            self.teardown(&prev, update);
        }
        self.signaled.clear();
        tracing::debug!(message_id, "output registry following new message");
        self.message_id = Some(message_id.to_string());
    }

    fn teardown(&mut self, message_id: &str, update: &mut RegistryUpdate) {
        self.force_complete(|b| b.message_id == message_id, update);
        self.streaming_id = None;
    }

    fn force_complete(
        &mut self,
        mut filter: impl FnMut(&OutputBlock) -> bool,
        update: &mut RegistryUpdate,
    ) {
        let open: Vec<usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_complete && filter(b))
            .map(|(i, _)| i)
            .collect();
        for i in open {
            tracing::debug!(id = %self.blocks[i].id, "force-completing streaming block");
            self.finalize(i, true, update);
        }
    }

    fn insert(&mut self, block: OutputBlock, update: &mut RegistryUpdate) {
        let id = block.id.clone();
        let complete = block.is_complete;
        tracing::debug!(id = %id, kind = %block.kind, complete, "discovered output block");
        self.blocks.push(block);
        update.inserted.push(id.clone());

        if !complete {
            self.streaming_id = Some(id.clone());
        }
        if self.signaled.insert(id.clone()) {
            self.signal_selection(&id, update);
        }
        if complete {
            self.finalize(self.blocks.len() - 1, false, update);
        }
    }

    fn merge(&mut self, i: usize, incoming: OutputBlock, update: &mut RegistryUpdate) {
        let current = &mut self.blocks[i];
        if current.is_complete && !incoming.is_complete {
            // Same id re-declared later; the later block takes over once it completes.
            return;
        }
        if !current.differs_visibly(&incoming) {
            return;
        }

        let was_complete = current.is_complete;
        current.title = incoming.title;
        current.kind = incoming.kind;
        current.content = incoming.content;
        current.is_complete = incoming.is_complete;
        current.start_index = incoming.start_index;
        current.end_index = incoming.end_index;
        current.message_id = incoming.message_id;
        current.chat_id = incoming.chat_id;
        update.updated.push(current.id.clone());

        if current.is_complete && !was_complete {
            self.finalize(i, false, update);
        }
    }

    fn signal_selection(&mut self, id: &str, update: &mut RegistryUpdate) {
        if self.opts.select_new_blocks {
            self.display.selected_block_id = Some(id.to_string());
            update.selected = Some(id.to_string());
        }
        if self.opts.auto_open_panel {
            self.display.panel_open = true;
        }
    }

    fn finalize(&mut self, i: usize, forced: bool, update: &mut RegistryUpdate) {
        let block = &mut self.blocks[i];
        block.is_complete = true;
        if self.streaming_id.as_deref() == Some(block.id.as_str()) {
            self.streaming_id = None;
        }
        if !self.finalized.insert(block.id.clone()) {
            tracing::debug!(id = %block.id, "block already finalized");
            return;
        }
        update.finalized.push(block.id.clone());
        if forced && !self.opts.persist_forced {
            return;
        }

        let payload = FinalizedBlock::from_block(block, forced);
        match self.store.save(&payload) {
            Ok(saved) => tracing::info!(id = %saved.id, forced, "persisted output block"),
            // The in-memory block stays as is; a failed save is not retried here.
            Err(e) => {
                tracing::warn!(id = %payload.id, error = %e, "failed to persist output block")
            }
        }
    }
}

/// Collapse blocks sharing an id to the last one declared, keeping first-seen order.
///
/// A complete block is not replaced by a later block with the same id that is still streaming.
fn last_per_id(blocks: Vec<OutputBlock>) -> Vec<OutputBlock> {
    let mut out: Vec<OutputBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match out.iter_mut().find(|b| b.id == block.id) {
            Some(seen) if seen.is_complete && !block.is_complete => {}
            Some(seen) => *seen = block,
            None => out.push(block),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/registry/output_registry.rs"]
mod tests;
