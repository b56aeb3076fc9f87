//! artstream is the streaming core of an AI ASCII-art generator.
//!
//! It turns a model's streamed reply and a backend's lifecycle events into presentation state:
//!
//! 1. **Extract**: `cumulative text -> Extraction` finds `<OUTPUT_START .../>` blocks in the
//!    reply so far and strips their markup from the transcript ([`extract`]).
//! 2. **Register**: [`OutputRegistry`] diffs each extraction against the blocks it already knows,
//!    selects new blocks for display and hands completed blocks to a [`BlockStore`] exactly once.
//! 3. **Track**: [`GenerationMachine`] follows one request from prompt to completed frames,
//!    ignoring events that arrive out of order.
//!
//! [`GenerationSession`] wires all three to a single ordered event stream.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Pure extraction**: the extractor keeps no state and re-scans the whole text on every chunk.
//! - **No faults from the stream**: malformed markers and out-of-order events never produce errors.
//! - **Single-threaded**: all mutation happens synchronously in response to one inbound event.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod extract;
mod foundation;
mod generation;
mod registry;
mod session;

pub use extract::block::{DEFAULT_TITLE, OutputBlock};
pub use extract::extractor::{Extraction, extract};
pub use extract::markers::{END_TAG, START_TAG};
pub use foundation::core::{BlockKind, FrameIndex, Fps, GenerationPlan};
pub use foundation::error::{ArtstreamError, ArtstreamResult};
pub use foundation::hash::synthesize_block_id;
pub use generation::machine::GenerationMachine;
pub use generation::state::{GenerationEvent, GenerationState, transition};
pub use registry::output_registry::{DisplaySurface, OutputRegistry, RegistryOpts, RegistryUpdate};
pub use registry::store::{
    BlockMetadata, BlockStore, FinalizedBlock, InMemoryBlockStore, JsonlBlockStore, SavedBlock,
};
pub use session::replay::{
    GenerationSession, MessageView, SessionEvent, SessionStep, SessionSummary, TranscriptBuffer,
    read_events,
};
