use std::io::BufRead;

use crate::extract::block::OutputBlock;
use crate::extract::extractor::extract;
use crate::foundation::core::GenerationPlan;
use crate::foundation::error::{ArtstreamError, ArtstreamResult};
use crate::generation::machine::GenerationMachine;
use crate::generation::state::GenerationState;
use crate::registry::output_registry::{
    DisplaySurface, OutputRegistry, RegistryOpts, RegistryUpdate,
};
use crate::registry::store::BlockStore;

/// One inbound event, as delivered by the backend transport, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Submit a prompt.
    Start {
        /// User prompt.
        prompt: String,
    },
    /// Backend job created.
    GenerationCreated {
        /// Backend job id.
        generation_id: String,
    },
    /// Backend plan available.
    PlanReady {
        /// Plan descriptor.
        #[serde(default)]
        plan: GenerationPlan,
        /// Planned frame count.
        total_frames: u64,
    },
    /// One frame payload.
    Frame {
        /// Frame content.
        frame: String,
        /// Index reported with the frame.
        index: u64,
    },
    /// A transcript chunk for a streaming assistant message.
    Text {
        /// Message the chunk belongs to.
        message_id: String,
        /// Conversation the message belongs to.
        chat_id: String,
        /// Newly arrived text.
        chunk: String,
    },
    /// The message finished streaming.
    TextEnd {
        /// Message that finished.
        message_id: String,
    },
    /// Backend finished.
    Complete {
        /// Stored artwork id, if any.
        #[serde(default)]
        artwork_id: Option<String>,
    },
    /// Backend failed.
    Error {
        /// Failure message.
        message: String,
    },
    /// The user cancelled the request.
    Abort,
    /// Return the generation to idle.
    Reset,
}

/// Cumulative text per streamed message, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct TranscriptBuffer {
    messages: Vec<(String, String)>,
}

impl TranscriptBuffer {
    /// Append `chunk` to `message_id` and return the cumulative text.
    pub fn push(&mut self, message_id: &str, chunk: &str) -> &str {
        let i = match self.messages.iter().position(|(id, _)| id == message_id) {
            Some(i) => i,
            None => {
                self.messages.push((message_id.to_string(), String::new()));
                self.messages.len() - 1
            }
        };
        let text = &mut self.messages[i].1;
        text.push_str(chunk);
        text
    }

    /// Cumulative text of `message_id`.
    pub fn get(&self, message_id: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|(id, _)| id == message_id)
            .map(|(_, text)| text.as_str())
    }

    /// `(message_id, text)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages.iter().map(|(id, t)| (id.as_str(), t.as_str()))
    }
}

/// Result of applying one [`SessionEvent`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStep {
    /// False when the generation machine rejected a lifecycle event.
    pub applied: bool,
    /// Registry changes caused by the event.
    pub update: RegistryUpdate,
}

/// Transcript message as the user sees it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MessageView {
    /// Message id.
    pub message_id: String,
    /// Text with output markers removed.
    pub visible_text: String,
}

/// Snapshot of a session, for reporting.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SessionSummary {
    /// Current generation state.
    pub state: GenerationState,
    /// Phase name of `state`.
    pub phase: &'static str,
    /// Percent complete, while generating.
    pub progress: Option<f64>,
    /// Planned playback length in seconds, while generating with a known frame rate.
    pub playback_secs: Option<f64>,
    /// A request is in flight.
    pub is_active: bool,
    /// A new request may be started.
    pub can_start: bool,
    /// Known output blocks.
    pub blocks: Vec<OutputBlock>,
    /// Display-side state.
    pub display: DisplaySurface,
    /// Transcript messages.
    pub messages: Vec<MessageView>,
}

/// Drives one conversation's generation machine and output registry from a single event stream.
pub struct GenerationSession<S> {
    machine: GenerationMachine,
    registry: OutputRegistry<S>,
    transcript: TranscriptBuffer,
}

impl<S: BlockStore> GenerationSession<S> {
    /// Create a session whose registry persists into `store`.
    pub fn new(store: S, opts: RegistryOpts) -> Self {
        Self {
            machine: GenerationMachine::new(),
            registry: OutputRegistry::new(store, opts),
            transcript: TranscriptBuffer::default(),
        }
    }

    /// Apply one event.
    pub fn apply(&mut self, event: SessionEvent) -> SessionStep {
        let mut step = SessionStep {
            applied: true,
            update: RegistryUpdate::default(),
        };
        match event {
            SessionEvent::Start { prompt } => step.applied = self.machine.start(prompt),
            SessionEvent::GenerationCreated { generation_id } => {
                step.applied = self.machine.generation_created(generation_id)
            }
            SessionEvent::PlanReady { plan, total_frames } => {
                step.applied = self.machine.plan_ready(plan, total_frames)
            }
            SessionEvent::Frame { frame, index } => {
                let mut frames = self.machine.state().frames().to_vec();
                frames.push(frame.clone());
                step.applied = self.machine.frame_received(frame, index, frames);
            }
            SessionEvent::Text {
                message_id,
                chat_id,
                chunk,
            } => {
                let text = self.transcript.push(&message_id, &chunk);
                step.update = self.registry.on_text_update(text, &message_id, &chat_id);
            }
            SessionEvent::TextEnd { message_id } => {
                if self.registry.message_id() == Some(message_id.as_str()) {
                    step.update = self.registry.end_message();
                }
            }
            SessionEvent::Complete { artwork_id } => {
                step.applied = self.machine.complete(artwork_id)
            }
            SessionEvent::Error { message } => {
                step.update = self.registry.abort();
                step.applied = self.machine.error(message);
            }
            SessionEvent::Abort => {
                step.update = self.registry.abort();
                step.applied = self.machine.error("generation aborted");
            }
            SessionEvent::Reset => step.applied = self.machine.reset(),
        }
        step
    }

    /// Apply events in order.
    pub fn replay(&mut self, events: impl IntoIterator<Item = SessionEvent>) -> usize {
        let mut rejected = 0;
        for event in events {
            if !self.apply(event).applied {
                rejected += 1;
            }
        }
        rejected
    }

    /// The generation machine.
    pub fn machine(&self) -> &GenerationMachine {
        &self.machine
    }

    /// The output registry.
    pub fn registry(&self) -> &OutputRegistry<S> {
        &self.registry
    }

    /// Mutable access to the output registry (selection, panel).
    pub fn registry_mut(&mut self) -> &mut OutputRegistry<S> {
        &mut self.registry
    }

    /// Visible text of `message_id`, with output markers removed.
    pub fn visible_text(&self, message_id: &str) -> Option<String> {
        self.transcript
            .get(message_id)
            .map(|text| extract(text, message_id).visible_text)
    }

    /// Snapshot for reporting.
    pub fn summary(&self) -> SessionSummary {
        let state = self.machine.state().clone();
        SessionSummary {
            phase: state.phase(),
            progress: state.progress(),
            playback_secs: match &state {
                GenerationState::Generating {
                    plan: Some(plan),
                    total_frames,
                    ..
                } => plan.duration_secs(*total_frames),
                _ => None,
            },
            is_active: state.is_active(),
            can_start: state.can_start(),
            state,
            blocks: self.registry.blocks().to_vec(),
            display: self.registry.display().clone(),
            messages: self
                .transcript
                .iter()
                .map(|(id, text)| MessageView {
                    message_id: id.to_string(),
                    visible_text: extract(text, id).visible_text,
                })
                .collect(),
        }
    }
}

/// Read a JSON-lines event stream. Blank lines are skipped.
pub fn read_events(reader: impl BufRead) -> ArtstreamResult<Vec<SessionEvent>> {
    let mut events = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ArtstreamError::Other(e.into()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = serde_json::from_str(line)
            .map_err(|e| ArtstreamError::serde(format!("event line {}: {e}", n + 1)))?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
#[path = "../../tests/unit/session/replay.rs"]
mod tests;
