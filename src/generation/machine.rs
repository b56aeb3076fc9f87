use crate::foundation::core::GenerationPlan;
use crate::generation::state::{GenerationEvent, GenerationState, transition};

/// Owns the [`GenerationState`] of one generation request.
///
/// Events arriving in a state that does not accept them are logged and ignored; every method
/// returns whether the event was applied.
#[derive(Clone, Debug, Default)]
pub struct GenerationMachine {
    state: GenerationState,
}

impl GenerationMachine {
    /// Create an idle machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Apply one event.
    pub fn dispatch(&mut self, event: GenerationEvent) -> bool {
        let name = event.name();
        let from = self.state.phase();
        match transition(&self.state, event) {
            Some(next) => {
                tracing::info!(event = name, from, to = next.phase(), "generation transition");
                self.state = next;
                true
            }
            None => {
                tracing::warn!(
                    event = name,
                    phase = from,
                    "ignoring out-of-order generation event"
                );
                false
            }
        }
    }

    /// Submit a prompt.
    pub fn start(&mut self, prompt: impl Into<String>) -> bool {
        self.dispatch(GenerationEvent::Start {
            prompt: prompt.into(),
        })
    }

    /// The backend created the job.
    pub fn generation_created(&mut self, generation_id: impl Into<String>) -> bool {
        self.dispatch(GenerationEvent::GenerationCreated {
            generation_id: generation_id.into(),
        })
    }

    /// The backend planned the job.
    pub fn plan_ready(&mut self, plan: GenerationPlan, total_frames: u64) -> bool {
        self.dispatch(GenerationEvent::PlanReady { plan, total_frames })
    }

    /// A frame arrived; `frames` holds every frame so far.
    pub fn frame_received(
        &mut self,
        frame: impl Into<String>,
        index: u64,
        frames: Vec<String>,
    ) -> bool {
        self.dispatch(GenerationEvent::FrameReceived {
            frame: frame.into(),
            index,
            frames,
        })
    }

    /// The backend finished.
    pub fn complete(&mut self, artwork_id: Option<String>) -> bool {
        self.dispatch(GenerationEvent::Complete { artwork_id })
    }

    /// The backend failed.
    pub fn error(&mut self, message: impl Into<String>) -> bool {
        self.dispatch(GenerationEvent::Error {
            message: message.into(),
        })
    }

    /// Return to idle.
    pub fn reset(&mut self) -> bool {
        self.dispatch(GenerationEvent::Reset)
    }

    /// See [`GenerationState::is_active`].
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// See [`GenerationState::can_start`].
    pub fn can_start(&self) -> bool {
        self.state.can_start()
    }

    /// See [`GenerationState::progress`].
    pub fn progress(&self) -> Option<f64> {
        self.state.progress()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generation/machine.rs"]
mod tests;
