use crate::foundation::core::{FrameIndex, GenerationPlan};

/// Lifecycle of one generation request.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Prompt submitted; backend job not created yet.
    Initializing {
        /// User prompt.
        prompt: String,
    },
    /// Backend job exists; waiting for its plan.
    Planning {
        /// User prompt.
        prompt: String,
        /// Backend job id.
        generation_id: String,
    },
    /// Plan known; frames arriving.
    Generating {
        /// User prompt.
        prompt: String,
        /// Backend job id.
        generation_id: String,
        /// Index reported with the latest frame.
        current_frame: FrameIndex,
        /// Frame count announced with the plan.
        total_frames: u64,
        /// Frames received so far.
        frames: Vec<String>,
        /// Plan reported by the backend.
        plan: Option<GenerationPlan>,
    },
    /// Terminal success.
    Completed {
        /// User prompt.
        prompt: String,
        /// Backend job id.
        generation_id: String,
        /// All received frames.
        frames: Vec<String>,
        /// Id of the stored artwork, if the backend saved one.
        artwork_id: Option<String>,
    },
    /// Terminal failure.
    Error {
        /// User prompt.
        prompt: String,
        /// Failure message, suitable for display.
        error: String,
        /// Backend job id, if one had been created.
        generation_id: Option<String>,
    },
}

/// External event fed to the generation machine.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Submit a prompt.
    Start {
        /// User prompt.
        prompt: String,
    },
    /// The backend acknowledged the job.
    GenerationCreated {
        /// Backend job id.
        generation_id: String,
    },
    /// The backend produced a plan.
    PlanReady {
        /// Plan descriptor.
        #[serde(default)]
        plan: GenerationPlan,
        /// Number of frames the plan will produce.
        total_frames: u64,
    },
    /// A frame arrived.
    FrameReceived {
        /// The new frame.
        frame: String,
        /// Index reported with the frame.
        index: u64,
        /// Every frame received so far, including this one.
        frames: Vec<String>,
    },
    /// The backend finished successfully.
    Complete {
        /// Id of the stored artwork, if any.
        #[serde(default)]
        artwork_id: Option<String>,
    },
    /// The backend failed.
    Error {
        /// Failure message.
        message: String,
    },
    /// Return to idle from any state.
    Reset,
}

impl GenerationEvent {
    /// Stable snake_case event name.
    pub fn name(&self) -> &'static str {
        match self {
            GenerationEvent::Start { .. } => "start",
            GenerationEvent::GenerationCreated { .. } => "generation_created",
            GenerationEvent::PlanReady { .. } => "plan_ready",
            GenerationEvent::FrameReceived { .. } => "frame_received",
            GenerationEvent::Complete { .. } => "complete",
            GenerationEvent::Error { .. } => "error",
            GenerationEvent::Reset => "reset",
        }
    }
}

/// Apply `event` to `state`. Returns `None` when `state` does not accept `event`.
pub fn transition(state: &GenerationState, event: GenerationEvent) -> Option<GenerationState> {
    use GenerationEvent as E;
    use GenerationState as S;

    let next = match (state, event) {
        (_, E::Reset) => S::Idle,

        (S::Idle | S::Error { .. } | S::Completed { .. }, E::Start { prompt }) => {
            S::Initializing { prompt }
        }

        (S::Initializing { prompt }, E::GenerationCreated { generation_id }) => S::Planning {
            prompt: prompt.clone(),
            generation_id,
        },

        (
            S::Planning {
                prompt,
                generation_id,
            },
            E::PlanReady { plan, total_frames },
        ) => S::Generating {
            prompt: prompt.clone(),
            generation_id: generation_id.clone(),
            current_frame: FrameIndex(0),
            total_frames,
            frames: Vec::new(),
            plan: Some(plan),
        },

        (
            S::Generating {
                prompt,
                generation_id,
                total_frames,
                plan,
                ..
            },
            E::FrameReceived { index, frames, .. },
        ) => S::Generating {
            prompt: prompt.clone(),
            generation_id: generation_id.clone(),
            current_frame: FrameIndex(index),
            total_frames: *total_frames,
            frames,
            plan: plan.clone(),
        },

        (
            S::Generating {
                prompt,
                generation_id,
                frames,
                ..
            },
            E::Complete { artwork_id },
        ) => S::Completed {
            prompt: prompt.clone(),
            generation_id: generation_id.clone(),
            frames: frames.clone(),
            artwork_id,
        },

        (S::Initializing { prompt }, E::Error { message }) => S::Error {
            prompt: prompt.clone(),
            error: message,
            generation_id: None,
        },
        (
            S::Planning {
                prompt,
                generation_id,
            }
            | S::Generating {
                prompt,
                generation_id,
                ..
            },
            E::Error { message },
        ) => S::Error {
            prompt: prompt.clone(),
            error: message,
            generation_id: Some(generation_id.clone()),
        },

        _ => return None,
    };
    Some(next)
}

impl GenerationState {
    /// Stable snake_case phase name.
    pub fn phase(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Initializing { .. } => "initializing",
            GenerationState::Planning { .. } => "planning",
            GenerationState::Generating { .. } => "generating",
            GenerationState::Completed { .. } => "completed",
            GenerationState::Error { .. } => "error",
        }
    }

    /// A request is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            GenerationState::Initializing { .. }
                | GenerationState::Planning { .. }
                | GenerationState::Generating { .. }
        )
    }

    /// A new request may be started.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            GenerationState::Idle
                | GenerationState::Error { .. }
                | GenerationState::Completed { .. }
        )
    }

    /// Percent complete while generating with a known, non-zero frame count.
    pub fn progress(&self) -> Option<f64> {
        match self {
            GenerationState::Generating {
                current_frame,
                total_frames,
                ..
            } if *total_frames > 0 => Some(100.0 * current_frame.0 as f64 / *total_frames as f64),
            _ => None,
        }
    }

    /// Prompt of the current or last request.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            GenerationState::Idle => None,
            GenerationState::Initializing { prompt }
            | GenerationState::Planning { prompt, .. }
            | GenerationState::Generating { prompt, .. }
            | GenerationState::Completed { prompt, .. }
            | GenerationState::Error { prompt, .. } => Some(prompt),
        }
    }

    /// Backend job id, once known.
    pub fn generation_id(&self) -> Option<&str> {
        match self {
            GenerationState::Planning { generation_id, .. }
            | GenerationState::Generating { generation_id, .. }
            | GenerationState::Completed { generation_id, .. } => Some(generation_id),
            GenerationState::Error { generation_id, .. } => generation_id.as_deref(),
            GenerationState::Idle | GenerationState::Initializing { .. } => None,
        }
    }

    /// Frames received so far.
    pub fn frames(&self) -> &[String] {
        match self {
            GenerationState::Generating { frames, .. }
            | GenerationState::Completed { frames, .. } => frames,
            _ => &[],
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generation/state.rs"]
mod tests;
