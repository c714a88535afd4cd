pub mod element;
pub mod orchestrator;
pub mod state;

pub use element::{FocusResult, FocusTarget, FOCUS_ATTEMPTS, FOCUS_BACKOFF};
pub use orchestrator::{Escalation, FocusOrchestrator, RunOutcome};
pub use state::{FocusPhase, FocusSnapshot, FocusState, FocusStats};
