//! Turns document activity into reminder candidates.
//!
//! Three sources feed one loop: child-list mutations, a periodic poll of every
//! attached dialog wrapper, and a deferred poll after the host opens a window.
//! The poll is the backstop for anything the mutation stream batched away or
//! dropped.

pub mod controller;
pub mod loop_worker;
pub mod pipeline;

pub use controller::DetectionObserver;
pub use pipeline::{CandidateOutcome, DetectionPipeline};

use serde::Serialize;

/// Events the host raises outside the document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HostEvent {
    /// A new top-level window or pane was opened.
    WindowOpened,
}
