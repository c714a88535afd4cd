use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::classifier::{ReminderClassifier, Rejection, Verdict};
use crate::dom::{Document, NodeId};
use crate::focus::{FocusOrchestrator, RunOutcome};
use crate::log_debug;
use crate::settings::SettingsStore;
use crate::tracker::ModalTracker;

#[derive(Debug)]
pub enum CandidateOutcome {
    Disabled,
    Detached,
    Rejected(Rejection),
    AlreadyHandled(String),
    Triggered {
        id: String,
        run: JoinHandle<RunOutcome>,
    },
}

/// Classify, dedup, then hand the dialog to the focus orchestrator.
///
/// Everything up to the spawn is synchronous, so two submissions of the same
/// dialog can never both get past the handled check.
#[derive(Clone)]
pub struct DetectionPipeline {
    document: Document,
    classifier: Arc<ReminderClassifier>,
    tracker: ModalTracker,
    focus: FocusOrchestrator,
    settings: Arc<SettingsStore>,
}

impl DetectionPipeline {
    pub fn new(
        document: Document,
        classifier: Arc<ReminderClassifier>,
        tracker: ModalTracker,
        focus: FocusOrchestrator,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            document,
            classifier,
            tracker,
            focus,
            settings,
        }
    }

    pub fn classifier(&self) -> &ReminderClassifier {
        &self.classifier
    }

    pub fn submit(&self, node: NodeId) -> CandidateOutcome {
        if !self.settings.enabled() {
            return CandidateOutcome::Disabled;
        }

        let id = {
            let view = self.document.view();
            if !view.is_attached(node) {
                return CandidateOutcome::Detached;
            }
            let Some(candidate) = self.classifier.capture(&view, node) else {
                return CandidateOutcome::Rejected(Rejection::NotAContainer);
            };
            match self.classifier.evaluate(&candidate) {
                Verdict::Accepted(rule) => {
                    log_debug!("modal {node} accepted by {rule:?}");
                }
                Verdict::Rejected(rejection) => {
                    return CandidateOutcome::Rejected(rejection);
                }
            }
            self.tracker.identify(&candidate)
        };

        if !self.tracker.claim(node, &id) {
            return CandidateOutcome::AlreadyHandled(id);
        }

        // Detached task; it ends on removal or on `clear`.
        let _watch = self
            .tracker
            .watch_for_removal(&self.document, node, id.clone(), |id| {
                log_debug!("modal {id} is gone; a new instance will be focused again");
            });

        let focus = self.focus.clone();
        let run_id = id.clone();
        let run = tokio::spawn(async move { focus.trigger(node, &run_id).await });

        CandidateOutcome::Triggered { id, run }
    }
}
