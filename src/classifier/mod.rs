//! Decides whether a dialog wrapper is the reminder dialog.
//!
//! No single signal in the dialog's markup is reliable across versions and
//! themes of the component that renders it, so the rules are an OR of ANDs:
//! each accepting rule needs two corroborating signals except the
//! done+snooze button pair, which is conclusive alone.

pub mod candidate;
pub mod config;
pub mod rules;

pub use candidate::{ButtonFact, DescendantFacts, ModalCandidate, SelectFact};
pub use config::ClassifierConfig;
pub use rules::{Rejection, Rule, Verdict};

use crate::dom::{DocumentView, NodeId};

#[derive(Debug, Clone, Default)]
pub struct ReminderClassifier {
    config: ClassifierConfig,
}

impl ReminderClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn capture<'v, 'a>(
        &'v self,
        view: &'v DocumentView<'a>,
        node: NodeId,
    ) -> Option<ModalCandidate<'v, 'a>> {
        ModalCandidate::capture(view, node, &self.config)
    }

    pub fn evaluate(&self, candidate: &ModalCandidate<'_, '_>) -> Verdict {
        rules::evaluate(candidate, &self.config)
    }

    pub fn classify(&self, candidate: &ModalCandidate<'_, '_>) -> bool {
        self.evaluate(candidate).is_accepted()
    }

    /// Captures and evaluates `node`; text nodes and unknown ids are rejected
    /// as non-containers.
    pub fn evaluate_node(&self, view: &DocumentView<'_>, node: NodeId) -> Verdict {
        match self.capture(view, node) {
            Some(candidate) => self.evaluate(&candidate),
            None => Verdict::Rejected(Rejection::NotAContainer),
        }
    }
}
