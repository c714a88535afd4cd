use serde::Serialize;

use super::candidate::{DescendantFacts, ModalCandidate};
use super::config::ClassifierConfig;

/// Which accepting rule fired, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    DualButton,
    MarkerClass,
    Structural,
    AccessibleLabel,
    ButtonTemporal,
    StylingControl,
    FileReference,
    FrameworkMarker,
    FallbackText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    /// Root is not a host dialog wrapper
    NotAContainer,
    /// No button-like descendant and no reminder vocabulary at all
    NoEvidence,
    /// Evidence present but no rule found two corroborating signals
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "verdict", content = "reason")]
pub enum Verdict {
    Accepted(Rule),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// Action labels match as whole words when they are ASCII, so "done" is not
/// found in "undone" or "abandoned". CJK labels have no word breaks and match
/// anywhere.
fn contains_label(haystack: &str, labels: &[String]) -> bool {
    labels.iter().any(|label| {
        if !label.is_ascii() {
            return haystack.contains(label.as_str());
        }
        haystack.match_indices(label.as_str()).any(|(start, _)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + label.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    })
}

/// Signals derived once from the facts and shared by several rules.
struct Signals {
    done_button: bool,
    snooze_button: bool,
    action_button: bool,
}

impl Signals {
    fn from_facts(facts: &DescendantFacts, config: &ClassifierConfig) -> Self {
        let done_button = facts
            .buttons
            .iter()
            .any(|b| contains_label(&b.text, &config.done_labels));
        let snooze_button = facts
            .buttons
            .iter()
            .any(|b| contains_label(&b.text, &config.snooze_labels));
        let cta_button = facts
            .buttons
            .iter()
            .any(|b| b.classes.iter().any(|c| *c == config.cta_class));

        Self {
            done_button,
            snooze_button,
            action_button: done_button || snooze_button || cta_button,
        }
    }
}

/// Runs the rules in priority order; the first one that matches decides.
pub fn evaluate(candidate: &ModalCandidate<'_, '_>, config: &ClassifierConfig) -> Verdict {
    if !candidate.has_class(&config.container_class) {
        return Verdict::Rejected(Rejection::NotAContainer);
    }

    let facts = candidate.facts();
    let text = facts.excerpt.as_str();

    let mentions_target_text = contains_any(text, &config.reminder_keywords)
        || contains_label(text, &config.done_labels)
        || contains_label(text, &config.snooze_labels);
    if facts.buttons.is_empty() && !mentions_target_text {
        return Verdict::Rejected(Rejection::NoEvidence);
    }

    let signals = Signals::from_facts(facts, config);

    if signals.done_button && signals.snooze_button {
        return Verdict::Accepted(Rule::DualButton);
    }

    if config
        .marker_classes
        .iter()
        .any(|marker| facts.classes.contains(marker))
    {
        return Verdict::Accepted(Rule::MarkerClass);
    }

    if facts.has_heading
        && facts.selects.iter().any(|s| s.has_placeholder)
        && signals.action_button
    {
        return Verdict::Accepted(Rule::Structural);
    }

    if facts
        .aria_labels
        .iter()
        .any(|label| contains_any(label, &config.aria_markers))
    {
        return Verdict::Accepted(Rule::AccessibleLabel);
    }

    let done_present = signals.done_button || contains_label(text, &config.done_labels);
    let snooze_present = signals.snooze_button || contains_label(text, &config.snooze_labels);
    if done_present && snooze_present && contains_any(text, &config.temporal_phrases) {
        return Verdict::Accepted(Rule::ButtonTemporal);
    }

    let cta_button = facts
        .buttons
        .iter()
        .any(|b| b.classes.iter().any(|c| *c == config.cta_class));
    let styled_select = facts
        .selects
        .iter()
        .any(|s| s.classes.iter().any(|c| *c == config.select_class));
    if cta_button && styled_select {
        return Verdict::Accepted(Rule::StylingControl);
    }

    let extension = config.file_extension.as_str();
    let file_reference = config
        .file_link_classes
        .iter()
        .any(|class| facts.classes.contains(class))
        || facts.aria_labels.iter().any(|label| label.contains(extension))
        || text.contains(extension);
    if file_reference && signals.action_button {
        return Verdict::Accepted(Rule::FileReference);
    }

    let framework_marker = facts
        .data_attributes
        .iter()
        .any(|name| name.starts_with(config.framework_data_prefix.as_str()))
        || facts
            .classes
            .iter()
            .any(|class| class.contains(config.framework_class_fragment.as_str()));
    if framework_marker && signals.action_button {
        return Verdict::Accepted(Rule::FrameworkMarker);
    }

    if contains_any(text, &config.reminder_keywords)
        && signals.action_button
        && !facts.text_truncated
        && facts.text_chars < config.max_fallback_text_chars
    {
        return Verdict::Accepted(Rule::FallbackText);
    }

    Verdict::Rejected(Rejection::Unmatched)
}
