use std::cell::OnceCell;
use std::collections::BTreeSet;

use crate::dom::{DocumentView, NodeId};

use super::config::ClassifierConfig;

/// Characters of an attribute value kept in the root summary.
const ATTRIBUTE_VALUE_CHARS: usize = 64;
/// Nodes visited inside a single button or select when reading its contents.
const CONTROL_SCAN_NODES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonFact {
    /// Normalized inner text (or `value` for input buttons)
    pub text: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectFact {
    pub classes: Vec<String>,
    /// Holds a disabled or hidden option, the "pick one" placeholder
    pub has_placeholder: bool,
}

/// Everything the classifier learns from below the candidate root. Computed in
/// one bounded walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescendantFacts {
    pub buttons: Vec<ButtonFact>,
    pub classes: BTreeSet<String>,
    /// Lowercased `aria-label` values
    pub aria_labels: Vec<String>,
    pub data_attributes: BTreeSet<String>,
    pub has_heading: bool,
    pub selects: Vec<SelectFact>,
    /// Lowercased, whitespace-collapsed text, at most `max_excerpt_chars` long
    pub excerpt: String,
    /// Characters in `excerpt`
    pub text_chars: usize,
    /// More text existed than the excerpt holds
    pub text_truncated: bool,
    pub nodes_scanned: usize,
}

/// A dialog candidate: the root's own facts up front, descendant facts and the
/// structural signature on first use.
pub struct ModalCandidate<'v, 'a> {
    view: &'v DocumentView<'a>,
    config: &'v ClassifierConfig,
    node: NodeId,
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    facts: OnceCell<DescendantFacts>,
    signature: OnceCell<String>,
}

impl<'v, 'a> ModalCandidate<'v, 'a> {
    /// `None` when `node` is not an element.
    pub fn capture(
        view: &'v DocumentView<'a>,
        node: NodeId,
        config: &'v ClassifierConfig,
    ) -> Option<Self> {
        let tag = view.tag(node)?.to_string();
        let classes = view.classes(node).map(str::to_string).collect();
        let attributes = view
            .attributes(node)
            .iter()
            .take(config.max_attribute_summary)
            .map(|(name, value)| {
                (
                    name.clone(),
                    value.chars().take(ATTRIBUTE_VALUE_CHARS).collect(),
                )
            })
            .collect();

        Some(Self {
            view,
            config,
            node,
            tag,
            classes,
            attributes,
            facts: OnceCell::new(),
            signature: OnceCell::new(),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// The node's own non-empty DOM `id`, read straight from the document
    /// rather than the bounded attribute summary.
    pub fn dom_id(&self) -> Option<&str> {
        self.view
            .attribute(self.node, "id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn facts(&self) -> &DescendantFacts {
        self.facts.get_or_init(|| self.scan())
    }

    /// Child tags with their own child counts, e.g. `div[2] button[1]`.
    pub fn structural_signature(&self) -> &str {
        self.signature.get_or_init(|| {
            self.view
                .children(self.node)
                .iter()
                .filter_map(|child| {
                    self.view
                        .tag(*child)
                        .map(|tag| format!("{tag}[{}]", self.view.children(*child).len()))
                })
                .take(self.config.max_child_tags)
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    fn scan(&self) -> DescendantFacts {
        let view = self.view;
        let config = self.config;
        let mut facts = DescendantFacts::default();
        let mut excerpt = TextAccumulator::new(config.max_excerpt_chars);

        for (node, depth) in view.descendants(self.node).take(config.max_scan_nodes) {
            facts.nodes_scanned += 1;
            if depth > config.max_scan_depth {
                continue;
            }
            if let Some(content) = view.text(node) {
                excerpt.push(content);
                continue;
            }
            let Some(tag) = view.tag(node) else {
                continue;
            };

            for class in view.classes(node) {
                facts.classes.insert(class.to_string());
            }
            for (name, value) in view.attributes(node) {
                if name == "aria-label" {
                    facts.aria_labels.push(value.to_lowercase());
                } else if name.starts_with("data-") {
                    facts.data_attributes.insert(name.clone());
                }
            }

            if matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                facts.has_heading = true;
            }
            if tag == "select" {
                facts.selects.push(SelectFact {
                    classes: view.classes(node).map(str::to_string).collect(),
                    has_placeholder: has_placeholder_option(view, node),
                });
            }
            if is_button_like(view, node, tag) && facts.buttons.len() < config.max_buttons {
                facts.buttons.push(ButtonFact {
                    text: button_text(view, node, tag),
                    classes: view.classes(node).map(str::to_string).collect(),
                });
            }
        }

        let (text, chars, truncated) = excerpt.finish();
        facts.excerpt = text;
        facts.text_chars = chars;
        facts.text_truncated = truncated;
        facts
    }
}

fn is_button_like(view: &DocumentView<'_>, node: NodeId, tag: &str) -> bool {
    match tag {
        "button" => true,
        "input" => matches!(
            view.attribute(node, "type").map(str::to_ascii_lowercase).as_deref(),
            Some("button" | "submit")
        ),
        _ => view.attribute(node, "role") == Some("button"),
    }
}

fn button_text(view: &DocumentView<'_>, node: NodeId, tag: &str) -> String {
    if tag == "input" {
        return normalize(view.attribute(node, "value").unwrap_or_default());
    }
    let mut text = TextAccumulator::new(ATTRIBUTE_VALUE_CHARS);
    for (child, _) in view.descendants(node).take(CONTROL_SCAN_NODES) {
        if let Some(content) = view.text(child) {
            text.push(content);
        }
    }
    text.finish().0
}

fn has_placeholder_option(view: &DocumentView<'_>, select: NodeId) -> bool {
    view.descendants(select)
        .take(CONTROL_SCAN_NODES)
        .any(|(node, _)| {
            view.tag(node) == Some("option")
                && (view.attribute(node, "disabled").is_some()
                    || view.attribute(node, "hidden").is_some())
        })
}

/// Lowercases and collapses whitespace.
pub(crate) fn normalize(raw: &str) -> String {
    let mut acc = TextAccumulator::new(usize::MAX);
    acc.push(raw);
    acc.finish().0
}

/// Builds a normalized excerpt out of text fragments, stopping at a character cap.
struct TextAccumulator {
    out: String,
    chars: usize,
    cap: usize,
    truncated: bool,
    pending_space: bool,
}

impl TextAccumulator {
    fn new(cap: usize) -> Self {
        Self {
            out: String::new(),
            chars: 0,
            cap,
            truncated: false,
            pending_space: false,
        }
    }

    fn push(&mut self, fragment: &str) {
        if self.truncated {
            return;
        }
        // Fragments from sibling nodes are separate words.
        self.pending_space |= self.chars > 0;
        for ch in fragment.chars() {
            if ch.is_whitespace() {
                self.pending_space = self.chars > 0;
                continue;
            }
            if self.pending_space {
                if !self.emit(' ') {
                    return;
                }
                self.pending_space = false;
            }
            for lower in ch.to_lowercase() {
                if !self.emit(lower) {
                    return;
                }
            }
        }
    }

    fn emit(&mut self, ch: char) -> bool {
        if self.chars >= self.cap {
            self.truncated = true;
            return false;
        }
        self.out.push(ch);
        self.chars += 1;
        true
    }

    fn finish(self) -> (String, usize, bool) {
        (self.out, self.chars, self.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{element, Document};

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Remind \n me   LATER "), "remind me later");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn facts_cover_buttons_selects_and_text() {
        let doc = Document::new();
        let modal = doc
            .append(
                doc.body(),
                element("div").class("modal-container").child(
                    element("div")
                        .class("modal")
                        .attr("data-svelte-h", "x")
                        .child(element("h2").text("Water the plants"))
                        .child(
                            element("select")
                                .class("dropdown")
                                .child(element("option").attr("hidden", "").text("Snooze"))
                                .child(element("option").text("5 minutes")),
                        )
                        .child(element("button").class("mod-cta").text("  Done "))
                        .child(element("input").attr("type", "submit").attr("value", "Later")),
                ),
            )
            .unwrap();

        let view = doc.view();
        let config = ClassifierConfig::default();
        let candidate = ModalCandidate::capture(&view, modal, &config).unwrap();
        let facts = candidate.facts();

        assert!(facts.has_heading);
        assert_eq!(facts.selects.len(), 1);
        assert!(facts.selects[0].has_placeholder);
        assert_eq!(facts.buttons.len(), 2);
        assert_eq!(facts.buttons[0].text, "done");
        assert_eq!(facts.buttons[1].text, "later");
        assert!(facts.data_attributes.contains("data-svelte-h"));
        assert_eq!(facts.excerpt, "water the plants snooze 5 minutes done");
        assert!(!facts.text_truncated);
        assert_eq!(candidate.structural_signature(), "div[4]");
    }

    #[test]
    fn excerpt_is_capped() {
        let doc = Document::new();
        let long = "word ".repeat(1000);
        let modal = doc
            .append(doc.body(), element("div").class("modal-container").text(long))
            .unwrap();

        let view = doc.view();
        let config = ClassifierConfig {
            max_excerpt_chars: 50,
            ..ClassifierConfig::default()
        };
        let candidate = ModalCandidate::capture(&view, modal, &config).unwrap();

        assert_eq!(candidate.facts().text_chars, 50);
        assert!(candidate.facts().text_truncated);
    }

    #[test]
    fn text_nodes_are_not_candidates() {
        let doc = Document::new();
        let para = doc.append(doc.body(), element("p").text("hi")).unwrap();
        let view = doc.view();
        let text_node = view.children(para)[0];
        let config = ClassifierConfig::default();

        assert!(ModalCandidate::capture(&view, text_node, &config).is_none());
    }
}
