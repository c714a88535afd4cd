use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::dom::{Document, DocumentView, NodeId, ScrollBehavior, ScrollBlock};
use crate::log_debug;

pub const FOCUS_ATTEMPTS: u32 = 3;
pub const FOCUS_BACKOFF: Duration = Duration::from_millis(50);

/// Descendants looked at when picking a focus target.
const TARGET_SCAN_NODES: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "camelCase")]
pub enum FocusTarget {
    Button(NodeId),
    TextInput(NodeId),
    Focusable(NodeId),
    /// The dialog itself, given a programmatic tab stop if it lacks one
    Root(NodeId),
}

impl FocusTarget {
    pub fn node(&self) -> NodeId {
        match *self {
            FocusTarget::Button(node)
            | FocusTarget::TextInput(node)
            | FocusTarget::Focusable(node)
            | FocusTarget::Root(node) => node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusResult {
    Focused { target: FocusTarget, attempts: u32 },
    Abandoned { target: FocusTarget, attempts: u32 },
}

/// Buttons first, then text entry, then anything focusable, else the dialog.
pub fn select_target(view: &DocumentView<'_>, root: NodeId) -> FocusTarget {
    let mut text_input = None;
    let mut focusable = None;

    for (node, _) in view.descendants(root).take(TARGET_SCAN_NODES) {
        if !view.is_focusable(node) {
            continue;
        }
        let tag = view.tag(node).unwrap_or_default();
        let input_type = view.attribute(node, "type").map(str::to_ascii_lowercase);
        let button_like = match tag {
            "button" => true,
            "input" => matches!(input_type.as_deref(), Some("button" | "submit")),
            _ => view.attribute(node, "role") == Some("button"),
        };
        if button_like {
            return FocusTarget::Button(node);
        }
        if text_input.is_none() && matches!(tag, "input" | "textarea") {
            text_input = Some(node);
        }
        // Programmatic-only tab stops are not picked as generic targets.
        if focusable.is_none() && view.attribute(node, "tabindex").map(str::trim) != Some("-1") {
            focusable = Some(node);
        }
    }

    text_input
        .map(FocusTarget::TextInput)
        .or(focusable.map(FocusTarget::Focusable))
        .unwrap_or(FocusTarget::Root(root))
}

/// Moves keyboard focus into the dialog at `root`: picks a target, scrolls
/// it to the centre of the viewport and retries focus with a short backoff.
pub async fn focus_within(doc: &Document, root: NodeId) -> Result<FocusResult> {
    let target = {
        let view = doc.view();
        if !view.is_attached(root) {
            bail!("modal {root} left the document before it could be focused");
        }
        select_target(&view, root)
    };

    if let FocusTarget::Root(node) = target {
        let missing_tab_stop = doc.view().attribute(node, "tabindex").is_none();
        if missing_tab_stop {
            doc.set_attribute(node, "tabindex", "-1")?;
        }
    }

    doc.scroll_into_view(target.node(), ScrollBehavior::Smooth, ScrollBlock::Center)?;

    for attempt in 1..=FOCUS_ATTEMPTS {
        doc.focus(target.node());
        let focused = doc.view().active_element() == Some(target.node());
        if focused {
            return Ok(FocusResult::Focused {
                target,
                attempts: attempt,
            });
        }
        if attempt < FOCUS_ATTEMPTS {
            log_debug!("focus attempt {attempt} on {} did not stick, retrying", target.node());
            tokio::time::sleep(FOCUS_BACKOFF).await;
        }
    }

    Ok(FocusResult::Abandoned {
        target,
        attempts: FOCUS_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element;

    #[test]
    fn button_wins_over_inputs() {
        let doc = Document::new();
        let modal = doc
            .append(
                doc.body(),
                element("div")
                    .child(element("input").attr("type", "text"))
                    .child(element("button").text("Done")),
            )
            .unwrap();

        let target = select_target(&doc.view(), modal);
        assert!(matches!(target, FocusTarget::Button(_)));
    }

    #[test]
    fn disabled_button_is_skipped() {
        let doc = Document::new();
        let modal = doc
            .append(
                doc.body(),
                element("div")
                    .child(element("button").attr("disabled", "").text("Done"))
                    .child(element("textarea")),
            )
            .unwrap();

        assert!(matches!(
            select_target(&doc.view(), modal),
            FocusTarget::TextInput(_)
        ));
    }

    #[test]
    fn programmatic_tab_stop_is_not_a_generic_target() {
        let doc = Document::new();
        let modal = doc
            .append(
                doc.body(),
                element("div")
                    .child(element("div").attr("tabindex", "-1"))
                    .child(element("a").attr("href", "#")),
            )
            .unwrap();

        let target = select_target(&doc.view(), modal);
        let FocusTarget::Focusable(node) = target else {
            panic!("expected a generic target, got {target:?}");
        };
        assert_eq!(doc.view().tag(node), Some("a"));
    }

    #[test]
    fn bare_dialog_falls_back_to_root() {
        let doc = Document::new();
        let modal = doc
            .append(doc.body(), element("div").child(element("p").text("hi")))
            .unwrap();
        assert_eq!(select_target(&doc.view(), modal), FocusTarget::Root(modal));
    }

    #[tokio::test(start_paused = true)]
    async fn root_gets_tab_stop_and_focus() {
        let doc = Document::new();
        let modal = doc
            .append(doc.body(), element("div").child(element("p").text("hi")))
            .unwrap();

        let result = focus_within(&doc, modal).await.unwrap();
        assert_eq!(
            result,
            FocusResult::Focused {
                target: FocusTarget::Root(modal),
                attempts: 1
            }
        );
        assert_eq!(doc.view().attribute(modal, "tabindex"), Some("-1"));
        assert_eq!(doc.view().active_element(), Some(modal));

        let scrolls = doc.take_scroll_requests();
        assert_eq!(scrolls.len(), 1);
        assert_eq!(scrolls[0].node, modal);
        assert_eq!(scrolls[0].block, ScrollBlock::Center);
    }

    #[tokio::test(start_paused = true)]
    async fn inert_dialog_is_abandoned_after_retries() {
        let doc = Document::new();
        let modal = doc
            .append(
                doc.body(),
                element("div")
                    .attr("inert", "")
                    .child(element("button").text("Done")),
            )
            .unwrap();

        let result = focus_within(&doc, modal).await.unwrap();
        assert!(matches!(
            result,
            FocusResult::Abandoned {
                attempts: FOCUS_ATTEMPTS,
                ..
            }
        ));
        assert_eq!(doc.view().active_element(), None);
    }

    #[tokio::test]
    async fn detached_dialog_errors() {
        let doc = Document::new();
        let modal = doc.append(doc.body(), element("div")).unwrap();
        doc.remove(modal).unwrap();
        assert!(focus_within(&doc, modal).await.is_err());
    }
}
