use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::dom::{Document, MutationRecord, NodeId};
use crate::log_debug;

/// How a removal watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    Detached,
    Cancelled,
}

/// Waits until `node` is no longer attached to `doc`.
///
/// Only removals inside `scope` (the node's parent at install time) or of one
/// of its ancestors can detach the node, so every other record is skipped
/// without walking the tree. `rx` must have been subscribed before the caller
/// last saw the node attached, otherwise a removal in between would go
/// unnoticed.
pub async fn wait_for_detach(
    doc: Document,
    mut rx: broadcast::Receiver<MutationRecord>,
    node: NodeId,
    scope: Option<NodeId>,
    cancel: CancellationToken,
) -> WatchEnd {
    loop {
        let attached = doc.view().is_attached(node);
        if !attached {
            return WatchEnd::Detached;
        }
        let Some(scope) = scope else {
            return WatchEnd::Detached;
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return WatchEnd::Cancelled,
                received = rx.recv() => match received {
                    Ok(record) => {
                        if touches_scope(&doc, scope, &record) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log_debug!("removal watch for {node} missed {skipped} records, rechecking");
                        break;
                    }
                    // The sender lives inside `doc`, which we hold.
                    Err(RecvError::Closed) => return WatchEnd::Cancelled,
                },
            }
        }
    }
}

fn touches_scope(doc: &Document, scope: NodeId, record: &MutationRecord) -> bool {
    if record.removed.is_empty() {
        return false;
    }
    let view = doc.view();
    // Detached subtrees keep their internal links, so a removed ancestor still
    // "contains" the scope after the fact. A scope that is already collected
    // can no longer be traced at all.
    !view.exists(scope)
        || view.contains(scope, record.target)
        || record.removed.iter().any(|removed| view.contains(*removed, scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn resolves_when_node_is_detached() {
        let doc = Document::new();
        let wrapper = doc.append(doc.body(), element("div")).unwrap();
        let modal = doc.append(wrapper, element("div").class("modal-container")).unwrap();

        let rx = doc.subscribe();
        let handle = tokio::spawn(wait_for_detach(
            doc.clone(),
            rx,
            modal,
            Some(wrapper),
            CancellationToken::new(),
        ));

        doc.append(doc.body(), element("p")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        doc.remove(wrapper).unwrap();
        assert_eq!(handle.await.unwrap(), WatchEnd::Detached);
    }

    #[tokio::test(start_paused = true)]
    async fn already_detached_node_resolves_immediately() {
        let doc = Document::new();
        let modal = doc.append(doc.body(), element("div")).unwrap();
        let rx = doc.subscribe();
        doc.remove(modal).unwrap();

        let end = wait_for_detach(doc.clone(), rx, modal, None, CancellationToken::new()).await;
        assert_eq!(end, WatchEnd::Detached);
    }

    #[tokio::test(start_paused = true)]
    async fn collected_scope_still_ends_the_watch() {
        let doc = Document::new();
        let outer = doc.append(doc.body(), element("section")).unwrap();
        let wrapper = doc.append(outer, element("div")).unwrap();
        let modal = doc.append(wrapper, element("div").class("modal-container")).unwrap();

        let handle = tokio::spawn(wait_for_detach(
            doc.clone(),
            doc.subscribe(),
            modal,
            Some(wrapper),
            CancellationToken::new(),
        ));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(doc.discard(outer).unwrap(), 3);
        assert!(!doc.view().exists(wrapper));
        assert_eq!(handle.await.unwrap(), WatchEnd::Detached);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_watch() {
        let doc = Document::new();
        let modal = doc.append(doc.body(), element("div")).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(wait_for_detach(
            doc.clone(),
            doc.subscribe(),
            modal,
            Some(doc.body()),
            cancel.clone(),
        ));

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), WatchEnd::Cancelled);
        assert!(doc.view().is_attached(modal));
    }
}
