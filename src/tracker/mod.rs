mod identity;
mod watch;

pub use identity::{content_id, SYNTHETIC_ID_PREFIX};
pub use watch::WatchEnd;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::ModalCandidate;
use crate::dom::{Document, NodeId};
use crate::log_debug;

/// Remembers which dialog instances were already handled.
///
/// Each instance gets a stable id (DOM id, else a content hash recorded in a
/// side table per node). An id stays in the handled set until its node is seen
/// detached, so repeated detections of the same open dialog are no-ops while a
/// fresh dialog with identical content after the first one closed counts as
/// new.
#[derive(Clone, Default)]
pub struct ModalTracker {
    inner: Arc<Mutex<TrackerState>>,
}

#[derive(Default)]
struct TrackerState {
    /// Handled ids and the node that claimed each, when known
    handled: HashMap<String, Option<NodeId>>,
    /// Synthetic ids already computed, keyed by node
    stamps: HashMap<NodeId, String>,
    /// Parent of every outstanding removal watch
    watches: CancellationToken,
}

impl ModalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable id for the candidate's node. The first computation for a node is
    /// recorded, later calls return the recorded value even if the dialog's
    /// text changed since.
    pub fn identify(&self, candidate: &ModalCandidate<'_, '_>) -> String {
        if let Some(id) = candidate.dom_id() {
            return id.to_string();
        }

        let node = candidate.node();
        if let Some(id) = self.lock().stamps.get(&node) {
            return id.clone();
        }

        // Hash outside the lock; the walk is bounded but not free.
        let id = content_id(candidate);
        self.lock().stamps.entry(node).or_insert(id).clone()
    }

    pub fn is_handled(&self, id: &str) -> bool {
        self.lock().handled.contains_key(id)
    }

    /// Marks `id` handled. Returns `false` when it already was, which makes
    /// this the check-and-set the detection pipeline relies on.
    pub fn mark_handled(&self, id: &str) -> bool {
        match self.lock().handled.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(None);
                true
            }
        }
    }

    /// [`mark_handled`](Self::mark_handled) on behalf of `node`. When another
    /// node already holds the id, `node`'s recorded synthetic id is dropped:
    /// only the claiming node's entry is released by its removal watch.
    pub fn claim(&self, node: NodeId, id: &str) -> bool {
        let mut state = self.lock();
        match state.handled.entry(id.to_string()) {
            Entry::Occupied(owner) => {
                if *owner.get() != Some(node) {
                    state.stamps.remove(&node);
                }
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Some(node));
                true
            }
        }
    }

    pub fn stamp_count(&self) -> usize {
        self.lock().stamps.len()
    }

    pub fn handled_count(&self) -> usize {
        self.lock().handled.len()
    }

    /// Forgets `id` and the node's recorded synthetic id.
    pub fn release(&self, node: NodeId, id: &str) {
        let mut state = self.lock();
        state.handled.remove(id);
        state.stamps.remove(&node);
    }

    /// Watches the node's parent subtree until the node is detached, then
    /// releases `id` and calls `on_removed` once. The watch disposes of itself
    /// after firing and is cancelled by [`clear`](Self::clear). It runs on its
    /// own task, so the returned handle may be dropped; it is there for
    /// callers that want to wait for the watch to end.
    pub fn watch_for_removal<F>(
        &self,
        doc: &Document,
        node: NodeId,
        id: String,
        on_removed: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        // Subscribe before reading the parent so nothing slips in between.
        let rx = doc.subscribe();
        let scope = doc.view().parent(node);
        let cancel = self.lock().watches.child_token();
        let tracker = self.clone();
        let doc = doc.clone();

        tokio::spawn(async move {
            match watch::wait_for_detach(doc, rx, node, scope, cancel).await {
                WatchEnd::Detached => {
                    log_debug!("modal {id} closed, removing from focused set");
                    tracker.release(node, &id);
                    on_removed(id);
                }
                WatchEnd::Cancelled => {
                    log_debug!("removal watch for modal {id} cancelled");
                }
            }
        })
    }

    /// Cancels every removal watch and forgets all ids.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.watches.cancel();
        state.watches = CancellationToken::new();
        state.handled.clear();
        state.stamps.clear();
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;
    use crate::dom::{element, ElementSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn reminder(title: &str) -> ElementSpec {
        element("div").class("modal-container").child(
            element("div")
                .class("modal")
                .child(element("h2").text(title))
                .child(element("button").text("Done"))
                .child(element("button").text("Snooze")),
        )
    }

    fn identify(tracker: &ModalTracker, doc: &Document, node: NodeId) -> String {
        let view = doc.view();
        let config = ClassifierConfig::default();
        let candidate = ModalCandidate::capture(&view, node, &config).unwrap();
        tracker.identify(&candidate)
    }

    #[test]
    fn identity_is_stable_for_a_node() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc.append(doc.body(), reminder("Pay rent")).unwrap();

        let first = identify(&tracker, &doc, modal);
        let second = identify(&tracker, &doc, modal);
        assert_eq!(first, second);
        assert!(first.starts_with(SYNTHETIC_ID_PREFIX));
    }

    #[test]
    fn identity_survives_content_changes_once_recorded() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let first = identify(&tracker, &doc, modal);

        doc.append(modal, element("p").text("appended later")).unwrap();
        assert_eq!(identify(&tracker, &doc, modal), first);
    }

    #[test]
    fn distinct_text_gives_distinct_ids() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let a = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let b = doc.append(doc.body(), reminder("Call mom")).unwrap();

        assert_ne!(identify(&tracker, &doc, a), identify(&tracker, &doc, b));
    }

    #[test]
    fn dom_id_takes_priority() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc
            .append(doc.body(), reminder("Pay rent").id("reminder-42"))
            .unwrap();

        assert_eq!(identify(&tracker, &doc, modal), "reminder-42");
    }

    #[test]
    fn mark_handled_is_check_and_set() {
        let tracker = ModalTracker::new();
        assert!(!tracker.is_handled("a"));
        assert!(tracker.mark_handled("a"));
        assert!(!tracker.mark_handled("a"));
        assert!(tracker.is_handled("a"));
        assert_eq!(tracker.handled_count(), 1);
    }

    #[test]
    fn second_node_with_same_content_keeps_no_stamp() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let first = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let twin = doc.append(doc.body(), reminder("Pay rent")).unwrap();

        let id = identify(&tracker, &doc, first);
        assert_eq!(identify(&tracker, &doc, twin), id);
        assert_eq!(tracker.stamp_count(), 2);

        assert!(tracker.claim(first, &id));
        assert!(!tracker.claim(twin, &id));
        assert_eq!(tracker.stamp_count(), 1);

        // The owner's own repeat keeps its entry.
        assert!(!tracker.claim(first, &id));
        assert_eq!(tracker.stamp_count(), 1);
        assert_eq!(identify(&tracker, &doc, first), id);

        doc.discard(twin).unwrap();
        assert!(!doc.view().exists(twin));
        assert_eq!(tracker.stamp_count(), 1);
        assert!(tracker.is_handled(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn watch_outlives_dropped_handle() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let id = identify(&tracker, &doc, modal);
        assert!(tracker.claim(modal, &id));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        drop(tracker.watch_for_removal(&doc, modal, id.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        tokio::time::sleep(Duration::from_millis(1)).await;

        doc.discard(modal).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!tracker.is_handled(&id));
        assert_eq!(tracker.stamp_count(), 0);
        assert!(!doc.view().exists(modal));
    }

    #[tokio::test(start_paused = true)]
    async fn removal_releases_id_exactly_once() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let id = identify(&tracker, &doc, modal);
        tracker.mark_handled(&id);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = tracker.watch_for_removal(&doc, modal, id.clone(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(tracker.is_handled(&id));

        doc.remove(modal).unwrap();
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!tracker.is_handled(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_watches() {
        let doc = Document::new();
        let tracker = ModalTracker::new();
        let modal = doc.append(doc.body(), reminder("Pay rent")).unwrap();
        let id = identify(&tracker, &doc, modal);
        tracker.mark_handled(&id);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let handle = tracker.watch_for_removal(&doc, modal, id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tracker.clear();
        handle.await.unwrap();
        doc.remove(modal).unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.handled_count(), 0);
    }
}
