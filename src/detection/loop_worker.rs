use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{sleep_until, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dom::{Document, MutationRecord, NodeId};
use crate::{log_debug, log_warn};

use super::HostEvent;

/// Delay between a window-open event and the scan it schedules.
pub const WINDOW_OPEN_RESCAN_DELAY: Duration = Duration::from_millis(100);

/// Receives every node the loop wants classified.
pub type CandidateSink = Box<dyn FnMut(NodeId) + Send>;

pub struct LoopConfig {
    pub container_class: String,
    pub interval: Duration,
}

pub async fn detection_loop(
    document: Document,
    mut mutations: broadcast::Receiver<MutationRecord>,
    mut host_events: broadcast::Receiver<HostEvent>,
    config: LoopConfig,
    mut on_candidate: CandidateSink,
    cancel_token: CancellationToken,
) {
    // First tick completes immediately, so the poll also runs at start.
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut mutations_open = true;
    let mut host_open = true;
    let mut rescan_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_debug!("detection loop shutting down");
                break;
            }
            received = mutations.recv(), if mutations_open => match received {
                Ok(record) => {
                    for node in added_candidates(&document, &record, &config.container_class) {
                        on_candidate(node);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    log_warn!("missed {missed} mutation records; the next poll covers them");
                }
                Err(RecvError::Closed) => mutations_open = false,
            },
            _ = ticker.tick() => {
                scan(&document, &config.container_class, &mut on_candidate);
            }
            received = host_events.recv(), if host_open => match received {
                Ok(HostEvent::WindowOpened) => {
                    if rescan_at.is_none() {
                        rescan_at = Some(Instant::now() + WINDOW_OPEN_RESCAN_DELAY);
                    }
                }
                Err(RecvError::Lagged(_)) => {
                    // Whatever was missed, at least one window opened.
                    rescan_at.get_or_insert_with(|| Instant::now() + WINDOW_OPEN_RESCAN_DELAY);
                }
                Err(RecvError::Closed) => host_open = false,
            },
            _ = sleep_until(rescan_at.unwrap_or_else(Instant::now)), if rescan_at.is_some() => {
                rescan_at = None;
                log_debug!("scanning after window open");
                scan(&document, &config.container_class, &mut on_candidate);
            }
        }
    }
}

/// Every attached dialog wrapper, in document order.
pub fn scan(document: &Document, container_class: &str, on_candidate: &mut CandidateSink) {
    let nodes = {
        let view = document.view();
        view.elements_with_class(view.root(), container_class)
    };
    for node in nodes {
        on_candidate(node);
    }
}

/// Inserted element roots that are still attached, each followed by any
/// dialog wrappers nested inside it.
fn added_candidates(
    document: &Document,
    record: &MutationRecord,
    container_class: &str,
) -> Vec<NodeId> {
    let view = document.view();
    let mut nodes = Vec::new();
    for &added in &record.added {
        if !view.is_element(added) || !view.is_attached(added) {
            continue;
        }
        nodes.push(added);
        nodes.extend(view.elements_with_class(added, container_class));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{element, ElementSpec};
    use std::sync::{Arc, Mutex};

    fn wrapper(title: &str) -> ElementSpec {
        element("div")
            .class("modal-container")
            .child(element("h2").text(title))
    }

    struct Harness {
        doc: Document,
        seen: Arc<Mutex<Vec<NodeId>>>,
        host_tx: broadcast::Sender<HostEvent>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(doc: Document, interval: Duration) -> Harness {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (host_tx, host_rx) = broadcast::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(detection_loop(
            doc.clone(),
            doc.subscribe(),
            host_rx,
            LoopConfig {
                container_class: "modal-container".to_string(),
                interval,
            },
            Box::new(move |node| sink.lock().unwrap().push(node)),
            cancel.clone(),
        ));
        Harness {
            doc,
            seen,
            host_tx,
            cancel,
            handle,
        }
    }

    impl Harness {
        fn take(&self) -> Vec<NodeId> {
            std::mem::take(&mut *self.seen.lock().unwrap())
        }

        async fn stop(self) {
            self.cancel.cancel();
            self.handle.await.unwrap();
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_runs_immediately() {
        let doc = Document::new();
        let existing = doc.append(doc.body(), wrapper("a")).unwrap();
        let harness = start(doc, Duration::from_secs(10));

        settle().await;
        assert_eq!(harness.take(), vec![existing]);
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn nested_wrapper_is_found_in_inserted_subtree() {
        let doc = Document::new();
        let harness = start(doc.clone(), Duration::from_secs(10));
        settle().await;
        harness.take();

        let pane = doc
            .append(doc.body(), element("section").child(wrapper("nested")))
            .unwrap();
        settle().await;

        let seen = harness.take();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], pane);
        assert!(doc.view().has_class(seen[1], "modal-container"));
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn poll_repeats_on_interval() {
        let doc = Document::new();
        let existing = doc.append(doc.body(), wrapper("a")).unwrap();
        let harness = start(doc, Duration::from_millis(500));
        settle().await;
        harness.take();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(harness.take(), vec![existing]);
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn window_open_events_coalesce_into_one_scan() {
        let doc = Document::new();
        let existing = doc.append(doc.body(), wrapper("a")).unwrap();
        let harness = start(doc, Duration::from_secs(10));
        settle().await;
        harness.take();

        harness.host_tx.send(HostEvent::WindowOpened).unwrap();
        harness.host_tx.send(HostEvent::WindowOpened).unwrap();
        settle().await;
        assert!(harness.take().is_empty());

        tokio::time::sleep(WINDOW_OPEN_RESCAN_DELAY).await;
        assert_eq!(harness.take(), vec![existing]);

        tokio::time::sleep(WINDOW_OPEN_RESCAN_DELAY * 2).await;
        assert!(harness.take().is_empty());
        harness.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn text_insertions_are_ignored() {
        let doc = Document::new();
        let harness = start(doc.clone(), Duration::from_secs(10));
        settle().await;

        doc.append(doc.body(), crate::dom::text("hello")).unwrap();
        settle().await;
        assert!(harness.take().is_empty());
        harness.stop().await;
    }
}
