use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::dom::{Document, NodeId};

use super::loop_worker::{detection_loop, LoopConfig};
use super::HostEvent;

/// Owns the detection loop task. Restarting with a new interval is a
/// `stop` followed by a `start`.
pub struct DetectionObserver {
    document: Document,
    host_events: broadcast::Sender<HostEvent>,
    container_class: String,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DetectionObserver {
    pub fn new(
        document: Document,
        host_events: broadcast::Sender<HostEvent>,
        container_class: impl Into<String>,
    ) -> Self {
        Self {
            document,
            host_events,
            container_class: container_class.into(),
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<F>(&mut self, interval: Duration, on_candidate: F) -> Result<()>
    where
        F: FnMut(NodeId) + Send + 'static,
    {
        if self.handle.is_some() {
            bail!("detection already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(detection_loop(
            self.document.clone(),
            self.document.subscribe(),
            self.host_events.subscribe(),
            LoopConfig {
                container_class: self.container_class.clone(),
                interval,
            },
            Box::new(on_candidate),
            cancel_token.clone(),
        ));

        info!("Detection started (poll every {}ms)", interval.as_millis());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection loop task failed to join")?;
            info!("Detection stopped");
        }
        Ok(())
    }
}
