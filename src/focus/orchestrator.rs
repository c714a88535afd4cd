use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::time::{sleep, Instant};

use super::element::{focus_within, FocusResult};
use super::state::{FocusPhase, FocusSnapshot, FocusState};
use crate::dom::{Document, NodeId};
use crate::i18n::{SharedTranslator, TranslationKey};
use crate::settings::SettingsStore;
use crate::window::WindowControl;
use crate::{log_debug, log_error};

/// How long the window stays pinned on top before it is unpinned.
pub const PIN_SETTLE: Duration = Duration::from_millis(200);
pub const REFOCUS_SETTLE: Duration = Duration::from_millis(100);
/// Stand-in for escalation when the window cannot be driven natively.
pub const DEGRADED_SETTLE: Duration = Duration::from_millis(50);
/// Gap between window escalation and element focus.
pub const POST_ESCALATION_SETTLE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Escalation {
    AlreadyActive,
    Pinned,
    Refocused,
    Degraded,
    /// A native call errored part way; the run carries on regardless
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RunOutcome {
    Disabled,
    CoolingDown { remaining_ms: u64 },
    Focused { escalation: Escalation, attempts: u32 },
    FocusAbandoned { escalation: Escalation, attempts: u32 },
    Failed { error: String },
}

/// Brings the host window forward and moves keyboard focus into a dialog.
///
/// At most one run per focus interval gets past the cooldown check, which
/// happens (and stamps the time) before the first suspension point.
#[derive(Clone)]
pub struct FocusOrchestrator {
    document: Document,
    window: Arc<dyn WindowControl>,
    settings: Arc<SettingsStore>,
    translator: SharedTranslator,
    state: Arc<Mutex<FocusState>>,
}

impl FocusOrchestrator {
    pub fn new(
        document: Document,
        window: Arc<dyn WindowControl>,
        settings: Arc<SettingsStore>,
        translator: SharedTranslator,
    ) -> Self {
        Self {
            document,
            window,
            settings,
            translator,
            state: Arc::new(Mutex::new(FocusState::new())),
        }
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        self.lock().snapshot()
    }

    /// Forgets the cooldown stamp and counters.
    pub fn reset(&self) {
        self.lock().reset();
    }

    pub async fn trigger(&self, node: NodeId, id: &str) -> RunOutcome {
        {
            let mut state = self.lock();
            state.phase = FocusPhase::CooldownCheck;
            state.stats.runs += 1;

            if !self.settings.enabled() {
                state.stats.disabled_skips += 1;
                state.phase = FocusPhase::Idle;
                return RunOutcome::Disabled;
            }

            if let Err(remaining) = state.try_begin(Instant::now(), self.settings.focus_interval())
            {
                state.stats.cooldown_skips += 1;
                state.phase = FocusPhase::Idle;
                log_debug!(
                    "{} (modal {id}, {}ms left)",
                    self.translator.t(TranslationKey::FocusCooldown),
                    remaining.as_millis()
                );
                return RunOutcome::CoolingDown {
                    remaining_ms: remaining.as_millis() as u64,
                };
            }
        }

        log_debug!(
            "{} (modal {id})",
            self.translator.t(TranslationKey::ReminderDetected)
        );

        let outcome = match self.run(node).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log_error!("Focus run for modal {id} failed: {err:#}");
                self.lock().stats.failures += 1;
                RunOutcome::Failed {
                    error: format!("{err:#}"),
                }
            }
        };
        self.lock().phase = FocusPhase::Idle;
        outcome
    }

    async fn run(&self, node: NodeId) -> Result<RunOutcome> {
        self.set_phase(FocusPhase::WindowEscalation);
        let escalation = self.escalate_window().await;
        {
            let mut state = self.lock();
            state.stats.escalations += 1;
            if escalation == Escalation::Degraded {
                state.stats.degraded_escalations += 1;
            }
        }

        sleep(POST_ESCALATION_SETTLE).await;

        self.set_phase(FocusPhase::ElementFocus);
        let outcome = match focus_within(&self.document, node).await? {
            FocusResult::Focused { attempts, .. } => {
                self.lock().stats.focus_successes += 1;
                RunOutcome::Focused {
                    escalation,
                    attempts,
                }
            }
            FocusResult::Abandoned { target, attempts } => {
                log_debug!(
                    "giving up on focusing {} after {attempts} attempts",
                    target.node()
                );
                self.lock().stats.focus_abandoned += 1;
                RunOutcome::FocusAbandoned {
                    escalation,
                    attempts,
                }
            }
        };
        Ok(outcome)
    }

    /// Best effort. Native errors are logged and swallowed.
    async fn escalate_window(&self) -> Escalation {
        if !self.window.is_available() {
            log_debug!("Native window control unavailable, skipping window escalation");
            sleep(DEGRADED_SETTLE).await;
            return Escalation::Degraded;
        }

        match self.activate_window().await {
            Ok(escalation) => escalation,
            Err(err) => {
                log_debug!("Window escalation failed, continuing: {err:#}");
                Escalation::Failed
            }
        }
    }

    async fn activate_window(&self) -> Result<Escalation> {
        let window = &self.window;
        let mut needs_activation = false;

        if window.is_minimized()? {
            window.restore()?;
            log_debug!("Window restored from minimized state");
            needs_activation = true;
        }
        if !window.is_visible()? {
            window.show()?;
            needs_activation = true;
        }
        if !window.is_focused()? {
            needs_activation = true;
        }

        if !needs_activation {
            log_debug!("{}", self.translator.t(TranslationKey::FocusSkipped));
            return Ok(Escalation::AlreadyActive);
        }

        if window.is_always_on_top()? {
            window.focus()?;
            sleep(REFOCUS_SETTLE).await;
            return Ok(Escalation::Refocused);
        }

        window.set_always_on_top(true)?;
        sleep(PIN_SETTLE).await;
        // Unpin even if focusing fails, and focus even if unpinning fails.
        let unpinned = window.set_always_on_top(false);
        let focused = window.focus();
        unpinned?;
        focused?;
        Ok(Escalation::Pinned)
    }

    fn set_phase(&self, phase: FocusPhase) {
        self.lock().phase = phase;
    }

    fn lock(&self) -> MutexGuard<'_, FocusState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
