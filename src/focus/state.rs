use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Where a focus run currently is. Only one run is ever past `CooldownCheck`
/// within a focus interval.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FocusPhase {
    #[default]
    Idle,
    CooldownCheck,
    WindowEscalation,
    ElementFocus,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    pub runs: u64,
    pub disabled_skips: u64,
    pub cooldown_skips: u64,
    pub escalations: u64,
    /// Escalations that only waited because the window could not be driven
    pub degraded_escalations: u64,
    pub focus_successes: u64,
    pub focus_abandoned: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub phase: FocusPhase,
    pub last_focus_at: Option<DateTime<Utc>>,
    pub stats: FocusStats,
}

#[derive(Debug, Clone, Default)]
pub struct FocusState {
    pub phase: FocusPhase,
    pub last_focus_at: Option<DateTime<Utc>>,
    pub stats: FocusStats,
    /// Monotonic twin of `last_focus_at`; the cooldown is measured on this one.
    last_focus: Option<Instant>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the cooldown and, when it has elapsed, stamps `now` as the last
    /// focus time in the same step. Returns the time left otherwise.
    pub fn try_begin(&mut self, now: Instant, interval: Duration) -> Result<(), Duration> {
        if let Some(last) = self.last_focus {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < interval {
                return Err(interval - elapsed);
            }
        }
        self.last_focus = Some(now);
        self.last_focus_at = Some(Utc::now());
        Ok(())
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            phase: self.phase,
            last_focus_at: self.last_focus_at,
            stats: self.stats,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
