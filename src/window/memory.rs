use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};
use serde::Serialize;

use super::WindowControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowFlags {
    pub minimized: bool,
    pub visible: bool,
    pub focused: bool,
    pub always_on_top: bool,
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self {
            minimized: false,
            visible: true,
            focused: true,
            always_on_top: false,
        }
    }
}

/// Mutating calls made against a [`MemoryWindow`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowCall {
    Restore,
    Show,
    SetAlwaysOnTop(bool),
    Focus,
}

#[derive(Debug, Default)]
struct MemoryWindowState {
    flags: WindowFlags,
    calls: Vec<WindowCall>,
    failing: bool,
}

/// Window that only lives in memory. Headless hosts use it to keep the
/// escalation logic running; it also records every mutating call.
#[derive(Debug, Default)]
pub struct MemoryWindow {
    state: Mutex<MemoryWindowState>,
}

impl MemoryWindow {
    pub fn new(flags: WindowFlags) -> Self {
        Self {
            state: Mutex::new(MemoryWindowState {
                flags,
                ..MemoryWindowState::default()
            }),
        }
    }

    pub fn flags(&self) -> WindowFlags {
        self.lock().flags
    }

    pub fn set_flags(&self, flags: WindowFlags) {
        self.lock().flags = flags;
    }

    pub fn calls(&self) -> Vec<WindowCall> {
        self.lock().calls.clone()
    }

    /// While set, every call errors as a broken native bridge would.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn read<T>(&self, f: impl FnOnce(&WindowFlags) -> T) -> Result<T> {
        let state = self.lock();
        if state.failing {
            bail!("native window bridge error");
        }
        Ok(f(&state.flags))
    }

    fn apply(&self, call: WindowCall) -> Result<()> {
        let mut state = self.lock();
        if state.failing {
            bail!("native window bridge error");
        }
        match call {
            WindowCall::Restore => state.flags.minimized = false,
            WindowCall::Show => state.flags.visible = true,
            WindowCall::SetAlwaysOnTop(on_top) => state.flags.always_on_top = on_top,
            WindowCall::Focus => state.flags.focused = true,
        }
        state.calls.push(call);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryWindowState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WindowControl for MemoryWindow {
    fn is_minimized(&self) -> Result<bool> {
        self.read(|flags| flags.minimized)
    }

    fn restore(&self) -> Result<()> {
        self.apply(WindowCall::Restore)
    }

    fn is_visible(&self) -> Result<bool> {
        self.read(|flags| flags.visible)
    }

    fn show(&self) -> Result<()> {
        self.apply(WindowCall::Show)
    }

    fn is_focused(&self) -> Result<bool> {
        self.read(|flags| flags.focused)
    }

    fn is_always_on_top(&self) -> Result<bool> {
        self.read(|flags| flags.always_on_top)
    }

    fn set_always_on_top(&self, on_top: bool) -> Result<()> {
        self.apply(WindowCall::SetAlwaysOnTop(on_top))
    }

    fn focus(&self) -> Result<()> {
        self.apply(WindowCall::Focus)
    }
}
