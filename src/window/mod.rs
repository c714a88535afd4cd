//! Native control over the host's top-level window.
//!
//! Whether the host exposes this at all depends on how it was launched, so it
//! is modelled as a capability: hosts hand in an implementation when they have
//! one and [`resolve`] substitutes [`UnavailableWindow`] when they do not.

pub mod memory;

pub use memory::{MemoryWindow, WindowCall, WindowFlags};

use std::sync::Arc;

use anyhow::{bail, Result};

pub trait WindowControl: Send + Sync {
    /// `false` only for the stand-in used when the host has no native window.
    fn is_available(&self) -> bool {
        true
    }

    fn is_minimized(&self) -> Result<bool>;
    fn restore(&self) -> Result<()>;
    fn is_visible(&self) -> Result<bool>;
    fn show(&self) -> Result<()>;
    fn is_focused(&self) -> Result<bool>;
    fn is_always_on_top(&self) -> Result<bool>;
    fn set_always_on_top(&self, on_top: bool) -> Result<()>;
    fn focus(&self) -> Result<()>;
}

/// Stand-in for hosts without native window control. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableWindow;

impl WindowControl for UnavailableWindow {
    fn is_available(&self) -> bool {
        false
    }

    fn is_minimized(&self) -> Result<bool> {
        bail!("native window control unavailable")
    }

    fn restore(&self) -> Result<()> {
        bail!("native window control unavailable")
    }

    fn is_visible(&self) -> Result<bool> {
        bail!("native window control unavailable")
    }

    fn show(&self) -> Result<()> {
        bail!("native window control unavailable")
    }

    fn is_focused(&self) -> Result<bool> {
        bail!("native window control unavailable")
    }

    fn is_always_on_top(&self) -> Result<bool> {
        bail!("native window control unavailable")
    }

    fn set_always_on_top(&self, _on_top: bool) -> Result<()> {
        bail!("native window control unavailable")
    }

    fn focus(&self) -> Result<()> {
        bail!("native window control unavailable")
    }
}

/// Resolves the host-supplied capability, falling back to [`UnavailableWindow`].
pub fn resolve(window: Option<Arc<dyn WindowControl>>) -> Arc<dyn WindowControl> {
    match window {
        Some(window) if window.is_available() => window,
        Some(_) | None => {
            log::info!("Native window control not available; focus runs will skip escalation");
            Arc::new(UnavailableWindow)
        }
    }
}
