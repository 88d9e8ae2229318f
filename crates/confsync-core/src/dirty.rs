//! Per-panel dirty tracking
//!
//! Each panel is a two-state machine:
//!
//! ```text
//!            PatchApplied
//!   CLEAN ────────────────► DIRTY ─┐ PatchApplied
//!     ▲                       │  ◄─┘
//!     └───────────────────────┘
//!        Committed (same panel)
//! ```
//!
//! Events are recorded only for operations that succeeded remotely. A commit
//! clears only the panel it is attributed to, even though the backend
//! persists the whole document.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::PanelId;

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Dirty state of one panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelState {
    /// No applied changes awaiting this panel's save
    #[default]
    Clean,
    /// Applied changes not yet acknowledged by this panel's save
    Dirty,
}

/// Successful remote operation attributed to a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelEvent {
    /// `apply_patch` succeeded
    PatchApplied,
    /// `commit` succeeded
    Committed,
}

/// Next state after `event`
#[inline]
#[must_use]
pub fn next_state(_from: PanelState, event: PanelEvent) -> PanelState {
    match event {
        PanelEvent::PatchApplied => PanelState::Dirty,
        PanelEvent::Committed => PanelState::Clean,
    }
}

/// Notification sent when a panel changes state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirtyChange {
    /// Panel that changed
    pub panel: PanelId,
    /// New dirty flag
    pub dirty: bool,
}

/// Dirty flags for every panel seen so far
#[derive(Debug)]
pub struct DirtyTracker {
    panels: DashMap<PanelId, PanelState>,
    changes: broadcast::Sender<DirtyChange>,
}

impl DirtyTracker {
    /// Create tracker with every panel clean
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            panels: DashMap::new(),
            changes,
        }
    }

    /// Apply `event` to `panel`, returning the new state
    pub fn record(&self, panel: &PanelId, event: PanelEvent) -> PanelState {
        let (before, after) = {
            let mut entry = self.panels.entry(panel.clone()).or_default();
            let before = *entry;
            let after = next_state(before, event);
            *entry = after;
            (before, after)
        };

        if before != after {
            tracing::debug!(panel = %panel, ?before, ?after, "panel state changed");
            // No subscribers is fine
            let _ = self.changes.send(DirtyChange {
                panel: panel.clone(),
                dirty: after == PanelState::Dirty,
            });
        }
        after
    }

    /// Record a successful apply from `panel`
    #[inline]
    pub fn mark_applied(&self, panel: &PanelId) {
        self.record(panel, PanelEvent::PatchApplied);
    }

    /// Record a successful save from `panel`
    #[inline]
    pub fn mark_committed(&self, panel: &PanelId) {
        self.record(panel, PanelEvent::Committed);
    }

    /// Current state of `panel` (unknown panels are clean)
    #[must_use]
    pub fn state(&self, panel: &PanelId) -> PanelState {
        self.panels.get(panel).map(|s| *s).unwrap_or_default()
    }

    /// Whether `panel` has unsaved changes
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, panel: &PanelId) -> bool {
        self.state(panel) == PanelState::Dirty
    }

    /// All dirty panels, sorted
    #[must_use]
    pub fn dirty_panels(&self) -> Vec<PanelId> {
        let mut dirty: Vec<PanelId> = self
            .panels
            .iter()
            .filter(|entry| *entry.value() == PanelState::Dirty)
            .map(|entry| entry.key().clone())
            .collect();
        dirty.sort();
        dirty
    }

    /// Whether any panel is dirty
    #[must_use]
    pub fn any_dirty(&self) -> bool {
        self.panels.iter().any(|entry| *entry.value() == PanelState::Dirty)
    }

    /// Subscribe to state changes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DirtyChange> {
        self.changes.subscribe()
    }
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}
