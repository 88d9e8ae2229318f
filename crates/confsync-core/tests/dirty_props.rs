//! Property tests for the panel dirty-state machine

use confsync_core::{next_state, DirtyTracker, PanelEvent, PanelId, PanelState};
use proptest::prelude::*;

const PANELS: [&str; 3] = ["platforms", "wechat", "api"];

fn event() -> impl Strategy<Value = PanelEvent> {
    prop_oneof![Just(PanelEvent::PatchApplied), Just(PanelEvent::Committed)]
}

fn state() -> impl Strategy<Value = PanelState> {
    prop_oneof![Just(PanelState::Clean), Just(PanelState::Dirty)]
}

#[test]
fn transition_table() {
    use PanelEvent::{Committed, PatchApplied};
    use PanelState::{Clean, Dirty};

    assert_eq!(next_state(Clean, PatchApplied), Dirty);
    assert_eq!(next_state(Dirty, PatchApplied), Dirty);
    assert_eq!(next_state(Dirty, Committed), Clean);
    assert_eq!(next_state(Clean, Committed), Clean);
}

proptest! {
    #[test]
    fn prop_next_state_depends_only_on_event(from in state(), ev in event()) {
        let expected = match ev {
            PanelEvent::PatchApplied => PanelState::Dirty,
            PanelEvent::Committed => PanelState::Clean,
        };
        prop_assert_eq!(next_state(from, ev), expected);
    }

    #[test]
    fn prop_dirty_iff_last_event_was_apply(
        events in prop::collection::vec((0..PANELS.len(), event()), 0..40)
    ) {
        let tracker = DirtyTracker::new();
        for (panel, ev) in &events {
            tracker.record(&PanelId::new(PANELS[*panel]), *ev);
        }

        for (index, name) in PANELS.iter().enumerate() {
            let last = events.iter().rev().find(|(panel, _)| *panel == index).map(|(_, ev)| *ev);
            let expected = last == Some(PanelEvent::PatchApplied);
            prop_assert_eq!(tracker.is_dirty(&PanelId::new(*name)), expected);
        }
    }

    #[test]
    fn prop_dirty_panels_matches_is_dirty(
        events in prop::collection::vec((0..PANELS.len(), event()), 0..40)
    ) {
        let tracker = DirtyTracker::new();
        for (panel, ev) in &events {
            tracker.record(&PanelId::new(PANELS[*panel]), *ev);
        }

        let listed = tracker.dirty_panels();
        for name in PANELS {
            let id = PanelId::new(name);
            prop_assert_eq!(listed.contains(&id), tracker.is_dirty(&id));
        }
        prop_assert_eq!(tracker.any_dirty(), !listed.is_empty());
    }
}
