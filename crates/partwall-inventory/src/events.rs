#![forbid(unsafe_code)]

//! Change notifications and client-side echo suppression.
//!
//! Every committed mutation is published once to every live subscriber with
//! a strictly increasing sequence number. Subscribers whose receiver has been
//! dropped are pruned on the next publish.
//!
//! [`EchoFilter`] is the client half: a session that just mutated something
//! ignores events it originated itself for a short window, so the echo of
//! its own write does not clobber optimistic local state.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use partwall_grid::Region;
use serde::{Deserialize, Serialize};

use crate::ids::{CaseId, DrawerId, SessionId, WallId};

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum InventoryChange {
    WallCreated {
        wall: WallId,
        columns: u16,
    },
    WallRemoved {
        wall: WallId,
    },
    CasePlaced {
        wall: WallId,
        case: CaseId,
        region: Region,
    },
    CaseMoved {
        case: CaseId,
        region: Region,
    },
    CaseResized {
        case: CaseId,
        region: Region,
    },
    CaseRemoved {
        wall: WallId,
        case: CaseId,
        drawers: usize,
    },
    CaseGridResized {
        case: CaseId,
        columns: u16,
        rows: u16,
    },
    DrawerPlaced {
        case: CaseId,
        drawer: DrawerId,
        region: Region,
    },
    DrawerMoved {
        drawer: DrawerId,
        region: Region,
    },
    DrawerResized {
        drawer: DrawerId,
        region: Region,
    },
    DrawerRemoved {
        case: CaseId,
        drawer: DrawerId,
    },
    TemplateApplied {
        wall: WallId,
        case: CaseId,
        template: String,
        drawers: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub sequence: u64,
    pub origin: SessionId,
    pub change: InventoryChange,
}

/// Fan-out of committed changes to subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<InventoryEvent>>,
    sequence: u64,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<InventoryEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of live subscribers as of the last publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Sequence number of the last published event (0 before any).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn publish(&mut self, origin: SessionId, change: InventoryChange) -> u64 {
        self.sequence += 1;
        let event = InventoryEvent {
            sequence: self.sequence,
            origin,
            change,
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.sequence
    }
}

/// Ignore echoes of this session's own mutations for `window` after each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoFilter {
    session: SessionId,
    window: Duration,
    last_local: Option<Instant>,
}

impl EchoFilter {
    #[must_use]
    pub const fn new(session: SessionId, window: Duration) -> Self {
        Self {
            session,
            window,
            last_local: None,
        }
    }

    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Note that this session just issued a mutation.
    pub fn record_local_mutation(&mut self, now: Instant) {
        self.last_local = Some(now);
    }

    /// Whether `event` should be applied to local state at `now`.
    #[must_use]
    pub fn should_apply(&self, event: &InventoryEvent, now: Instant) -> bool {
        if event.origin != self.session {
            return true;
        }
        match self.last_local {
            Some(at) => now.saturating_duration_since(at) >= self.window,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(raw: u64) -> WallId {
        WallId::new(raw).unwrap()
    }

    fn event(origin: u64) -> InventoryEvent {
        InventoryEvent {
            sequence: 1,
            origin: SessionId(origin),
            change: InventoryChange::WallRemoved { wall: wall(1) },
        }
    }

    #[test]
    fn publish_reaches_every_subscriber_in_order() {
        let mut bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        bus.publish(SessionId(1), InventoryChange::WallCreated { wall: wall(1), columns: 4 });
        bus.publish(SessionId(2), InventoryChange::WallRemoved { wall: wall(1) });

        for rx in [first, second] {
            let events: Vec<_> = rx.try_iter().collect();
            assert_eq!(events.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2]);
            assert_eq!(events[1].origin, SessionId(2));
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        bus.publish(SessionId::SYSTEM, InventoryChange::WallRemoved { wall: wall(2) });
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_iter().count(), 1);
    }

    #[test]
    fn echo_filter_drops_own_events_inside_window() {
        let start = Instant::now();
        let mut filter = EchoFilter::new(SessionId(7), Duration::from_millis(500));
        assert!(filter.should_apply(&event(7), start));

        filter.record_local_mutation(start);
        assert!(!filter.should_apply(&event(7), start + Duration::from_millis(100)));
        assert!(filter.should_apply(&event(8), start + Duration::from_millis(100)));
        assert!(filter.should_apply(&event(7), start + Duration::from_millis(500)));
    }

    #[test]
    fn change_serializes_with_tag() {
        let json = serde_json::to_value(InventoryChange::DrawerRemoved {
            case: CaseId::new(3).unwrap(),
            drawer: DrawerId::new(9).unwrap(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"change": "drawer_removed", "case": 3, "drawer": 9})
        );
    }
}
