use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::SlotKind;
use crate::user::UserId;

/// Every state change the engine makes produces an EngineEvent.
/// Notification dispatchers and analytics subscribe through an [`EventSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A slot's release instant passed for a user within their plan.
    SlotAvailable {
        event_id: Uuid,
        user_id: UserId,
        week: u32,
        slot: SlotKind,
        released_at: DateTime<Utc>,
    },
    AnswerEvaluated {
        event_id: Uuid,
        user_id: UserId,
        week: u32,
        slot: SlotKind,
        correct: bool,
        attempts: u32,
        at: DateTime<Utc>,
    },
    /// First correct answer for the slot. Emitted exactly once per (user, slot).
    SlotCompleted {
        event_id: Uuid,
        user_id: UserId,
        week: u32,
        slot: SlotKind,
        points_awarded: u32,
        new_streak: u32,
        at: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn slot_available(user_id: UserId, week: u32, slot: SlotKind, released_at: DateTime<Utc>) -> Self {
        EngineEvent::SlotAvailable {
            event_id: Uuid::new_v4(),
            user_id,
            week,
            slot,
            released_at,
        }
    }

    pub fn answer_evaluated(
        user_id: UserId,
        week: u32,
        slot: SlotKind,
        correct: bool,
        attempts: u32,
        at: DateTime<Utc>,
    ) -> Self {
        EngineEvent::AnswerEvaluated {
            event_id: Uuid::new_v4(),
            user_id,
            week,
            slot,
            correct,
            attempts,
            at,
        }
    }

    pub fn slot_completed(
        user_id: UserId,
        week: u32,
        slot: SlotKind,
        points_awarded: u32,
        new_streak: u32,
        at: DateTime<Utc>,
    ) -> Self {
        EngineEvent::SlotCompleted {
            event_id: Uuid::new_v4(),
            user_id,
            week,
            slot,
            points_awarded,
            new_streak,
            at,
        }
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            EngineEvent::SlotAvailable { event_id, .. }
            | EngineEvent::AnswerEvaluated { event_id, .. }
            | EngineEvent::SlotCompleted { event_id, .. } => *event_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            EngineEvent::SlotAvailable { user_id, .. }
            | EngineEvent::AnswerEvaluated { user_id, .. }
            | EngineEvent::SlotCompleted { user_id, .. } => *user_id,
        }
    }
}

/// Receives engine events. Must not block; delivery is best effort.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: EngineEvent) {}
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Remove and return everything published so far.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = EngineEvent::slot_available(UserId(3), 2, SlotKind::Midweek, Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SlotAvailable");
        assert_eq!(json["slot"], "midweek");
        assert_eq!(json["user_id"], 3);

        let back: EngineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_ids_are_unique() {
        let now = Utc::now();
        let a = EngineEvent::answer_evaluated(UserId(1), 1, SlotKind::Opener, false, 1, now);
        let b = EngineEvent::answer_evaluated(UserId(1), 1, SlotKind::Opener, false, 1, now);
        assert_ne!(a.event_id(), b.event_id());
    }

    #[test]
    fn memory_sink_drains() {
        let sink = MemorySink::new();
        sink.publish(EngineEvent::slot_completed(UserId(1), 1, SlotKind::Closer, 20, 1, Utc::now()));
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.events().is_empty());
    }
}
