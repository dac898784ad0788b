//! Event bus for progression notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use ascend_common::{AbilityId, CharacterId, StatId};

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    /// Character reached a new level
    LeveledUp {
        /// Character ID
        character: CharacterId,
        /// Level reached
        level: u32,
    },
    /// A base stat gained levels
    StatLeveledUp {
        /// Character ID
        character: CharacterId,
        /// Stat ID
        stat: StatId,
        /// Level reached
        level: u32,
    },
    /// Character went from 0 HP to above 0
    Revived {
        /// Character ID
        character: CharacterId,
        /// HP after revival
        hp: u32,
    },
    /// Character dropped to 0 HP
    Defeated {
        /// Character ID
        character: CharacterId,
    },
    /// Stat added to a character
    StatAdded {
        /// Character ID
        character: CharacterId,
        /// Stat ID
        stat: StatId,
    },
    /// Stat removed from a character
    StatRemoved {
        /// Character ID
        character: CharacterId,
        /// Stat ID
        stat: StatId,
    },
    /// Ability granted to a character
    AbilityGranted {
        /// Character ID
        character: CharacterId,
        /// Ability ID
        ability: AbilityId,
    },
    /// Ability revoked from a character
    AbilityRevoked {
        /// Character ID
        character: CharacterId,
        /// Ability ID
        ability: AbilityId,
    },
}

impl ProgressionEvent {
    /// Character the event is about.
    #[must_use]
    pub fn character(&self) -> CharacterId {
        match self {
            Self::LeveledUp { character, .. }
            | Self::StatLeveledUp { character, .. }
            | Self::Revived { character, .. }
            | Self::Defeated { character }
            | Self::StatAdded { character, .. }
            | Self::StatRemoved { character, .. }
            | Self::AbilityGranted { character, .. }
            | Self::AbilityRevoked { character, .. } => *character,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<ProgressionEvent>,
    /// Receiver for collecting events
    receiver: Receiver<ProgressionEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: ProgressionEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<ProgressionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new publisher handle.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            sender: self.sender.clone(),
        }
    }
}

/// Cloneable handle used by characters to publish events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: Sender<ProgressionEvent>,
}

impl EventPublisher {
    /// Publishes an event, dropping it if the bus is full or gone.
    pub fn publish(&self, event: ProgressionEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::debug!("Progression event dropped: bus full or closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let character = CharacterId::new();
        bus.publish(ProgressionEvent::Defeated { character });
        bus.publisher()
            .publish(ProgressionEvent::LeveledUp { character, level: 2 });

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.character() == character));
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let publisher = bus.publisher();
        let character = CharacterId::new();
        publisher.publish(ProgressionEvent::Defeated { character });
        publisher.publish(ProgressionEvent::Revived { character, hp: 1 });

        let events = bus.drain();
        assert_eq!(events, vec![ProgressionEvent::Defeated { character }]);
    }
}
