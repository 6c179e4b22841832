use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use shared::EntityKind;

/// Notable things that happened during a tick, reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    EntityDestroyed { id: EntityId, kind: EntityKind },
    BuildingDestroyed { id: EntityId },
    TargetAcquired { turret: EntityId, target: EntityId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = GameEvent::TargetAcquired { turret: 4, target: 9 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"target_acquired","turret":4,"target":9}"#);

        let destroyed = GameEvent::EntityDestroyed { id: 2, kind: EntityKind::Zombie };
        let json = serde_json::to_string(&destroyed).unwrap();
        assert_eq!(json, r#"{"event":"entity_destroyed","id":2,"kind":"zombie"}"#);
    }
}
