use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioural kind of an entity, used by queries and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Programmer,
    Engineer,
    Tank,
    Zombie,
    MgTurret,
    Barricade,
}

impl EntityKind {
    /// Hostile entities are the ones turrets shoot at.
    pub fn is_hostile(&self) -> bool {
        matches!(self, EntityKind::Zombie)
    }

    pub fn is_player(&self) -> bool {
        matches!(
            self,
            EntityKind::Programmer | EntityKind::Engineer | EntityKind::Tank
        )
    }

    pub fn is_building(&self) -> bool {
        matches!(self, EntityKind::MgTurret | EntityKind::Barricade)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Programmer => "programmer",
            EntityKind::Engineer => "engineer",
            EntityKind::Tank => "tank",
            EntityKind::Zombie => "zombie",
            EntityKind::MgTurret => "mg_turret",
            EntityKind::Barricade => "barricade",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_categories() {
        assert!(EntityKind::Zombie.is_hostile());
        assert!(!EntityKind::Programmer.is_hostile());
        assert!(EntityKind::Tank.is_player());
        assert!(EntityKind::MgTurret.is_building());
        assert!(!EntityKind::Zombie.is_building());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::MgTurret).unwrap();
        assert_eq!(json, "\"mg_turret\"");
        let kind: EntityKind = serde_json::from_str("\"zombie\"").unwrap();
        assert_eq!(kind, EntityKind::Zombie);
    }
}
