//! Game data configuration
//!
//! Configuration is read once at startup from a JSON document. Every field has
//! a default so a partial file (or no file at all) yields a playable setup.
//! After validation the configuration is turned into an [`EntityTypeTable`],
//! an immutable lookup that is shared by reference with every consumer.

use crate::kind::EntityKind;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating game data.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'scale_factor' must be a non-zero finite number, got {0}")]
    InvalidScale(f32),

    #[error("unknown entity type name '{0}'")]
    UnknownEntityType(String),

    #[error("entity type '{name}' is a {kind}, which is not valid in the {section} section")]
    MisplacedEntityType {
        name: String,
        kind: EntityKind,
        section: &'static str,
    },
}

/// Map settings: grid scale and AI key points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Grid cells per world unit.
    pub scale_factor: f32,
    pub player_spawns: Vec<Vec2>,
    pub enemy_spawns: Vec<Vec2>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            player_spawns: vec![Vec2::new(1.5, 1.5)],
            enemy_spawns: Vec::new(),
        }
    }
}

/// Settings for a moving entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub building_power: u8,
    pub combat_power: u8,
    #[serde(rename = "tot_hp")]
    pub total_hp: u16,
    pub speed: f32,
}

/// Settings for a building type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    #[serde(rename = "tot_hp")]
    pub total_hp: u16,
    #[serde(rename = "building_power_req")]
    pub build_power_required: u16,
}

/// Machine-gun turret tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurretConfig {
    /// Maximum distance, in world units, at which targets are acquired and engaged
    pub max_distance: f32,
    pub acquire_interval_ms: u64,
    pub fire_interval_ms: u64,
    /// Grace period before a target out of range or sight is forgotten
    pub lost_target_ms: u64,
    pub attack_power: f32,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            max_distance: 3.0,
            acquire_interval_ms: 500,
            fire_interval_ms: 250,
            lost_target_ms: 500,
            attack_power: 0.2,
        }
    }
}

impl TurretConfig {
    pub fn acquire_interval(&self) -> Duration {
        Duration::from_millis(self.acquire_interval_ms)
    }

    pub fn fire_interval(&self) -> Duration {
        Duration::from_millis(self.fire_interval_ms)
    }

    pub fn lost_target(&self) -> Duration {
        Duration::from_millis(self.lost_target_ms)
    }
}

/// Top-level game data document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub map: MapConfig,
    /// Human-readable type names and the kind they designate
    pub type_names: BTreeMap<String, EntityKind>,
    pub entities: BTreeMap<String, EntityData>,
    pub buildings: BTreeMap<String, BuildingData>,
    pub turret: TurretConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        let type_names = [
            ("programmer", EntityKind::Programmer),
            ("engineer", EntityKind::Engineer),
            ("grunt", EntityKind::Tank),
            ("zombie", EntityKind::Zombie),
            ("mg_turret", EntityKind::MgTurret),
            ("barricade", EntityKind::Barricade),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_string(), kind))
        .collect();

        let entities = [
            ("programmer", EntityData { building_power: 2, combat_power: 1, total_hp: 100, speed: 3.0 }),
            ("engineer", EntityData { building_power: 5, combat_power: 1, total_hp: 100, speed: 2.5 }),
            ("grunt", EntityData { building_power: 1, combat_power: 5, total_hp: 150, speed: 2.0 }),
            ("zombie", EntityData { building_power: 0, combat_power: 2, total_hp: 1, speed: 1.5 }),
        ]
        .into_iter()
        .map(|(name, data)| (name.to_string(), data))
        .collect();

        let buildings = [
            ("mg_turret", BuildingData { total_hp: 200, build_power_required: 100 }),
            ("barricade", BuildingData { total_hp: 500, build_power_required: 50 }),
        ]
        .into_iter()
        .map(|(name, data)| (name.to_string(), data))
        .collect();

        Self {
            map: MapConfig::default(),
            type_names,
            entities,
            buildings,
            turret: TurretConfig::default(),
        }
    }
}

impl GameConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let config: GameConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a zero scale and data sections naming unknown or misplaced types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.map.scale_factor;
        if scale == 0.0 || !scale.is_finite() {
            return Err(ConfigError::InvalidScale(scale));
        }

        for name in self.entities.keys() {
            let kind = self.resolve(name)?;
            if kind.is_building() {
                return Err(ConfigError::MisplacedEntityType {
                    name: name.clone(),
                    kind,
                    section: "entities",
                });
            }
        }
        for name in self.buildings.keys() {
            let kind = self.resolve(name)?;
            if !kind.is_building() {
                return Err(ConfigError::MisplacedEntityType {
                    name: name.clone(),
                    kind,
                    section: "buildings",
                });
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<EntityKind, ConfigError> {
        self.type_names
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownEntityType(name.to_string()))
    }
}

/// Immutable lookup from type names and kinds to their game data.
///
/// Built once during startup and shared (usually behind an `Arc`) with every
/// component that needs entity settings.
#[derive(Debug, Clone)]
pub struct EntityTypeTable {
    names: BTreeMap<String, EntityKind>,
    entities: BTreeMap<EntityKind, EntityData>,
    buildings: BTreeMap<EntityKind, BuildingData>,
    turret: TurretConfig,
}

impl EntityTypeTable {
    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut entities = BTreeMap::new();
        for (name, data) in &config.entities {
            entities.insert(config.resolve(name)?, *data);
        }
        let mut buildings = BTreeMap::new();
        for (name, data) in &config.buildings {
            buildings.insert(config.resolve(name)?, *data);
        }

        Ok(Self {
            names: config.type_names.clone(),
            entities,
            buildings,
            turret: config.turret,
        })
    }

    /// Resolves a human-readable type name.
    pub fn kind(&self, name: &str) -> Option<EntityKind> {
        self.names.get(name).copied()
    }

    pub fn entity_data(&self, kind: EntityKind) -> Option<&EntityData> {
        self.entities.get(&kind)
    }

    pub fn building_data(&self, kind: EntityKind) -> Option<&BuildingData> {
        self.buildings.get(&kind)
    }

    pub fn turret(&self) -> &TurretConfig {
        &self.turret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "map": { "scale_factor": 2.0 } }"#).unwrap();
        assert_eq!(config.map.scale_factor, 2.0);
        assert_eq!(config.turret, TurretConfig::default());
        assert!(config.entities.contains_key("zombie"));
    }

    #[test]
    fn test_zero_scale_factor_rejected() {
        let result = GameConfig::from_json(r#"{ "map": { "scale_factor": 0.0 } }"#);
        assert!(matches!(result, Err(ConfigError::InvalidScale(_))));
    }

    #[test]
    fn test_unknown_type_name_rejected() {
        let json = r#"{
            "entities": { "ghost": { "building_power": 0, "combat_power": 1, "tot_hp": 5, "speed": 1.0 } }
        }"#;
        match GameConfig::from_json(json) {
            Err(ConfigError::UnknownEntityType(name)) => assert_eq!(name, "ghost"),
            other => panic!("Expected unknown type error, got {:?}", other),
        }
    }

    #[test]
    fn test_building_in_entities_section_rejected() {
        let mut config = GameConfig::default();
        config.entities.insert(
            "barricade".to_string(),
            EntityData { building_power: 0, combat_power: 0, total_hp: 1, speed: 0.0 },
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MisplacedEntityType { section: "entities", .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(GameConfig::from_json("{ not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_type_table_lookups() {
        let table = EntityTypeTable::from_config(&GameConfig::default()).unwrap();
        assert_eq!(table.kind("grunt"), Some(EntityKind::Tank));
        assert_eq!(table.kind("nobody"), None);
        assert_eq!(table.entity_data(EntityKind::Zombie).unwrap().total_hp, 1);
        assert_eq!(table.building_data(EntityKind::MgTurret).unwrap().build_power_required, 100);
        assert!(table.building_data(EntityKind::Zombie).is_none());
        assert_eq!(table.turret().fire_interval(), Duration::from_millis(250));
    }
}
