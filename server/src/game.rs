//! Authoritative game state
//!
//! [`GameState`] owns the world grid and every live entity. Moving entities
//! (player characters and zombies) are [`Actor`]s; static ones are
//! [`Building`]s. Both are kept in id-ordered maps so a tick always visits
//! entities in the same order.
//!
//! A tick runs in four phases:
//! 1. actors advance along their paths and the grid follows them
//! 2. actors in reach of their assigned entity build, repair or attack it
//! 3. buildings run their combat logic against the actors
//! 4. anything that ran out of hit points is removed and reported

use crate::actor::{Action, Actor, ACTION_REACH};
use crate::building::{Barricade, Building, CombatContext, CombatOutcome, MgTurret};
use crate::entity::{Entity, EntityFilter, EntityId, INVALID_ID};
use crate::events::GameEvent;
use crate::movable::DEFAULT_NEXT_WAYPOINTS;
use crate::world::{World, WorldSnapshot};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{EntityKind, EntityTypeTable, MapConfig, Vec2};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by requests against the game state.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),

    #[error("entity {0} is not a building")]
    NotABuilding(EntityId),

    #[error("entity {0} cannot move")]
    NotMovable(EntityId),

    #[error("entity {0} cannot act")]
    NotAnActor(EntityId),

    #[error("entity {0} cannot target itself")]
    SelfTarget(EntityId),

    #[error("no game data for entity kind {0}")]
    MissingData(EntityKind),

    #[error("position ({}, {}) is not traversable", .0.x, .0.y)]
    Blocked(Vec2),

    #[error("map has no enemy spawn point")]
    NoEnemySpawn,
}

/// Summary of one entity inside a [`GameSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub hp: f32,
    pub next_waypoints: Vec<Vec2>,
}

/// Serializable picture of the whole game at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub world: WorldSnapshot,
    pub entities: Vec<EntitySummary>,
}

pub struct GameState {
    pub tick: u64,
    world: World,
    types: Arc<EntityTypeTable>,
    map: MapConfig,
    actors: BTreeMap<EntityId, Actor>,
    buildings: BTreeMap<EntityId, Building>,
    next_id: EntityId,
}

/// Combat view handed to buildings: the grid and the actors they can shoot.
struct Battlefield<'a> {
    world: &'a World,
    actors: &'a mut BTreeMap<EntityId, Actor>,
}

impl CombatContext for Battlefield<'_> {
    fn world(&self) -> &World {
        self.world
    }

    fn nearest_entity(
        &self,
        pos: Vec2,
        radius: f32,
        filter: &EntityFilter,
    ) -> Option<(EntityId, Vec2, f32)> {
        nearest_actor(self.world, self.actors, pos, radius, filter)
    }

    fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.actors
            .get(&id)
            .filter(|actor| !actor.is_dead())
            .map(Entity::position)
    }

    fn deal_damage(&mut self, id: EntityId, damage: f32) -> Option<bool> {
        self.actors
            .get_mut(&id)
            .map(|actor| actor.deal_damage(damage))
    }
}

fn nearest_actor(
    world: &World,
    actors: &BTreeMap<EntityId, Actor>,
    pos: Vec2,
    radius: f32,
    filter: &EntityFilter,
) -> Option<(EntityId, Vec2, f32)> {
    world
        .radius_query(pos, radius)
        .iter()
        .filter_map(|id| actors.get(&id))
        .filter(|actor| !actor.is_dead() && filter(*actor as &dyn Entity))
        .map(|actor| (actor.id(), actor.position(), actor.position().distance(&pos)))
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

impl GameState {
    pub fn new(world: World, types: Arc<EntityTypeTable>, map: MapConfig) -> Self {
        Self {
            tick: 0,
            world,
            types,
            map,
            actors: BTreeMap::new(),
            buildings: BTreeMap::new(),
            next_id: INVALID_ID + 1,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn map(&self) -> &MapConfig {
        &self.map
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ensure_traversable(&self, pos: Vec2) -> Result<(), GameError> {
        match self.world.tile_from_world(pos) {
            Some(tile) if tile.is_walkable() => Ok(()),
            _ => Err(GameError::Blocked(pos)),
        }
    }

    /// Spawns a moving entity of the given kind.
    pub fn spawn_actor(&mut self, kind: EntityKind, pos: Vec2) -> Result<EntityId, GameError> {
        let data = *self
            .types
            .entity_data(kind)
            .ok_or(GameError::MissingData(kind))?;
        self.ensure_traversable(pos)?;

        let id = self.allocate_id();
        let actor = Actor::new(id, kind, pos, &data);
        self.world.attach_entity(&actor);
        self.actors.insert(id, actor);
        info!("Spawned {} {} at ({:.2}, {:.2})", kind, id, pos.x, pos.y);
        Ok(id)
    }

    /// Spawns a zombie at one of the map's enemy spawn points, picked at random.
    pub fn spawn_enemy(&mut self, rng: &mut impl Rng) -> Result<EntityId, GameError> {
        let pos = *self
            .map
            .enemy_spawns
            .choose(rng)
            .ok_or(GameError::NoEnemySpawn)?;
        self.spawn_actor(EntityKind::Zombie, pos)
    }

    /// Places an unfinished building.
    pub fn place_building(&mut self, kind: EntityKind, pos: Vec2) -> Result<EntityId, GameError> {
        let data = *self
            .types
            .building_data(kind)
            .ok_or(GameError::MissingData(kind))?;
        self.ensure_traversable(pos)?;

        let id = self.allocate_id();
        let building = match kind {
            EntityKind::MgTurret => {
                Building::MgTurret(MgTurret::new(id, pos, &data, *self.types.turret()))
            }
            EntityKind::Barricade => Building::Barricade(Barricade::new(id, pos, &data)),
            _ => return Err(GameError::MissingData(kind)),
        };
        self.world.attach_entity(&building);
        self.buildings.insert(id, building);
        info!("Placed {} {} at ({:.2}, {:.2})", kind, id, pos.x, pos.y);
        Ok(id)
    }

    pub fn add_build_power(&mut self, id: EntityId, bp: u16) -> Result<(), GameError> {
        if self.actors.contains_key(&id) {
            return Err(GameError::NotABuilding(id));
        }
        let building = self
            .buildings
            .get_mut(&id)
            .ok_or(GameError::UnknownEntity(id))?;
        building.base_mut().add_build_power(bp);
        Ok(())
    }

    /// Replaces the path of a moving entity, nearest waypoint first.
    pub fn set_path(&mut self, id: EntityId, path: Vec<Vec2>) -> Result<(), GameError> {
        if self.buildings.contains_key(&id) {
            return Err(GameError::NotMovable(id));
        }
        let actor = self
            .actors
            .get_mut(&id)
            .ok_or(GameError::UnknownEntity(id))?;
        actor.movable.set_path(path);
        Ok(())
    }

    /// Assigns an action to a moving entity. The action runs once the entity
    /// is within [`ACTION_REACH`] of its target and ends when the target is
    /// built, fully repaired or gone.
    pub fn assign_action(&mut self, id: EntityId, action: Action) -> Result<(), GameError> {
        if self.buildings.contains_key(&id) {
            return Err(GameError::NotAnActor(id));
        }
        if !self.actors.contains_key(&id) {
            return Err(GameError::UnknownEntity(id));
        }
        match action {
            Action::Idle => {}
            Action::Build(target) | Action::Repair(target) => {
                if !self.buildings.contains_key(&target) {
                    return Err(GameError::NotABuilding(target));
                }
            }
            Action::Attack(target) if target == id => return Err(GameError::SelfTarget(id)),
            Action::Attack(target) => {
                if self.entity(target).is_none() {
                    return Err(GameError::UnknownEntity(target));
                }
            }
        }

        if let Some(actor) = self.actors.get_mut(&id) {
            actor.set_action(action);
            debug!("Entity {} now doing {:?}", id, action);
        }
        Ok(())
    }

    /// Applies damage to any entity and returns whether it was lethal. The
    /// entity is removed at the end of the next tick.
    pub fn deal_damage(&mut self, id: EntityId, damage: f32) -> Result<bool, GameError> {
        if let Some(actor) = self.actors.get_mut(&id) {
            return Ok(actor.deal_damage(damage));
        }
        self.buildings
            .get_mut(&id)
            .map(|building| building.deal_damage(damage))
            .ok_or(GameError::UnknownEntity(id))
    }

    /// Removes an entity from the game, returning false if it did not exist.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let removed = self.actors.remove(&id).is_some() || self.buildings.remove(&id).is_some();
        if removed {
            self.world.detach_entity(id);
            info!("Removed entity {}", id);
        }
        removed
    }

    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        match self.actors.get(&id) {
            Some(actor) => Some(actor as &dyn Entity),
            None => self.buildings.get(&id).map(|b| b as &dyn Entity),
        }
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.actors.len() + self.buildings.len()
    }

    /// Nearest live moving entity within `radius` of `pos` accepted by
    /// `filter`, with its distance.
    pub fn nearest_entity(
        &self,
        pos: Vec2,
        radius: f32,
        filter: &EntityFilter,
    ) -> Option<(EntityId, f32)> {
        nearest_actor(&self.world, &self.actors, pos, radius, filter)
            .map(|(id, _, distance)| (id, distance))
    }

    /// Advances the simulation by `dt` and returns what happened.
    pub fn update(&mut self, dt: Duration) -> Vec<GameEvent> {
        self.tick += 1;
        let mut events = Vec::new();

        let mut moved = 0;
        for actor in self.actors.values_mut() {
            if actor.movable.advance(dt) {
                self.world.update_entity(&*actor);
                moved += 1;
            }
        }

        self.run_actions(dt);

        let mut battlefield = Battlefield {
            world: &self.world,
            actors: &mut self.actors,
        };
        for (&id, building) in self.buildings.iter_mut() {
            match building.update(dt, &mut battlefield) {
                CombatOutcome::TargetAcquired { target } => {
                    events.push(GameEvent::TargetAcquired { turret: id, target });
                }
                CombatOutcome::Fired { target, lethal } => {
                    debug!("Turret {} hit {} (lethal: {})", id, target, lethal);
                }
                CombatOutcome::TargetLost { target } => {
                    debug!("Turret {} lost target {}", id, target);
                }
                CombatOutcome::Idle => {}
            }
        }

        let dead_actors: Vec<(EntityId, EntityKind)> = self
            .actors
            .values()
            .filter(|actor| actor.is_dead())
            .map(|actor| (actor.id(), actor.kind()))
            .collect();
        for (id, kind) in dead_actors {
            self.remove_entity(id);
            events.push(GameEvent::EntityDestroyed { id, kind });
        }

        let dead_buildings: Vec<EntityId> = self
            .buildings
            .values()
            .filter(|building| building.base().hit_points() <= 0.0)
            .map(Entity::id)
            .collect();
        for id in dead_buildings {
            self.remove_entity(id);
            events.push(GameEvent::BuildingDestroyed { id });
        }

        debug!(
            "Tick {}: {} moved, {} entities, {} events",
            self.tick,
            moved,
            self.entity_count(),
            events.len()
        );
        events
    }

    fn run_actions(&mut self, dt: Duration) {
        let busy: Vec<(EntityId, Action, Vec2)> = self
            .actors
            .values()
            .filter(|actor| !actor.is_dead() && actor.action() != Action::Idle)
            .map(|actor| (actor.id(), actor.action(), actor.position()))
            .collect();

        for (id, action, pos) in busy {
            let target = match action.target() {
                Some(target) => target,
                None => continue,
            };
            let target_pos = match self.entity(target) {
                Some(entity) => entity.position(),
                None => {
                    debug!("Entity {} stops {:?}, target is gone", id, action);
                    self.set_idle(id);
                    continue;
                }
            };
            if pos.distance(&target_pos) > ACTION_REACH {
                continue;
            }

            let done = match action {
                Action::Build(_) => {
                    let bp = match self.actors.get_mut(&id) {
                        Some(actor) => actor.build_power_over(dt),
                        None => continue,
                    };
                    self.buildings.get_mut(&target).map_or(true, |building| {
                        building.base_mut().add_build_power(bp);
                        building.base().is_built()
                    })
                }
                Action::Repair(_) => {
                    let hp = match self.actors.get(&id) {
                        Some(actor) => actor.repair_over(dt),
                        None => continue,
                    };
                    self.buildings
                        .get_mut(&target)
                        .map_or(true, |building| building.base_mut().repair(hp))
                }
                Action::Attack(_) => {
                    let damage = match self.actors.get(&id) {
                        Some(actor) => actor.damage_over(dt),
                        None => continue,
                    };
                    self.deal_damage(target, damage).unwrap_or(true)
                }
                Action::Idle => false,
            };
            if done {
                self.set_idle(id);
            }
        }
    }

    fn set_idle(&mut self, id: EntityId) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.set_action(Action::Idle);
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let actors = self.actors.values().map(|actor| EntitySummary {
            id: actor.id(),
            kind: actor.kind(),
            pos: actor.position(),
            hp: actor.hit_points(),
            next_waypoints: actor.movable.next_waypoints(DEFAULT_NEXT_WAYPOINTS),
        });
        let buildings = self.buildings.values().map(|building| EntitySummary {
            id: building.id(),
            kind: building.kind(),
            pos: building.position(),
            hp: building.base().hit_points(),
            next_waypoints: Vec::new(),
        });

        let mut entities: Vec<EntitySummary> = actors.chain(buildings).collect();
        entities.sort_by_key(|summary| summary.id);
        GameSnapshot {
            tick: self.tick,
            world: self.world.snapshot(),
            entities,
        }
    }

    /// Binary encoding of [`GameState::snapshot`].
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(&self.snapshot())
    }
}
