use crate::entity::{Entity, EntityId};
use crate::movable::Movable;
use shared::{BoundingBox, EntityData, EntityKind, Vec2};
use std::time::Duration;

/// Maximum distance between an actor and the entity it works on.
pub const ACTION_REACH: f32 = 1.25;

/// What an actor does with the entity it was assigned to, once in reach.
///
/// Rates are per second: build power and repaired hit points come from the
/// actor's building power, damage from its combat power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Idle,
    Build(EntityId),
    Repair(EntityId),
    Attack(EntityId),
}

impl Action {
    pub fn target(&self) -> Option<EntityId> {
        match *self {
            Action::Idle => None,
            Action::Build(id) | Action::Repair(id) | Action::Attack(id) => Some(id),
        }
    }
}

/// A moving entity: player characters and zombies.
#[derive(Debug, Clone)]
pub struct Actor {
    id: EntityId,
    kind: EntityKind,
    pub movable: Movable,
    hp: f32,
    pub building_power: u8,
    pub combat_power: u8,
    action: Action,
    // fraction of a build power point carried over to the next tick
    pending_bp: f32,
}

impl Actor {
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, data: &EntityData) -> Self {
        Self {
            id,
            kind,
            movable: Movable::new(pos, data.speed),
            hp: f32::from(data.total_hp),
            building_power: data.building_power,
            combat_power: data.combat_power,
            action: Action::Idle,
            pending_bp: 0.0,
        }
    }

    pub fn hit_points(&self) -> f32 {
        self.hp
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = action;
        self.pending_bp = 0.0;
    }

    /// Whole build power points produced over `dt`. The remainder carries
    /// over, so short ticks add up.
    pub fn build_power_over(&mut self, dt: Duration) -> u16 {
        self.pending_bp += f32::from(self.building_power) * dt.as_secs_f32();
        let whole = self.pending_bp.floor();
        self.pending_bp -= whole;
        whole as u16
    }

    pub fn repair_over(&self, dt: Duration) -> f32 {
        f32::from(self.building_power) * dt.as_secs_f32()
    }

    pub fn damage_over(&self, dt: Duration) -> f32 {
        f32::from(self.combat_power) * dt.as_secs_f32()
    }
}

impl Entity for Actor {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn position(&self) -> Vec2 {
        self.movable.pos
    }

    fn bounding_box(&self) -> BoundingBox {
        self.movable.bounding_box()
    }

    fn deal_damage(&mut self, damage: f32) -> bool {
        self.hp -= damage;
        self.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn zombie_data() -> EntityData {
        EntityData {
            building_power: 0,
            combat_power: 2,
            total_hp: 1,
            speed: 1.5,
        }
    }

    #[test]
    fn test_actor_takes_settings_from_data() {
        let actor = Actor::new(3, EntityKind::Zombie, Vec2::new(1.0, 2.0), &zombie_data());
        assert_eq!(actor.hit_points(), 1.0);
        assert_eq!(actor.movable.speed, 1.5);
        assert_eq!(actor.combat_power, 2);
        assert_eq!(actor.action(), Action::Idle);
        assert_eq!(actor.position(), Vec2::new(1.0, 2.0));
        assert_eq!(actor.bounding_box(), BoundingBox::new(0.5, 1.5, 1.5, 2.5));
    }

    #[test]
    fn test_damage_until_dead() {
        let mut actor = Actor::new(3, EntityKind::Zombie, Vec2::ZERO, &zombie_data());
        assert!(!actor.deal_damage(0.2));
        assert_approx_eq!(actor.hit_points(), 0.8, 1e-6);
        assert!(!actor.deal_damage(0.3));
        assert!(actor.deal_damage(0.5));
        assert!(actor.is_dead());
    }

    #[test]
    fn test_build_power_carries_fractions() {
        let data = EntityData {
            building_power: 5,
            ..zombie_data()
        };
        let mut actor = Actor::new(1, EntityKind::Engineer, Vec2::ZERO, &data);
        actor.set_action(Action::Build(7));

        // 5 points per second over quarter-second ticks
        let produced: Vec<u16> = (0..4)
            .map(|_| actor.build_power_over(Duration::from_millis(250)))
            .collect();
        assert_eq!(produced, vec![1, 1, 1, 2]);
        assert_eq!(actor.build_power_over(Duration::from_secs(2)), 10);
        assert_approx_eq!(actor.damage_over(Duration::from_millis(500)), 1.0, 1e-6);
        assert_eq!(actor.action().target(), Some(7));
    }
}
