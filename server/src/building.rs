//! Buildings and the machine-gun turret combat controller
//!
//! Buildings are placed unfinished and become active once enough build power
//! has been induced into them. A finished machine-gun turret cycles through
//! three states:
//!
//! - **Guarding**: every acquisition interval, look for the nearest hostile
//!   entity within range that is in line of sight
//! - **Attacking**: fire at the target each time the fire-rate cooldown
//!   elapses, as long as it stays within range and line of sight
//! - **TargetAcquired**: the target went out of range or sight; wait for it
//!   to come back for a grace period, then forget it
//!
//! A single elapsed-time accumulator drives every state. It is reset on each
//! state transition and each time the turret fires.

use crate::entity::{Entity, EntityFilter, EntityId};
use crate::raycast::{GridPoint, RayCastResult};
use crate::world::World;
use log::{debug, info};
use shared::{BoundingBox, BuildingData, EntityKind, TurretConfig, Vec2, BUILDING_HALF_EXTENT};
use std::time::Duration;

/// What a turret needs from the game state to fight.
pub trait CombatContext {
    fn world(&self) -> &World;

    /// Nearest entity within `radius` of `pos` accepted by `filter`, with its
    /// position and distance.
    fn nearest_entity(
        &self,
        pos: Vec2,
        radius: f32,
        filter: &EntityFilter,
    ) -> Option<(EntityId, Vec2, f32)>;

    /// Current position of an entity, `None` if it no longer exists.
    fn position_of(&self, id: EntityId) -> Option<Vec2>;

    /// Applies damage and returns whether it was lethal, `None` if the entity
    /// no longer exists.
    fn deal_damage(&mut self, id: EntityId, damage: f32) -> Option<bool>;
}

/// Notable outcome of a building update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Idle,
    TargetAcquired { target: EntityId },
    TargetLost { target: EntityId },
    Fired { target: EntityId, lethal: bool },
}

/// Hit points and construction progress common to every building.
#[derive(Debug, Clone)]
pub struct BuildingBase {
    id: EntityId,
    kind: EntityKind,
    pos: Vec2,
    total_hp: f32,
    cur_hp: f32,
    required_bp: u16,
    cur_bp: u16,
    is_built: bool,
}

impl BuildingBase {
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, data: &BuildingData) -> Self {
        let mut base = Self {
            id,
            kind,
            pos,
            total_hp: f32::from(data.total_hp),
            cur_hp: 1.0,
            required_bp: data.build_power_required,
            cur_bp: 0,
            is_built: false,
        };
        if base.required_bp == 0 {
            base.finish();
        }
        base
    }

    fn finish(&mut self) {
        self.is_built = true;
        self.cur_hp = self.total_hp;
        self.cur_bp = self.required_bp;
    }

    /// Induces build power; hit points grow with construction progress.
    pub fn add_build_power(&mut self, bp: u16) {
        if self.is_built {
            return;
        }
        self.cur_bp = self.cur_bp.saturating_add(bp);
        self.cur_hp = self.total_hp * (f32::from(self.cur_bp) / f32::from(self.required_bp));
        if self.cur_bp >= self.required_bp {
            self.finish();
            info!("Building {} ({}) is complete", self.id, self.kind);
        }
        debug!(
            "Building {} receiving build power: hp {:.1}/{:.1}, bp {}/{}",
            self.id, self.cur_hp, self.total_hp, self.cur_bp, self.required_bp
        );
    }

    /// Restores hit points of a finished building up to its total. Returns
    /// true once there is nothing left to repair; an unfinished building
    /// needs build power instead.
    pub fn repair(&mut self, hp: f32) -> bool {
        if !self.is_built {
            return true;
        }
        self.cur_hp = (self.cur_hp + hp).min(self.total_hp);
        self.cur_hp >= self.total_hp
    }

    pub fn is_built(&self) -> bool {
        self.is_built
    }

    pub fn hit_points(&self) -> f32 {
        self.cur_hp
    }

    pub fn build_power(&self) -> u16 {
        self.cur_bp
    }
}

impl Entity for BuildingBase {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center(self.pos, BUILDING_HALF_EXTENT)
    }

    fn deal_damage(&mut self, damage: f32) -> bool {
        if damage >= self.cur_hp {
            self.cur_hp = 0.0;
            true
        } else {
            self.cur_hp -= damage;
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurretState {
    Guarding,
    TargetAcquired,
    Attacking,
}

/// Machine-gun turret.
#[derive(Debug, Clone)]
pub struct MgTurret {
    base: BuildingBase,
    config: TurretConfig,
    state: TurretState,
    target: Option<EntityId>,
    elapsed: Duration,
}

impl MgTurret {
    pub fn new(id: EntityId, pos: Vec2, data: &BuildingData, config: TurretConfig) -> Self {
        Self {
            base: BuildingBase::new(id, EntityKind::MgTurret, pos, data),
            config,
            state: TurretState::Guarding,
            target: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn base(&self) -> &BuildingBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut BuildingBase {
        &mut self.base
    }

    pub fn state(&self) -> TurretState {
        self.state
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    fn enter(&mut self, state: TurretState) {
        debug!("Turret {}: {:?} -> {:?}", self.base.id, self.state, state);
        self.state = state;
        self.elapsed = Duration::ZERO;
    }

    fn forget_target(&mut self) -> CombatOutcome {
        let outcome = match self.target.take() {
            Some(target) => CombatOutcome::TargetLost { target },
            None => CombatOutcome::Idle,
        };
        self.enter(TurretState::Guarding);
        outcome
    }

    /// Advances the combat state machine by `dt`. Unfinished turrets do nothing.
    pub fn update(&mut self, dt: Duration, ctx: &mut dyn CombatContext) -> CombatOutcome {
        if !self.base.is_built {
            return CombatOutcome::Idle;
        }
        self.elapsed += dt;

        match self.state {
            TurretState::Guarding => {
                if self.elapsed < self.config.acquire_interval() {
                    return CombatOutcome::Idle;
                }
                self.elapsed = Duration::ZERO;
                match self.acquire_target(&*ctx) {
                    Some(target) => {
                        info!(
                            "Turret {} acquired target {} from {:?}",
                            self.base.id, target, self.base.pos
                        );
                        self.target = Some(target);
                        self.enter(TurretState::Attacking);
                        CombatOutcome::TargetAcquired { target }
                    }
                    None => CombatOutcome::Idle,
                }
            }
            TurretState::Attacking => {
                let Some(target) = self.target else {
                    return self.forget_target();
                };
                let Some(target_pos) = ctx.position_of(target) else {
                    return self.forget_target();
                };
                if !self.can_engage(ctx.world(), target_pos) {
                    debug!("Turret {} lost sight of target {}", self.base.id, target);
                    self.enter(TurretState::TargetAcquired);
                    return CombatOutcome::Idle;
                }
                if self.elapsed < self.config.fire_interval() {
                    return CombatOutcome::Idle;
                }
                self.fire(target, ctx)
            }
            TurretState::TargetAcquired => {
                let Some(target) = self.target else {
                    return self.forget_target();
                };
                let Some(target_pos) = ctx.position_of(target) else {
                    return self.forget_target();
                };
                if self.can_engage(ctx.world(), target_pos) {
                    self.enter(TurretState::Attacking);
                    CombatOutcome::Idle
                } else if self.elapsed >= self.config.lost_target() {
                    info!("Turret {} gave up on target {}", self.base.id, target);
                    self.forget_target()
                } else {
                    CombatOutcome::Idle
                }
            }
        }
    }

    fn fire(&mut self, target: EntityId, ctx: &mut dyn CombatContext) -> CombatOutcome {
        debug!("Turret {} is shooting at {}", self.base.id, target);
        self.elapsed = Duration::ZERO;
        let lethal = ctx
            .deal_damage(target, self.config.attack_power)
            .unwrap_or(true);
        if lethal {
            info!("Turret {} killed target {}", self.base.id, target);
            self.target = None;
            self.enter(TurretState::Guarding);
        }
        CombatOutcome::Fired { target, lethal }
    }

    fn acquire_target(&self, ctx: &dyn CombatContext) -> Option<EntityId> {
        let pos = self.base.pos;
        let hostile = |e: &dyn Entity| e.kind().is_hostile();
        let (id, target_pos, distance) =
            ctx.nearest_entity(pos, self.config.max_distance, &hostile)?;
        if distance > self.config.max_distance {
            return None;
        }

        let world = ctx.world();
        let (own, target) = self.endpoint_cells(world, target_pos);
        let ray = world.cast_ray_with(pos, target_pos - pos, distance, |cell| {
            cell == own || cell == target || world.is_point_traversable(cell.0, cell.1)
        });
        self.sight_is_clear(&ray, own).then_some(id)
    }

    /// True if the target is within range and nothing untraversable lies
    /// strictly between the turret and the target.
    pub fn can_engage(&self, world: &World, target_pos: Vec2) -> bool {
        let pos = self.base.pos;
        let max = self.config.max_distance;
        if pos.square_distance(&target_pos) > max * max {
            return false;
        }

        let (own, target) = self.endpoint_cells(world, target_pos);
        let ray = world.line_through_with(pos, target_pos, |cell| {
            cell == own || cell == target || world.is_point_traversable(cell.0, cell.1)
        });
        self.sight_is_clear(&ray, own)
    }

    fn endpoint_cells(&self, world: &World, target_pos: Vec2) -> (GridPoint, GridPoint) {
        (
            world.world_to_grid(self.base.pos).to_cell(),
            world.world_to_grid(target_pos).to_cell(),
        )
    }

    // a collision on the turret's own cell is an artifact of the rasterized line
    fn sight_is_clear(&self, ray: &RayCastResult, own: GridPoint) -> bool {
        !ray.is_colliding || ray.colliding_pos == own
    }
}

/// Passive obstacle.
#[derive(Debug, Clone)]
pub struct Barricade {
    base: BuildingBase,
}

impl Barricade {
    pub fn new(id: EntityId, pos: Vec2, data: &BuildingData) -> Self {
        Self {
            base: BuildingBase::new(id, EntityKind::Barricade, pos, data),
        }
    }
}

/// Every building kind the game knows about.
#[derive(Debug, Clone)]
pub enum Building {
    MgTurret(MgTurret),
    Barricade(Barricade),
}

impl Building {
    pub fn base(&self) -> &BuildingBase {
        match self {
            Building::MgTurret(turret) => &turret.base,
            Building::Barricade(barricade) => &barricade.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BuildingBase {
        match self {
            Building::MgTurret(turret) => &mut turret.base,
            Building::Barricade(barricade) => &mut barricade.base,
        }
    }

    pub fn update(&mut self, dt: Duration, ctx: &mut dyn CombatContext) -> CombatOutcome {
        match self {
            Building::MgTurret(turret) => turret.update(dt, ctx),
            Building::Barricade(_) => CombatOutcome::Idle,
        }
    }
}

impl Entity for Building {
    fn id(&self) -> EntityId {
        self.base().id()
    }

    fn kind(&self) -> EntityKind {
        self.base().kind()
    }

    fn position(&self) -> Vec2 {
        self.base().position()
    }

    fn bounding_box(&self) -> BoundingBox {
        self.base().bounding_box()
    }

    fn deal_damage(&mut self, damage: f32) -> bool {
        self.base_mut().deal_damage(damage)
    }
}
