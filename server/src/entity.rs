use shared::{BoundingBox, EntityKind, Vec2};

/// Stable identifier of an entity for the lifetime of a game.
pub type EntityId = u32;

/// Identifier never handed out to a live entity.
pub const INVALID_ID: EntityId = 0;

/// Capabilities every entity exposes to the simulation core.
///
/// Entities are owned by the game state; the world and the combat controllers
/// only ever keep their [`EntityId`].
pub trait Entity {
    fn id(&self) -> EntityId;

    fn kind(&self) -> EntityKind;

    fn position(&self) -> Vec2;

    fn bounding_box(&self) -> BoundingBox;

    /// Applies damage and returns true if it was lethal.
    fn deal_damage(&mut self, damage: f32) -> bool;
}

/// Predicate used to narrow entity queries, e.g. `|e| e.kind().is_hostile()`.
pub type EntityFilter<'a> = dyn Fn(&dyn Entity) -> bool + 'a;
