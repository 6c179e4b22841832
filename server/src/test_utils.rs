//! Helpers shared by the unit tests of this crate.

use crate::entity::{Entity, EntityId};
use crate::world::World;
use image::{GrayImage, Luma};
use shared::{BoundingBox, EntityKind, Vec2, ACTOR_RADIUS};

/// Minimal entity with a square bounding box and hit points.
#[derive(Debug, Clone)]
pub struct Dummy {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub half_extent: f32,
    pub hp: f32,
}

impl Dummy {
    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self::with_half_extent(id, position, ACTOR_RADIUS)
    }

    pub fn with_half_extent(id: EntityId, position: Vec2, half_extent: f32) -> Self {
        Self {
            id,
            kind: EntityKind::Zombie,
            position,
            half_extent,
            hp: 1.0,
        }
    }
}

impl Entity for Dummy {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center(self.position, self.half_extent)
    }

    fn deal_damage(&mut self, damage: f32) -> bool {
        self.hp -= damage;
        self.hp <= 0.0
    }
}

/// World of the given size with scale 1 where the listed cells are walls.
pub fn world_with_walls(width: u32, height: u32, walls: &[(u32, u32)]) -> World {
    let img = GrayImage::from_fn(width, height, |x, y| {
        if walls.contains(&(x, y)) {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    World::new(&img, 1.0).expect("valid test world")
}

pub fn open_world(width: u32, height: u32) -> World {
    world_with_walls(width, height, &[])
}
