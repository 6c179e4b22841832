//! Spatial grid of the playable map
//!
//! The world is a fixed-size grid of tiles built once from a rasterized map.
//! Every tile knows whether it can be walked on and which entities currently
//! overlap it. Entities are referenced by id only: each tile keeps an
//! [`EntitySet`] and the world caches, per entity, the indices of the tiles it
//! is attached to together with the bounding box it had when attached.
//!
//! Coordinates come in two flavours:
//! - *world* coordinates, in which entities live
//! - *grid* coordinates, obtained by multiplying world coordinates by the
//!   scale factor and flooring
//!
//! Anything outside the grid is considered solid.

use crate::entity::{Entity, EntityId};
use crate::entity_set::EntitySet;
use image::{DynamicImage, GenericImageView, GrayImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{BoundingBox, Vec2};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Indices of the tiles an entity overlaps. The broad phase never yields more
/// than nine.
pub type TileList = SmallVec<[usize; 9]>;

/// Errors raised while building a world.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("grid scale must be a non-zero finite number, got {0}")]
    InvalidScale(f32),

    #[error("map raster is empty")]
    EmptyRaster,

    #[error("failed to load map image: {0}")]
    Image(#[from] image::ImageError),
}

/// Rasterized traversability source.
pub trait Raster {
    /// Width and height in cells.
    fn dimensions(&self) -> (u32, u32);

    /// True if the classification channel of the cell is non-zero.
    fn is_walkable(&self, x: u32, y: u32) -> bool;
}

impl Raster for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn is_walkable(&self, x: u32, y: u32) -> bool {
        // classification lives in the red channel
        self.get_pixel(x, y).0[0] != 0
    }
}

impl Raster for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        GrayImage::dimensions(self)
    }

    fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.get_pixel(x, y).0[0] != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Walkable,
    NotWalkable,
}

/// One cell of the world grid.
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub kind: TileKind,
    /// Entities whose bounding box currently overlaps this tile
    pub entities: EntitySet,
    bounding_box: BoundingBox,
}

impl Tile {
    fn new(x: i32, y: i32, kind: TileKind, scale: f32) -> Self {
        let size = 1.0 / scale;
        Self {
            x,
            y,
            kind,
            entities: EntitySet::new(),
            bounding_box: BoundingBox::new(
                x as f32 * size,
                (x + 1) as f32 * size,
                y as f32 * size,
                (y + 1) as f32 * size,
            ),
        }
    }

    /// Area covered by the tile, in world coordinates.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    pub fn is_walkable(&self) -> bool {
        self.kind == TileKind::Walkable
    }
}

#[derive(Debug, Clone, Default)]
struct Attachment {
    tiles: TileList,
    bounding_box: BoundingBox,
}

/// Serializable view of the grid and its entity bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub grid_width: i32,
    pub grid_height: i32,
    pub scale: f32,
    pub kinds: Vec<TileKind>,
    pub attachments: BTreeMap<EntityId, Vec<usize>>,
}

/// The spatial reference on which game entities are located.
#[derive(Debug, Clone)]
pub struct World {
    tiles: Vec<Tile>,
    grid_width: i32,
    grid_height: i32,
    width: f32,
    height: f32,
    scale: f32,
    attachments: HashMap<EntityId, Attachment>,
}

impl World {
    /// Builds the grid from a raster. `scale` is the number of grid cells per
    /// world unit and must be non-zero.
    pub fn new(raster: &impl Raster, scale: f32) -> Result<Self, WorldError> {
        if scale == 0.0 || !scale.is_finite() {
            return Err(WorldError::InvalidScale(scale));
        }
        let (grid_width, grid_height) = raster.dimensions();
        if grid_width == 0 || grid_height == 0 {
            return Err(WorldError::EmptyRaster);
        }

        let mut tiles = Vec::with_capacity((grid_width * grid_height) as usize);
        for y in 0..grid_height {
            for x in 0..grid_width {
                let kind = if raster.is_walkable(x, y) {
                    TileKind::Walkable
                } else {
                    TileKind::NotWalkable
                };
                tiles.push(Tile::new(x as i32, y as i32, kind, scale));
            }
        }

        let world = Self {
            tiles,
            grid_width: grid_width as i32,
            grid_height: grid_height as i32,
            width: grid_width as f32 / scale,
            height: grid_height as f32 / scale,
            scale,
            attachments: HashMap::new(),
        };
        info!(
            "Built world: {}x{} grid, {}x{} world units, scale {}",
            world.grid_width, world.grid_height, world.width, world.height, world.scale
        );
        Ok(world)
    }

    /// Loads the map image at `path` and builds the grid from it.
    pub fn load(path: impl AsRef<Path>, scale: f32) -> Result<Self, WorldError> {
        let img = image::open(path)?;
        Self::new(&img, scale)
    }

    pub fn grid_width(&self) -> i32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> i32 {
        self.grid_height
    }

    /// World width in world units.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// World height in world units.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.grid_width || y < 0 || y >= self.grid_height {
            None
        } else {
            Some((x + y * self.grid_width) as usize)
        }
    }

    fn index_from_world(&self, pt: Vec2) -> Option<usize> {
        if !pt.is_finite() {
            return None;
        }
        let (x, y) = self.world_to_grid(pt).to_cell();
        self.index_of(x, y)
    }

    /// Converts world coordinates into (fractional) grid coordinates.
    pub fn world_to_grid(&self, pt: Vec2) -> Vec2 {
        pt.scale(self.scale)
    }

    /// Tile at the given *grid* coordinates, `None` outside the grid.
    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.index_of(x, y).map(|idx| &self.tiles[idx])
    }

    /// Tile containing the given *world* point.
    pub fn tile_from_world(&self, pt: Vec2) -> Option<&Tile> {
        self.index_from_world(pt).map(|idx| &self.tiles[idx])
    }

    /// Tile by its index in the grid.
    pub fn tile_at_index(&self, idx: usize) -> Option<&Tile> {
        self.tiles.get(idx)
    }

    /// Indicates if a world point lies within the world boundaries.
    pub fn point_in_bounds(&self, pt: Vec2) -> bool {
        pt.x >= 0.0 && pt.x <= self.width && pt.y >= 0.0 && pt.y <= self.height
    }

    /// True if the grid point is inside the grid and walkable.
    pub fn is_point_traversable(&self, x: i32, y: i32) -> bool {
        // huge impenetrable walls surround the grid
        self.tile(x, y).map_or(false, Tile::is_walkable)
    }

    /// Returns the tiles intersecting with a bounding box (broad phase).
    ///
    /// The box is assumed not to span more than about one tile: only the
    /// tile containing its center and the eight surrounding tiles are
    /// considered.
    pub fn intersecting_tiles(&self, bb: &BoundingBox) -> TileList {
        let mut tiles = TileList::new();
        let Some(center) = self.index_from_world(bb.center()) else {
            return tiles;
        };
        tiles.push(center);
        if self.tiles[center].bounding_box.contains(bb) {
            return tiles;
        }

        let (cx, cy) = (self.tiles[center].x, self.tiles[center].y);
        let mut neighbour = |dx: i32, dy: i32| -> bool {
            match self.index_of(cx + dx, cy + dy) {
                Some(idx) if self.tiles[idx].bounding_box.intersects(bb) => {
                    tiles.push(idx);
                    true
                }
                _ => false,
            }
        };
        let left = neighbour(-1, 0);
        let right = neighbour(1, 0);
        let up = neighbour(0, -1);
        let down = neighbour(0, 1);

        // a diagonal tile only counts when both of its orthogonal neighbours did
        for (horizontal, dx) in [(left, -1), (right, 1)] {
            for (vertical, dy) in [(up, -1), (down, 1)] {
                if horizontal && vertical {
                    if let Some(idx) = self.index_of(cx + dx, cy + dy) {
                        tiles.push(idx);
                    }
                }
            }
        }
        tiles
    }

    /// Attaches an entity to the tiles its bounding box overlaps.
    pub fn attach_entity(&mut self, ent: &dyn Entity) {
        if self.attachments.contains_key(&ent.id()) {
            self.detach_entity(ent.id());
        }
        let bounding_box = ent.bounding_box();
        let tiles = self.intersecting_tiles(&bounding_box);
        for &idx in &tiles {
            self.tiles[idx].entities.add(ent.id());
        }
        self.attachments
            .insert(ent.id(), Attachment { tiles, bounding_box });
    }

    /// Detaches an entity from every tile it was attached to.
    pub fn detach_entity(&mut self, id: EntityId) {
        if let Some(attachment) = self.attachments.remove(&id) {
            for idx in attachment.tiles {
                self.tiles[idx].entities.remove(id);
            }
        }
    }

    /// Re-attaches an entity after it moved.
    ///
    /// Costs a full detach and attach, so only call it when the bounding box
    /// actually changed.
    pub fn update_entity(&mut self, ent: &dyn Entity) {
        self.detach_entity(ent.id());
        self.attach_entity(ent);
    }

    /// Tile indices the entity is currently attached to (empty if detached).
    pub fn attached_tiles(&self, id: EntityId) -> &[usize] {
        self.attachments
            .get(&id)
            .map_or(&[][..], |attachment| attachment.tiles.as_slice())
    }

    pub fn is_attached(&self, id: EntityId) -> bool {
        self.attachments.contains_key(&id)
    }

    /// Returns the set of entities intersecting with the given box.
    ///
    /// Querying with the bounding box of an attached entity returns that
    /// entity as well.
    pub fn aabb_query(&self, bb: &BoundingBox) -> EntitySet {
        let mut candidates = EntitySet::new();
        for idx in self.intersecting_tiles(bb) {
            candidates.union(&self.tiles[idx].entities);
        }

        candidates
            .iter()
            .filter(|id| {
                self.attachments
                    .get(id)
                    .map_or(false, |attachment| attachment.bounding_box.intersects(bb))
            })
            .collect()
    }

    /// Returns the entities whose bounding box center lies within `radius`
    /// world units of `center`.
    ///
    /// Unlike [`World::aabb_query`] this walks every tile covered by the
    /// circle, so it suits radii spanning several tiles.
    pub fn radius_query(&self, center: Vec2, radius: f32) -> EntitySet {
        if !center.is_finite() || radius.is_nan() {
            return EntitySet::new();
        }
        let (min_x, min_y) = self.world_to_grid(center - Vec2::new(radius, radius)).to_cell();
        let (max_x, max_y) = self.world_to_grid(center + Vec2::new(radius, radius)).to_cell();

        let mut candidates = EntitySet::new();
        for y in min_y.max(0)..=max_y.min(self.grid_height - 1) {
            for x in min_x.max(0)..=max_x.min(self.grid_width - 1) {
                if let Some(idx) = self.index_of(x, y) {
                    candidates.union(&self.tiles[idx].entities);
                }
            }
        }

        let square_radius = radius * radius;
        candidates
            .iter()
            .filter(|id| {
                self.attachments.get(id).map_or(false, |attachment| {
                    attachment.bounding_box.center().square_distance(&center) <= square_radius
                })
            })
            .collect()
    }

    /// Returns the set of entities intersecting with `ent`, excluding itself.
    ///
    /// # Panics
    ///
    /// Panics if `ent` is not part of its own query result, which means the
    /// grid bookkeeping no longer matches the entity position.
    pub fn entity_query(&self, ent: &dyn Entity) -> EntitySet {
        let mut set = self.aabb_query(&ent.bounding_box());
        if !set.remove(ent.id()) {
            panic!(
                "entity {} not found by its own spatial query, grid bookkeeping is out of sync",
                ent.id()
            );
        }
        set
    }

    /// Text rendering of the grid: `#` walls, `o` occupied tiles, `.` free
    /// tiles, one row per line.
    pub fn render_grid(&self) -> String {
        let mut buffer = String::new();
        for row in self.tiles.chunks(self.grid_width as usize) {
            for tile in row {
                let cell = match (tile.kind, tile.entities.is_empty()) {
                    (TileKind::NotWalkable, _) => '#',
                    (TileKind::Walkable, false) => 'o',
                    (TileKind::Walkable, true) => '.',
                };
                buffer.push(cell);
                buffer.push(' ');
            }
            buffer.push('\n');
        }
        buffer
    }

    /// Logs [`World::render_grid`] at debug level.
    pub fn dump_grid(&self) {
        debug!("World grid dump:\n{}", self.render_grid());
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            grid_width: self.grid_width,
            grid_height: self.grid_height,
            scale: self.scale,
            kinds: self.tiles.iter().map(|tile| tile.kind).collect(),
            attachments: self
                .attachments
                .iter()
                .map(|(id, attachment)| (*id, attachment.tiles.to_vec()))
                .collect(),
        }
    }
}
