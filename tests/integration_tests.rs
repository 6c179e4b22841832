//! Integration tests for the simulation core
//!
//! These tests drive the public API the way the game loop does: worlds built
//! from rasters, entities attached and moved, rays cast and turrets fighting.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::entity::{Entity, EntityId};
use server::events::GameEvent;
use server::game::GameState;
use server::movable::Movable;
use server::world::{Raster, World};
use shared::{BoundingBox, EntityKind, EntityTypeTable, GameConfig, Vec2, ACTOR_RADIUS};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Map described with one string per row: `#` is a wall, anything else is
/// walkable.
struct AsciiMap(Vec<&'static str>);

impl Raster for AsciiMap {
    fn dimensions(&self) -> (u32, u32) {
        (self.0[0].len() as u32, self.0.len() as u32)
    }

    fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.0[y as usize].as_bytes()[x as usize] != b'#'
    }
}

fn open_map(width: usize, height: usize) -> World {
    let row: &'static str = Box::leak(".".repeat(width).into_boxed_str());
    World::new(&AsciiMap(vec![row; height]), 1.0).unwrap()
}

/// Test entity moving with a [`Movable`].
struct Walker {
    id: EntityId,
    movable: Movable,
}

impl Walker {
    fn new(id: EntityId, pos: Vec2) -> Self {
        Self {
            id,
            movable: Movable::new(pos, 1.0),
        }
    }
}

impl Entity for Walker {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Programmer
    }

    fn position(&self) -> Vec2 {
        self.movable.pos
    }

    fn bounding_box(&self) -> BoundingBox {
        self.movable.bounding_box()
    }

    fn deal_damage(&mut self, _damage: f32) -> bool {
        false
    }
}

/// SPATIAL GRID TESTS
mod grid_tests {
    use super::*;

    /// A box strictly inside a tile is attached to that tile only
    #[test]
    fn box_inside_tile_maps_to_one_tile() {
        let world = open_map(6, 6);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let (tx, ty) = (rng.gen_range(0..6), rng.gen_range(0..6));
            let min_x = tx as f32 + rng.gen_range(0.01..0.5);
            let min_y = ty as f32 + rng.gen_range(0.01..0.5);
            let bb = BoundingBox::new(
                min_x,
                min_x + rng.gen_range(0.01..0.49),
                min_y,
                min_y + rng.gen_range(0.01..0.49),
            );

            let tiles = world.intersecting_tiles(&bb);
            assert_eq!(tiles.len(), 1);
            let tile = world.tile_at_index(tiles[0]).unwrap();
            assert_eq!((tile.x, tile.y), (tx, ty));
        }
    }

    /// Attach followed by detach leaves no trace anywhere in the grid
    #[test]
    fn attach_detach_leaves_grid_empty() {
        let mut world = open_map(8, 8);
        let walkers: Vec<Walker> = (1..=20)
            .map(|id| Walker::new(id, Vec2::new((id % 8) as f32 + 0.3, (id / 3) as f32 + 0.6)))
            .collect();

        for walker in &walkers {
            world.attach_entity(walker);
        }
        for walker in &walkers {
            world.detach_entity(walker.id());
            assert!(world.attached_tiles(walker.id()).is_empty());
        }
        for y in 0..8 {
            for x in 0..8 {
                assert!(world.tile(x, y).unwrap().entities.is_empty());
            }
        }
    }

    /// After moving and updating, the entity query matches a brute-force scan
    #[test]
    fn entity_query_matches_brute_force_after_moves() {
        let mut world = open_map(12, 12);
        let mut rng = StdRng::seed_from_u64(42);
        let random_pos = |rng: &mut StdRng| {
            Vec2::new(rng.gen_range(0.0..11.99), rng.gen_range(0.0..11.99))
        };

        let mut walkers: Vec<Walker> = (1..=40)
            .map(|id| Walker::new(id, random_pos(&mut rng)))
            .collect();
        for walker in &walkers {
            world.attach_entity(walker);
        }

        for _round in 0..10 {
            for walker in walkers.iter_mut() {
                if rng.gen_bool(0.5) {
                    walker.movable.pos = random_pos(&mut rng);
                    world.update_entity(&*walker);
                }
            }

            for walker in &walkers {
                let expected: BTreeSet<EntityId> = walkers
                    .iter()
                    .filter(|other| other.id != walker.id)
                    .filter(|other| other.bounding_box().intersects(&walker.bounding_box()))
                    .map(|other| other.id)
                    .collect();
                let found: BTreeSet<EntityId> = world.entity_query(walker).iter().collect();
                assert_eq!(found, expected, "query mismatch for entity {}", walker.id);
            }
        }
    }

    /// Cached tile lists always equal a fresh broad phase over the current box
    #[test]
    fn cached_tiles_follow_moving_entity() {
        let mut world = open_map(10, 10);
        let mut walker = Walker::new(1, Vec2::new(0.5, 0.5));
        world.attach_entity(&walker);
        walker.movable.set_path(vec![Vec2::new(8.5, 0.5), Vec2::new(8.5, 8.5)]);

        while !walker.movable.has_reached_destination() {
            if walker.movable.advance(Duration::from_millis(130)) {
                world.update_entity(&walker);
            }
            let fresh = world.intersecting_tiles(&walker.bounding_box());
            assert_eq!(world.attached_tiles(1), fresh.as_slice());
        }
        assert_eq!(walker.position(), Vec2::new(8.5, 8.5));
    }
}

/// RAY CASTING TESTS
mod raycast_tests {
    use super::*;

    fn corridor(blocked: bool) -> World {
        let mut rows = vec![".........."; 10];
        if blocked {
            rows[5] = ".....#....";
        }
        World::new(&AsciiMap(rows), 1.0).unwrap()
    }

    /// A single obstruction on the row is the reported collision point
    #[test]
    fn obstruction_is_reported() {
        let result = corridor(true).line_through(Vec2::new(0.0, 5.0), Vec2::new(9.0, 5.0));
        assert!(result.is_colliding);
        assert_eq!(result.colliding_pos, (5, 5));

        let result = corridor(false).line_through(Vec2::new(0.0, 5.0), Vec2::new(9.0, 5.0));
        assert!(!result.is_colliding);
    }

    /// Diagonal rays stop at the first wall from their origin
    #[test]
    fn diagonal_ray_stops_at_first_wall() {
        let world = World::new(
            &AsciiMap(vec![
                "......",
                "......",
                "..#...",
                "......",
                "....#.",
                "......",
            ]),
            1.0,
        )
        .unwrap();

        let forward = world.line_through(Vec2::new(0.5, 0.5), Vec2::new(5.5, 5.5));
        assert_eq!(forward.colliding_pos, (2, 2));
        let backward = world.line_through(Vec2::new(5.5, 5.5), Vec2::new(0.5, 0.5));
        assert_eq!(backward.colliding_pos, (4, 4));
    }

    /// Rays far longer than the map stop at its border
    #[test]
    fn endless_ray_stops_at_map_border() {
        let world = open_map(10, 10);
        for length in [f32::INFINITY, 4.0e9] {
            let result = world.cast_ray(Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), length);
            assert!(result.is_colliding);
            assert_eq!(result.colliding_pos, (10, 1));
        }
    }
}

/// MOVEMENT TESTS
mod movement_tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// Exact path length is covered in one call, a shorter step is proportional
    #[test]
    fn advance_covers_exact_path_length() {
        let path = vec![Vec2::new(4.0, 0.0), Vec2::new(4.0, 2.0)];

        let mut movable = Movable::new(Vec2::ZERO, 3.0);
        movable.set_path(path.clone());
        movable.advance(Duration::from_secs(2));
        assert!(movable.has_reached_destination());
        assert_eq!(movable.pos, Vec2::new(4.0, 2.0));

        let mut movable = Movable::new(Vec2::ZERO, 3.0);
        movable.set_path(path);
        movable.advance(Duration::from_millis(1000));
        assert!(!movable.has_reached_destination());
        assert_approx_eq!(movable.pos.x, 3.0, 1e-5);
        assert_approx_eq!(movable.pos.y, 0.0, 1e-5);
    }
}

/// COMBAT TESTS
mod combat_tests {
    use super::*;
    use server::building::{Building, TurretState};

    const TICK: Duration = Duration::from_millis(50);

    fn game(world: World, zombie_hp: u16) -> GameState {
        let mut config = GameConfig::default();
        if let Some(zombie) = config.entities.get_mut("zombie") {
            zombie.total_hp = zombie_hp;
        }
        let types = Arc::new(EntityTypeTable::from_config(&config).unwrap());
        GameState::new(world, types, config.map)
    }

    fn built_turret(game: &mut GameState, pos: Vec2) -> EntityId {
        let id = game.place_building(EntityKind::MgTurret, pos).unwrap();
        game.add_build_power(id, u16::MAX).unwrap();
        id
    }

    fn turret_state(game: &GameState, id: EntityId) -> (TurretState, Option<EntityId>) {
        match game.building(id) {
            Some(Building::MgTurret(turret)) => (turret.state(), turret.target()),
            other => panic!("Expected a turret, got {:?}", other),
        }
    }

    fn run(game: &mut GameState, ticks: usize) -> Vec<GameEvent> {
        (0..ticks).flat_map(|_| game.update(TICK)).collect()
    }

    /// Hostile at (3, 0) is acquired within one interval and then shot at
    #[test]
    fn turret_acquires_and_fires() {
        let mut game = game(open_map(10, 10), 10);
        let turret = built_turret(&mut game, Vec2::ZERO);
        let zombie = game.spawn_actor(EntityKind::Zombie, Vec2::new(3.0, 0.0)).unwrap();

        let events = run(&mut game, 10);
        assert_eq!(events, vec![GameEvent::TargetAcquired { turret, target: zombie }]);
        assert_eq!(turret_state(&game, turret), (TurretState::Attacking, Some(zombie)));

        run(&mut game, 5);
        let hp = game.actor(zombie).unwrap().hit_points();
        assert!(hp < 10.0, "zombie should have been shot, hp = {}", hp);
    }

    /// Distance 3.0001 is out of reach
    #[test]
    fn turret_ignores_hostile_out_of_range() {
        let mut game = game(open_map(10, 10), 10);
        let turret = built_turret(&mut game, Vec2::ZERO);
        game.spawn_actor(EntityKind::Zombie, Vec2::new(3.0001, 0.0)).unwrap();

        assert!(run(&mut game, 40).is_empty());
        assert_eq!(turret_state(&game, turret), (TurretState::Guarding, None));
    }

    /// A lethal hit clears the target and reports the kill
    #[test]
    fn lethal_hit_returns_turret_to_guarding() {
        let mut game = game(open_map(10, 10), 1);
        let turret = built_turret(&mut game, Vec2::ZERO);
        let zombie = game.spawn_actor(EntityKind::Zombie, Vec2::new(3.0, 0.0)).unwrap();

        let events = run(&mut game, 60);
        assert!(events.contains(&GameEvent::EntityDestroyed {
            id: zombie,
            kind: EntityKind::Zombie
        }));
        assert_eq!(turret_state(&game, turret), (TurretState::Guarding, None));
        assert!(!game.world().is_attached(zombie));
    }

    /// Walls between turret and hostile prevent acquisition
    #[test]
    fn wall_blocks_line_of_sight() {
        let world = World::new(&AsciiMap(vec![".#....", "......", "......"]), 1.0).unwrap();
        let mut game = game(world, 10);
        built_turret(&mut game, Vec2::new(0.5, 0.5));
        let zombie = game.spawn_actor(EntityKind::Zombie, Vec2::new(2.5, 0.5)).unwrap();

        assert!(run(&mut game, 40).is_empty());
        assert_eq!(game.actor(zombie).unwrap().hit_points(), 10.0);
    }

    /// Zombies walking past a turret get acquired once they come into range
    #[test]
    fn walking_zombie_is_engaged() {
        let mut game = game(open_map(12, 3), 1);
        let turret = built_turret(&mut game, Vec2::new(1.5, 1.5));
        let zombie = game.spawn_actor(EntityKind::Zombie, Vec2::new(10.5, 1.5)).unwrap();
        game.set_path(zombie, vec![Vec2::new(0.5, 1.5)]).unwrap();

        let events = run(&mut game, 200);
        assert_eq!(events[0], GameEvent::TargetAcquired { turret, target: zombie });
        assert!(events.contains(&GameEvent::EntityDestroyed {
            id: zombie,
            kind: EntityKind::Zombie
        }));
    }

    #[test]
    fn actor_radius_box_is_used_for_actors() {
        let mut game = game(open_map(5, 5), 1);
        let id = game.spawn_actor(EntityKind::Zombie, Vec2::new(2.5, 2.5)).unwrap();
        let bb = game.entity(id).unwrap().bounding_box();
        assert_eq!(bb.width(), ACTOR_RADIUS * 2.0);
    }
}

/// GAME LOOP TESTS
mod game_loop_tests {
    use super::*;
    use server::game::GameSnapshot;
    use server::game_loop::{GameCommand, GameLoop};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Commands sent from another task end up in a running game
    #[tokio::test]
    async fn commands_drive_a_running_game() {
        let config = GameConfig::default();
        let types = Arc::new(EntityTypeTable::from_config(&config).unwrap());
        let state = GameState::new(open_map(10, 10), types, config.map);

        let (cmd_tx, cmd_rx) = mpsc::channel(100);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let game = tokio::spawn(GameLoop::new(state, 100, cmd_rx, event_tx).run());

        cmd_tx
            .send(GameCommand::PlaceBuilding { kind: EntityKind::MgTurret, pos: Vec2::new(1.5, 1.5) })
            .await
            .unwrap();
        cmd_tx.send(GameCommand::AddBuildPower { id: 1, bp: 100 }).await.unwrap();
        cmd_tx
            .send(GameCommand::SpawnActor { kind: EntityKind::Zombie, pos: Vec2::new(3.5, 1.5) })
            .await
            .unwrap();

        let mut received = Vec::new();
        let killed = GameEvent::EntityDestroyed { id: 2, kind: EntityKind::Zombie };
        while !received.contains(&killed) {
            let event = timeout(Duration::from_secs(10), event_rx.recv())
                .await
                .expect("no kill within 10 seconds")
                .expect("event channel closed");
            received.push(event);
        }
        assert_eq!(received[0], GameEvent::TargetAcquired { turret: 1, target: 2 });

        cmd_tx.send(GameCommand::Shutdown).await.unwrap();
        let state = timeout(Duration::from_secs(5), game).await.unwrap().unwrap();
        assert_eq!(state.entity_count(), 1);

        let snapshot: GameSnapshot = bincode::deserialize(&state.snapshot_bytes().unwrap()).unwrap();
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.entities[0].kind, EntityKind::MgTurret);
        assert!(!snapshot.world.attachments.contains_key(&2));
    }
}
