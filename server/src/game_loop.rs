//! Fixed-rate simulation loop
//!
//! The loop owns the [`GameState`]. Other tasks talk to it through a command
//! channel, drained once per tick boundary, and listen to the [`GameEvent`]s
//! it forwards after each tick.

use crate::actor::Action;
use crate::entity::EntityId;
use crate::events::GameEvent;
use crate::game::GameState;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{EntityKind, Vec2, MAX_DELTA_TIME};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Requests applied to the game state between ticks.
#[derive(Debug, Clone)]
pub enum GameCommand {
    SpawnActor { kind: EntityKind, pos: Vec2 },
    SpawnEnemy,
    PlaceBuilding { kind: EntityKind, pos: Vec2 },
    AddBuildPower { id: EntityId, bp: u16 },
    SetPath { id: EntityId, path: Vec<Vec2> },
    AssignAction { id: EntityId, action: Action },
    DealDamage { id: EntityId, damage: f32 },
    RemoveEntity { id: EntityId },
    Shutdown,
}

pub struct GameLoop {
    state: GameState,
    tick_duration: Duration,
    commands: mpsc::Receiver<GameCommand>,
    events: mpsc::UnboundedSender<GameEvent>,
    rng: StdRng,
}

impl GameLoop {
    pub fn new(
        state: GameState,
        tick_rate: u32,
        commands: mpsc::Receiver<GameCommand>,
        events: mpsc::UnboundedSender<GameEvent>,
    ) -> Self {
        Self {
            state,
            tick_duration: Duration::from_secs(1) / tick_rate.max(1),
            commands,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes enemy spawning reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Applies a command to the game state. Returns false on shutdown.
    pub fn process_command(&mut self, cmd: GameCommand) -> bool {
        let result = match cmd {
            GameCommand::SpawnActor { kind, pos } => self.state.spawn_actor(kind, pos).map(drop),
            GameCommand::SpawnEnemy => self.state.spawn_enemy(&mut self.rng).map(drop),
            GameCommand::PlaceBuilding { kind, pos } => {
                self.state.place_building(kind, pos).map(drop)
            }
            GameCommand::AddBuildPower { id, bp } => self.state.add_build_power(id, bp),
            GameCommand::SetPath { id, path } => self.state.set_path(id, path),
            GameCommand::AssignAction { id, action } => self.state.assign_action(id, action),
            GameCommand::DealDamage { id, damage } => {
                self.state.deal_damage(id, damage).map(drop)
            }
            GameCommand::RemoveEntity { id } => {
                if !self.state.remove_entity(id) {
                    warn!("Cannot remove unknown entity {}", id);
                }
                Ok(())
            }
            GameCommand::Shutdown => return false,
        };

        if let Err(e) = result {
            warn!("Rejected command: {}", e);
        }
        true
    }

    /// Runs one simulation step and forwards its events. Returns the number
    /// of events produced.
    pub fn tick(&mut self, dt: Duration) -> usize {
        let events = self.state.update(dt);
        let count = events.len();
        for event in events {
            if self.events.send(event).is_err() {
                debug!("Event receiver dropped, discarding events");
                break;
            }
        }
        count
    }

    /// Drains pending commands. Returns false once the loop should stop.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(cmd) => {
                    if !self.process_command(cmd) {
                        info!("Shutdown requested");
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    info!("All command senders dropped");
                    return false;
                }
            }
        }
    }

    /// Runs the loop until shutdown and hands the final state back.
    pub async fn run(mut self) -> GameState {
        let mut interval_timer = interval(self.tick_duration);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        interval_timer.tick().await;
        let mut last_update = Instant::now();
        let max_delta_time = Duration::from_secs_f32(MAX_DELTA_TIME);

        info!(
            "Game loop running at {:.1} ticks per second",
            1.0 / self.tick_duration.as_secs_f32()
        );

        loop {
            interval_timer.tick().await;

            let current_time = Instant::now();
            let mut delta_time = current_time - last_update;
            last_update = current_time;

            if delta_time > max_delta_time {
                warn!(
                    "Large delta time detected ({:.3}s), capping to {:.3}s",
                    delta_time.as_secs_f32(),
                    max_delta_time.as_secs_f32()
                );
                delta_time = max_delta_time;
            }

            if !self.drain_commands() {
                break;
            }
            self.tick(delta_time);
        }

        info!("Game loop stopped after {} ticks", self.state.tick);
        self.state
    }
}
