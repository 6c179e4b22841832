use clap::Parser;
use log::{error, info, warn};
use server::game::GameState;
use server::game_loop::{GameCommand, GameLoop};
use server::world::World;
use shared::{EntityKind, EntityTypeTable, GameConfig, DEFAULT_TICK_RATE};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// Main-method of the application.
/// Parses command-line arguments, builds the world, then runs the game loop
/// alongside an enemy spawner and an event logger.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Map image; the red channel marks walkable cells
        #[clap(short, long)]
        map: PathBuf,
        /// Game data configuration (JSON)
        #[clap(short, long)]
        config: Option<PathBuf>,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value_t = DEFAULT_TICK_RATE)]
        tick_rate: u32,
        /// Seconds between enemy spawns, 0 disables spawning
        #[clap(short, long, default_value = "5")]
        enemy_interval: u64,
        /// Log a rendering of the grid at startup and shutdown
        #[clap(long)]
        dump_grid: bool,
    }

    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let types = Arc::new(EntityTypeTable::from_config(&config)?);
    let world = World::load(&args.map, config.map.scale_factor)?;
    if args.dump_grid {
        world.dump_grid();
    }

    let player_spawns = config.map.player_spawns.clone();
    let state = GameState::new(world, types, config.map);

    // Create bounded channel for game commands
    let (cmd_sender, cmd_receiver) = mpsc::channel::<GameCommand>(1000);
    let (event_sender, mut event_receiver) = mpsc::unbounded_channel();

    for pos in player_spawns {
        cmd_sender
            .send(GameCommand::SpawnActor { kind: EntityKind::Programmer, pos })
            .await?;
    }

    // Spawn game loop task
    let mut game_handle =
        tokio::spawn(GameLoop::new(state, args.tick_rate, cmd_receiver, event_sender).run());

    // Spawn event logger task
    tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to encode event {:?}: {}", event, e),
            }
        }
    });

    // Spawn enemy spawner task
    let enemy_interval = args.enemy_interval;
    if enemy_interval > 0 {
        let cmd_sender = cmd_sender.clone();
        tokio::spawn(async move {
            let mut spawn_timer = interval(Duration::from_secs(enemy_interval));
            loop {
                spawn_timer.tick().await;
                if cmd_sender.send(GameCommand::SpawnEnemy).await.is_err() {
                    break;
                }
            }
        });
    }

    // Handle shutdown gracefully
    tokio::select! {
        result = &mut game_handle => {
            match result {
                Ok(_) => warn!("Game loop stopped on its own"),
                Err(e) => error!("Game loop task panicked: {}", e),
            }
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    cmd_sender.send(GameCommand::Shutdown).await?;
    match game_handle.await {
        Ok(state) => {
            if args.dump_grid {
                state.world().dump_grid();
            }
            info!(
                "Final state: tick {}, {} entities",
                state.tick,
                state.entity_count()
            );
        }
        Err(e) => error!("Game loop task panicked: {}", e),
    }

    Ok(())
}
