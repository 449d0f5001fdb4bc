pub mod combat;
mod config;
pub mod entities;
pub mod net;
pub mod telemetry;
pub mod world;

pub use config::AppConfig;
pub use world::commands::{Command, CommandOutcome};
pub use world::menus::await_menu;
pub use world::scheduler::{spawn_tick_loop, ServerControl};
pub use world::state::World;
pub use world::tick::TickOutcome;

use std::sync::{Arc, Mutex};
use telemetry::logging::log_game;
use world::definitions::{Definitions, Layout};
use world::time::GameClock;

pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;

    let definitions =
        Definitions::load(&config.definitions_path()).map_err(|err| err.to_string())?;
    let (objects, boundaries, items, npcs) = definitions.counts();
    log_game(&format!(
        "definitions: objects={}, boundaries={}, items={}, npcs={}",
        objects, boundaries, items, npcs
    ));
    println!("rscsim: definitions");
    println!("- root: {}", config.root.display());
    println!("- objects: {}", objects);
    println!("- boundaries: {}", boundaries);
    println!("- items: {}", items);
    println!("- npcs: {}", npcs);

    let mut world = World::new(
        Arc::new(definitions),
        GameClock::new(config.tick_length),
        config.seed,
    );
    match config.layout_path() {
        Some(path) => {
            let layout = Layout::load(&path).map_err(|err| err.to_string())?;
            let summary = world.load_layout(&layout);
            log_game(&format!(
                "layout: tiles={}, objects={}, npcs={}, skipped={}",
                summary.tiles, summary.objects, summary.npcs, summary.skipped
            ));
            println!(
                "- layout: tiles={}, objects={}, npcs={}, skipped={}",
                summary.tiles, summary.objects, summary.npcs, summary.skipped
            );
        }
        None => println!("- layout: none"),
    }
    println!(
        "- tick: {}ms, seed {}, limit {}",
        config.tick_length.as_millis(),
        config.seed,
        config.tick_limit
    );

    let world = Arc::new(Mutex::new(world));
    let control = Arc::new(ServerControl::new());
    let handle = spawn_tick_loop(world, control, config.tick_limit);
    let ticks = handle
        .join()
        .map_err(|_| "tick thread panicked".to_string())?;
    log_game(&format!("simulation stopped after {} ticks", ticks));
    println!("rscsim: stopped after {} ticks", ticks);
    Ok(())
}
