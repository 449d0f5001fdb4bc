use crate::telemetry::logging::log_tick;
use crate::world::state::World;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ServerSignal {
    Running = 0,
    Shutdown = 1,
}

/// Shared run flag between the tick thread and whoever owns the process.
#[derive(Debug)]
pub struct ServerControl {
    signal: AtomicU8,
}

impl Default for ServerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerControl {
    pub fn new() -> Self {
        Self {
            signal: AtomicU8::new(ServerSignal::Running as u8),
        }
    }

    pub fn request_shutdown(&self) {
        self.signal.store(ServerSignal::Shutdown as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.signal.load(Ordering::SeqCst) == ServerSignal::Running as u8
    }
}

/// Runs `World::tick` on a dedicated thread at the world clock's cadence
/// until shutdown is requested, or until `tick_limit` ticks have run when it
/// is non-zero. The handle yields the number of ticks run.
pub fn spawn_tick_loop(
    world: Arc<Mutex<World>>,
    control: Arc<ServerControl>,
    tick_limit: u64,
) -> thread::JoinHandle<u64> {
    thread::spawn(move || {
        let mut ticks = 0u64;
        while control.is_running() {
            let started = Instant::now();
            let tick_length = {
                let mut world = world.lock().unwrap_or_else(PoisonError::into_inner);
                let outcome = world.tick();
                log_tick(outcome.tick.0, world.players.len(), world.npcs.len());
                world.clock.tick_length()
            };
            ticks += 1;
            if tick_limit > 0 && ticks >= tick_limit {
                control.request_shutdown();
                break;
            }
            thread::sleep(tick_length.saturating_sub(started.elapsed()));
        }
        ticks
    })
}
