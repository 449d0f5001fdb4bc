use crate::world::location::Location;
use crate::world::time::{GameClock, GameTick};
use std::time::Duration;

/// How long an owned drop stays visible only to its owner.
pub const PRIVATE_WINDOW: Duration = Duration::from_secs(60);
/// How long any drop stays on the ground.
pub const DESPAWN_WINDOW: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroundItemId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundItem {
    pub id: GroundItemId,
    pub item: u32,
    pub amount: u32,
    pub location: Location,
    /// Username of the player the drop belongs to while private.
    pub owner: Option<String>,
    pub spawned_at: GameTick,
    pub private_until: GameTick,
    pub expires_at: GameTick,
}

impl GroundItem {
    /// A drop placed now, with its windows measured in `clock` ticks.
    pub fn new(
        id: GroundItemId,
        item: u32,
        amount: u32,
        location: Location,
        owner: Option<String>,
        clock: &GameClock,
    ) -> Self {
        let now = clock.now();
        Self {
            id,
            item,
            amount,
            location,
            owner,
            spawned_at: now,
            private_until: now.after(clock.ticks_from_duration_round_up(PRIVATE_WINDOW)),
            expires_at: now.after(clock.ticks_from_duration_round_up(DESPAWN_WINDOW)),
        }
    }

    pub fn is_private(&self, now: GameTick) -> bool {
        self.owner.is_some() && now < self.private_until
    }

    pub fn visible_to(&self, username: &str, now: GameTick) -> bool {
        if !self.is_private(now) {
            return true;
        }
        self.owner.as_deref() == Some(username)
    }

    pub fn is_expired(&self, now: GameTick) -> bool {
        now >= self.expires_at
    }
}
