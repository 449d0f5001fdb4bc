use std::time::Duration;

/// Default length of one simulation step.
pub const DEFAULT_TICK_LENGTH: Duration = Duration::from_millis(640);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u64);

impl GameTick {
    pub fn after(self, ticks: u64) -> Self {
        GameTick(self.0.saturating_add(ticks))
    }
}

#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_LENGTH)
    }
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self, ticks: u64) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(ticks);
        self.tick
    }

    pub fn ticks_from_duration_round_up(&self, duration: Duration) -> u64 {
        if duration.is_zero() {
            return 0;
        }
        let tick_nanos = self.tick_length.as_nanos().max(1);
        let duration_nanos = duration.as_nanos();
        let ticks = (duration_nanos + tick_nanos - 1) / tick_nanos;
        ticks.min(u64::MAX as u128) as u64
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_length_is_clamped() {
        let clock = GameClock::new(Duration::ZERO);
        assert_eq!(clock.tick_length(), Duration::from_millis(1));
    }

    #[test]
    fn advance_accumulates() {
        let mut clock = GameClock::default();
        assert_eq!(clock.now(), GameTick(0));
        clock.advance(3);
        assert_eq!(clock.advance(2), GameTick(5));
    }

    #[test]
    fn duration_conversion_rounds_up() {
        let clock = GameClock::default();
        assert_eq!(clock.ticks_from_duration_round_up(Duration::from_secs(60)), 94);
        assert_eq!(clock.ticks_from_duration_round_up(Duration::ZERO), 0);
        assert_eq!(clock.ticks_from_duration_round_up(Duration::from_secs(1200)), 1875);
        let fast = GameClock::new(Duration::from_millis(100));
        assert_eq!(fast.ticks_from_duration_round_up(Duration::from_millis(250)), 3);
    }
}
