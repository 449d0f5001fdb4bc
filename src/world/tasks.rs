use crate::combat::round::CombatRound;
use crate::entities::mob::MobId;
use crate::world::location::Location;

/// Repeating per-tick work registered on a mob, run by the tick until it
/// reports completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Combat(CombatRound),
}

impl Task {
    pub fn is_combat(&self) -> bool {
        matches!(self, Task::Combat(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Continue,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTarget {
    Mob(MobId),
    Tile(Location),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalAction {
    Attack,
    Trade,
    Duel,
    TakeItem { item: u32 },
}

/// Walk-then-act intent. Each tick the mob steps toward `target`; once within
/// `radius` with a clear line to it, `on_arrive` runs and the action clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistancedAction {
    pub target: ActionTarget,
    pub radius: i32,
    pub on_arrive: ArrivalAction,
}
