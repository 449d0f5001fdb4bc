use crate::entities::attributes::SharedAttributes;
use crate::entities::mob_state::MobState;
use crate::entities::skills::Skills;
use crate::world::location::{Direction, Location};
use crate::world::pathway::Pathway;
use crate::world::tasks::{DistancedAction, Task};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TRIED_REACH: &str = "tried_reach";
pub const FOLLOW_RADIUS: &str = "follow_radius";
pub const FOLLOW_TARGET: &str = "follow_target";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NpcId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MobId {
    Player(PlayerId),
    Npc(NpcId),
}

impl MobId {
    pub fn is_player(self) -> bool {
        matches!(self, MobId::Player(_))
    }

    pub fn player(self) -> Option<PlayerId> {
        match self {
            MobId::Player(id) => Some(id),
            MobId::Npc(_) => None,
        }
    }
}

impl From<PlayerId> for MobId {
    fn from(id: PlayerId) -> Self {
        MobId::Player(id)
    }
}

impl From<NpcId> for MobId {
    fn from(id: NpcId) -> Self {
        MobId::Npc(id)
    }
}

impl fmt::Display for MobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MobId::Player(id) => write!(f, "player#{}", id.0),
            MobId::Npc(id) => write!(f, "npc#{}", id.0),
        }
    }
}

/// State shared by players and NPCs.
#[derive(Debug)]
pub struct Mob {
    pub id: MobId,
    pub location: Location,
    pub direction: Direction,
    pub state: MobState,
    pub skills: Skills,
    pub path: Option<Pathway>,
    /// Cleared on disconnect; shared with the connection worker.
    pub transients: SharedAttributes,
    pub tasks: Vec<Task>,
    pub distanced_action: Option<DistancedAction>,
    pub fight_target: Option<MobId>,
    pub fight_round: u32,
    pub removed: bool,
}

impl Mob {
    pub fn new(id: MobId, location: Location, skills: Skills) -> Self {
        Self {
            id,
            location,
            direction: Direction::North,
            state: MobState::IDLE,
            skills,
            path: None,
            transients: SharedAttributes::new(),
            tasks: Vec::new(),
            distanced_action: None,
            fight_target: None,
            fight_round: 0,
            removed: false,
        }
    }

    pub fn has_state(&self, state: MobState) -> bool {
        self.state.intersects(state)
    }

    pub fn is_fighting(&self) -> bool {
        self.state.contains(MobState::FIGHTING)
    }

    pub fn set_path(&mut self, path: Pathway) {
        self.path = Some(path);
    }

    pub fn walk_to(&mut self, target: Location) {
        self.set_path(Pathway::to_location(target));
    }

    pub fn reset_path(&mut self) {
        self.path = None;
    }

    pub fn finished_path(&self) -> bool {
        self.path.as_ref().map_or(true, Pathway::is_finished)
    }

    pub fn follow_radius(&self) -> i64 {
        self.transients.var_int(FOLLOW_RADIUS, -1)
    }

    pub fn is_following(&self) -> bool {
        self.follow_radius() >= 0
    }

    pub fn reset_following(&mut self) {
        {
            let mut transients = self.transients.lock();
            transients.unset_var(FOLLOW_RADIUS);
            transients.unset_var(FOLLOW_TARGET);
        }
        self.reset_path();
    }

    pub fn reset_distanced_action(&mut self) {
        self.distanced_action = None;
    }

    /// Leaves combat: drops the fight flag, target, round count and any
    /// combat task this mob drives.
    pub fn reset_fighting(&mut self) {
        if !self.is_fighting() {
            return;
        }
        self.state.remove(MobState::FIGHTING);
        self.fight_target = None;
        self.fight_round = 0;
        self.direction = Direction::North;
        self.tasks.retain(|task| !task.is_combat());
    }
}
