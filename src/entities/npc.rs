use crate::entities::mob::{Mob, MobId, NpcId};
use crate::entities::skills::Skills;
use crate::world::definitions::NpcDefinition;
use crate::world::location::Location;
use crate::world::time::GameTick;

#[derive(Debug)]
pub struct Npc {
    pub id: NpcId,
    pub definition: u32,
    pub mob: Mob,
    pub spawn: Location,
    /// Set while dead; the NPC returns to `spawn` once this tick is reached.
    pub respawn_at: Option<GameTick>,
}

impl Npc {
    pub fn new(id: NpcId, definition: &NpcDefinition, spawn: Location) -> Self {
        Self {
            id,
            definition: definition.id,
            mob: Mob::new(MobId::Npc(id), spawn, skills_for(definition)),
            spawn,
            respawn_at: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.respawn_at.is_some()
    }

    pub fn should_respawn(&self, now: GameTick) -> bool {
        self.respawn_at.map_or(false, |at| now >= at)
    }
}

pub fn skills_for(definition: &NpcDefinition) -> Skills {
    Skills::for_npc(
        definition.attack,
        definition.defense,
        definition.strength,
        definition.hits,
    )
}
