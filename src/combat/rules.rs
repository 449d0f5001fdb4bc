use crate::entities::mob::{MobId, PlayerId};
use crate::entities::player::DUEL_CONFIRMED;
use crate::world::state::World;

#[derive(Debug, Clone)]
pub struct CombatRules {
    pub pvp_enabled: bool,
    /// Distance from which an attack order engages.
    pub melee_radius: i32,
    /// Rounds a mob must have swung before it may walk away.
    pub retreat_rounds: u32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            pvp_enabled: true,
            melee_radius: 2,
            retreat_rounds: 3,
        }
    }
}

/// Whether `attacker` may start a fight with `target`. Refusals are
/// explained to the attacker.
pub fn can_attack(world: &World, attacker: PlayerId, target: MobId) -> bool {
    let Some(player) = world.player(attacker) else {
        return false;
    };
    let target_id = match target {
        MobId::Npc(id) => {
            return world.npc(id).map_or(false, |npc| {
                !npc.mob.removed
                    && world
                        .definitions
                        .npc(npc.definition)
                        .map_or(false, |definition| definition.attackable)
            });
        }
        MobId::Player(id) => id,
    };
    if target_id == attacker {
        return false;
    }
    let Some(opponent) = world.player(target_id) else {
        return false;
    };
    if player.is_dueling() {
        return player.duel_target() == Some(target_id)
            && player.mob.transients.var_bool(DUEL_CONFIRMED, false);
    }
    if !world.rules.pvp_enabled {
        player.message("You cannot attack other players here!");
        return false;
    }
    let our_wild = player.location().wilderness();
    let their_wild = opponent.location().wilderness();
    if our_wild < 1 || their_wild < 1 {
        player.message("You cannot attack other players outside of the wilderness!");
        return false;
    }
    let delta = (player.mob.skills.combat_level() - opponent.mob.skills.combat_level()).abs();
    if delta > our_wild {
        player.message(format!(
            "You must move to at least level {} wilderness to attack {}!",
            delta, opponent.username
        ));
        return false;
    }
    if delta > their_wild {
        player.message(format!(
            "{} is not in high enough wilderness for you to attack!",
            opponent.username
        ));
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attributes::AttributeStore;
    use crate::entities::skills::SkillType;
    use crate::net::session::{OutboundEvent, SessionHandle};
    use crate::world::definitions::{Definitions, NpcDefinition};
    use crate::world::location::Location;
    use crate::world::time::GameClock;
    use std::sync::Arc;

    fn world() -> World {
        let mut definitions = Definitions::default();
        for (id, name, attackable) in [(1, "Man", true), (2, "Banker", false)] {
            definitions.insert_npc(NpcDefinition {
                id,
                name: name.to_string(),
                attackable,
                attack: 1,
                defense: 1,
                strength: 1,
                hits: 5,
                respawn_ticks: 20,
            });
        }
        World::new(Arc::new(definitions), GameClock::default(), 3)
    }

    fn messages(handle: &SessionHandle) -> Vec<String> {
        handle
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                OutboundEvent::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn only_attackable_live_npcs_may_be_attacked() {
        let mut world = world();
        let alice = world.connect_player("alice", Location::new(120, 650), AttributeStore::new());
        let man = world.add_npc(1, Location::new(121, 650)).expect("man");
        let banker = world.add_npc(2, Location::new(122, 650)).expect("banker");
        assert!(can_attack(&world, alice.player, MobId::Npc(man)));
        assert!(!can_attack(&world, alice.player, MobId::Npc(banker)));
        if let Some(npc) = world.npcs.get_mut(&man) {
            npc.mob.removed = true;
        }
        assert!(!can_attack(&world, alice.player, MobId::Npc(man)));
    }

    #[test]
    fn players_cannot_attack_themselves() {
        let mut world = world();
        let alice = world.connect_player("alice", Location::new(120, 100), AttributeStore::new());
        assert!(!can_attack(&world, alice.player, MobId::Player(alice.player)));
    }

    #[test]
    fn disabled_pvp_refuses_with_a_message() {
        let mut world = world();
        world.rules.pvp_enabled = false;
        let alice = world.connect_player("alice", Location::new(120, 100), AttributeStore::new());
        let bob = world.connect_player("bob", Location::new(121, 100), AttributeStore::new());
        assert!(!can_attack(&world, alice.player, MobId::Player(bob.player)));
        assert_eq!(messages(&alice), vec!["You cannot attack other players here!".to_string()]);
    }

    #[test]
    fn target_must_stand_deep_enough() {
        let mut world = world();
        let alice = world.connect_player("alice", Location::new(120, 100), AttributeStore::new());
        let bob = world.connect_player("bob", Location::new(121, 420), AttributeStore::new());
        if let Some(player) = world.player_mut(alice.player) {
            player.mob.skills.set_level(SkillType::Attack, 40);
        }
        assert!(!can_attack(&world, alice.player, MobId::Player(bob.player)));
        assert_eq!(
            messages(&alice),
            vec!["bob is not in high enough wilderness for you to attack!".to_string()]
        );
    }

    #[test]
    fn even_fight_in_deep_wilderness_is_allowed() {
        let mut world = world();
        let alice = world.connect_player("alice", Location::new(120, 100), AttributeStore::new());
        let bob = world.connect_player("bob", Location::new(121, 101), AttributeStore::new());
        assert!(can_attack(&world, alice.player, MobId::Player(bob.player)));
        assert!(messages(&alice).is_empty());
    }
}
