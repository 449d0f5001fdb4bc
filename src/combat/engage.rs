use crate::combat::round::CombatRound;
use crate::entities::mob::MobId;
use crate::entities::mob_state::MobState;
use crate::entities::player::SKULL_DURATION;
use crate::telemetry::logging::log_game;
use crate::world::location::Direction;
use crate::world::state::World;
use crate::world::tasks::Task;

/// Puts two mobs into melee. The attacker steps onto the target's tile and
/// drives the fight from a combat task of its own.
pub fn start_combat(world: &mut World, attacker: MobId, target: MobId) -> bool {
    if attacker == target {
        return false;
    }
    let (Some(attacking), Some(defending)) = (world.mob(attacker), world.mob(target)) else {
        return false;
    };
    if attacking.removed || defending.removed || attacking.is_fighting() || defending.is_fighting()
    {
        return false;
    }
    let arena = defending.location;
    let attacker_dueling = attacking.has_state(MobState::DUELING);

    if target.is_player() {
        world.play_sound(target, "underattack");
        if let MobId::Player(aggressor) = attacker {
            if !attacker_dueling {
                let ticks = world.clock.ticks_from_duration_round_up(SKULL_DURATION);
                if let Some(player) = world.player(aggressor) {
                    player.skull(ticks);
                }
            }
        }
    }

    world.set_location(attacker, arena);
    if let Some(mob) = world.mob_mut(attacker) {
        mob.reset_path();
        mob.reset_distanced_action();
        mob.state.insert(MobState::FIGHTING);
        mob.direction = Direction::RightFighting;
        mob.fight_target = Some(target);
        mob.fight_round = 0;
        mob.tasks.push(Task::Combat(CombatRound::new(attacker, target)));
    }
    if let Some(mob) = world.mob_mut(target) {
        mob.reset_path();
        mob.reset_distanced_action();
        mob.state.insert(MobState::FIGHTING);
        mob.direction = Direction::LeftFighting;
        mob.fight_target = Some(attacker);
        mob.fight_round = 0;
    }
    log_game(&format!(
        "{} attacked {} at {}",
        world.mob_name(attacker),
        world.mob_name(target),
        arena
    ));
    true
}

/// Walks `id` out of its fight if the rules allow it. Both sides leave
/// combat on success.
pub fn try_retreat(world: &mut World, id: MobId) -> bool {
    let Some(mob) = world.mob(id) else {
        return false;
    };
    if !mob.is_fighting() {
        return true;
    }
    if mob.fight_round < world.rules.retreat_rounds {
        if let MobId::Player(player) = id {
            world.message(
                player,
                format!(
                    "You can't retreat during the first {} rounds of combat",
                    world.rules.retreat_rounds
                ),
            );
        }
        return false;
    }
    if let MobId::Player(player) = id {
        if let Some(player_state) = world.player(player) {
            if player_state.is_dueling() && !player_state.duel_rules().retreat {
                player_state.message("You cannot retreat during this duel!");
                return false;
            }
        }
    }
    let opponent = mob.fight_target;
    world.reset_fighting(id);
    if let Some(opponent) = opponent {
        world.reset_fighting(opponent);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attributes::AttributeStore;
    use crate::world::definitions::Definitions;
    use crate::world::location::Location;
    use crate::world::time::GameClock;
    use std::sync::Arc;

    #[test]
    fn attacker_steps_onto_the_target_and_faces_it() {
        let mut world = World::new(Arc::new(Definitions::default()), GameClock::default(), 2);
        let alice = world.connect_player("alice", Location::new(120, 100), AttributeStore::new());
        let bob = world.connect_player("bob", Location::new(121, 101), AttributeStore::new());
        let (attacker, target) = (MobId::Player(alice.player), MobId::Player(bob.player));
        assert!(start_combat(&mut world, attacker, target));

        let attacking = world.mob(attacker).expect("attacker");
        assert_eq!(attacking.location, Location::new(121, 101));
        assert_eq!(attacking.direction, Direction::RightFighting);
        assert_eq!(attacking.fight_target, Some(target));
        assert_eq!(attacking.tasks.len(), 1);
        let defending = world.mob(target).expect("target");
        assert_eq!(defending.direction, Direction::LeftFighting);
        assert!(defending.tasks.is_empty());

        assert!(!start_combat(&mut world, target, attacker));
        assert!(!start_combat(&mut world, attacker, attacker));
    }
}
