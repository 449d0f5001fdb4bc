use crate::combat::damage::CombatProfile;
use crate::combat::death::killed;
use crate::entities::mob::MobId;
use crate::entities::player::{FightMode, PARALYZE_MONSTER_PRAYER};
use crate::entities::skills::SkillType;
use crate::net::session::OutboundEvent;
use crate::world::state::World;
use crate::world::tasks::TaskStatus;
use crate::world::tick::{CombatRoundReport, TickOutcome};

/// One melee engagement, registered as a task on the mob that started it.
/// Swings happen every other tick, alternating between the two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatRound {
    pub owner: MobId,
    pub target: MobId,
    pub attacker: MobId,
    pub defender: MobId,
    pub tick: u32,
}

impl CombatRound {
    pub fn new(owner: MobId, target: MobId) -> Self {
        Self {
            owner,
            target,
            attacker: owner,
            defender: target,
            tick: 0,
        }
    }

    pub fn run(&mut self, world: &mut World, outcome: &mut TickOutcome) -> TaskStatus {
        if !self.still_engaged(world) {
            world.reset_fighting(self.owner);
            if world.mob(self.target).and_then(|mob| mob.fight_target) == Some(self.owner) {
                world.reset_fighting(self.target);
            }
            return TaskStatus::Done;
        }
        self.tick += 1;
        if self.tick % 2 == 0 {
            return TaskStatus::Continue;
        }
        let status = swing(world, self.attacker, self.defender, outcome);
        if status == TaskStatus::Continue {
            std::mem::swap(&mut self.attacker, &mut self.defender);
        }
        status
    }

    fn still_engaged(&self, world: &World) -> bool {
        let (Some(owner), Some(target)) = (world.mob(self.owner), world.mob(self.target)) else {
            return false;
        };
        world.is_connected(self.owner)
            && world.is_connected(self.target)
            && !owner.removed
            && !target.removed
            && owner.is_fighting()
            && target.is_fighting()
            && owner.fight_target == Some(self.target)
            && owner.location.longest_delta(target.location) == 0
    }
}

fn stance(world: &World, id: MobId) -> FightMode {
    match id {
        MobId::Player(id) => world
            .player(id)
            .map_or(FightMode::Controlled, |player| player.fight_mode()),
        MobId::Npc(_) => FightMode::Controlled,
    }
}

/// One swing of `attacker` at `defender`.
fn swing(
    world: &mut World,
    attacker: MobId,
    defender: MobId,
    outcome: &mut TickOutcome,
) -> TaskStatus {
    if let Some(mob) = world.mob_mut(attacker) {
        mob.fight_round += 1;
    }
    if let (MobId::Npc(_), MobId::Player(player)) = (attacker, defender) {
        if world
            .player(player)
            .map_or(false, |player| player.prayer_active(PARALYZE_MONSTER_PRAYER))
        {
            return TaskStatus::Continue;
        }
    }
    let (Some(attacker_mob), Some(defender_mob)) = (world.mob(attacker), world.mob(defender))
    else {
        return TaskStatus::Done;
    };
    let attacking = CombatProfile::from_skills(&attacker_mob.skills, stance(world, attacker));
    let defending = CombatProfile::from_skills(&defender_mob.skills, stance(world, defender));
    let rolled = world.roll_melee(&attacking, &defending);

    let Some(defender_mob) = world.mob_mut(defender) else {
        return TaskStatus::Done;
    };
    let damage = rolled.clamp(0, defender_mob.skills.current(SkillType::Hits));
    defender_mob.skills.decrease_current(SkillType::Hits, damage);
    let current = defender_mob.skills.current(SkillType::Hits);
    let maximum = defender_mob.skills.maximum(SkillType::Hits);
    let location = defender_mob.location;
    outcome.combat_rounds.push(CombatRoundReport {
        attacker,
        defender,
        damage,
    });

    if current <= 0 {
        world.play_sound(attacker, "victory");
        killed(world, defender, Some(attacker), outcome);
        return TaskStatus::Done;
    }
    world.broadcast(
        location,
        OutboundEvent::Damage {
            mob: defender,
            damage,
            current,
            maximum,
        },
    );
    let sound = if damage > 0 { "combat1b" } else { "combat1a" };
    world.play_sound(attacker, sound);
    world.play_sound(defender, sound);
    TaskStatus::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::damage::{CombatFormula, CombatRng};
    use crate::combat::engage::start_combat;
    use crate::entities::attributes::AttributeStore;
    use crate::world::definitions::{Definitions, NpcDefinition};
    use crate::world::location::Location;
    use crate::world::time::GameClock;
    use std::sync::Arc;

    #[derive(Debug)]
    struct FixedHit(i32);

    impl CombatFormula for FixedHit {
        fn melee_damage(&self, _: &CombatProfile, _: &CombatProfile, _: &mut CombatRng) -> i32 {
            self.0
        }
    }

    fn world(hit: i32) -> World {
        let mut definitions = Definitions::default();
        for (id, name, hits) in [(1, "Rat", 1), (2, "Giant", 99)] {
            definitions.insert_npc(NpcDefinition {
                id,
                name: name.to_string(),
                attackable: true,
                attack: 1,
                defense: 1,
                strength: 1,
                hits,
                respawn_ticks: 10,
            });
        }
        World::new(Arc::new(definitions), GameClock::default(), 5).with_formula(Box::new(FixedHit(hit)))
    }

    #[test]
    fn paralyzed_monsters_lose_their_swing() {
        let mut world = world(1);
        let alice = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let giant = world.add_npc(2, Location::new(100, 101)).expect("giant");
        if let Some(player) = world.player_mut(alice.player) {
            assert!(player.prayer_on(PARALYZE_MONSTER_PRAYER));
        }
        assert!(start_combat(&mut world, MobId::Player(alice.player), MobId::Npc(giant)));

        let mut reports = Vec::new();
        for _ in 0..8 {
            reports.extend(world.tick().combat_rounds);
        }
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|round| round.attacker == MobId::Player(alice.player)));
        let hits = |id: MobId| world.mob(id).map(|mob| mob.skills.current(SkillType::Hits));
        assert_eq!(hits(MobId::Player(alice.player)), Some(10));
        assert_eq!(hits(MobId::Npc(giant)), Some(97));
    }

    #[test]
    fn damage_is_capped_at_remaining_hits() {
        let mut world = world(7);
        let alice = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let rat = world.add_npc(1, Location::new(101, 100)).expect("rat");
        assert!(start_combat(&mut world, MobId::Player(alice.player), MobId::Npc(rat)));

        let outcome = world.tick();
        assert_eq!(outcome.combat_rounds.len(), 1);
        assert_eq!(outcome.combat_rounds[0].damage, 1);
        assert_eq!(outcome.deaths.len(), 1);
        assert!(world.mob(MobId::Player(alice.player)).map_or(false, |mob| !mob.is_fighting()));
    }
}
