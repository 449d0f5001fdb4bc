use crate::entities::attributes::AttributeValue;
use crate::entities::inventory::ItemStack;
use crate::entities::mob::{MobId, NpcId, PlayerId};
use crate::entities::player::{DEATH_TIME, PROTECT_ITEM_PRAYER};
use crate::net::session::OutboundEvent;
use crate::telemetry::logging::{log_game, log_suspicious, log_warning};
use crate::world::definitions::DEFAULT_DROP;
use crate::world::location::{Direction, DEATH_SPOT, SPAWN_POINT};
use crate::world::state::World;
use crate::world::tick::{DeathReport, TickOutcome};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stacks a player keeps on death when not skulled.
pub const KEPT_ON_DEATH: usize = 3;

pub fn killed(world: &mut World, victim: MobId, killer: Option<MobId>, outcome: &mut TickOutcome) {
    match victim {
        MobId::Player(id) => player_killed(world, id, killer, outcome),
        MobId::Npc(id) => npc_killed(world, id, killer, outcome),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Awards a killer its share of the victim's worth and announces the kill.
fn reward_killer(world: &mut World, killer: Option<MobId>, victim: MobId) {
    let Some(MobId::Player(killer)) = killer else {
        return;
    };
    let Some(victim_mob) = world.mob(victim) else {
        return;
    };
    let experience = world.formula().combat_experience(&victim_mob.skills);
    let name = world.mob_name(victim);
    if let Some(player) = world.player_mut(killer) {
        player.distribute_melee_experience((experience / 4.0).ceil() as i64);
        player.message(format!("You have defeated {}!", name));
    }
}

fn owner_name(world: &World, killer: Option<MobId>) -> Option<String> {
    killer
        .and_then(MobId::player)
        .and_then(|id| world.player(id))
        .map(|player| player.username.clone())
}

/// Death of a player: items drop where they fell, skills restore, and the
/// player wakes at the spawn point.
pub fn player_killed(
    world: &mut World,
    victim: PlayerId,
    killer: Option<MobId>,
    outcome: &mut TickOutcome,
) {
    let definitions = world.definitions.clone();
    let Some(player) = world.player_mut(victim) else {
        return;
    };
    player
        .mob
        .transients
        .set_var(DEATH_TIME, AttributeValue::Time(unix_millis()));
    player.play_sound("death");
    player.send(OutboundEvent::Death);
    player.mob.skills.restore_all();
    player.send(OutboundEvent::Stats);
    player.mob.direction = Direction::North;
    let location = player.mob.location;
    let dueling = player.is_dueling();
    let duel_partner = player.duel_target();

    let mut drops = vec![ItemStack::new(DEFAULT_DROP, 1)];
    if dueling {
        drops.extend(player.duel_offer.items().iter().copied());
    } else {
        let mut keep = 0;
        if player.prayer_active(PROTECT_ITEM_PRAYER) {
            keep += 1;
        }
        if !player.is_skulled() {
            keep += KEPT_ON_DEATH;
        }
        drops.extend(player.inventory.death_drops(keep, &definitions));
    }
    let victim_name = player.username.clone();

    if dueling {
        if let Some(partner) = duel_partner {
            world.reset_duel(partner);
        }
        world.reset_duel(victim);
    }
    reward_killer(world, killer, MobId::Player(victim));

    let owner = owner_name(world, killer);
    let mut dropped = 0;
    for (index, item) in drops.iter().enumerate() {
        let removed = index == 0
            || world
                .player_mut(victim)
                .map_or(false, |player| player.inventory.remove_by_id(item.id, item.amount).is_some());
        if removed {
            world.add_ground_item(item.id, item.amount, location, owner.clone());
            dropped += 1;
        } else {
            let note = format!(
                "{} died holding {}x{} that could not be removed at {}",
                victim_name, item.id, item.amount, location
            );
            log_warning(&note);
            log_suspicious(&note);
        }
    }

    if let Some(player) = world.player_mut(victim) {
        player.prayers_off();
        player.send(OutboundEvent::Inventory);
    }
    world.reset_fighting(MobId::Player(victim));
    if let Some(killer) = killer {
        world.reset_fighting(killer);
    }
    if let Some(player) = world.player(victim) {
        player.unskull();
        player.send(OutboundEvent::EquipBonuses);
    }
    world.set_location(MobId::Player(victim), SPAWN_POINT);
    if SPAWN_POINT.plane() != location.plane() {
        world.send(victim, OutboundEvent::Plane(SPAWN_POINT.plane()));
    }
    outcome.deaths.push(DeathReport {
        victim: MobId::Player(victim),
        killer,
        drops: dropped,
    });
    log_game(&format!(
        "{} was killed by {} at {}",
        victim_name,
        killer.map_or_else(|| "nothing".to_string(), |id| world.mob_name(id)),
        location
    ));
}

/// Death of an NPC: it drops its bones, leaves the world and waits for its
/// respawn tick.
pub fn npc_killed(
    world: &mut World,
    victim: NpcId,
    killer: Option<MobId>,
    outcome: &mut TickOutcome,
) {
    let Some(npc) = world.npc(victim) else {
        return;
    };
    let location = npc.mob.location;
    let respawn_ticks = world
        .definitions
        .npc(npc.definition)
        .map_or(50, |definition| definition.respawn_ticks);
    let owner = owner_name(world, killer);
    world.add_ground_item(DEFAULT_DROP, 1, location, owner);
    reward_killer(world, killer, MobId::Npc(victim));

    world.reset_fighting(MobId::Npc(victim));
    if let Some(killer) = killer {
        world.reset_fighting(killer);
    }
    world.set_location(MobId::Npc(victim), DEATH_SPOT);
    let respawn_at = world.now().after(respawn_ticks);
    if let Some(npc) = world.npcs.get_mut(&victim) {
        npc.respawn_at = Some(respawn_at);
        npc.mob.removed = true;
        npc.mob.reset_path();
        npc.mob.reset_distanced_action();
        npc.mob.tasks.clear();
    }
    outcome.deaths.push(DeathReport {
        victim: MobId::Npc(victim),
        killer,
        drops: 1,
    });
}
