use crate::combat::engage::start_combat;
use crate::combat::rules::can_attack;
use crate::entities::mob::{MobId, NpcId, PlayerId, FOLLOW_TARGET, TRIED_REACH};
use crate::entities::npc::skills_for;
use crate::entities::player::SKULL_TICKS;
use crate::telemetry::logging::log_game;
use crate::world::location::Location;
use crate::world::movement::{PathStep, MAX_REACH_ATTEMPTS};
use crate::world::state::World;
use crate::world::tasks::{ActionTarget, ArrivalAction, DistancedAction, Task, TaskStatus};
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatRoundReport {
    pub attacker: MobId,
    pub defender: MobId,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeathReport {
    pub victim: MobId,
    pub killer: Option<MobId>,
    pub drops: usize,
}

/// Everything observable that one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub tick: GameTick,
    pub moves: Vec<(MobId, Location)>,
    pub finished_paths: Vec<MobId>,
    pub aborted_paths: Vec<MobId>,
    pub combat_rounds: Vec<CombatRoundReport>,
    pub deaths: Vec<DeathReport>,
    pub respawns: Vec<NpcId>,
    pub disconnected: Vec<PlayerId>,
    pub expired_items: usize,
}

impl World {
    /// Runs one game tick. Players act before NPCs, each in id order, so a
    /// seeded world replays identically.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.advance(1);
        let mut outcome = TickOutcome {
            tick: now,
            ..TickOutcome::default()
        };

        let hung_up: Vec<PlayerId> = self
            .players
            .values()
            .filter(|player| !player.is_connected())
            .map(|player| player.id)
            .collect();
        for id in hung_up {
            if self.disconnect(id).is_some() {
                outcome.disconnected.push(id);
            }
        }

        let mobs: Vec<MobId> = self
            .players
            .keys()
            .map(|id| MobId::Player(*id))
            .chain(self.npcs.keys().map(|id| MobId::Npc(*id)))
            .collect();
        for id in mobs {
            self.tick_mob(id, &mut outcome);
        }

        self.respawn_npcs(now, &mut outcome);
        self.decay_skulls();
        self.expire_ground_items(now, &mut outcome);
        outcome
    }

    fn tick_mob(&mut self, id: MobId, outcome: &mut TickOutcome) {
        if self.mob(id).map_or(true, |mob| mob.removed) {
            return;
        }
        self.run_distanced_action(id);
        self.run_following(id);
        match self.traverse_path(id) {
            PathStep::Idle => {}
            PathStep::Moved(location) => outcome.moves.push((id, location)),
            PathStep::Finished => outcome.finished_paths.push(id),
            PathStep::Aborted => outcome.aborted_paths.push(id),
        }
        self.run_tasks(id, outcome);
    }

    /// Runs each task once. Tasks added while running are kept and first
    /// run on the next tick.
    fn run_tasks(&mut self, id: MobId, outcome: &mut TickOutcome) {
        let Some(mob) = self.mob_mut(id) else {
            return;
        };
        let tasks = std::mem::take(&mut mob.tasks);
        let mut kept = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            let status = match &mut task {
                Task::Combat(round) => round.run(self, outcome),
            };
            if status == TaskStatus::Continue {
                kept.push(task);
            }
        }
        if let Some(mob) = self.mob_mut(id) {
            let still_fighting = mob.is_fighting();
            let added = std::mem::take(&mut mob.tasks);
            mob.tasks = kept
                .into_iter()
                .filter(|task| still_fighting || !task.is_combat())
                .collect();
            mob.tasks.extend(added);
        }
    }

    fn run_distanced_action(&mut self, id: MobId) {
        let Some(action) = self.mob(id).and_then(|mob| mob.distanced_action) else {
            return;
        };
        if self.step_distanced_action(id, action) {
            if let Some(mob) = self.mob_mut(id) {
                mob.reset_distanced_action();
            }
        }
    }

    /// Walks toward the action's target and fires it on arrival. Returns
    /// true once the action is over, fired or abandoned.
    fn step_distanced_action(&mut self, id: MobId, action: DistancedAction) -> bool {
        let target = match action.target {
            ActionTarget::Mob(target) => self.live_location(target),
            ActionTarget::Tile(tile) => Some(tile),
        };
        let Some(target_location) = target else {
            if let Some(mob) = self.mob_mut(id) {
                mob.reset_path();
            }
            return true;
        };
        let Some(mob) = self.mob(id) else {
            return true;
        };
        if action.on_arrive == ArrivalAction::Attack && mob.is_fighting() {
            return true;
        }
        let location = mob.location;
        if !location.within_range(target_location, action.radius) {
            if let Some(mob) = self.mob_mut(id) {
                mob.walk_to(target_location);
            }
            return false;
        }
        if let ActionTarget::Mob(_) = action.target {
            if !self.can_reach_mob(id, target_location) {
                let tries = self
                    .mob(id)
                    .map_or(MAX_REACH_ATTEMPTS, |mob| mob.transients.var_int(TRIED_REACH, 0));
                if tries >= MAX_REACH_ATTEMPTS {
                    if let Some(mob) = self.mob_mut(id) {
                        mob.transients.unset_var(TRIED_REACH);
                        mob.reset_path();
                    }
                    return true;
                }
                return false;
            }
        }
        if let Some(mob) = self.mob_mut(id) {
            mob.reset_path();
        }
        self.arrive(id, action);
        true
    }

    fn arrive(&mut self, id: MobId, action: DistancedAction) {
        match (action.on_arrive, action.target) {
            (ArrivalAction::Attack, ActionTarget::Mob(target)) => {
                if self.mob(target).map_or(true, |mob| mob.is_fighting()) {
                    if let MobId::Player(player) = id {
                        self.message(player, "Your opponent is busy!");
                    }
                    return;
                }
                let allowed = match id {
                    MobId::Player(player) => can_attack(self, player, target),
                    MobId::Npc(_) => true,
                };
                if allowed {
                    start_combat(self, id, target);
                }
            }
            (ArrivalAction::Trade, ActionTarget::Mob(MobId::Player(target))) => {
                if let MobId::Player(player) = id {
                    self.request_trade(player, target);
                }
            }
            (ArrivalAction::Duel, ActionTarget::Mob(MobId::Player(target))) => {
                if let MobId::Player(player) = id {
                    self.request_duel(player, target);
                }
            }
            (ArrivalAction::TakeItem { item }, ActionTarget::Tile(tile)) => {
                if let MobId::Player(player) = id {
                    self.take_ground_item(player, tile, item);
                }
            }
            _ => {}
        }
    }

    fn run_following(&mut self, id: MobId) {
        let Some(mob) = self.mob(id) else {
            return;
        };
        if !mob.is_following() {
            return;
        }
        let radius = mob.follow_radius() as i32;
        let location = mob.location;
        let target = mob
            .transients
            .var_mob(FOLLOW_TARGET)
            .and_then(|target| self.live_location(target));
        let Some(mob) = self.mob_mut(id) else {
            return;
        };
        match target {
            None => mob.reset_following(),
            Some(target) if !location.within_range(target, radius) => mob.walk_to(target),
            Some(_) => mob.reset_path(),
        }
    }

    fn respawn_npcs(&mut self, now: GameTick, outcome: &mut TickOutcome) {
        let due: Vec<NpcId> = self
            .npcs
            .values()
            .filter(|npc| npc.should_respawn(now))
            .map(|npc| npc.id)
            .collect();
        for id in due {
            let Some(npc) = self.npcs.get(&id) else {
                continue;
            };
            let spawn = npc.spawn;
            let skills = self.definitions.npc(npc.definition).map(skills_for);
            self.set_location(MobId::Npc(id), spawn);
            if let Some(npc) = self.npcs.get_mut(&id) {
                if let Some(skills) = skills {
                    npc.mob.skills = skills;
                }
                npc.mob.skills.restore_all();
                npc.mob.removed = false;
                npc.respawn_at = None;
            }
            outcome.respawns.push(id);
        }
    }

    fn decay_skulls(&mut self) {
        for player in self.players.values() {
            let remaining = player.attributes.var_int(SKULL_TICKS, 0);
            if remaining <= 0 {
                continue;
            }
            if remaining == 1 {
                player.unskull();
            } else {
                player.attributes.set_int(SKULL_TICKS, remaining - 1);
            }
        }
    }

    fn expire_ground_items(&mut self, now: GameTick, outcome: &mut TickOutcome) {
        let expired: Vec<_> = self
            .ground_items
            .values()
            .filter(|item| item.is_expired(now))
            .map(|item| item.id)
            .collect();
        for id in expired {
            if let Some(item) = self.remove_ground_item(id) {
                outcome.expired_items += 1;
                log_game(&format!(
                    "ground item {}x{} expired at {}",
                    item.item, item.amount, item.location
                ));
            }
        }
    }
}
