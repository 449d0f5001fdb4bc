use crate::entities::attributes::AttributeValue;
use crate::entities::mob::{MobId, PlayerId, FOLLOW_RADIUS, FOLLOW_TARGET};
use crate::entities::mob_state::{Action, MobState};
use crate::entities::player::SHOP;
use crate::net::session::OutboundEvent;
use crate::world::location::Location;
use crate::world::state::World;

impl World {
    /// Ends a mob's fight. A player leaving a fight also leaves its duel.
    pub fn reset_fighting(&mut self, id: MobId) {
        let Some(mob) = self.mob_mut(id) else {
            return;
        };
        mob.reset_fighting();
        if let MobId::Player(player) = id {
            self.reset_duel(player);
        }
    }

    /// Cancels everything a player is doing, in a fixed order.
    pub fn reset_all(&mut self, id: PlayerId) {
        self.reset_fighting(MobId::Player(id));
        self.reset_duel(id);
        self.reset_trade(id);
        let Some(player) = self.player_mut(id) else {
            return;
        };
        player.mob.reset_distanced_action();
        if player.mob.is_following() {
            player.mob.reset_following();
        }
        self.close_option_menu(id);
        self.close_bank(id);
        self.close_shop(id);
    }

    /// Applies `state` if nothing forbids `action`.
    fn enter_state(&mut self, id: PlayerId, action: Action, state: MobState) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.mob.state.permits(action) {
            return false;
        }
        player.mob.state.insert(state);
        true
    }

    /// Drops `state`, reporting whether it was set.
    fn leave_state(&mut self, id: PlayerId, state: MobState) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.mob.state.contains(state) {
            return false;
        }
        player.mob.state.remove(state);
        true
    }

    pub fn open_bank(&mut self, id: PlayerId) -> bool {
        if !self.enter_state(id, Action::OpenBank, MobState::BANKING) {
            return false;
        }
        self.send(id, OutboundEvent::BankOpen);
        true
    }

    pub fn close_bank(&mut self, id: PlayerId) {
        if self.leave_state(id, MobState::BANKING) {
            self.send(id, OutboundEvent::BankClose);
        }
    }

    pub fn open_shop(&mut self, id: PlayerId, shop: u32) -> bool {
        if !self.enter_state(id, Action::OpenShop, MobState::SHOPPING) {
            return false;
        }
        if let Some(player) = self.player(id) {
            player.mob.transients.set_int(SHOP, i64::from(shop));
        }
        self.send(id, OutboundEvent::ShopOpen(shop));
        true
    }

    pub fn close_shop(&mut self, id: PlayerId) {
        if self.leave_state(id, MobState::SHOPPING) {
            if let Some(player) = self.player(id) {
                player.mob.transients.unset_var(SHOP);
            }
            self.send(id, OutboundEvent::ShopClose);
        }
    }

    pub fn open_appearance(&mut self, id: PlayerId) -> bool {
        if !self.enter_state(id, Action::ChangeAppearance, MobState::CHANGING_APPEARANCE) {
            return false;
        }
        self.send(id, OutboundEvent::AppearanceOpen);
        true
    }

    pub fn close_appearance(&mut self, id: PlayerId) {
        if self.leave_state(id, MobState::CHANGING_APPEARANCE) {
            self.send(id, OutboundEvent::Appearance);
        }
    }

    pub fn sleep(&mut self, id: PlayerId) -> bool {
        if !self.enter_state(id, Action::Sleep, MobState::SLEEPING) {
            return false;
        }
        if let Some(player) = self.player_mut(id) {
            player.mob.reset_path();
        }
        self.send(id, OutboundEvent::SleepOpen);
        true
    }

    pub fn wake(&mut self, id: PlayerId) {
        if self.leave_state(id, MobState::SLEEPING) {
            self.send(id, OutboundEvent::SleepClose);
        }
    }

    /// Starts `id` following `target`, staying within `radius` tiles.
    pub fn follow(&mut self, id: MobId, target: MobId, radius: i32) -> bool {
        if id == target || self.live_location(target).is_none() {
            return false;
        }
        let Some(mob) = self.mob_mut(id) else {
            return false;
        };
        if !mob.state.permits(Action::Follow) {
            return false;
        }
        mob.reset_distanced_action();
        let mut transients = mob.transients.lock();
        transients.set_var(FOLLOW_RADIUS, AttributeValue::Int(i64::from(radius.max(0))));
        transients.set_var(FOLLOW_TARGET, AttributeValue::Mob(target));
        true
    }

    /// Picks up a ground item the player can see on `tile`.
    pub fn take_ground_item(&mut self, id: PlayerId, tile: Location, item: u32) -> bool {
        let now = self.now();
        let Some(player) = self.player(id) else {
            return false;
        };
        if !player.mob.state.permits(Action::TakeItem) || player.mob.location != tile {
            return false;
        }
        let Some(found) = self
            .ground_items_at(tile)
            .into_iter()
            .find(|ground| ground.item == item && ground.visible_to(&player.username, now))
            .map(|ground| (ground.id, ground.amount))
        else {
            return false;
        };
        let stackable = self.definitions.item_stackable(item);
        if !player.inventory.can_hold(item, found.1, stackable) {
            player.message("You don't have room for that item");
            return false;
        }
        let Some(ground) = self.remove_ground_item(found.0) else {
            return false;
        };
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if let Err(err) = player.inventory.add(ground.item, ground.amount, stackable) {
            player.message(format!("Could not take item: {}", err));
            return false;
        }
        player.play_sound("takeobject");
        player.send(OutboundEvent::Inventory);
        true
    }

    pub fn chat(&self, id: PlayerId, message: &str) {
        let Some(player) = self.player(id) else {
            return;
        };
        self.broadcast(
            player.mob.location,
            OutboundEvent::Chat {
                speaker: MobId::Player(id),
                message: message.to_string(),
            },
        );
    }
}
