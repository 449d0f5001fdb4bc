use crate::entities::attributes::AttributeValue;
use crate::entities::inventory::{Inventory, ItemStack};
use crate::entities::mob::{MobId, PlayerId};
use crate::entities::mob_state::{Action, MobState};
use crate::entities::player::{
    DuelRules, Player, DUEL_ACCEPTED, DUEL_CAN_EQUIP, DUEL_CAN_MAGIC, DUEL_CAN_PRAYER,
    DUEL_CAN_RETREAT, DUEL_CONFIRMED, DUEL_TARGET, TRADE_ACCEPTED, TRADE_TARGET,
};
use crate::net::session::OutboundEvent;
use crate::telemetry::logging::{log_game, log_suspicious};
use crate::world::definitions::Definitions;
use crate::world::state::World;

/// The two negotiations share their flow; this names the keys and flags
/// each one uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Negotiation {
    Trade,
    Duel,
}

impl Negotiation {
    fn action(self) -> Action {
        match self {
            Negotiation::Trade => Action::Trade,
            Negotiation::Duel => Action::Duel,
        }
    }

    fn state(self) -> MobState {
        match self {
            Negotiation::Trade => MobState::TRADING,
            Negotiation::Duel => MobState::DUELING,
        }
    }

    fn target_key(self) -> &'static str {
        match self {
            Negotiation::Trade => TRADE_TARGET,
            Negotiation::Duel => DUEL_TARGET,
        }
    }

    fn accepted_key(self) -> &'static str {
        match self {
            Negotiation::Trade => TRADE_ACCEPTED,
            Negotiation::Duel => DUEL_ACCEPTED,
        }
    }

    fn offer(self, player: &mut Player) -> &mut Inventory {
        match self {
            Negotiation::Trade => &mut player.trade_offer,
            Negotiation::Duel => &mut player.duel_offer,
        }
    }

    fn open_event(self, partner: PlayerId) -> OutboundEvent {
        match self {
            Negotiation::Trade => OutboundEvent::TradeOpen(partner),
            Negotiation::Duel => OutboundEvent::DuelOpen(partner),
        }
    }

    fn update_event(self) -> OutboundEvent {
        match self {
            Negotiation::Trade => OutboundEvent::TradeUpdate,
            Negotiation::Duel => OutboundEvent::DuelUpdate,
        }
    }

    fn close_event(self) -> OutboundEvent {
        match self {
            Negotiation::Trade => OutboundEvent::TradeClose,
            Negotiation::Duel => OutboundEvent::DuelClose,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Negotiation::Trade => "trade",
            Negotiation::Duel => "duel",
        }
    }
}

/// `inventory` after giving away `give` and receiving `take`.
fn exchange(
    inventory: &Inventory,
    give: &[ItemStack],
    take: &[ItemStack],
    definitions: &Definitions,
) -> Result<Inventory, String> {
    let mut next = inventory.clone();
    for item in give {
        next.remove_by_id(item.id, item.amount)
            .ok_or_else(|| format!("missing offered item {}x{}", item.id, item.amount))?;
    }
    for item in take {
        next.add(item.id, item.amount, definitions.item_stackable(item.id))?;
    }
    Ok(next)
}

impl World {
    fn partner_of(&self, id: PlayerId, kind: Negotiation) -> Option<PlayerId> {
        self.player(id)?
            .mob
            .transients
            .var_mob(kind.target_key())
            .and_then(MobId::player)
    }

    fn request(&mut self, id: PlayerId, target: PlayerId, kind: Negotiation) -> bool {
        if id == target {
            return false;
        }
        let (Some(player), Some(other)) = (self.player(id), self.player(target)) else {
            return false;
        };
        if !player.mob.state.permits(kind.action()) {
            return false;
        }
        if !other.mob.state.permits(kind.action()) {
            player.message(format!("{} is busy at the moment", other.username));
            return false;
        }
        player.mob.transients.set_mob(kind.target_key(), MobId::Player(target));
        let mutual = self.partner_of(target, kind) == Some(id);
        if !mutual {
            let name = player.username.clone();
            player.message(format!("Sending {} request", kind.verb()));
            other.message(format!("{} wishes to {} with you", name, kind.verb()));
            return true;
        }
        for (me, partner) in [(id, target), (target, id)] {
            if let Some(player) = self.player_mut(me) {
                player.mob.state.insert(kind.state());
                player.mob.transients.unset_var(kind.accepted_key());
                kind.offer(player).clear();
                player.send(kind.open_event(partner));
            }
        }
        true
    }

    fn offer_item(&mut self, id: PlayerId, item: u32, amount: u32, kind: Negotiation) -> bool {
        let stackable = self.definitions.item_stackable(item);
        let Some(partner) = self.partner_of(id, kind) else {
            return false;
        };
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.mob.state.contains(kind.state()) || amount == 0 {
            return false;
        }
        let held = player.inventory.count(item);
        let offered = kind.offer(player).count(item);
        if held < offered.saturating_add(amount) {
            return false;
        }
        if kind.offer(player).add(item, amount, stackable).is_err() {
            return false;
        }
        for me in [id, partner] {
            if let Some(player) = self.player(me) {
                player.mob.transients.unset_var(kind.accepted_key());
                player.send(kind.update_event());
            }
        }
        true
    }

    /// Marks this side accepted; returns whether both sides now agree.
    fn accept(&mut self, id: PlayerId, kind: Negotiation) -> Option<PlayerId> {
        let partner = self.partner_of(id, kind)?;
        let player = self.player(id)?;
        if !player.mob.state.contains(kind.state()) {
            return None;
        }
        player.mob.transients.set_bool(kind.accepted_key(), true);
        let other = self.player(partner)?;
        let agreed = other.mob.state.contains(kind.state())
            && other.mob.transients.var_bool(kind.accepted_key(), false)
            && self.partner_of(partner, kind) == Some(id);
        agreed.then_some(partner)
    }

    fn decline(&mut self, id: PlayerId, kind: Negotiation) {
        let partner = self.partner_of(id, kind);
        self.reset_negotiation(id, kind);
        if let Some(partner) = partner {
            if self.partner_of(partner, kind) == Some(id) {
                self.reset_negotiation(partner, kind);
                self.message(partner, format!("Other player has declined the {}", kind.verb()));
            }
        }
    }

    fn reset_negotiation(&mut self, id: PlayerId, kind: Negotiation) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let was_open = player.mob.state.contains(kind.state());
        let confirmed = player.mob.transients.var_bool(DUEL_CONFIRMED, false);
        {
            let mut transients = player.mob.transients.lock();
            transients.unset_var(kind.target_key());
            transients.unset_var(kind.accepted_key());
            if kind == Negotiation::Duel {
                for key in [
                    DUEL_CONFIRMED,
                    DUEL_CAN_RETREAT,
                    DUEL_CAN_MAGIC,
                    DUEL_CAN_PRAYER,
                    DUEL_CAN_EQUIP,
                ] {
                    transients.unset_var(key);
                }
            }
        }
        kind.offer(player).clear();
        player.mob.state.remove(kind.state());
        if was_open && !(kind == Negotiation::Duel && confirmed) {
            player.send(kind.close_event());
        }
    }

    pub fn request_trade(&mut self, id: PlayerId, target: PlayerId) -> bool {
        self.request(id, target, Negotiation::Trade)
    }

    pub fn offer_trade_item(&mut self, id: PlayerId, item: u32, amount: u32) -> bool {
        self.offer_item(id, item, amount, Negotiation::Trade)
    }

    /// Accepts the current offers. Once both sides accept, the items change
    /// hands atomically or not at all.
    pub fn accept_trade(&mut self, id: PlayerId) -> bool {
        match self.accept(id, Negotiation::Trade) {
            Some(partner) => self.complete_trade(id, partner),
            None => false,
        }
    }

    pub fn decline_trade(&mut self, id: PlayerId) {
        self.decline(id, Negotiation::Trade);
    }

    pub fn reset_trade(&mut self, id: PlayerId) {
        self.reset_negotiation(id, Negotiation::Trade);
    }

    fn complete_trade(&mut self, first: PlayerId, second: PlayerId) -> bool {
        let definitions = self.definitions.clone();
        let (Some(a), Some(b)) = (self.player(first), self.player(second)) else {
            return false;
        };
        let a_offer = a.trade_offer.items().to_vec();
        let b_offer = b.trade_offer.items().to_vec();
        let result = exchange(&a.inventory, &a_offer, &b_offer, &definitions).and_then(|a_next| {
            exchange(&b.inventory, &b_offer, &a_offer, &definitions).map(|b_next| (a_next, b_next))
        });
        let names = (a.username.clone(), b.username.clone());
        self.reset_trade(first);
        self.reset_trade(second);
        match result {
            Ok((a_next, b_next)) => {
                for (id, next) in [(first, a_next), (second, b_next)] {
                    if let Some(player) = self.player_mut(id) {
                        player.inventory = next;
                        player.send(OutboundEvent::Inventory);
                        player.message("Trade completed successfully");
                    }
                }
                log_game(&format!(
                    "trade {} -> {}: {:?} / {:?}",
                    names.0, names.1, a_offer, b_offer
                ));
                true
            }
            Err(err) => {
                if err.starts_with("missing") {
                    log_suspicious(&format!("trade {} <-> {}: {}", names.0, names.1, err));
                }
                for id in [first, second] {
                    self.message(id, "Trade could not be completed");
                }
                false
            }
        }
    }

    pub fn request_duel(&mut self, id: PlayerId, target: PlayerId) -> bool {
        self.request(id, target, Negotiation::Duel)
    }

    pub fn offer_duel_item(&mut self, id: PlayerId, item: u32, amount: u32) -> bool {
        self.offer_item(id, item, amount, Negotiation::Duel)
    }

    /// Sets the rules for both duellists and withdraws any acceptance.
    pub fn set_duel_rules(&mut self, id: PlayerId, rules: DuelRules) -> bool {
        let Some(partner) = self.partner_of(id, Negotiation::Duel) else {
            return false;
        };
        if !self
            .player(id)
            .map_or(false, |player| player.mob.state.contains(MobState::DUELING))
        {
            return false;
        }
        for me in [id, partner] {
            if let Some(player) = self.player(me) {
                player.set_duel_rules(rules);
                player.mob.transients.unset_var(DUEL_ACCEPTED);
                player.send(OutboundEvent::DuelUpdate);
            }
        }
        true
    }

    /// Accepts the duel terms. When both sides have accepted, the duel is
    /// confirmed and the two may attack each other.
    pub fn accept_duel(&mut self, id: PlayerId) -> bool {
        let Some(partner) = self.accept(id, Negotiation::Duel) else {
            return false;
        };
        for me in [id, partner] {
            if let Some(player) = self.player(me) {
                player
                    .mob
                    .transients
                    .set_var(DUEL_CONFIRMED, AttributeValue::Bool(true));
                player.send(OutboundEvent::DuelClose);
                player.message("Commencing Duel!");
            }
        }
        true
    }

    pub fn decline_duel(&mut self, id: PlayerId) {
        self.decline(id, Negotiation::Duel);
    }

    pub fn reset_duel(&mut self, id: PlayerId) {
        self.reset_negotiation(id, Negotiation::Duel);
    }
}
