use crate::combat::engage::try_retreat;
use crate::combat::rules::can_attack;
use crate::entities::mob::{MobId, PlayerId};
use crate::entities::mob_state::Action;
use crate::entities::player::{DuelRules, FightMode, Player};
use crate::net::session::MenuWait;
use crate::world::location::Location;
use crate::world::pathway::Pathway;
use crate::world::state::World;
use crate::world::tasks::{ActionTarget, ArrivalAction, DistancedAction};

/// Radius a trade or duel request walks the player to.
const REQUEST_RADIUS: i32 = 1;

/// A decoded client request, applied by the tick under the world lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WalkTo { x: i32, y: i32 },
    WalkPath(Pathway),
    Attack(MobId),
    Follow { target: MobId, radius: i32 },
    TradeRequest(PlayerId),
    TradeOffer { item: u32, amount: u32 },
    TradeAccept,
    TradeDecline,
    DuelRequest(PlayerId),
    DuelRules(DuelRules),
    DuelOffer { item: u32, amount: u32 },
    DuelAccept,
    DuelDecline,
    OpenMenu(Vec<String>),
    MenuReply { token: u64, index: i32 },
    TakeItem { x: i32, y: i32, item: u32 },
    SetFightMode(FightMode),
    Prayer { index: usize, enabled: bool },
    OpenBank,
    CloseBank,
    OpenShop(u32),
    CloseShop,
    OpenAppearance,
    CloseAppearance,
    Sleep,
    Wake,
    Chat(String),
    Disconnect,
}

#[derive(Debug)]
pub enum CommandOutcome {
    Applied,
    /// Refused: the player's state forbids it, or the target is gone.
    Ignored,
    /// A menu opened; the caller waits on it off the tick.
    Menu(MenuWait),
    LoggedOut(Box<Player>),
}

impl CommandOutcome {
    fn from_flag(applied: bool) -> Self {
        if applied {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored
        }
    }
}

impl World {
    pub fn apply_command(&mut self, id: PlayerId, command: Command) -> CommandOutcome {
        if !self.players.contains_key(&id) {
            return CommandOutcome::Ignored;
        }
        match command {
            Command::WalkTo { x, y } => self.walk(id, Pathway::to_coords(x, y)),
            Command::WalkPath(path) => self.walk(id, path),
            Command::Attack(target) => self.order_attack(id, target),
            Command::Follow { target, radius } => {
                CommandOutcome::from_flag(self.follow(MobId::Player(id), target, radius))
            }
            Command::TradeRequest(target) => {
                self.walk_then(id, ActionTarget::Mob(MobId::Player(target)), REQUEST_RADIUS, ArrivalAction::Trade, Action::Trade)
            }
            Command::TradeOffer { item, amount } => {
                CommandOutcome::from_flag(self.offer_trade_item(id, item, amount))
            }
            Command::TradeAccept => {
                self.accept_trade(id);
                CommandOutcome::Applied
            }
            Command::TradeDecline => {
                self.decline_trade(id);
                CommandOutcome::Applied
            }
            Command::DuelRequest(target) => {
                self.walk_then(id, ActionTarget::Mob(MobId::Player(target)), REQUEST_RADIUS, ArrivalAction::Duel, Action::Duel)
            }
            Command::DuelRules(rules) => CommandOutcome::from_flag(self.set_duel_rules(id, rules)),
            Command::DuelOffer { item, amount } => {
                CommandOutcome::from_flag(self.offer_duel_item(id, item, amount))
            }
            Command::DuelAccept => {
                self.accept_duel(id);
                CommandOutcome::Applied
            }
            Command::DuelDecline => {
                self.decline_duel(id);
                CommandOutcome::Applied
            }
            Command::OpenMenu(options) => match self.open_option_menu(id, options) {
                Some(wait) => CommandOutcome::Menu(wait),
                None => CommandOutcome::Ignored,
            },
            Command::MenuReply { token, index } => {
                CommandOutcome::from_flag(self.reply_option_menu(id, token, index))
            }
            Command::TakeItem { x, y, item } => {
                let tile = Location::new(x, y);
                self.walk_then(id, ActionTarget::Tile(tile), 0, ArrivalAction::TakeItem { item }, Action::TakeItem)
            }
            Command::SetFightMode(mode) => {
                if let Some(player) = self.player(id) {
                    player.set_fight_mode(mode);
                }
                CommandOutcome::Applied
            }
            Command::Prayer { index, enabled } => self.pray(id, index, enabled),
            Command::OpenBank => CommandOutcome::from_flag(self.open_bank(id)),
            Command::CloseBank => {
                self.close_bank(id);
                CommandOutcome::Applied
            }
            Command::OpenShop(shop) => CommandOutcome::from_flag(self.open_shop(id, shop)),
            Command::CloseShop => {
                self.close_shop(id);
                CommandOutcome::Applied
            }
            Command::OpenAppearance => CommandOutcome::from_flag(self.open_appearance(id)),
            Command::CloseAppearance => {
                self.close_appearance(id);
                CommandOutcome::Applied
            }
            Command::Sleep => CommandOutcome::from_flag(self.sleep(id)),
            Command::Wake => {
                self.wake(id);
                CommandOutcome::Applied
            }
            Command::Chat(message) => {
                self.chat(id, &message);
                CommandOutcome::Applied
            }
            Command::Disconnect => match self.disconnect(id) {
                Some(player) => CommandOutcome::LoggedOut(Box::new(player)),
                None => CommandOutcome::Ignored,
            },
        }
    }

    /// A walk order. Walking out of a fight is a retreat and follows the
    /// retreat rules; otherwise the legality table decides.
    fn walk(&mut self, id: PlayerId, path: Pathway) -> CommandOutcome {
        if !path.within_world() {
            return CommandOutcome::Ignored;
        }
        let fighting = self
            .player(id)
            .map_or(false, |player| player.mob.is_fighting());
        if fighting && !try_retreat(self, MobId::Player(id)) {
            return CommandOutcome::Ignored;
        }
        let can_walk = self
            .player(id)
            .map_or(false, |player| player.mob.state.can_walk());
        if !can_walk {
            return CommandOutcome::Ignored;
        }
        self.reset_all(id);
        match self.player_mut(id) {
            Some(player) => {
                player.mob.set_path(path);
                CommandOutcome::Applied
            }
            None => CommandOutcome::Ignored,
        }
    }

    fn walk_then(
        &mut self,
        id: PlayerId,
        target: ActionTarget,
        radius: i32,
        on_arrive: ArrivalAction,
        action: Action,
    ) -> CommandOutcome {
        if let ActionTarget::Mob(mob) = target {
            if mob == MobId::Player(id) || self.live_location(mob).is_none() {
                return CommandOutcome::Ignored;
            }
        }
        let Some(player) = self.player_mut(id) else {
            return CommandOutcome::Ignored;
        };
        if !player.mob.state.permits(action) {
            return CommandOutcome::Ignored;
        }
        if player.mob.is_following() {
            player.mob.reset_following();
        }
        player.mob.distanced_action = Some(DistancedAction {
            target,
            radius,
            on_arrive,
        });
        CommandOutcome::Applied
    }

    fn order_attack(&mut self, id: PlayerId, target: MobId) -> CommandOutcome {
        if !can_attack(self, id, target) {
            return CommandOutcome::Ignored;
        }
        let radius = self.rules.melee_radius;
        self.walk_then(id, ActionTarget::Mob(target), radius, ArrivalAction::Attack, Action::Attack)
    }

    fn pray(&mut self, id: PlayerId, index: usize, enabled: bool) -> CommandOutcome {
        let Some(player) = self.player_mut(id) else {
            return CommandOutcome::Ignored;
        };
        if !player.mob.state.permits(Action::Pray) {
            return CommandOutcome::Ignored;
        }
        if enabled {
            CommandOutcome::from_flag(player.prayer_on(index))
        } else {
            player.prayer_off(index);
            CommandOutcome::Applied
        }
    }
}
