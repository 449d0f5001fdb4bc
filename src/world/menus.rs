use crate::entities::mob::PlayerId;
use crate::entities::mob_state::{Action, MobState};
use crate::net::session::{MenuReply, MenuWait, OpenMenu, OutboundEvent};
use crate::world::state::World;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

impl World {
    /// Shows `options` to a player. The returned wait is resolved by the
    /// caller, off the tick, through [`await_menu`].
    pub fn open_option_menu(&mut self, id: PlayerId, options: Vec<String>) -> Option<MenuWait> {
        if options.is_empty() {
            return None;
        }
        let permitted = self
            .player(id)
            .map_or(false, |player| player.mob.state.permits(Action::OptionMenu));
        if !permitted {
            return None;
        }
        let token = self.next_menu_token();
        let (menu, receiver) = OpenMenu::new(token, options.clone());
        let player = self.player_mut(id)?;
        player.menu = Some(menu);
        player.mob.state.insert(MobState::OPTION_MENU);
        player.send(OutboundEvent::OptionMenuOpen(options));
        Some(MenuWait::new(id, token, receiver))
    }

    /// Delivers a client's choice to the menu it answers. Replies to a menu
    /// that is no longer open are dropped.
    pub fn reply_option_menu(&mut self, id: PlayerId, token: u64, index: i32) -> bool {
        self.player(id)
            .and_then(|player| player.menu.as_ref())
            .filter(|menu| menu.token == token)
            .map_or(false, |menu| menu.offer(index))
    }

    /// Settles a menu once its waiter has a result. Returns the chosen
    /// option index when the reply named a real option.
    pub fn resolve_option_menu(&mut self, id: PlayerId, token: u64, reply: MenuReply) -> Option<usize> {
        let player = self.player_mut(id)?;
        if player.menu.as_ref().map(|menu| menu.token) != Some(token) {
            return None;
        }
        let menu = player.menu.take()?;
        player.mob.state.remove(MobState::OPTION_MENU);
        let chatting = player.mob.state.contains(MobState::CHATTING);
        match reply {
            MenuReply::Selected(index) => {
                let chosen = usize::try_from(index)
                    .ok()
                    .filter(|index| *index < menu.options.len())?;
                if chatting {
                    self.chat(id, &menu.options[chosen]);
                }
                Some(chosen)
            }
            MenuReply::TimedOut | MenuReply::Closed => {
                player.send(OutboundEvent::OptionMenuClose);
                None
            }
        }
    }

    /// Dismisses an open menu. A worker still waiting on it sees the menu as
    /// closed.
    pub fn close_option_menu(&mut self, id: PlayerId) {
        let Some(player) = self.player_mut(id) else {
            return;
        };
        let had_menu = player.menu.take().is_some();
        if had_menu || player.mob.state.contains(MobState::OPTION_MENU) {
            player.mob.state.remove(MobState::OPTION_MENU);
            player.send(OutboundEvent::OptionMenuClose);
        }
    }
}

/// Blocks a connection worker until the player answers `wait`, the menu is
/// dismissed, or `timeout` passes. The world lock is only taken to settle
/// the result.
pub fn await_menu(world: &Mutex<World>, wait: MenuWait, timeout: Duration) -> Option<usize> {
    let reply = wait.wait(timeout);
    let mut guard = world.lock().unwrap_or_else(PoisonError::into_inner);
    guard.resolve_option_menu(wait.player, wait.token, reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::attributes::AttributeStore;
    use crate::entities::mob::MobId;
    use crate::net::session::MENU_TIMEOUT;
    use crate::world::definitions::Definitions;
    use crate::world::location::Location;
    use crate::world::time::GameClock;
    use std::sync::Arc;
    use std::thread;

    fn world() -> World {
        World::new(Arc::new(Definitions::default()), GameClock::default(), 1)
    }

    fn options() -> Vec<String> {
        vec!["Yes please".to_string(), "No thanks".to_string()]
    }

    #[test]
    fn reply_resolves_outside_the_lock() {
        let world = Arc::new(Mutex::new(world()));
        let (id, wait) = {
            let mut guard = world.lock().expect("world");
            let handle = guard.connect_player("alice", Location::new(100, 100), AttributeStore::new());
            let wait = guard.open_option_menu(handle.player, options()).expect("menu");
            (handle.player, wait)
        };
        let token = wait.token;
        let waiter = {
            let world = world.clone();
            thread::spawn(move || await_menu(&world, wait, MENU_TIMEOUT))
        };
        {
            let mut guard = world.lock().expect("world");
            assert!(guard.reply_option_menu(id, token, 1));
        }
        assert_eq!(waiter.join().expect("waiter"), Some(1));
        let guard = world.lock().expect("world");
        let player = guard.player(id).expect("player");
        assert!(player.menu.is_none());
        assert!(!player.mob.state.contains(MobState::OPTION_MENU));
    }

    #[test]
    fn reply_survives_a_poisoned_world_lock() {
        let world = Arc::new(Mutex::new(world()));
        let (id, wait) = {
            let mut guard = world.lock().expect("world");
            let handle = guard.connect_player("alice", Location::new(100, 100), AttributeStore::new());
            let wait = guard.open_option_menu(handle.player, options()).expect("menu");
            assert!(guard.reply_option_menu(handle.player, wait.token, 0));
            (handle.player, wait)
        };
        let poisoner = world.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().expect("world");
            panic!("tick thread died holding the world");
        })
        .join();
        assert!(world.is_poisoned());
        assert_eq!(await_menu(&world, wait, MENU_TIMEOUT), Some(0));
        let guard = world.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(guard.player(id).map_or(false, |p| p.menu.is_none()));
    }

    #[test]
    fn out_of_range_reply_yields_none() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let wait = world.open_option_menu(handle.player, options()).expect("menu");
        assert!(world.reply_option_menu(handle.player, wait.token, 5));
        let reply = wait.wait(Duration::from_millis(10));
        assert_eq!(world.resolve_option_menu(handle.player, wait.token, reply), None);
        assert!(world.player(handle.player).map_or(false, |p| p.menu.is_none()));
    }

    #[test]
    fn timeout_closes_the_menu() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let wait = world.open_option_menu(handle.player, options()).expect("menu");
        let reply = wait.wait(Duration::from_millis(5));
        assert_eq!(reply, MenuReply::TimedOut);
        assert_eq!(world.resolve_option_menu(handle.player, wait.token, reply), None);
        assert!(handle.drain().contains(&OutboundEvent::OptionMenuClose));
    }

    #[test]
    fn walking_away_reads_as_closed() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let wait = world.open_option_menu(handle.player, options()).expect("menu");
        world.close_option_menu(handle.player);
        assert_eq!(wait.wait(Duration::from_millis(10)), MenuReply::Closed);
        assert!(!world.reply_option_menu(handle.player, wait.token, 0));
    }

    #[test]
    fn second_menu_is_refused_while_one_is_open() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let _first = world.open_option_menu(handle.player, options()).expect("menu");
        assert!(world.open_option_menu(handle.player, options()).is_none());
        assert!(world.open_option_menu(handle.player, Vec::new()).is_none());
    }

    #[test]
    fn chatting_menus_echo_the_choice() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        if let Some(player) = world.player_mut(handle.player) {
            player.mob.state.insert(MobState::CHATTING);
        }
        let wait = world.open_option_menu(handle.player, options()).expect("menu");
        let chosen = world.resolve_option_menu(handle.player, wait.token, MenuReply::Selected(0));
        assert_eq!(chosen, Some(0));
        assert!(handle.drain().contains(&OutboundEvent::Chat {
            speaker: MobId::Player(handle.player),
            message: "Yes please".to_string(),
        }));
    }
}
