use crate::entities::attributes::SharedAttributes;
use crate::entities::mob::{MobId, PlayerId};
use crate::entities::player::PRAYER_COUNT;
use crate::entities::skills::SkillType;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a connection worker waits for an option menu reply.
pub const MENU_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the simulation tells a connected client. Encoding these onto
/// the wire is the connection layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Message(String),
    Sound(&'static str),
    Damage {
        mob: MobId,
        damage: i32,
        current: i32,
        maximum: i32,
    },
    Death,
    Stats,
    Stat(SkillType),
    Prayers([bool; PRAYER_COUNT]),
    Plane(i32),
    Inventory,
    EquipBonuses,
    Appearance,
    OptionMenuOpen(Vec<String>),
    OptionMenuClose,
    Chat { speaker: MobId, message: String },
    BankOpen,
    BankClose,
    ShopOpen(u32),
    ShopClose,
    AppearanceOpen,
    SleepOpen,
    SleepClose,
    TradeOpen(PlayerId),
    TradeUpdate,
    TradeClose,
    DuelOpen(PlayerId),
    DuelUpdate,
    DuelClose,
    Logout,
}

/// Tick-side end of a player's connection.
#[derive(Debug)]
pub struct Session {
    outbound: Sender<OutboundEvent>,
    connected: Arc<AtomicBool>,
    torn_down: AtomicBool,
}

impl Session {
    /// Creates the tick-side end plus the receiver and liveness flag handed
    /// to the connection worker.
    pub fn open() -> (Self, Receiver<OutboundEvent>, Arc<AtomicBool>) {
        let (outbound, events) = crossbeam_channel::unbounded();
        let connected = Arc::new(AtomicBool::new(true));
        let session = Self {
            outbound,
            connected: connected.clone(),
            torn_down: AtomicBool::new(false),
        };
        (session, events, connected)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.torn_down.load(Ordering::Acquire)
    }

    /// Queues an event. Events to a dead connection are dropped.
    pub fn send(&self, event: OutboundEvent) {
        if !self.is_connected() {
            return;
        }
        let _ = self.outbound.send(event);
    }

    /// Marks the session torn down. Only the first caller gets `true`.
    pub fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

/// Connection-worker end of a player's session.
#[derive(Debug)]
pub struct SessionHandle {
    pub player: PlayerId,
    pub events: Receiver<OutboundEvent>,
    pub attributes: SharedAttributes,
    pub transients: SharedAttributes,
    connected: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(
        player: PlayerId,
        events: Receiver<OutboundEvent>,
        connected: Arc<AtomicBool>,
        attributes: SharedAttributes,
        transients: SharedAttributes,
    ) -> Self {
        Self {
            player,
            events,
            attributes,
            transients,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// The socket closed; the tick tears the player down on its next pass.
    pub fn hang_up(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn drain(&self) -> Vec<OutboundEvent> {
        self.events.try_iter().collect()
    }
}

/// An option menu the tick is holding open for a player.
#[derive(Debug)]
pub struct OpenMenu {
    pub token: u64,
    pub options: Vec<String>,
    reply: Sender<i32>,
}

impl OpenMenu {
    pub fn new(token: u64, options: Vec<String>) -> (Self, Receiver<i32>) {
        let (reply, receiver) = crossbeam_channel::bounded(1);
        (
            Self {
                token,
                options,
                reply,
            },
            receiver,
        )
    }

    /// Hands a reply to the waiting worker. A second reply is refused.
    pub fn offer(&self, index: i32) -> bool {
        self.reply.try_send(index).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuReply {
    Selected(i32),
    /// The menu was closed, or the player left, before a reply arrived.
    Closed,
    TimedOut,
}

/// Returned to the caller that opened a menu; waiting on it happens outside
/// the world lock.
#[derive(Debug)]
pub struct MenuWait {
    pub player: PlayerId,
    pub token: u64,
    receiver: Receiver<i32>,
}

impl MenuWait {
    pub fn new(player: PlayerId, token: u64, receiver: Receiver<i32>) -> Self {
        Self {
            player,
            token,
            receiver,
        }
    }

    pub fn wait(&self, timeout: Duration) -> MenuReply {
        match self.receiver.recv_timeout(timeout) {
            Ok(index) => MenuReply::Selected(index),
            Err(RecvTimeoutError::Timeout) => MenuReply::TimedOut,
            Err(RecvTimeoutError::Disconnected) => MenuReply::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_stop_after_teardown() {
        let (session, events, _connected) = Session::open();
        session.send(OutboundEvent::Sound("death"));
        assert!(session.begin_teardown());
        assert!(!session.begin_teardown());
        session.send(OutboundEvent::Death);
        let received: Vec<OutboundEvent> = events.try_iter().collect();
        assert_eq!(received, vec![OutboundEvent::Sound("death")]);
    }

    #[test]
    fn hang_up_is_visible_to_the_tick() {
        let (session, events, connected) = Session::open();
        let handle = SessionHandle::new(
            PlayerId(1),
            events,
            connected,
            SharedAttributes::new(),
            SharedAttributes::new(),
        );
        assert!(session.is_connected());
        handle.hang_up();
        assert!(!session.is_connected());
        assert!(!handle.is_connected());
    }

    #[test]
    fn menu_reply_is_accepted_once() {
        let (menu, receiver) = OpenMenu::new(7, vec!["Yes".to_string(), "No".to_string()]);
        let wait = MenuWait::new(PlayerId(1), menu.token, receiver);
        assert!(menu.offer(1));
        assert!(!menu.offer(0));
        assert_eq!(wait.wait(Duration::from_millis(10)), MenuReply::Selected(1));
    }

    #[test]
    fn dropped_menu_reads_as_closed() {
        let (menu, receiver) = OpenMenu::new(1, vec!["Ok".to_string()]);
        let wait = MenuWait::new(PlayerId(1), 1, receiver);
        drop(menu);
        assert_eq!(wait.wait(Duration::from_millis(10)), MenuReply::Closed);
    }

    #[test]
    fn silent_menu_times_out() {
        let (_menu, receiver) = OpenMenu::new(1, vec!["Ok".to_string()]);
        let wait = MenuWait::new(PlayerId(1), 1, receiver);
        assert_eq!(wait.wait(Duration::from_millis(5)), MenuReply::TimedOut);
    }
}
