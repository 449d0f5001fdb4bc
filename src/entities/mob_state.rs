use std::fmt;

/// Independent behaviour flags of a mob. Several may be set at once; which
/// combinations gate which actions lives in [`LEGALITY`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MobState(u16);

impl MobState {
    pub const IDLE: MobState = MobState(0);
    pub const FIGHTING: MobState = MobState(1 << 0);
    pub const DUELING: MobState = MobState(1 << 1);
    pub const TRADING: MobState = MobState(1 << 2);
    pub const BANKING: MobState = MobState(1 << 3);
    pub const SHOPPING: MobState = MobState(1 << 4);
    pub const CHANGING_APPEARANCE: MobState = MobState(1 << 5);
    pub const OPTION_MENU: MobState = MobState(1 << 6);
    pub const SLEEPING: MobState = MobState(1 << 7);
    pub const BUSY: MobState = MobState(1 << 8);
    pub const BATCHING: MobState = MobState(1 << 9);
    pub const ITEM_ACTION: MobState = MobState(1 << 10);
    pub const CHATTING: MobState = MobState(1 << 11);

    const NAMES: [(MobState, &'static str); 12] = [
        (MobState::FIGHTING, "fighting"),
        (MobState::DUELING, "dueling"),
        (MobState::TRADING, "trading"),
        (MobState::BANKING, "banking"),
        (MobState::SHOPPING, "shopping"),
        (MobState::CHANGING_APPEARANCE, "changing_appearance"),
        (MobState::OPTION_MENU, "option_menu"),
        (MobState::SLEEPING, "sleeping"),
        (MobState::BUSY, "busy"),
        (MobState::BATCHING, "batching"),
        (MobState::ITEM_ACTION, "item_action"),
        (MobState::CHATTING, "chatting"),
    ];

    pub const fn union(self, other: MobState) -> MobState {
        MobState(self.0 | other.0)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: MobState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: MobState) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: MobState) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MobState) {
        self.0 &= !other.0;
    }

    pub fn is_idle(self) -> bool {
        self.0 == 0
    }

    /// Whether `action` may start given the current flags.
    pub fn permits(self, action: Action) -> bool {
        !self.intersects(forbidden_states(action))
    }

    /// Walking is refused while any movement-locking flag is set, except that
    /// walking away from an option menu opened by chat or an item action is
    /// taken as cancelling the menu.
    pub fn can_walk(self) -> bool {
        if self.contains(MobState::OPTION_MENU)
            && self.intersects(MobState::CHATTING.union(MobState::ITEM_ACTION))
        {
            return true;
        }
        self.permits(Action::Walk)
    }
}

impl std::ops::BitOr for MobState {
    type Output = MobState;

    fn bitor(self, rhs: MobState) -> MobState {
        self.union(rhs)
    }
}

impl fmt::Debug for MobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "MobState(idle)")
        } else {
            write!(f, "MobState({})", names.join("|"))
        }
    }
}

/// Externally triggered actions whose legality depends on the mob's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Walk,
    Attack,
    Follow,
    Trade,
    Duel,
    OpenBank,
    OpenShop,
    ChangeAppearance,
    OptionMenu,
    Sleep,
    TakeItem,
    Pray,
}

const WALK_LOCKS: MobState = MobState::BATCHING
    .union(MobState::FIGHTING)
    .union(MobState::TRADING)
    .union(MobState::DUELING)
    .union(MobState::CHANGING_APPEARANCE)
    .union(MobState::SLEEPING)
    .union(MobState::CHATTING)
    .union(MobState::BUSY)
    .union(MobState::SHOPPING);

const INTERFACE_OPEN: MobState = MobState::TRADING
    .union(MobState::BANKING)
    .union(MobState::SHOPPING)
    .union(MobState::CHANGING_APPEARANCE)
    .union(MobState::SLEEPING);

/// Action -> flags that forbid it. Adding a blocking flag is a one-line edit.
pub const LEGALITY: [(Action, MobState); 12] = [
    (Action::Walk, WALK_LOCKS),
    (
        Action::Attack,
        INTERFACE_OPEN
            .union(MobState::FIGHTING)
            .union(MobState::BUSY),
    ),
    (
        Action::Follow,
        MobState::FIGHTING
            .union(MobState::TRADING)
            .union(MobState::SLEEPING)
            .union(MobState::BUSY),
    ),
    (
        Action::Trade,
        INTERFACE_OPEN
            .union(MobState::FIGHTING)
            .union(MobState::DUELING)
            .union(MobState::BUSY),
    ),
    (
        Action::Duel,
        INTERFACE_OPEN
            .union(MobState::FIGHTING)
            .union(MobState::DUELING)
            .union(MobState::BUSY),
    ),
    (
        Action::OpenBank,
        MobState::FIGHTING
            .union(MobState::TRADING)
            .union(MobState::BANKING),
    ),
    (
        Action::OpenShop,
        MobState::FIGHTING
            .union(MobState::TRADING)
            .union(MobState::SHOPPING),
    ),
    (
        Action::ChangeAppearance,
        MobState::FIGHTING.union(MobState::TRADING),
    ),
    (
        Action::OptionMenu,
        MobState::TRADING.union(MobState::OPTION_MENU),
    ),
    (
        Action::Sleep,
        MobState::FIGHTING
            .union(MobState::TRADING)
            .union(MobState::DUELING)
            .union(MobState::SLEEPING),
    ),
    (
        Action::TakeItem,
        INTERFACE_OPEN
            .union(MobState::FIGHTING)
            .union(MobState::BUSY),
    ),
    (Action::Pray, MobState::SLEEPING),
];

pub fn forbidden_states(action: Action) -> MobState {
    LEGALITY
        .iter()
        .find(|(entry, _)| *entry == action)
        .map_or(MobState::IDLE, |(_, forbidden)| *forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_a_table_entry() {
        for action in [
            Action::Walk,
            Action::Attack,
            Action::Follow,
            Action::Trade,
            Action::Duel,
            Action::OpenBank,
            Action::OpenShop,
            Action::ChangeAppearance,
            Action::OptionMenu,
            Action::Sleep,
            Action::TakeItem,
            Action::Pray,
        ] {
            assert!(LEGALITY.iter().any(|(entry, _)| *entry == action));
        }
    }

    #[test]
    fn insert_and_remove_are_independent() {
        let mut state = MobState::IDLE;
        state.insert(MobState::FIGHTING | MobState::DUELING);
        state.remove(MobState::DUELING);
        assert!(state.contains(MobState::FIGHTING));
        assert!(!state.contains(MobState::DUELING));
        assert_eq!(format!("{:?}", state), "MobState(fighting)");
        state.remove(MobState::FIGHTING);
        assert!(state.is_idle());
    }

    #[test]
    fn walking_is_locked_by_fight_and_trade() {
        assert!(MobState::IDLE.can_walk());
        assert!(!MobState::FIGHTING.can_walk());
        assert!(!MobState::TRADING.can_walk());
        assert!(MobState::BANKING.can_walk());
        assert!(MobState::OPTION_MENU.can_walk());
    }

    #[test]
    fn menu_carve_out_permits_walking_while_chatting() {
        assert!(!MobState::CHATTING.can_walk());
        assert!((MobState::CHATTING | MobState::OPTION_MENU).can_walk());
        assert!((MobState::ITEM_ACTION | MobState::OPTION_MENU | MobState::BUSY).can_walk());
    }

    #[test]
    fn option_menu_is_refused_while_trading_or_already_open() {
        assert!(MobState::FIGHTING.permits(Action::OptionMenu));
        assert!(!MobState::TRADING.permits(Action::OptionMenu));
        assert!(!MobState::OPTION_MENU.permits(Action::OptionMenu));
    }

    #[test]
    fn bank_requires_no_fight_or_trade() {
        assert!(MobState::IDLE.permits(Action::OpenBank));
        assert!(!MobState::FIGHTING.permits(Action::OpenBank));
        assert!(!MobState::BANKING.permits(Action::OpenBank));
        assert!(MobState::SHOPPING.permits(Action::OpenBank));
    }
}
