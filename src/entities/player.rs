use crate::entities::attributes::{AttributeStore, AttributeValue, SharedAttributes};
use crate::entities::inventory::{Inventory, DUEL_OFFER_CAPACITY, TRADE_OFFER_CAPACITY};
use crate::entities::mob::{Mob, MobId, PlayerId};
use crate::entities::mob_state::MobState;
use crate::entities::skills::{SkillType, Skills};
use crate::net::session::{OpenMenu, OutboundEvent, Session};
use crate::world::location::Location;
use std::time::Duration;

pub const PRAYER_COUNT: usize = 14;
pub const PROTECT_ITEM_PRAYER: usize = 8;
pub const PARALYZE_MONSTER_PRAYER: usize = 12;

/// Prayers within a group replace one another.
const PRAYER_GROUPS: [[usize; 3]; 3] = [[0, 3, 9], [1, 4, 10], [2, 5, 11]];

// Persistent attributes.
pub const SKULL_TICKS: &str = "skull_ticks";
/// How long an unprovoked attack on another player keeps the attacker skulled.
pub const SKULL_DURATION: Duration = Duration::from_secs(20 * 60);
pub const FIGHT_MODE: &str = "fight_mode";

// Transient attributes.
pub const DEATH_TIME: &str = "death_time";
pub const TRADE_TARGET: &str = "trade_target";
pub const TRADE_ACCEPTED: &str = "trade_accepted";
pub const DUEL_TARGET: &str = "duel_target";
pub const DUEL_ACCEPTED: &str = "duel_accepted";
pub const DUEL_CONFIRMED: &str = "duel_confirmed";
pub const DUEL_CAN_RETREAT: &str = "duel_can_retreat";
pub const DUEL_CAN_MAGIC: &str = "duel_can_magic";
pub const DUEL_CAN_PRAYER: &str = "duel_can_prayer";
pub const DUEL_CAN_EQUIP: &str = "duel_can_equip";
pub const SHOP: &str = "shop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FightMode {
    #[default]
    Controlled,
    Aggressive,
    Accurate,
    Defensive,
}

impl FightMode {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(FightMode::Controlled),
            1 => Some(FightMode::Aggressive),
            2 => Some(FightMode::Accurate),
            3 => Some(FightMode::Defensive),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            FightMode::Controlled => 0,
            FightMode::Aggressive => 1,
            FightMode::Accurate => 2,
            FightMode::Defensive => 3,
        }
    }

    /// Skill trained by this stance, or `None` when melee experience is
    /// shared across attack, defense and strength.
    pub fn trained_skill(self) -> Option<SkillType> {
        match self {
            FightMode::Controlled => None,
            FightMode::Aggressive => Some(SkillType::Strength),
            FightMode::Accurate => Some(SkillType::Attack),
            FightMode::Defensive => Some(SkillType::Defense),
        }
    }
}

/// What a duel allows. Everything is allowed until the players agree
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelRules {
    pub retreat: bool,
    pub magic: bool,
    pub prayer: bool,
    pub equipment: bool,
}

impl Default for DuelRules {
    fn default() -> Self {
        Self {
            retreat: true,
            magic: true,
            prayer: true,
            equipment: true,
        }
    }
}

#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub mob: Mob,
    pub username: String,
    /// Survives logout; shared with the connection worker.
    pub attributes: SharedAttributes,
    pub inventory: Inventory,
    pub trade_offer: Inventory,
    pub duel_offer: Inventory,
    pub prayers: [bool; PRAYER_COUNT],
    pub session: Session,
    pub menu: Option<OpenMenu>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        username: String,
        location: Location,
        attributes: AttributeStore,
        session: Session,
    ) -> Self {
        Self {
            id,
            mob: Mob::new(MobId::Player(id), location, Skills::default()),
            username,
            attributes: SharedAttributes::from_store(attributes),
            inventory: Inventory::default(),
            trade_offer: Inventory::with_capacity(TRADE_OFFER_CAPACITY),
            duel_offer: Inventory::with_capacity(DUEL_OFFER_CAPACITY),
            prayers: [false; PRAYER_COUNT],
            session,
            menu: None,
        }
    }

    pub fn location(&self) -> Location {
        self.mob.location
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn send(&self, event: OutboundEvent) {
        self.session.send(event);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.send(OutboundEvent::Message(text.into()));
    }

    pub fn play_sound(&self, name: &'static str) {
        self.send(OutboundEvent::Sound(name));
    }

    pub fn fight_mode(&self) -> FightMode {
        FightMode::from_index(self.attributes.var_int(FIGHT_MODE, 0)).unwrap_or_default()
    }

    pub fn set_fight_mode(&self, mode: FightMode) {
        self.attributes.set_int(FIGHT_MODE, mode.index());
    }

    pub fn is_skulled(&self) -> bool {
        self.attributes.var_int(SKULL_TICKS, 0) > 0
    }

    /// Skulls the player for `ticks` ticks, restarting any running timer.
    pub fn skull(&self, ticks: u64) {
        self.attributes.set_int(SKULL_TICKS, ticks as i64);
        self.send(OutboundEvent::Appearance);
    }

    pub fn unskull(&self) {
        self.attributes.unset_var(SKULL_TICKS);
        self.send(OutboundEvent::Appearance);
    }

    pub fn is_dueling(&self) -> bool {
        self.mob.state.contains(MobState::DUELING)
    }

    pub fn trade_target(&self) -> Option<PlayerId> {
        self.mob
            .transients
            .var_mob(TRADE_TARGET)
            .and_then(MobId::player)
    }

    pub fn duel_target(&self) -> Option<PlayerId> {
        self.mob
            .transients
            .var_mob(DUEL_TARGET)
            .and_then(MobId::player)
    }

    pub fn duel_rules(&self) -> DuelRules {
        let transients = self.mob.transients.lock();
        DuelRules {
            retreat: transients.var_bool(DUEL_CAN_RETREAT, true),
            magic: transients.var_bool(DUEL_CAN_MAGIC, true),
            prayer: transients.var_bool(DUEL_CAN_PRAYER, true),
            equipment: transients.var_bool(DUEL_CAN_EQUIP, true),
        }
    }

    pub fn set_duel_rules(&self, rules: DuelRules) {
        let mut transients = self.mob.transients.lock();
        for (key, allowed) in [
            (DUEL_CAN_RETREAT, rules.retreat),
            (DUEL_CAN_MAGIC, rules.magic),
            (DUEL_CAN_PRAYER, rules.prayer),
            (DUEL_CAN_EQUIP, rules.equipment),
        ] {
            transients.set_var(key, AttributeValue::Bool(allowed));
        }
    }

    pub fn prayer_active(&self, index: usize) -> bool {
        self.prayers.get(index).copied().unwrap_or(false)
    }

    /// Activates a prayer, switching off the others in its group. Refused in
    /// a duel that forbids prayer.
    pub fn prayer_on(&mut self, index: usize) -> bool {
        if index >= PRAYER_COUNT {
            return false;
        }
        if self.is_dueling() && !self.duel_rules().prayer {
            self.message("You cannot use prayer in this duel!");
            self.send(OutboundEvent::Prayers(self.prayers));
            return false;
        }
        if let Some(group) = PRAYER_GROUPS.iter().find(|group| group.contains(&index)) {
            for other in group {
                self.prayers[*other] = false;
            }
        }
        self.prayers[index] = true;
        self.send(OutboundEvent::Prayers(self.prayers));
        true
    }

    pub fn prayer_off(&mut self, index: usize) {
        if let Some(slot) = self.prayers.get_mut(index) {
            *slot = false;
        }
        self.send(OutboundEvent::Prayers(self.prayers));
    }

    pub fn prayers_off(&mut self) {
        self.prayers = [false; PRAYER_COUNT];
        self.send(OutboundEvent::Prayers(self.prayers));
    }

    pub fn increase_experience(&mut self, skill: SkillType, amount: i64) {
        let gained = self.mob.skills.increase_experience(skill, amount);
        if gained > 0 {
            self.play_sound("advance");
            self.message(format!(
                "@gre@You just advanced {} {} level{}!",
                gained,
                skill.name(),
                if gained == 1 { "" } else { "s" }
            ));
        }
        self.send(OutboundEvent::Stat(skill));
    }

    /// Splits melee experience according to the current fight mode. Hits
    /// always receives a share.
    pub fn distribute_melee_experience(&mut self, experience: i64) {
        match self.fight_mode().trained_skill() {
            Some(skill) => self.increase_experience(skill, experience * 3),
            None => {
                for skill in [SkillType::Attack, SkillType::Defense, SkillType::Strength] {
                    self.increase_experience(skill, experience);
                }
            }
        }
        self.increase_experience(SkillType::Hits, experience);
    }
}
