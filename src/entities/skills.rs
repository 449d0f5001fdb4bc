use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const SKILL_COUNT: usize = 18;
pub const MAX_LEVEL: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillType {
    Attack,
    Defense,
    Strength,
    Hits,
    Ranged,
    Prayer,
    Magic,
    Cooking,
    Woodcutting,
    Fletching,
    Fishing,
    Firemaking,
    Crafting,
    Smithing,
    Mining,
    Herblaw,
    Agility,
    Thieving,
}

impl SkillType {
    pub const ALL: [SkillType; SKILL_COUNT] = [
        SkillType::Attack,
        SkillType::Defense,
        SkillType::Strength,
        SkillType::Hits,
        SkillType::Ranged,
        SkillType::Prayer,
        SkillType::Magic,
        SkillType::Cooking,
        SkillType::Woodcutting,
        SkillType::Fletching,
        SkillType::Fishing,
        SkillType::Firemaking,
        SkillType::Crafting,
        SkillType::Smithing,
        SkillType::Mining,
        SkillType::Herblaw,
        SkillType::Agility,
        SkillType::Thieving,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SkillType::Attack => "attack",
            SkillType::Defense => "defense",
            SkillType::Strength => "strength",
            SkillType::Hits => "hits",
            SkillType::Ranged => "ranged",
            SkillType::Prayer => "prayer",
            SkillType::Magic => "magic",
            SkillType::Cooking => "cooking",
            SkillType::Woodcutting => "woodcutting",
            SkillType::Fletching => "fletching",
            SkillType::Fishing => "fishing",
            SkillType::Firemaking => "firemaking",
            SkillType::Crafting => "crafting",
            SkillType::Smithing => "smithing",
            SkillType::Mining => "mining",
            SkillType::Herblaw => "herblaw",
            SkillType::Agility => "agility",
            SkillType::Thieving => "thieving",
        }
    }
}

fn experience_table() -> &'static [i64; MAX_LEVEL as usize] {
    static TABLE: OnceLock<[i64; MAX_LEVEL as usize]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0i64; MAX_LEVEL as usize];
        let mut total = 0i64;
        for (index, slot) in table.iter_mut().enumerate() {
            let level = (index + 1) as f64;
            total += (level + 300.0 * 2f64.powf(level / 7.0)) as i64;
            *slot = (total & 0x0fff_fffc) / 4;
        }
        table
    })
}

/// Experience needed to reach `level`. Level 1 and anything out of range
/// need none.
pub fn level_to_experience(level: i32) -> i64 {
    let index = level - 2;
    if !(0..MAX_LEVEL).contains(&index) {
        return 0;
    }
    experience_table()[index as usize]
}

pub fn experience_to_level(experience: i64) -> i32 {
    for (index, needed) in experience_table().iter().enumerate() {
        if *needed > experience {
            return (index as i32 + 1).min(MAX_LEVEL);
        }
    }
    MAX_LEVEL
}

/// Current, maximum and experience per skill. Experience only ever grows;
/// the maximum level follows it through the level curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skills {
    current: [i32; SKILL_COUNT],
    maximum: [i32; SKILL_COUNT],
    experience: [i64; SKILL_COUNT],
}

impl Default for Skills {
    fn default() -> Self {
        let mut skills = Self {
            current: [1; SKILL_COUNT],
            maximum: [1; SKILL_COUNT],
            experience: [0; SKILL_COUNT],
        };
        skills.set_level(SkillType::Hits, 10);
        skills
    }
}

impl Skills {
    pub fn current(&self, skill: SkillType) -> i32 {
        self.current[skill.index()]
    }

    pub fn maximum(&self, skill: SkillType) -> i32 {
        self.maximum[skill.index()]
    }

    pub fn experience(&self, skill: SkillType) -> i64 {
        self.experience[skill.index()]
    }

    pub fn set_current(&mut self, skill: SkillType, level: i32) {
        self.current[skill.index()] = level.max(0);
    }

    pub fn decrease_current(&mut self, skill: SkillType, amount: i32) {
        let slot = &mut self.current[skill.index()];
        *slot = (*slot - amount.max(0)).max(0);
    }

    /// Sets current, maximum and experience to match `level`.
    pub fn set_level(&mut self, skill: SkillType, level: i32) {
        let level = level.clamp(1, MAX_LEVEL);
        self.current[skill.index()] = level;
        self.maximum[skill.index()] = level;
        self.experience[skill.index()] = level_to_experience(level);
    }

    pub fn restore_all(&mut self) {
        self.current = self.maximum;
    }

    /// Adds experience and returns how many levels were gained.
    pub fn increase_experience(&mut self, skill: SkillType, amount: i64) -> i32 {
        let index = skill.index();
        self.experience[index] = self.experience[index].saturating_add(amount.max(0));
        let level = experience_to_level(self.experience[index]);
        let gained = level - self.maximum[index];
        if gained > 0 {
            self.maximum[index] += gained;
            self.current[index] += gained;
        }
        gained.max(0)
    }

    pub fn combat_level(&self) -> i32 {
        let aggressive = f64::from(self.maximum(SkillType::Attack) + self.maximum(SkillType::Strength));
        let defensive = f64::from(self.maximum(SkillType::Defense) + self.maximum(SkillType::Hits));
        let spiritual =
            f64::from(self.maximum(SkillType::Prayer) + self.maximum(SkillType::Magic)) / 8.0;
        let ranged = f64::from(self.maximum(SkillType::Ranged));
        if aggressive < ranged * 1.5 {
            (defensive / 4.0 + ranged * 0.375 + spiritual) as i32
        } else {
            (aggressive / 4.0 + defensive / 4.0 + spiritual) as i32
        }
    }

    /// Skills of an NPC built from its definition's four combat stats.
    pub fn for_npc(attack: i32, defense: i32, strength: i32, hits: i32) -> Self {
        let mut skills = Self::default();
        skills.set_level(SkillType::Attack, attack);
        skills.set_level(SkillType::Defense, defense);
        skills.set_level(SkillType::Strength, strength);
        skills.set_level(SkillType::Hits, hits);
        skills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_curve_matches_classic_table() {
        assert_eq!(level_to_experience(1), 0);
        assert_eq!(level_to_experience(2), 83);
        assert_eq!(level_to_experience(10), 1154);
        assert_eq!(experience_to_level(0), 1);
        assert_eq!(experience_to_level(83), 2);
        assert_eq!(experience_to_level(1153), 9);
        assert_eq!(experience_to_level(i64::MAX), 99);
    }

    #[test]
    fn new_character_is_combat_level_three() {
        let skills = Skills::default();
        assert_eq!(skills.maximum(SkillType::Hits), 10);
        assert_eq!(skills.combat_level(), 3);
    }

    #[test]
    fn combat_level_uses_ranged_when_dominant() {
        let mut skills = Skills::default();
        for skill in [
            SkillType::Attack,
            SkillType::Defense,
            SkillType::Strength,
            SkillType::Hits,
        ] {
            skills.set_level(skill, 50);
        }
        assert_eq!(skills.combat_level(), 50);
        skills.set_level(SkillType::Ranged, 99);
        assert_eq!(skills.combat_level(), 62);
    }

    #[test]
    fn experience_gain_raises_both_levels() {
        let mut skills = Skills::default();
        skills.decrease_current(SkillType::Attack, 5);
        assert_eq!(skills.current(SkillType::Attack), 0);
        let gained = skills.increase_experience(SkillType::Attack, level_to_experience(3));
        assert_eq!(gained, 2);
        assert_eq!(skills.maximum(SkillType::Attack), 3);
        assert_eq!(skills.current(SkillType::Attack), 2);
        assert_eq!(skills.increase_experience(SkillType::Attack, -50), 0);
        assert_eq!(skills.experience(SkillType::Attack), level_to_experience(3));
    }

    #[test]
    fn restore_all_resets_current_to_maximum() {
        let mut skills = Skills::for_npc(5, 5, 5, 8);
        skills.decrease_current(SkillType::Hits, 3);
        skills.restore_all();
        assert_eq!(skills.current(SkillType::Hits), 8);
    }
}
