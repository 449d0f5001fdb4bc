pub mod attributes;
pub mod inventory;
pub mod mob;
pub mod mob_state;
pub mod npc;
pub mod player;
pub mod skills;
