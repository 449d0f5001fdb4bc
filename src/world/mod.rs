pub mod actions;
pub mod collision;
pub mod commands;
pub mod definitions;
pub mod ground_item;
pub mod location;
pub mod menus;
pub mod movement;
pub mod object;
pub mod pathway;
pub mod region;
pub mod scheduler;
pub mod state;
pub mod tasks;
pub mod tick;
pub mod time;
pub mod trade;
