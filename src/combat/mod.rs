pub mod damage;
pub mod death;
pub mod engage;
pub mod round;
pub mod rules;
