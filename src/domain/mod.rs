pub mod tile;
pub mod grid;
pub mod entity;
pub mod motion;
pub mod ai;
pub mod combat;
