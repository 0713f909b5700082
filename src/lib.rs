//! Candy Grab: a tile-grid platformer core.
//!
//! `domain` holds the rules (grid, motion resolver, villain pursuit,
//! combat), `sim` advances a whole level one tick at a time, and `ui` is
//! the terminal front-end driven by the binary.

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
