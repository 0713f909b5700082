/// WorldState: the complete snapshot of a running game.
///
/// Everything the simulation mutates lives here or on the actors it
/// owns; there is no global state. The grid is the level as loaded minus
/// the candy collected so far.

use crate::config::Tuning;
use crate::domain::combat::{Beam, Combatant};
use crate::domain::entity::{Body, Player, Villain};
use crate::domain::grid::{Grid, TilePos};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    LevelComplete,
    GameOver,
}

pub struct WorldState {
    // ── Level ──
    pub grid: Grid,
    pub player_spawn: TilePos,
    pub villain_spawns: Vec<TilePos>,

    // ── Entities ──
    pub player: Player,
    pub villains: Vec<Villain>,
    pub beams: Vec<Beam>,

    // ── Tuning ──
    pub tuning: Tuning,

    // ── Meta ──
    pub phase: Phase,
    pub score: u32,
    pub lives: u32,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    /// Completed passes over the whole level list.
    pub loop_count: u32,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
}

impl WorldState {
    pub fn new(tuning: Tuning) -> Self {
        let lives = tuning.combat.lives;
        let speed = tuning.motion.player_speed;
        WorldState {
            grid: Grid::new(vec![]),
            player_spawn: TilePos::new(0, 0),
            villain_spawns: vec![],
            player: Player::new(Body::new(0.0, 0.0, speed)),
            villains: vec![],
            beams: vec![],
            tuning,
            phase: Phase::Playing,
            score: 0,
            lives,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            loop_count: 0,
            tick: 0,
            message: String::new(),
            message_timer: 0,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tile_size(&self) -> f32 {
        self.tuning.motion.tile_size
    }

    /// Villain speed scale: grows each time the level list wraps around.
    pub fn speed_multiplier(&self) -> f32 {
        1.0 + self.loop_count as f32 * self.tuning.pursuit.loop_speedup
    }

    pub fn active_villains(&self, now_ms: u64) -> usize {
        self.villains.iter().filter(|v| !v.is_disabled(now_ms)).count()
    }

    pub fn candies_left(&self) -> usize {
        self.grid.candies().len()
    }
}
