/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Player (death animation, or one resolver step from input)
///   2. Villains, in list order (wake warning, then pursuit)
///   3. Fire
///   4. Beam expiry
///   5. Contact with active villains
///   6. Candy scan
///   7. Win check
///
/// `now_ms` is the caller's clock; the step never reads time itself.

use log::{debug, info};

use crate::domain::ai;
use crate::domain::combat::{self, Combatant};
use crate::domain::entity::{FrameInput, Facing, MoveDir};
use crate::domain::motion::{self, try_move};
use super::event::GameEvent;
use super::scanner;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput, now_ms: u64) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    resolve_player(world, input.movement, now_ms, &mut events);
    if world.phase != Phase::Playing { return events; }
    resolve_villains(world, now_ms, &mut events);
    if input.fire {
        resolve_fire(world, now_ms, &mut events);
    }
    resolve_beams(world, now_ms);
    resolve_contact(world, now_ms, &mut events);
    scanner::scan(world, &mut events);
    resolve_win(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut WorldState, movement: Option<MoveDir>, now_ms: u64, events: &mut Vec<GameEvent>) {
    let combat = &world.tuning.combat;
    if world.player.is_dying() {
        if world.player.update_death(now_ms, combat.death_anim_ms, combat.death_cooldown_ms) {
            finish_death(world, events);
        }
        return;
    }

    let cfg = &world.tuning.motion;
    let player = &mut world.player;
    player.timer = player.timer.wrapping_add(1);
    motion::snap_to_floor(&mut player.body, player.timer, &world.grid, cfg);

    let (dx, dy) = match movement {
        Some(dir) => dir.delta(),
        None => return,
    };
    if let Some(facing) = Facing::from_dx(dx) {
        player.body.facing = facing;
    }
    try_move(&mut player.body, dx, dy, &world.grid, cfg);
}

/// The death animation has played out: respawn, or end the game.
fn finish_death(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.lives == 0 {
        info!("game over with {} points", world.score);
        world.phase = Phase::GameOver;
        world.set_message("GAME OVER", 0);
        events.push(GameEvent::GameOver { score: world.score });
        return;
    }
    let t = world.tile_size();
    world.player.body.teleport_to(world.player_spawn, t);
    world.player.body.facing = Facing::Right;
    debug!("player respawned at {:?}", world.player_spawn);
}

// ══════════════════════════════════════════════════════════════
// Villains
// ══════════════════════════════════════════════════════════════

fn resolve_villains(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) {
    let player = world.player.body.clone();
    let tuning = &world.tuning;

    for v in world.villains.iter_mut() {
        if v.hits.clear_expired(now_ms) {
            info!("villain {} back in pursuit", v.id);
            v.wake_warned = false;
        } else if let Some(until) = v.hits.disabled_until() {
            if !v.wake_warned && until.saturating_sub(now_ms) <= tuning.combat.wake_warning_ms {
                v.wake_warned = true;
                events.push(GameEvent::VillainWaking { id: v.id });
            }
        }
        ai::update_villain(v, &player, &world.grid, &tuning.motion, &tuning.pursuit, now_ms);
    }
}

// ══════════════════════════════════════════════════════════════
// Combat
// ══════════════════════════════════════════════════════════════

fn resolve_fire(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) {
    let was_disabled: Vec<bool> = world.villains.iter().map(|v| v.is_disabled(now_ms)).collect();
    let tuning = &world.tuning;
    let (beam, disabled) = match combat::fire_beam(
        &world.player, &mut world.villains, &world.grid,
        &tuning.motion, &tuning.combat, now_ms,
    ) {
        Some(shot) => shot,
        None => return,
    };

    let origin = world.player.body.tile_position(tuning.motion.tile_size);
    events.push(GameEvent::BeamFired {
        col: origin.col,
        row: origin.row,
        facing: world.player.body.facing,
        disabled,
    });
    for (v, was) in world.villains.iter().zip(was_disabled) {
        if was { continue; }
        if let Some(until_ms) = v.hits.disabled_until().filter(|_| v.is_disabled(now_ms)) {
            events.push(GameEvent::VillainDisabled { id: v.id, until_ms });
        }
    }

    if disabled > 0 {
        let points = disabled * tuning.combat.points_per_disable;
        world.score += points;
        world.set_message(&format!("+{points}"), 30);
    }
    world.beams.push(beam);
}

fn resolve_beams(world: &mut WorldState, now_ms: u64) {
    let duration = world.tuning.combat.beam_duration_ms;
    world.beams.retain(|b| !b.is_expired(now_ms, duration));
}

fn resolve_contact(world: &mut WorldState, now_ms: u64, events: &mut Vec<GameEvent>) {
    let touched = combat::player_touched(
        &world.player, &world.villains, &world.grid, world.tile_size(), now_ms,
    );
    if !touched { return; }

    world.lives = world.lives.saturating_sub(1);
    world.player.start_death(now_ms);
    info!("player caught, {} lives left", world.lives);
    events.push(GameEvent::PlayerKilled { lives_left: world.lives });
}

// ══════════════════════════════════════════════════════════════
// Win check
// ══════════════════════════════════════════════════════════════

fn resolve_win(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.grid.has_candy() { return; }
    world.phase = Phase::LevelComplete;
    info!("level {} cleared, score {}", world.current_level + 1, world.score);
    world.set_message(&format!("{} cleared!  [Enter] next level", world.level_name), 0);
    events.push(GameEvent::LevelCleared { level: world.current_level });
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
