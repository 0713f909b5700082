/// Villain AI: rule-based pursuit over the tile grid.
///
/// Each tick a villain runs through these states in strict priority
/// order; the first terminal one ends its turn:
///   1. **Floor recovery**: inside a floor tile, nudge up and drop the climb.
///   2. **Stuck**: same tile for too long, clear intent and try to sidestep.
///   3. **Seek ladder**: a lateral chase was blocked earlier, so walk the
///      remembered direction until a ladder is found, then climb it.
///   4. **Opportunistic climb**: on any ladder tile, climb toward the
///      player's row.
///   5. **Column climb**: same column as the player, try a climb and
///      fall through.
///   6. **Chase**: step horizontally toward the player; if blocked off a
///      ladder, start seeking a ladder the other way.
///
/// Movement itself is always delegated to `motion::try_move`; refused
/// steps are silently absorbed.

use log::{debug, trace};

use crate::config::{MotionConfig, PursuitConfig};
use super::combat::Combatant;
use super::entity::{Body, Climb, ClimbDir, Facing, Villain};
use super::grid::{Grid, TilePos};
use super::motion::{self, try_move};
use super::tile::Tile;

/// Advance one villain by one tick.
pub fn update_villain(
    v: &mut Villain,
    player: &Body,
    grid: &Grid,
    motion_cfg: &MotionConfig,
    pursuit: &PursuitConfig,
    now_ms: u64,
) {
    v.timer = v.timer.wrapping_add(1);
    if v.is_disabled(now_ms) { return; }

    motion::snap_to_floor(&mut v.body, v.timer, grid, motion_cfg);

    let here = v.body.tile_position(motion_cfg.tile_size);
    let current = grid.tile(here);

    if recover_from_floor(v, current, motion_cfg) { return; }
    if handle_stuck(v, here, grid, motion_cfg, pursuit) { return; }
    if handle_seek_ladder(v, player, grid, motion_cfg) { return; }
    if current.is_ladder_family() && try_climb(v, player, grid, motion_cfg) { return; }
    if here.col == player.tile_position(motion_cfg.tile_size).col {
        try_climb(v, player, grid, motion_cfg);
    }
    move_toward_player(v, player, grid, motion_cfg);
}

// ── States ──

fn recover_from_floor(v: &mut Villain, current: Tile, cfg: &MotionConfig) -> bool {
    if current != Tile::Floor { return false; }
    trace!("villain {} inside floor, nudging up", v.id);
    v.body.y -= cfg.floor_nudge;
    v.climb = None;
    true
}

fn handle_stuck(
    v: &mut Villain,
    here: TilePos,
    grid: &Grid,
    cfg: &MotionConfig,
    pursuit: &PursuitConfig,
) -> bool {
    if !v.stuck.observe(here, pursuit.stuck_limit_ticks) { return false; }
    jostle(v, here);
    for dx in [-1, 1] {
        if try_move(&mut v.body, dx, 0, grid, cfg) {
            return true;
        }
    }
    false
}

/// Clear every pursuit flag after being stuck too long.
pub fn jostle(v: &mut Villain, here: TilePos) {
    debug!("villain {} stuck at {here:?}, clearing flags", v.id);
    v.clear_intent();
    v.stuck.reset();
}

fn handle_seek_ladder(v: &mut Villain, player: &Body, grid: &Grid, cfg: &MotionConfig) -> bool {
    let dir = match v.seek { Some(d) => d, None => return false };
    v.body.facing = dir;
    if motion::on_ladder(&v.body, grid, cfg.tile_size) {
        if try_climb(v, player, grid, cfg)
            && motion::valid_floor_below(&v.body, grid, cfg.tile_size)
        {
            v.seek = None;
        }
    } else {
        try_move(&mut v.body, dir.dx(), 0, grid, cfg);
    }
    true
}

fn move_toward_player(v: &mut Villain, player: &Body, grid: &Grid, cfg: &MotionConfig) {
    let delta = player.x - v.body.x;
    if delta.abs() < 1.0 { return; }
    let dir = if delta > 0.0 { Facing::Right } else { Facing::Left };
    v.body.facing = dir;
    if try_move(&mut v.body, dir.dx(), 0, grid, cfg) { return; }

    let here = grid.tile(v.body.tile_position(cfg.tile_size));
    if !here.is_ladder_family() {
        debug!("villain {} blocked heading {dir:?}, seeking a ladder", v.id);
        v.seek = Some(dir.reverse());
    }
}

// ── Climb sub-procedure ──

/// Climb toward the player's row. Returns true when the tick was used
/// (stepped off the ladder or made a vertical step).
fn try_climb(v: &mut Villain, player: &Body, grid: &Grid, cfg: &MotionConfig) -> bool {
    if should_exit_ladder(v, player, grid, cfg) {
        exit_ladder(v, grid, cfg);
        return true;
    }
    match climb_direction(v, player, grid, cfg.tile_size) {
        Some(dir) => attempt_climb(v, dir, grid, cfg),
        None => false,
    }
}

/// Already climbing, level with the player, snapped to a row, floor at a
/// diagonal below.
fn should_exit_ladder(v: &Villain, player: &Body, grid: &Grid, cfg: &MotionConfig) -> bool {
    if !matches!(v.climb, Some(Climb { started: true, .. })) { return false; }
    let t = cfg.tile_size;
    player.tile_position(t).row == v.body.tile_position(t).row
        && motion::is_aligned_y(&v.body, t, cfg.exit_snap_tolerance)
        && motion::valid_floor_below(&v.body, grid, t)
}

fn exit_ladder(v: &mut Villain, grid: &Grid, cfg: &MotionConfig) {
    let n = grid.neighborhood(v.body.tile_position(cfg.tile_size));
    v.clear_intent();
    let dir = if n.lo_left == Tile::Floor {
        Facing::Left
    } else if n.lo_right == Tile::Floor {
        Facing::Right
    } else {
        return;
    };
    debug!("villain {} stepping off ladder {dir:?}", v.id);
    v.body.facing = dir;
    try_move(&mut v.body, dir.dx(), 0, grid, cfg);
}

/// Keep the current climb, or pick one: the player's way if the ladder
/// goes there, otherwise whichever way it goes.
fn climb_direction(v: &mut Villain, player: &Body, grid: &Grid, tile_size: f32) -> Option<ClimbDir> {
    if let Some(c) = v.climb {
        return Some(c.dir);
    }
    let here = v.body.tile_position(tile_size);
    let up = motion::can_climb(ClimbDir::Up, grid, here);
    let down = motion::can_climb(ClimbDir::Down, grid, here);
    let rows_to_player = player.tile_position(tile_size).row - here.row;

    let dir = if rows_to_player > 0 && down {
        ClimbDir::Down
    } else if rows_to_player < 0 && up {
        ClimbDir::Up
    } else if up {
        ClimbDir::Up
    } else if down {
        ClimbDir::Down
    } else {
        return None;
    };
    v.climb = Some(Climb { dir, started: false });
    Some(dir)
}

fn attempt_climb(v: &mut Villain, dir: ClimbDir, grid: &Grid, cfg: &MotionConfig) -> bool {
    if try_move(&mut v.body, 0, dir.dy(), grid, cfg) {
        v.climb = Some(Climb { dir, started: true });
        true
    } else {
        v.climb = None;
        false
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
