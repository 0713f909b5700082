/// Motion Resolver: terrain legality for one discrete step.
///
/// `try_move` is the single entry point used by both the player input
/// handler and the pursuit controller. It knows nothing about *why* a
/// direction was requested; it checks the grid and either applies the
/// full `(dx, dy) * speed` delta or leaves the body untouched.
///
/// ## Step Truth Table
///
/// ┌──────────────────────────────────────┬─────────┐
/// │ Condition (priority order)            │ Result  │
/// ├──────────────────────────────────────┼─────────┤
/// │ centre tile is Floor                  │ nudge up, moved │
/// │ (dx, dy) == (0, 0)                    │ not moved │
/// │ new x outside [0, (width-1)·T]        │ DENY    │
/// │ dy ≠ 0 and not column-aligned         │ DENY    │
/// │ dy ≠ 0 and not on a ladder (below)    │ DENY    │
/// │ target tile outside grid              │ DENY    │
/// │ lateral: centre is Ladder             │ DENY    │
/// │ lateral: aligned and side tile Barrier│ DENY    │
/// │ lateral: centre is LadderTop          │ DENY    │
/// │ lateral: no row below target          │ DENY    │
/// │ down: centre ∉ {D,E}, below ∉ {L,E,U,F}│ DENY   │
/// │ up: target ∉ {L,D,E,U,T}              │ DENY    │
/// │ Otherwise                             │ ALLOW   │
/// └──────────────────────────────────────┴─────────┘

use log::trace;

use crate::config::MotionConfig;
use super::entity::{Body, ClimbDir};
use super::grid::{Grid, Neighborhood, TilePos};
use super::tile::Tile;

/// Attempt one step. Returns whether the body moved.
pub fn try_move(body: &mut Body, dx: i32, dy: i32, grid: &Grid, cfg: &MotionConfig) -> bool {
    let t = cfg.tile_size;
    let here = body.tile_position(t);
    let tiles = grid.neighborhood(here);

    // Inside floor geometry: recover upward, whatever was requested
    if tiles.center == Tile::Floor {
        trace!("inside floor at {here:?}, nudging up {}px", cfg.floor_nudge);
        body.y -= cfg.floor_nudge;
        return true;
    }
    if dx == 0 && dy == 0 {
        return false;
    }

    let new_x = body.x + dx as f32 * body.speed;
    let new_y = body.y + dy as f32 * body.speed;

    if new_x < 0.0 || new_x > grid.max_x(t) {
        return false;
    }
    if dy != 0 && (!is_aligned_x(body, cfg) || !on_climbable(dy, &tiles)) {
        return false;
    }

    let target = target_tile(new_x, new_y, dx, dy, t);
    if !grid.in_bounds(target.col, target.row) {
        return false;
    }
    if blocks_lateral(body, dx, &tiles, target, grid, cfg) {
        return false;
    }
    if blocks_downward(dy, &tiles) {
        return false;
    }
    if blocks_upward(dy, target, grid) {
        return false;
    }

    body.x = new_x;
    body.y = new_y;
    true
}

/// Tile entered by a step: floor toward negative, ceil toward positive,
/// nearest on an axis with no motion.
pub fn target_tile(new_x: f32, new_y: f32, dx: i32, dy: i32, tile_size: f32) -> TilePos {
    fn axis(v: f32, d: i32) -> i32 {
        let r = match d.signum() {
            -1 => v.floor(),
            1 => v.ceil(),
            _ => v.round(),
        };
        r as i32
    }
    TilePos::new(axis(new_x / tile_size, dx), axis(new_y / tile_size, dy))
}

fn blocks_lateral(
    body: &Body,
    dx: i32,
    tiles: &Neighborhood,
    target: TilePos,
    grid: &Grid,
    cfg: &MotionConfig,
) -> bool {
    if dx == 0 { return false; }
    if tiles.center == Tile::Ladder { return true; }
    if is_aligned_x(body, cfg) {
        if dx < 0 && tiles.left == Tile::Barrier { return true; }
        if dx > 0 && tiles.right == Tile::Barrier { return true; }
    }
    if tiles.center == Tile::LadderTop { return true; }
    !grid.in_bounds(target.col, target.row + 1)
}

/// Vertical steps start from a ladder tile. A descent may also start from
/// the head of a shaft, with the ladder directly underfoot.
fn on_climbable(dy: i32, tiles: &Neighborhood) -> bool {
    tiles.center.is_ladder_family() || (dy > 0 && tiles.lo_center.is_ladder())
}

fn blocks_downward(dy: i32, tiles: &Neighborhood) -> bool {
    if dy <= 0 { return false; }
    !tiles.center.allows_descent() && !tiles.lo_center.supports_descent_into()
}

fn blocks_upward(dy: i32, target: TilePos, grid: &Grid) -> bool {
    if dy >= 0 { return false; }
    !grid.tile(target).accepts_climb_up()
}

// ── Alignment ──

fn distance_to_edge(v: f32, tile_size: f32) -> f32 {
    let rem = v.rem_euclid(tile_size);
    rem.min(tile_size - rem)
}

/// Is the body within tolerance of a column boundary?
pub fn is_aligned_x(body: &Body, cfg: &MotionConfig) -> bool {
    distance_to_edge(body.x, cfg.tile_size) <= cfg.align_tolerance
}

/// Is the body within `tolerance` of a row boundary?
pub fn is_aligned_y(body: &Body, tile_size: f32, tolerance: f32) -> bool {
    distance_to_edge(body.y, tile_size) <= tolerance
}

// ── Ladder queries ──

/// Is the neighbour above/below part of a ladder?
pub fn can_climb(dir: ClimbDir, grid: &Grid, pos: TilePos) -> bool {
    grid.tile(pos.offset(0, dir.dy())).is_ladder_family()
}

/// Floor diagonally below-left or below-right.
pub fn valid_floor_below(body: &Body, grid: &Grid, tile_size: f32) -> bool {
    let n = grid.neighborhood(body.tile_position(tile_size));
    n.lo_left == Tile::Floor || n.lo_right == Tile::Floor
}

/// Standing on a ladder proper (top excluded).
pub fn on_ladder(body: &Body, grid: &Grid, tile_size: f32) -> bool {
    grid.tile(body.tile_position(tile_size)).is_ladder()
}

/// Periodically settle a body floating over a floor onto its row.
/// Only acts every `snap_interval_ticks` ticks.
pub fn snap_to_floor(body: &mut Body, timer: u32, grid: &Grid, cfg: &MotionConfig) {
    if cfg.snap_interval_ticks == 0 || timer % cfg.snap_interval_ticks != 0 { return; }
    let here = body.tile_position(cfg.tile_size);
    let n = grid.neighborhood(here);
    if n.center == Tile::Empty && n.lo_center == Tile::Floor {
        let snap_y = here.row as f32 * cfg.tile_size;
        if body.y != snap_y {
            trace!("snapping to floor row {} from y={:.1}", here.row, body.y);
            body.y = snap_y;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;

    fn cfg() -> MotionConfig {
        Tuning::default().motion
    }

    fn body_at(col: i32, row: i32, speed: f32) -> Body {
        Body::at_tile(TilePos::new(col, row), 32.0, speed)
    }

    // ── Lateral ──

    #[test]
    fn walks_right_on_floor() {
        let g = Grid::from_rows(&["     ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(try_move(&mut b, 1, 0, &g, &cfg()));
        assert_eq!(b.x, 66.0);
        assert_eq!(b.y, 0.0);
    }

    #[test]
    fn zero_step_never_moves() {
        let g = Grid::from_rows(&["  L  ", "FFFFF"]);
        for col in 0..5 {
            let mut b = body_at(col, 0, 2.0);
            let before = b.clone();
            assert!(!try_move(&mut b, 0, 0, &g, &cfg()));
            assert_eq!(b, before);
        }
    }

    #[test]
    fn inside_floor_nudges_up_regardless_of_direction() {
        let g = Grid::from_rows(&["     ", "FFFFF"]);
        for (dx, dy) in [(0, 0), (1, 0), (0, 1)] {
            let mut b = body_at(2, 1, 2.0);
            assert!(try_move(&mut b, dx, dy, &g, &cfg()));
            assert_eq!(b.x, 64.0);
            assert_eq!(b.y, 31.0);
        }
    }

    #[test]
    fn horizontal_map_edges() {
        let g = Grid::from_rows(&["     ", "FFFFF"]);
        let mut b = body_at(0, 0, 2.0);
        assert!(!try_move(&mut b, -1, 0, &g, &cfg()));
        let mut b = body_at(4, 0, 2.0);
        assert!(!try_move(&mut b, 1, 0, &g, &cfg()));
        assert_eq!(b.x, 128.0);
    }

    #[test]
    fn bottom_row_cannot_walk() {
        let g = Grid::from_rows(&["     "]);
        let mut b = body_at(2, 0, 2.0);
        assert!(!try_move(&mut b, 1, 0, &g, &cfg()));
    }

    #[test]
    fn ladder_shaft_blocks_lateral() {
        let g = Grid::from_rows(&["  T  ", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, 1, 0, &g, &cfg()));
        assert!(!try_move(&mut b, -1, 0, &g, &cfg()));
        let mut top = body_at(2, 0, 2.0);
        assert!(!try_move(&mut top, 1, 0, &g, &cfg()));
    }

    #[test]
    fn exit_markers_allow_lateral() {
        let g = Grid::from_rows(&["  U  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(try_move(&mut b, -1, 0, &g, &cfg()));
        assert_eq!(b.x, 62.0);
    }

    #[test]
    fn aligned_actor_blocked_by_barrier() {
        let g = Grid::from_rows(&["     ", " B B ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, -1, 0, &g, &cfg()));
        assert!(!try_move(&mut b, 1, 0, &g, &cfg()));
        assert_eq!(b.x, 64.0);
    }

    #[test]
    fn unaligned_actor_not_blocked_by_barrier_check() {
        let g = Grid::from_rows(&["     ", " B   ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        b.x = 70.0; // 6px past the column, outside tolerance
        assert!(try_move(&mut b, -1, 0, &g, &cfg()));
        assert_eq!(b.x, 68.0);
    }

    #[test]
    fn barrier_on_far_side_does_not_block() {
        let g = Grid::from_rows(&["     ", " B   ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(try_move(&mut b, 1, 0, &g, &cfg()));
    }

    // ── Vertical ──

    #[test]
    fn climbs_up_a_ladder() {
        let g = Grid::from_rows(&["     ", "  T  ", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 2, 2.0);
        assert!(try_move(&mut b, 0, -1, &g, &cfg()));
        assert_eq!(b.y, 62.0);
    }

    #[test]
    fn cannot_climb_into_floor() {
        let g = Grid::from_rows(&["FFFFF", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, 0, -1, &g, &cfg()));
        assert_eq!(b.y, 32.0);
    }

    #[test]
    fn off_ladder_never_moves_vertically() {
        let g = Grid::from_rows(&["     ", "     ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, 0, -1, &g, &cfg()));
        assert!(!try_move(&mut b, 0, 1, &g, &cfg()));
        assert_eq!(b.y, 32.0);
    }

    #[test]
    fn vertical_requires_column_alignment() {
        let g = Grid::from_rows(&["     ", "  T  ", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 2, 2.0);
        b.x = 68.0;
        assert!(!try_move(&mut b, 0, -1, &g, &cfg()));
        b.x = 67.0; // within 3px
        assert!(try_move(&mut b, 0, -1, &g, &cfg()));
    }

    #[test]
    fn descends_from_exit_down_marker() {
        let g = Grid::from_rows(&["  D  ", "FFTFF", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(try_move(&mut b, 0, 1, &g, &cfg()));
        assert_eq!(b.y, 2.0);
    }

    #[test]
    fn cannot_descend_through_ladder_top_from_plain_floor() {
        // Standing above a ladder top without a 'D' marker
        let g = Grid::from_rows(&["     ", "FFTFF", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(!try_move(&mut b, 0, 1, &g, &cfg()));
    }

    #[test]
    fn descends_onto_ladder_below() {
        let g = Grid::from_rows(&["  T  ", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(try_move(&mut b, 0, 1, &g, &cfg()));
        assert_eq!(b.y, 2.0);
    }

    #[test]
    fn descends_into_shaft_from_open_ground() {
        let g = Grid::from_rows(&["     ", "FFLFF", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(try_move(&mut b, 0, 1, &g, &cfg()));
        assert_eq!(b.y, 2.0);

        // The shaft head is not a ladder to climb up from
        let g = Grid::from_rows(&["     ", "     ", "FFLFF", "  L  ", "FFFFF"]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, 0, -1, &g, &cfg()));
        assert_eq!(b.y, 32.0);
    }

    #[test]
    fn standing_on_floor_never_sinks() {
        let g = Grid::from_rows(&["  @  ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        assert!(!try_move(&mut b, 0, 1, &g, &cfg()));
        assert_eq!(b.y, 0.0);
    }

    #[test]
    fn cannot_descend_past_bottom_row() {
        let g = Grid::from_rows(&["FFFFF", "  E  "]);
        let mut b = body_at(2, 1, 2.0);
        assert!(!try_move(&mut b, 0, 1, &g, &cfg()));
    }

    // ── Helpers ──

    #[test]
    fn target_tile_rounds_in_travel_direction() {
        assert_eq!(target_tile(62.0, 64.0, -1, 0, 32.0), TilePos::new(1, 2));
        assert_eq!(target_tile(66.0, 64.0, 1, 0, 32.0), TilePos::new(3, 2));
        assert_eq!(target_tile(64.0, 62.0, 0, -1, 32.0), TilePos::new(2, 1));
        assert_eq!(target_tile(64.0, 66.0, 0, 1, 32.0), TilePos::new(2, 3));
    }

    #[test]
    fn ladder_queries() {
        let g = Grid::from_rows(&["  T  ", " FLF ", "FFFFF"]);
        let pos = TilePos::new(2, 1);
        assert!(can_climb(ClimbDir::Up, &g, pos));
        assert!(!can_climb(ClimbDir::Down, &g, pos));
        let b = body_at(2, 0, 1.0);
        assert!(valid_floor_below(&b, &g, 32.0));
        assert!(!on_ladder(&b, &g, 32.0)); // ladder top is not a ladder proper
        assert!(on_ladder(&body_at(2, 1, 1.0), &g, 32.0));
    }

    #[test]
    fn snap_only_on_interval() {
        let g = Grid::from_rows(&["     ", "FFFFF"]);
        let mut b = body_at(2, 0, 2.0);
        b.y = 5.0;
        snap_to_floor(&mut b, 119, &g, &cfg());
        assert_eq!(b.y, 5.0);
        snap_to_floor(&mut b, 120, &g, &cfg());
        assert_eq!(b.y, 0.0);
    }
}
