/// Entities: Player and Villain, plus the transient pursuit state.
///
/// Positions are continuous (pixel space). The tile an actor is "in" is
/// always derived by rounding, see `Body::tile_position`.

use super::combat::HitHistory;
use super::grid::TilePos;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// Horizontal step for this direction.
    pub fn dx(self) -> i32 {
        match self {
            Facing::Left => -1,
            Facing::Right => 1,
        }
    }

    pub fn from_dx(dx: i32) -> Option<Self> {
        match dx.signum() {
            -1 => Some(Facing::Left),
            1 => Some(Facing::Right),
            _ => None,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    /// Unit step `(dx, dy)` handed to the motion resolver.
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Frame input: movement is continuous (held key), fire is edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub fire: bool,
}

/// Position, speed and facing shared by every actor.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub facing: Facing,
}

impl Body {
    pub fn new(x: f32, y: f32, speed: f32) -> Self {
        Body { x, y, speed, facing: Facing::Right }
    }

    /// Place a body on the top-left corner of a tile.
    pub fn at_tile(pos: TilePos, tile_size: f32, speed: f32) -> Self {
        Body::new(pos.col as f32 * tile_size, pos.row as f32 * tile_size, speed)
    }

    /// The tile whose centre is nearest: rounding, not flooring.
    pub fn tile_position(&self, tile_size: f32) -> TilePos {
        TilePos::new(
            (self.x / tile_size).round() as i32,
            (self.y / tile_size).round() as i32,
        )
    }

    pub fn teleport_to(&mut self, pos: TilePos, tile_size: f32) {
        self.x = pos.col as f32 * tile_size;
        self.y = pos.row as f32 * tile_size;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClimbDir {
    Up,
    Down,
}

impl ClimbDir {
    pub fn dy(self) -> i32 {
        match self {
            ClimbDir::Up => -1,
            ClimbDir::Down => 1,
        }
    }
}

/// An active climb. Absence (`None` on the villain) means "not climbing".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Climb {
    pub dir: ClimbDir,
    pub started: bool, // at least one vertical step has succeeded
}

/// Counts consecutive ticks spent in the same tile.
#[derive(Clone, Debug, Default)]
pub struct StuckTracker {
    pub last: Option<TilePos>,
    pub ticks: u32,
}

impl StuckTracker {
    /// Record this tick's tile. Returns true once the same tile has been
    /// seen for more than `limit` ticks.
    pub fn observe(&mut self, pos: TilePos, limit: u32) -> bool {
        if self.last.is_none() {
            self.last = Some(pos);
            self.ticks = 0;
        }
        if self.last == Some(pos) {
            self.ticks += 1;
            self.ticks > limit
        } else {
            self.last = Some(pos);
            self.ticks = 0;
            false
        }
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub timer: u32,
    pub death_start_ms: Option<u64>,
    pub invulnerable_until_ms: u64,
    pub spin_angle: f32, // degrees, only meaningful while dying
}

impl Player {
    pub fn new(body: Body) -> Self {
        Player {
            body,
            timer: 0,
            death_start_ms: None,
            invulnerable_until_ms: 0,
            spin_angle: 0.0,
        }
    }

    pub fn is_dying(&self) -> bool {
        self.death_start_ms.is_some()
    }

    pub fn is_invulnerable(&self, now_ms: u64) -> bool {
        now_ms < self.invulnerable_until_ms
    }

    /// Begin the death animation. No-op if already dying.
    pub fn start_death(&mut self, now_ms: u64) {
        if self.is_dying() { return; }
        self.death_start_ms = Some(now_ms);
        self.spin_angle = 0.0;
    }

    /// Advance the death animation. Returns true on the tick it finishes.
    pub fn update_death(&mut self, now_ms: u64, anim_ms: u64, cooldown_ms: u64) -> bool {
        let start = match self.death_start_ms { Some(s) => s, None => return false };
        let elapsed = now_ms.saturating_sub(start);
        // One full turn per second
        self.spin_angle = elapsed as f32 * 360.0 / 1000.0;
        if elapsed >= anim_ms {
            self.death_start_ms = None;
            self.spin_angle = 0.0;
            self.invulnerable_until_ms = now_ms + cooldown_ms;
            return true;
        }
        false
    }
}

#[derive(Clone, Debug)]
pub struct Villain {
    pub id: usize,
    pub body: Body,
    pub timer: u32,
    pub climb: Option<Climb>,
    pub seek: Option<Facing>,
    pub stuck: StuckTracker,
    pub hits: HitHistory,
    pub wake_warned: bool,
}

impl Villain {
    pub fn new(id: usize, body: Body) -> Self {
        Villain {
            id,
            body,
            timer: 0,
            climb: None,
            seek: None,
            stuck: StuckTracker::default(),
            hits: HitHistory::default(),
            wake_warned: false,
        }
    }

    /// Speed for villain `index` of `total`: spread evenly between the
    /// slowest and fastest, then scaled.
    pub fn speed_for(index: usize, total: usize, min: f32, max: f32, multiplier: f32) -> f32 {
        let t = index as f32 / total.saturating_sub(1).max(1) as f32;
        (min + t * (max - min)) * multiplier
    }

    pub fn is_climbing(&self) -> bool {
        self.climb.is_some()
    }

    /// Drop every pursuit and climb intent.
    pub fn clear_intent(&mut self) {
        self.seek = None;
        self.climb = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_position_rounds_to_nearest() {
        let b = Body::new(47.9, 16.0, 1.0);
        assert_eq!(b.tile_position(32.0), TilePos::new(1, 1)); // 1.497, 0.5 → 1
        let b = Body::new(48.1, 15.9, 1.0);
        assert_eq!(b.tile_position(32.0), TilePos::new(2, 0));
    }

    #[test]
    fn stuck_tracker_counts_same_tile() {
        let mut s = StuckTracker::default();
        let p = TilePos::new(3, 3);
        for _ in 0..45 {
            assert!(!s.observe(p, 45));
        }
        assert!(s.observe(p, 45));
        assert!(!s.observe(TilePos::new(4, 3), 45));
        assert_eq!(s.ticks, 0);
    }

    #[test]
    fn villain_speeds_spread_over_range() {
        assert!((Villain::speed_for(0, 3, 1.2, 1.8, 1.0) - 1.2).abs() < 1e-6);
        assert!((Villain::speed_for(1, 3, 1.2, 1.8, 1.0) - 1.5).abs() < 1e-6);
        assert!((Villain::speed_for(2, 3, 1.2, 1.8, 1.0) - 1.8).abs() < 1e-6);
        assert!((Villain::speed_for(0, 1, 1.2, 1.8, 1.15) - 1.38).abs() < 1e-5);
    }

    #[test]
    fn death_animation_then_invulnerability() {
        let mut p = Player::new(Body::new(0.0, 0.0, 2.0));
        p.start_death(1_000);
        p.start_death(1_500); // ignored while dying
        assert_eq!(p.death_start_ms, Some(1_000));
        assert!(!p.update_death(2_000, 3_000, 5_000));
        assert!((p.spin_angle - 360.0).abs() < 1e-3);
        assert!(p.update_death(4_000, 3_000, 5_000));
        assert!(!p.is_dying());
        assert!(p.is_invulnerable(8_999));
        assert!(!p.is_invulnerable(9_000));
    }
}
