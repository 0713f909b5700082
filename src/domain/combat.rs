/// Combat / disable layer.
///
/// A villain hit `hits_to_disable` times inside a sliding window is frozen
/// for a fixed duration. The gate is purely time-based: there is no
/// re-enable call, `is_disabled(now)` simply turns false once `now`
/// reaches `disabled_until`.
///
/// The player fires a short beam covering a few tiles in the facing
/// direction; each beam hits each villain at most once.

use std::collections::VecDeque;

use log::{debug, info};

use crate::config::{CombatConfig, MotionConfig};
use super::entity::{Facing, Player, Villain};
use super::grid::{Grid, TilePos};

/// Time-ordered hit timestamps plus the resulting disable deadline.
#[derive(Clone, Debug, Default)]
pub struct HitHistory {
    times: VecDeque<u64>,
    disabled_until: Option<u64>,
}

impl HitHistory {
    /// Record a hit. Returns true only when this hit newly disables.
    pub fn register(&mut self, now_ms: u64, cfg: &CombatConfig) -> bool {
        self.times.push_back(now_ms);
        while let Some(&oldest) = self.times.front() {
            if now_ms.saturating_sub(oldest) > cfg.disable_window_ms {
                self.times.pop_front();
            } else {
                break;
            }
        }
        if self.times.len() >= cfg.hits_to_disable && !self.is_disabled(now_ms) {
            self.disabled_until = Some(now_ms + cfg.disable_duration_ms);
            return true;
        }
        false
    }

    pub fn is_disabled(&self, now_ms: u64) -> bool {
        self.disabled_until.map_or(false, |until| now_ms < until)
    }

    pub fn disabled_until(&self) -> Option<u64> {
        self.disabled_until
    }

    /// Forget an expired deadline. Returns true if one was cleared.
    pub fn clear_expired(&mut self, now_ms: u64) -> bool {
        match self.disabled_until {
            Some(until) if now_ms >= until => {
                self.disabled_until = None;
                true
            }
            _ => false,
        }
    }

    /// Hits currently inside the window (as of the last registration).
    pub fn recent_hits(&self) -> usize {
        self.times.len()
    }
}

/// Capability shared by every actor that takes part in combat.
pub trait Combatant {
    fn tile_position(&self, tile_size: f32) -> TilePos;

    /// Is this actor out of play right now?
    fn is_disabled(&self, now_ms: u64) -> bool;

    /// Apply a hit. Returns true if it newly disabled the actor.
    fn register_hit(&mut self, _now_ms: u64, _cfg: &CombatConfig) -> bool {
        false
    }
}

impl Combatant for Villain {
    fn tile_position(&self, tile_size: f32) -> TilePos {
        self.body.tile_position(tile_size)
    }

    fn is_disabled(&self, now_ms: u64) -> bool {
        self.hits.is_disabled(now_ms)
    }

    fn register_hit(&mut self, now_ms: u64, cfg: &CombatConfig) -> bool {
        let disabled = self.hits.register(now_ms, cfg);
        debug!("villain {} hit at {now_ms}ms; recent={}", self.id, self.hits.recent_hits());
        if disabled {
            self.clear_intent();
            self.wake_warned = false;
            info!("villain {} disabled until {:?}", self.id, self.hits.disabled_until());
        }
        disabled
    }
}

impl Combatant for Player {
    fn tile_position(&self, tile_size: f32) -> TilePos {
        self.body.tile_position(tile_size)
    }

    fn is_disabled(&self, _now_ms: u64) -> bool {
        self.is_dying()
    }
}

// ── Beam ──

/// A short-lived shot covering a row segment.
#[derive(Clone, Debug)]
pub struct Beam {
    pub spawn_ms: u64,
    pub tiles: Vec<TilePos>,
}

impl Beam {
    pub fn new(origin: TilePos, facing: Facing, range: i32, now_ms: u64) -> Self {
        let step = facing.dx();
        Beam {
            spawn_ms: now_ms,
            tiles: (1..=range).map(|i| origin.offset(step * i, 0)).collect(),
        }
    }

    pub fn covers(&self, pos: TilePos) -> bool {
        self.tiles.contains(&pos)
    }

    /// Remaining opacity 255 → 0 over the beam's lifetime.
    pub fn alpha(&self, now_ms: u64, duration_ms: u64) -> u8 {
        let elapsed = now_ms.saturating_sub(self.spawn_ms);
        if duration_ms == 0 || elapsed >= duration_ms { return 0; }
        (255.0 * (1.0 - elapsed as f32 / duration_ms as f32)) as u8
    }

    pub fn is_expired(&self, now_ms: u64, duration_ms: u64) -> bool {
        self.alpha(now_ms, duration_ms) == 0
    }
}

/// Fire from the player's tile. Returns the beam and how many villains it
/// newly disabled, or None when firing is not allowed here.
pub fn fire_beam(
    player: &Player,
    villains: &mut [Villain],
    grid: &Grid,
    motion: &MotionConfig,
    cfg: &CombatConfig,
    now_ms: u64,
) -> Option<(Beam, u32)> {
    let t = motion.tile_size;
    let origin = player.tile_position(t);
    if player.is_disabled(now_ms) || grid.tile(origin).is_combat_ineligible() {
        return None;
    }

    let beam = Beam::new(origin, player.body.facing, cfg.beam_range, now_ms);
    let mut newly_disabled = 0;
    for v in villains.iter_mut() {
        let pos = v.tile_position(t);
        if !beam.covers(pos) || grid.tile(pos).is_combat_ineligible() {
            continue;
        }
        if v.register_hit(now_ms, cfg) {
            newly_disabled += 1;
        }
    }
    Some((beam, newly_disabled))
}

/// Does an active villain share the player's tile?
pub fn player_touched(
    player: &Player,
    villains: &[Villain],
    grid: &Grid,
    tile_size: f32,
    now_ms: u64,
) -> bool {
    if player.is_dying() || player.is_invulnerable(now_ms) { return false; }
    let pos = player.tile_position(tile_size);
    if grid.tile(pos).is_combat_ineligible() { return false; }
    villains.iter().any(|v| !v.is_disabled(now_ms) && v.tile_position(tile_size) == pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::domain::entity::{Body, Climb, ClimbDir};

    fn cfg() -> CombatConfig {
        Tuning::default().combat
    }

    fn villain_at(id: usize, col: i32, row: i32) -> Villain {
        Villain::new(id, Body::at_tile(TilePos::new(col, row), 32.0, 1.5))
    }

    fn player_at(col: i32, row: i32) -> Player {
        Player::new(Body::at_tile(TilePos::new(col, row), 32.0, 2.0))
    }

    // ── Hit history ──

    #[test]
    fn three_hits_in_window_disable() {
        let c = cfg();
        let mut h = HitHistory::default();
        assert!(!h.register(0, &c));
        assert!(!h.register(500, &c));
        assert!(h.register(1_900, &c));
        assert_eq!(h.disabled_until(), Some(31_900));
    }

    #[test]
    fn old_hits_pruned_before_count() {
        let c = cfg();
        let mut h = HitHistory::default();
        assert!(!h.register(0, &c));
        assert!(!h.register(2_500, &c));
        assert_eq!(h.recent_hits(), 1);
        assert!(!h.is_disabled(2_500));
    }

    #[test]
    fn hit_exactly_at_window_edge_counts() {
        let c = cfg();
        let mut h = HitHistory::default();
        h.register(0, &c);
        h.register(1_000, &c);
        assert!(h.register(2_000, &c));
    }

    #[test]
    fn further_hits_do_not_extend_disable() {
        let c = cfg();
        let mut h = HitHistory::default();
        h.register(0, &c);
        h.register(500, &c);
        h.register(1_900, &c);
        assert!(!h.register(1_950, &c));
        assert!(!h.register(2_000, &c));
        assert_eq!(h.disabled_until(), Some(31_900));
    }

    #[test]
    fn disable_expires_at_deadline() {
        let c = cfg();
        let mut h = HitHistory::default();
        h.register(0, &c);
        h.register(500, &c);
        h.register(1_900, &c);
        assert!(h.is_disabled(31_899));
        assert!(!h.is_disabled(31_900));
        assert!(h.clear_expired(31_900));
        assert_eq!(h.disabled_until(), None);
    }

    #[test]
    fn can_be_disabled_again_after_expiry() {
        let c = cfg();
        let mut h = HitHistory::default();
        for t in [0, 100, 200] { h.register(t, &c); }
        for t in [40_000, 40_100] { assert!(!h.register(t, &c)); }
        assert!(h.register(40_200, &c));
        assert_eq!(h.disabled_until(), Some(70_200));
    }

    #[test]
    fn disabling_clears_villain_intent() {
        let c = cfg();
        let mut v = villain_at(0, 2, 0);
        v.seek = Some(Facing::Left);
        v.climb = Some(Climb { dir: ClimbDir::Up, started: true });
        v.register_hit(0, &c);
        v.register_hit(10, &c);
        assert!(v.seek.is_some());
        assert!(v.register_hit(20, &c));
        assert!(v.seek.is_none());
        assert!(!v.is_climbing());
    }

    // ── Beam ──

    #[test]
    fn beam_disables_villains_in_range_after_three_shots() {
        let grid = Grid::from_rows(&["        ", "FFFFFFFF"]);
        let player = player_at(1, 0);
        let mut villains = vec![villain_at(0, 2, 0), villain_at(1, 4, 0), villain_at(2, 5, 0)];
        let (motion, c) = (Tuning::default().motion, cfg());

        let (beam, n) = fire_beam(&player, &mut villains, &grid, &motion, &c, 0).unwrap();
        assert_eq!(beam.tiles, vec![TilePos::new(2, 0), TilePos::new(3, 0), TilePos::new(4, 0)]);
        assert_eq!(n, 0);
        assert_eq!(fire_beam(&player, &mut villains, &grid, &motion, &c, 500).unwrap().1, 0);
        assert_eq!(fire_beam(&player, &mut villains, &grid, &motion, &c, 1_000).unwrap().1, 2);
        assert!(villains[0].is_disabled(1_000));
        assert!(villains[1].is_disabled(1_000));
        assert!(!villains[2].is_disabled(1_000));
        assert_eq!(villains[2].hits.recent_hits(), 0);
    }

    #[test]
    fn beam_follows_facing() {
        let mut player = player_at(4, 0);
        player.body.facing = Facing::Left;
        let beam = Beam::new(player.tile_position(32.0), player.body.facing, 3, 0);
        assert!(beam.covers(TilePos::new(1, 0)));
        assert!(!beam.covers(TilePos::new(5, 0)));
    }

    #[test]
    fn cannot_fire_from_ladder() {
        let grid = Grid::from_rows(&["  L  ", "FFFFF"]);
        let player = player_at(2, 0);
        let (motion, c) = (Tuning::default().motion, cfg());
        assert!(fire_beam(&player, &mut [], &grid, &motion, &c, 0).is_none());
    }

    #[test]
    fn villain_on_ladder_is_not_hit() {
        let grid = Grid::from_rows(&["   L ", "FFFFF"]);
        let player = player_at(1, 0);
        let mut villains = vec![villain_at(0, 3, 0)];
        let (motion, c) = (Tuning::default().motion, cfg());
        for t in [0, 100, 200] {
            fire_beam(&player, &mut villains, &grid, &motion, &c, t);
        }
        assert_eq!(villains[0].hits.recent_hits(), 0);
    }

    #[test]
    fn beam_fades_out() {
        let beam = Beam::new(TilePos::new(0, 0), Facing::Right, 3, 1_000);
        assert_eq!(beam.alpha(1_000, 300), 255);
        assert!(beam.alpha(1_150, 300) < beam.alpha(1_100, 300));
        assert!(!beam.is_expired(1_200, 300));
        assert!(beam.is_expired(1_300, 300));
    }

    // ── Contact ──

    #[test]
    fn active_villain_on_player_tile_touches() {
        let grid = Grid::from_rows(&["     ", "FFFFF"]);
        let player = player_at(2, 0);
        let villains = vec![villain_at(0, 2, 0)];
        assert!(player_touched(&player, &villains, &grid, 32.0, 0));
    }

    #[test]
    fn disabled_villain_or_invulnerable_player_does_not_touch() {
        let grid = Grid::from_rows(&["     ", "FFFFF"]);
        let c = cfg();
        let mut player = player_at(2, 0);
        let mut villains = vec![villain_at(0, 2, 0)];
        for t in [0, 1, 2] { villains[0].register_hit(t, &c); }
        assert!(!player_touched(&player, &villains, &grid, 32.0, 10));

        let villains = vec![villain_at(0, 2, 0)];
        player.invulnerable_until_ms = 5_000;
        assert!(!player_touched(&player, &villains, &grid, 32.0, 4_999));
        assert!(player_touched(&player, &villains, &grid, 32.0, 5_000));
    }
}
