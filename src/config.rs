/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::tile::Tile;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: Tuning,
    pub levels_dir: PathBuf,
    pub tick_rate_ms: u64,
    pub log_file: Option<PathBuf>,
}

/// Everything the simulation reads each tick. Cloned into `WorldState`.
#[derive(Clone, Debug)]
pub struct Tuning {
    pub motion: MotionConfig,
    pub pursuit: PursuitConfig,
    pub combat: CombatConfig,
    pub candy: CandyConfig,
}

#[derive(Clone, Debug)]
pub struct MotionConfig {
    pub tile_size: f32,
    pub align_tolerance: f32,     // px from a column centre that still counts as aligned
    pub exit_snap_tolerance: f32, // px from a row boundary for stepping off a ladder
    pub floor_nudge: f32,         // px pushed upward when inside a floor tile
    pub player_speed: f32,
    pub snap_interval_ticks: u32,
}

#[derive(Clone, Debug)]
pub struct PursuitConfig {
    pub stuck_limit_ticks: u32,
    pub villain_min_speed: f32,
    pub villain_max_speed: f32,
    pub loop_speedup: f32, // added to the speed multiplier per full pass over the levels
}

#[derive(Clone, Debug)]
pub struct CombatConfig {
    pub disable_window_ms: u64,
    pub disable_duration_ms: u64,
    pub hits_to_disable: usize,
    pub wake_warning_ms: u64,
    pub beam_range: i32,
    pub beam_duration_ms: u64,
    pub points_per_disable: u32,
    pub death_anim_ms: u64,
    pub death_cooldown_ms: u64,
    pub lives: u32,
}

#[derive(Clone, Debug)]
pub struct CandyConfig {
    pub scores: HashMap<char, u32>,
}

impl CandyConfig {
    pub fn score_for(&self, code: char) -> u32 {
        self.scores.get(&code).copied().unwrap_or(0)
    }

    /// Does this glyph load as candy?
    pub fn is_candy(&self, code: char) -> bool {
        self.scores.contains_key(&code)
    }
}

impl Default for CandyConfig {
    fn default() -> Self {
        Tuning::default().candy
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::from_toml(TomlConfig::default())
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    motion: TomlMotion,
    #[serde(default)]
    pursuit: TomlPursuit,
    #[serde(default)]
    combat: TomlCombat,
    #[serde(default = "default_candy")]
    candy: HashMap<String, u32>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlMotion {
    #[serde(default = "default_tile_size")]
    tile_size: f32,
    #[serde(default = "default_align_tolerance")]
    align_tolerance: f32,
    #[serde(default = "default_exit_snap_tolerance")]
    exit_snap_tolerance: f32,
    #[serde(default = "default_floor_nudge")]
    floor_nudge: f32,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_snap_interval")]
    snap_interval_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPursuit {
    #[serde(default = "default_stuck_limit")]
    stuck_limit_ticks: u32,
    #[serde(default = "default_villain_min_speed")]
    villain_min_speed: f32,
    #[serde(default = "default_villain_max_speed")]
    villain_max_speed: f32,
    #[serde(default = "default_loop_speedup")]
    loop_speedup: f32,
}

#[derive(Deserialize, Debug)]
struct TomlCombat {
    #[serde(default = "default_disable_window")]
    disable_window_ms: u64,
    #[serde(default = "default_disable_duration")]
    disable_duration_ms: u64,
    #[serde(default = "default_hits_to_disable")]
    hits_to_disable: usize,
    #[serde(default = "default_wake_warning")]
    wake_warning_ms: u64,
    #[serde(default = "default_beam_range")]
    beam_range: i32,
    #[serde(default = "default_beam_duration")]
    beam_duration_ms: u64,
    #[serde(default = "default_points_per_disable")]
    points_per_disable: u32,
    #[serde(default = "default_death_anim")]
    death_anim_ms: u64,
    #[serde(default = "default_death_cooldown")]
    death_cooldown_ms: u64,
    #[serde(default = "default_lives")]
    lives: u32,
}

// ── Defaults ──

fn default_levels_dir() -> String { "levels".into() }
fn default_tick_rate() -> u64 { 16 }   // ~60 Hz

fn default_tile_size() -> f32 { 32.0 }
fn default_align_tolerance() -> f32 { 3.0 }
fn default_exit_snap_tolerance() -> f32 { 2.0 }
fn default_floor_nudge() -> f32 { 1.0 }
fn default_player_speed() -> f32 { 2.0 }
fn default_snap_interval() -> u32 { 120 }

fn default_stuck_limit() -> u32 { 45 }
fn default_villain_min_speed() -> f32 { 1.2 }
fn default_villain_max_speed() -> f32 { 1.8 }
fn default_loop_speedup() -> f32 { 0.15 }

fn default_disable_window() -> u64 { 2_000 }
fn default_disable_duration() -> u64 { 30_000 }
fn default_hits_to_disable() -> usize { 3 }
fn default_wake_warning() -> u64 { 1_000 }
fn default_beam_range() -> i32 { 3 }
fn default_beam_duration() -> u64 { 300 }
fn default_points_per_disable() -> u32 { 100 }
fn default_death_anim() -> u64 { 3_000 }
fn default_death_cooldown() -> u64 { 5_000 }  // cannot die again right after respawn
fn default_lives() -> u32 { 3 }

fn default_candy() -> HashMap<String, u32> {
    [("@", 50), ("!", 100), ("#", 150), ("$", 200)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl Default for TomlConfig {
    fn default() -> Self {
        TomlConfig {
            general: TomlGeneral::default(),
            motion: TomlMotion::default(),
            pursuit: TomlPursuit::default(),
            combat: TomlCombat::default(),
            candy: default_candy(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            tick_rate_ms: default_tick_rate(),
            log_file: None,
        }
    }
}

impl Default for TomlMotion {
    fn default() -> Self {
        TomlMotion {
            tile_size: default_tile_size(),
            align_tolerance: default_align_tolerance(),
            exit_snap_tolerance: default_exit_snap_tolerance(),
            floor_nudge: default_floor_nudge(),
            player_speed: default_player_speed(),
            snap_interval_ticks: default_snap_interval(),
        }
    }
}

impl Default for TomlPursuit {
    fn default() -> Self {
        TomlPursuit {
            stuck_limit_ticks: default_stuck_limit(),
            villain_min_speed: default_villain_min_speed(),
            villain_max_speed: default_villain_max_speed(),
            loop_speedup: default_loop_speedup(),
        }
    }
}

impl Default for TomlCombat {
    fn default() -> Self {
        TomlCombat {
            disable_window_ms: default_disable_window(),
            disable_duration_ms: default_disable_duration(),
            hits_to_disable: default_hits_to_disable(),
            wake_warning_ms: default_wake_warning(),
            beam_range: default_beam_range(),
            beam_duration_ms: default_beam_duration(),
            points_per_disable: default_points_per_disable(),
            death_anim_ms: default_death_anim(),
            death_cooldown_ms: default_death_cooldown(),
            lives: default_lives(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        let levels_dir_str = toml_cfg.general.levels_dir.clone();
        let levels_dir = if PathBuf::from(&levels_dir_str).is_absolute() {
            PathBuf::from(&levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(&levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(&levels_dir_str))
        };

        Self::assemble(toml_cfg, levels_dir)
    }

    /// Parse a config document directly. Used by `load` and by tests.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        let levels_dir = PathBuf::from(&toml_cfg.general.levels_dir);
        Ok(Self::assemble(toml_cfg, levels_dir))
    }

    fn assemble(toml_cfg: TomlConfig, levels_dir: PathBuf) -> Self {
        GameConfig {
            levels_dir,
            tick_rate_ms: toml_cfg.general.tick_rate_ms.max(1),
            log_file: toml_cfg.general.log_file.as_ref().map(PathBuf::from),
            tuning: Tuning::from_toml(toml_cfg),
        }
    }
}

impl Tuning {
    fn from_toml(cfg: TomlConfig) -> Self {
        let mut scores = HashMap::new();
        for (key, score) in cfg.candy {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if Tile::is_reserved_code(c) => {
                    eprintln!("Warning: ignoring candy entry {key:?}: already a map code");
                }
                (Some(c), None) => { scores.insert(c, score); }
                _ => eprintln!("Warning: ignoring candy entry {key:?}: key must be a single character"),
            }
        }

        Tuning {
            motion: MotionConfig {
                tile_size: cfg.motion.tile_size,
                align_tolerance: cfg.motion.align_tolerance,
                exit_snap_tolerance: cfg.motion.exit_snap_tolerance,
                floor_nudge: cfg.motion.floor_nudge,
                player_speed: cfg.motion.player_speed,
                snap_interval_ticks: cfg.motion.snap_interval_ticks,
            },
            pursuit: PursuitConfig {
                stuck_limit_ticks: cfg.pursuit.stuck_limit_ticks,
                villain_min_speed: cfg.pursuit.villain_min_speed,
                villain_max_speed: cfg.pursuit.villain_max_speed,
                loop_speedup: cfg.pursuit.loop_speedup,
            },
            combat: CombatConfig {
                disable_window_ms: cfg.combat.disable_window_ms,
                disable_duration_ms: cfg.combat.disable_duration_ms,
                hits_to_disable: cfg.combat.hits_to_disable,
                wake_warning_ms: cfg.combat.wake_warning_ms,
                beam_range: cfg.combat.beam_range,
                beam_duration_ms: cfg.combat.beam_duration_ms,
                points_per_disable: cfg.combat.points_per_disable,
                death_anim_ms: cfg.combat.death_anim_ms,
                death_cooldown_ms: cfg.combat.death_cooldown_ms,
                lives: cfg.combat.lives,
            },
            candy: CandyConfig { scores },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    eprintln!("Warning: config.toml parse error: {e}");
                    eprintln!("Using default settings.");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                eprintln!("Warning: could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}
