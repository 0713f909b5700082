/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels_dir` (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.txt`):
///   Line 1: `# Level Name` (optional)
///   Lines: map rows, top to bottom
///
/// ## Tile legend:
///   'F' = Floor                  'L' = Ladder
///   'T' = Ladder top             'U' = Ladder exit (up)
///   'D' = Ladder exit (down)     'E' = Ladder exit (both)
///   'B' = Barrier                'P' = Player spawn
///   'V' = Villain spawn          ' ' = Empty
///
/// Candy glyphs are whatever the `[candy]` table names (`@ ! # $` by
/// default). Ragged rows are padded with spaces to the widest row.
/// Characters outside the legend load as empty and are logged.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{CandyConfig, GameConfig};
use crate::domain::entity::{Body, Player, Villain};
use crate::domain::grid::{Grid, TilePos};
use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level {name:?} has no map rows")]
    NoRows { name: String },
    #[error("level {name:?} has no player spawn 'P'")]
    NoPlayerSpawn { name: String },
    #[error("no levels available")]
    NoLevels,
}

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

/// A level decoded into terrain plus the spawn markers lifted out of it.
#[derive(Debug)]
pub struct LevelLayout {
    pub grid: Grid,
    pub player_spawn: TilePos,
    pub villain_spawns: Vec<TilePos>,
}

impl LevelDef {
    /// Parse a single level from text content.
    pub fn parse(content: &str, fallback_name: &str) -> Result<LevelDef, LevelError> {
        let mut name = String::new();
        let mut rows: Vec<String> = vec![];

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if name.is_empty() && rows.is_empty() && is_name_line(line) {
                name = line[1..].trim().to_string();
            } else {
                rows.push(line.to_string());
            }
        }

        while rows.last().map_or(false, |r| r.trim().is_empty()) {
            rows.pop();
        }
        if name.is_empty() {
            name = fallback_name.to_string();
        }
        if rows.is_empty() {
            return Err(LevelError::NoRows { name });
        }

        let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        for row in &mut rows {
            let len = row.chars().count();
            if len < max_width {
                row.extend(std::iter::repeat(' ').take(max_width - len));
            }
        }

        if !rows.iter().any(|r| r.contains('P')) {
            return Err(LevelError::NoPlayerSpawn { name });
        }
        Ok(LevelDef { name, rows })
    }

    /// Decode the rows into a grid, lifting out the spawn markers. Glyphs in
    /// the candy table become candy; nothing else does.
    pub fn layout(&self, candy: &CandyConfig) -> Result<LevelLayout, LevelError> {
        if self.rows.is_empty() {
            return Err(LevelError::NoRows { name: self.name.clone() });
        }

        let mut player_spawn = None;
        let mut villain_spawns = vec![];
        let mut tiles = Vec::with_capacity(self.rows.len());

        for (y, row) in self.rows.iter().enumerate() {
            let mut line = Vec::with_capacity(row.len());
            for (x, ch) in row.chars().enumerate() {
                let pos = TilePos::new(x as i32, y as i32);
                let tile = match ch {
                    'P' => {
                        if player_spawn.replace(pos).is_some() {
                            warn!("level {:?}: extra player spawn at {pos:?}, using the last", self.name);
                        }
                        Tile::Empty
                    }
                    'V' => {
                        villain_spawns.push(pos);
                        Tile::Empty
                    }
                    _ => match Tile::decode(ch, |c| candy.is_candy(c)) {
                        Some(Tile::OutOfBounds) | None => {
                            warn!("level {:?}: unknown tile {ch:?} at {pos:?}", self.name);
                            Tile::Empty
                        }
                        Some(t) => t,
                    },
                };
                line.push(tile);
            }
            tiles.push(line);
        }

        let player_spawn = player_spawn
            .ok_or_else(|| LevelError::NoPlayerSpawn { name: self.name.clone() })?;

        Ok(LevelLayout { grid: Grid::new(tiles), player_spawn, villain_spawns })
    }
}

/// A header starts with `# ` and contains a lowercase letter; map rows only
/// use uppercase codes, so `# $ F` stays a row of candy.
fn is_name_line(line: &str) -> bool {
    line.starts_with("# ") && line.chars().any(|c| c.is_lowercase())
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// The level list for this run: the configured directory if it yields any
/// level, the embedded set otherwise.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    match load_from_directory(dir) {
        Ok(levels) if !levels.is_empty() => {
            info!("loaded {} levels from {}", levels.len(), dir.display());
            levels
        }
        Ok(_) => {
            info!("no levels in {}, using built-in levels", dir.display());
            embedded_levels()
        }
        Err(e) => {
            if dir.exists() {
                warn!("{e}; using built-in levels");
            } else {
                debug!("{e}; using built-in levels");
            }
            embedded_levels()
        }
    }
}

/// Read every `.txt` level in `dir`, sorted by file name. Unreadable or
/// invalid files are logged and skipped.
pub fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LevelError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut levels = vec![];
    for path in paths {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let parsed = std::fs::read_to_string(&path)
            .map_err(|source| LevelError::Io { path: path.clone(), source })
            .and_then(|content| LevelDef::parse(&content, &stem));
        match parsed {
            Ok(def) => levels.push(def),
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(levels)
}

/// Load a level into the world state. Preserves score, lives and the
/// loop count.
pub fn load_level(world: &mut WorldState, levels: &[LevelDef], level_idx: usize) -> Result<(), LevelError> {
    let def = levels.get(level_idx).ok_or(LevelError::NoLevels)?;
    let layout = def.layout(&world.tuning.candy)?;

    let t = world.tile_size();
    let multiplier = world.speed_multiplier();
    let pursuit = &world.tuning.pursuit;
    let total = layout.villain_spawns.len();
    world.villains = layout.villain_spawns.iter().enumerate()
        .map(|(i, &pos)| {
            let speed = Villain::speed_for(
                i, total, pursuit.villain_min_speed, pursuit.villain_max_speed, multiplier,
            );
            Villain::new(i, Body::at_tile(pos, t, speed))
        })
        .collect();

    world.player = Player::new(Body::at_tile(layout.player_spawn, t, world.tuning.motion.player_speed));
    world.player_spawn = layout.player_spawn;
    world.villain_spawns = layout.villain_spawns;
    world.grid = layout.grid;
    world.beams.clear();

    world.current_level = level_idx;
    world.total_levels = levels.len();
    world.level_name = def.name.clone();
    world.tick = 0;
    world.phase = Phase::Playing;
    world.set_message(&def.name, 80);

    info!(
        "level {} {:?}: {}x{}, {} villains, {} candies, speed x{:.2}",
        level_idx + 1, def.name, world.grid.width(), world.grid.height(),
        total, world.candies_left(), multiplier,
    );
    Ok(())
}

/// Move on to the next level, wrapping to the first and speeding the
/// villains up after the last.
pub fn advance_level(world: &mut WorldState, levels: &[LevelDef]) -> Result<(), LevelError> {
    let mut next = world.current_level + 1;
    if next >= levels.len() {
        next = 0;
        world.loop_count += 1;
        info!("level list wrapped (loop {})", world.loop_count);
    }
    load_level(world, levels, next)
}

/// Fresh score, lives and speed, starting at the first level.
pub fn new_game(world: &mut WorldState, levels: &[LevelDef]) -> Result<(), LevelError> {
    world.score = 0;
    world.lives = world.tuning.combat.lives;
    world.loop_count = 0;
    load_level(world, levels, 0)
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Sugar Rush", &[
            "                         ",
            "                         ",
            "                         ",
            "  @ D   V     !    D  #  ",
            "FFFFTFFFFFFFFFFFFFFTFFFFF",
            "    L              L     ",
            "    L              L     ",
            "    L              L     ",
            "  $ U  B    D      U V @ ",
            "FFFFFFFFFFFFTFFFFFFFFFFFF",
            "            L            ",
            "            L            ",
            "            L            ",
            " P   !      U    B  #  $ ",
            "FFFFFFFFFFFFFFFFFFFFFFFFF",
        ]),
        make_embedded("Lollipop Lane", &[
            "                         ",
            "                         ",
            "                         ",
            "  ! D      @    V   D  $ ",
            "FFFFTFFFFFFFFFFFFFFFTFFFF",
            "    L               L    ",
            "    L               L    ",
            "    L               L    ",
            "  # U   V   D     B U  ! ",
            "FFFFFFFFFFFFTFFFFFFFFFFFF",
            "            L            ",
            "            L            ",
            "            L            ",
            "  @  V      E   P   $    ",
            "FFFFFFFFFFFFFFFFFFFFFFFFF",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}
