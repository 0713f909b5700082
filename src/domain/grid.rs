/// Grid map: the level's character grid decoded into tiles.
///
/// Fixed at level load. The Motion Resolver only reads it; the only
/// writer is the candy scanner (`set_tile`).
///
/// All lookups are bounds-safe: anything outside the grid reads as
/// `Tile::OutOfBounds`, which every movement rule treats as impassable.

use crate::config::CandyConfig;
use super::tile::Tile;

/// Tile coordinate (column, row). Signed so neighbours of the edge
/// cells can be expressed and then resolved to the sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct TilePos {
    pub col: i32,
    pub row: i32,
}

impl TilePos {
    pub fn new(col: i32, row: i32) -> Self {
        TilePos { col, row }
    }

    pub fn offset(self, dc: i32, dr: i32) -> Self {
        TilePos { col: self.col + dc, row: self.row + dr }
    }
}

/// The 3×3 block of tiles around a cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Neighborhood {
    pub up_left: Tile,
    pub up_center: Tile,
    pub up_right: Tile,
    pub left: Tile,
    pub center: Tile,
    pub right: Tile,
    pub lo_left: Tile,
    pub lo_center: Tile,
    pub lo_right: Tile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Build from decoded rows. Ragged rows are padded with `Empty` to the
    /// widest row so the grid is always rectangular.
    pub fn new(mut rows: Vec<Vec<Tile>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, Tile::Empty);
        }
        let height = rows.len();
        Grid { rows, width, height }
    }

    /// Build from map text using the default candy glyphs. Characters without
    /// terrain meaning become `Empty`.
    pub fn from_rows(rows: &[&str]) -> Self {
        let candy = CandyConfig::default();
        Grid::new(
            rows.iter()
                .map(|r| {
                    r.chars()
                        .map(|c| Tile::decode(c, |g| candy.is_candy(g)).unwrap_or(Tile::Empty))
                        .collect()
                })
                .collect(),
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Tile at (col, row), or the out-of-bounds sentinel.
    #[inline]
    pub fn tile_at(&self, col: i32, row: i32) -> Tile {
        if self.in_bounds(col, row) {
            self.rows[row as usize][col as usize]
        } else {
            Tile::OutOfBounds
        }
    }

    #[inline]
    pub fn tile(&self, pos: TilePos) -> Tile {
        self.tile_at(pos.col, pos.row)
    }

    pub fn neighborhood(&self, pos: TilePos) -> Neighborhood {
        let at = |dc: i32, dr: i32| self.tile(pos.offset(dc, dr));
        Neighborhood {
            up_left: at(-1, -1),
            up_center: at(0, -1),
            up_right: at(1, -1),
            left: at(-1, 0),
            center: at(0, 0),
            right: at(1, 0),
            lo_left: at(-1, 1),
            lo_center: at(0, 1),
            lo_right: at(1, 1),
        }
    }

    /// Replace a tile. Out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, pos: TilePos, tile: Tile) {
        if self.in_bounds(pos.col, pos.row) {
            self.rows[pos.row as usize][pos.col as usize] = tile;
        }
    }

    /// Every remaining candy cell, row-major.
    pub fn candies(&self) -> Vec<(TilePos, char)> {
        let mut found = vec![];
        for (y, row) in self.rows.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if let Tile::Candy(c) = *tile {
                    found.push((TilePos::new(x as i32, y as i32), c));
                }
            }
        }
        found
    }

    pub fn has_candy(&self) -> bool {
        self.rows.iter().flatten().any(|t| t.is_candy())
    }

    /// Rightmost x coordinate (px) an actor may occupy.
    pub fn max_x(&self, tile_size: f32) -> f32 {
        (self.width.saturating_sub(1)) as f32 * tile_size
    }
}
